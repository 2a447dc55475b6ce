//! # filedrop-storage
//!
//! Storage provider implementations for FileDrop. Uploaded payloads are
//! written to, and expired files removed from, the local filesystem.

pub mod providers;

pub use providers::LocalStorageProvider;
