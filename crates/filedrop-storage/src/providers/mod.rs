//! Concrete [`StorageProvider`](filedrop_core::traits::StorageProvider) implementations.

pub mod local;

pub use local::LocalStorageProvider;
