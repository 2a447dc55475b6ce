//! # filedrop-core
//!
//! Core crate for FileDrop. Contains configuration schemas, the storage
//! provider trait, typed identifiers, and the unified error system.
//!
//! This crate has **no** internal dependencies on other FileDrop crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
