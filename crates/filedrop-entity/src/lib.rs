//! # filedrop-entity
//!
//! Persisted record models for FileDrop. Every struct in this crate
//! represents a database table row and derives `Debug`, `Clone`,
//! `Serialize`, `Deserialize`, and `sqlx::FromRow`.

pub mod file;
pub mod item;
pub mod user;

pub use file::FileRecord;
pub use item::ItemRecord;
pub use user::UserRecord;
