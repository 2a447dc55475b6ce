//! # filedrop-database
//!
//! Persistence gateway for FileDrop: the repository traits the maintenance
//! jobs depend on, a PostgreSQL implementation backed by sqlx, and an
//! in-memory implementation for development and tests.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::connect_pool;
pub use repositories::{
    FileRepository, ItemRepository, MemoryRepository, RepositorySet, UserRepository,
};
