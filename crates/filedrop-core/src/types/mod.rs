//! Core type definitions used across the FileDrop workspace.

pub mod id;

pub use id::*;
