//! # Timeline Common Library
//!
//! Shared code for the timeline crates:
//! - Legacy array grammar codec
//! - Lenient scalar coercion
//! - Memo/image variant schemas and batch payloads
//! - Row store abstraction and its SQLite implementation
//! - Configuration loading
//! - Time helpers

pub mod coerce;
pub mod config;
pub mod db;
pub mod error;
pub mod legacy;
pub mod time;
pub mod timeline;

pub use error::{CodecError, Error, Result};
