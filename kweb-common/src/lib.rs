//! # Knowledge Web Common Library
//!
//! Shared code for the knowledge web services including:
//! - Common error type
//! - TOML configuration model and resolution
//! - Root folder initialization
//! - SQLite connection pool setup

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;

pub use error::{Error, Result};
