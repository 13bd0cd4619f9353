//! Common error types for Postula
//!
//! Store and form-session failures have their own narrower types
//! ([`crate::StoreError`], [`crate::SyncError`]); this enum covers startup
//! concerns: opening the database, reading configuration, parsing ids.

use thiserror::Error;

/// Common result type for Postula operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Database open/schema error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or located
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed identifier or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
