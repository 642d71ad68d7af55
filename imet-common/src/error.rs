//! Workspace-wide error type
//!
//! Only the failure classes shared across crates live here. Lookup-domain
//! errors (provider codes, HTTP statuses) belong to the service crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or parse error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure with no more specific classification
    #[error("Internal error: {0}")]
    Internal(String),
}
