//! Custom error types for the common library
//!
//! This module defines the error type raised by the credential storage
//! substrate.

use thiserror::Error;

/// Custom error type for credential store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error occurred while reading or writing the backing file
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored contents could not be encoded or decoded
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing file holds something other than a JSON object of strings
    #[error("Store corrupted: {0}")]
    Corrupted(String),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
