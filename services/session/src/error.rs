//! Custom error types for the session client

use common::StoreError;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while talking to the storefront API or persisting credentials
///
/// The session manager collapses every variant into the same recovery action
/// per operation; the distinction is kept for diagnostics.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No credential of the required kind is stored
    #[error("No {0} token stored")]
    MissingCredential(&'static str),

    /// The API reported the presented token as invalid or expired
    #[error("Token is invalid or expired")]
    InvalidToken,

    /// The API answered with a non-success status
    #[error("Request rejected with status {status}")]
    Rejected { status: StatusCode },

    /// The request never produced a usable response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response carried a body of the wrong shape
    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Credentials could not be persisted
    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),
}

/// Type alias for session results
pub type SessionResult<T> = Result<T, SessionError>;
