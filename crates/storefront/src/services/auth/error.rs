//! Authentication error types.

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] loopstore_core::EmailError),

    /// Invalid credentials (wrong password or unknown account).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password too short.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The API rejected the request or could not be reached.
    #[error("auth request failed: {0}")]
    Api(#[from] ApiError),

    /// The local session copy could not be updated.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
}
