//! Common error types for the GenoDash client core

use thiserror::Error;

/// Common result type for GenoDash operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every client-side service.
///
/// One-shot operations (sign, upload, submit) surface these directly and
/// never retry. The poll loop retries `Transient` and `Server` internally
/// and treats everything else as fatal for the watched job.
#[derive(Error, Debug)]
pub enum Error {
    /// Local precondition failed; the request was never sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// 401/403 from the backend; re-auth or insufficient permission
    #[error("Auth error ({status}): {message}")]
    Auth { status: u16, message: String },

    /// 404 for a referenced file/job/analysis id
    #[error("Not found: {0}")]
    NotFound(String),

    /// 409; the resource already exists (consent already signed)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transport-level failure (connection refused, timeout, bad body)
    #[error("Network error: {0}")]
    Transient(String),

    /// 5xx on a one-shot call, with the server-provided message preserved
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors the poll loop may retry at the next tick.
    ///
    /// 401/403/404 always stop the loop; only transport failures and
    /// 5xx responses are treated as transient during polling.
    pub fn is_retryable_in_poll(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Server { .. })
    }
}
