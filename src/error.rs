use thiserror::Error;

/// Outcomes of a lookup attempt that are not a successful match.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Input failed the username shape check and was never submitted.
    #[error("invalid username: {0:?}")]
    ValidationRejected(String),

    /// The service answered with an empty result set.
    #[error("user not found")]
    NotFound,

    /// Transport failure or a response that could not be understood.
    #[error("lookup failed: {0}")]
    LookupFailed(String),
}
