//! Error types for the validation library.
//!
//! Most validation outcomes are reported as [`CheckResult`](crate::levels::CheckResult)
//! values rather than errors. The variants here cover malformed input, programming
//! errors against the [`ValidationContext`](crate::context::ValidationContext) API and
//! configuration problems.

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during signature validation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mandatory element of the signature is missing or malformed.
    ///
    /// Aborts the validation of the affected signature.
    #[error("Structural error: {0}")]
    Structural(String),

    /// A token handle that was never added to the validation context.
    #[error("Unknown token handle: {0}")]
    UnknownToken(usize),

    /// Revocation data was already recorded for a token.
    #[error("Revocation data already recorded for token {0}")]
    RevocationDataAlreadySet(usize),

    /// Certificate could not be decoded.
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    /// CRL could not be decoded.
    #[error("Invalid CRL: {0}")]
    InvalidCrl(String),

    /// Unsupported digest or signature algorithm.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
