//! Error types for the Consent Kernel Core.

use thiserror::Error;

/// Core errors that can occur while working with claims and receipts.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The subject refused at least one mandatory claim.
    #[error("consent denied for mandatory attributes: {}", claims.join(", "))]
    MandatoryConsentDenied { claims: Vec<String> },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("malformed value: {0}")]
    Malformed(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
