//! Error types for consent operations.

use consent_kernel_core::CoreError;
use consent_kernel_store::StoreError;
use thiserror::Error;

/// Why reading the current consent failed.
#[derive(Debug, Error)]
pub enum QueryFailure {
    /// The single-active-receipt invariant is broken.
    #[error("subject has {0} active receipts for the service, expected at most one")]
    MultipleActive(usize),

    /// A collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that can occur during consent operations.
#[derive(Debug, Error)]
pub enum ConsentError {
    /// The caller passed something unusable. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reading required claims or existing receipts failed.
    #[error("consent query failed while {operation} for {subject} in {tenant_domain}")]
    ConsentQuery {
        operation: &'static str,
        tenant_domain: String,
        subject: String,
        #[source]
        reason: QueryFailure,
    },

    /// The subject withheld consent for mandatory claims.
    #[error("consent denied for mandatory attributes: {}", claims.join(", "))]
    MandatoryConsentDenied { claims: Vec<String> },

    /// Provisioning taxonomy or writing the receipt failed.
    #[error("receipt write failed while {operation} for {subject} in {tenant_domain}")]
    ReceiptWrite {
        operation: &'static str,
        tenant_domain: String,
        subject: String,
        #[source]
        source: StoreError,
    },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Encoding or other core failure.
    #[error("core error: {0}")]
    Core(CoreError),
}

impl From<CoreError> for ConsentError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MandatoryConsentDenied { claims } => {
                ConsentError::MandatoryConsentDenied { claims }
            }
            other => ConsentError::Core(other),
        }
    }
}

impl ConsentError {
    /// True when the subject's receipts break the single-active invariant.
    pub fn is_multiple_active(&self) -> bool {
        matches!(
            self,
            ConsentError::ConsentQuery {
                reason: QueryFailure::MultipleActive(_),
                ..
            }
        )
    }
}

/// Result type for consent operations.
pub type Result<T> = std::result::Result<T, ConsentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mandatory_denial_converts() {
        let err: ConsentError = CoreError::MandatoryConsentDenied {
            claims: vec!["email".into(), "country".into()],
        }
        .into();
        assert!(matches!(err, ConsentError::MandatoryConsentDenied { .. }));
        assert_eq!(
            err.to_string(),
            "consent denied for mandatory attributes: email, country"
        );
    }

    #[test]
    fn test_query_error_keeps_source() {
        use std::error::Error;

        let err = ConsentError::ConsentQuery {
            operation: "searching receipts",
            tenant_domain: "carbon.super".into(),
            subject: "PRIMARY/alice".into(),
            reason: QueryFailure::MultipleActive(2),
        };
        assert!(err.is_multiple_active());
        assert!(err.to_string().contains("PRIMARY/alice"));
        assert!(err.source().unwrap().to_string().contains("2 active receipts"));
    }
}
