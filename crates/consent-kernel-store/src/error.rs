//! Error types for the store module.

use std::fmt;

use consent_kernel_core::CoreError;
use thiserror::Error;

/// Kind of taxonomy record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyKind {
    Purpose,
    PurposeCategory,
    PiiCategory,
}

impl fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaxonomyKind::Purpose => "purpose",
            TaxonomyKind::PurposeCategory => "purpose category",
            TaxonomyKind::PiiCategory => "PII category",
        })
    }
}

/// Errors that can occur during store operations.
///
/// [`StoreError::NameNotFound`] is the only client error callers are
/// expected to recover from; everything else is a management error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No taxonomy record with this name in the tenant.
    #[error("{kind} name is invalid or not found: {name}")]
    NameNotFound { kind: TaxonomyKind, name: String },

    /// A taxonomy record with this name already exists in the tenant.
    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: TaxonomyKind, name: String },

    /// Receipt not found.
    #[error("receipt not found: {0}")]
    ReceiptNotFound(String),

    /// A receipt input references a taxonomy id the store does not know.
    #[error("unknown {kind} id: {id}")]
    UnknownReference { kind: TaxonomyKind, id: i64 },

    /// The call was made without a tenant context.
    #[error("tenant context not established")]
    MissingContext,

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Blob encoding error.
    #[error("serialization error: {0}")]
    Serialization(#[from] CoreError),

    /// A stored value failed to decode.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking task failed to complete.
    #[error("background task failed: {0}")]
    Task(String),

    /// Catalog or registry backend failure.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True for the "name not found" client error of the given kind.
    pub fn is_name_not_found(&self, expected: TaxonomyKind) -> bool {
        matches!(self, StoreError::NameNotFound { kind, .. } if *kind == expected)
    }

    /// True when a create lost a race against another writer.
    pub fn is_already_exists(&self, expected: TaxonomyKind) -> bool {
        matches!(self, StoreError::AlreadyExists { kind, .. } if *kind == expected)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
