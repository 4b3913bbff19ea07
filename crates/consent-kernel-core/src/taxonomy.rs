//! Consent taxonomy: purposes, purpose categories and PII categories.
//!
//! Taxonomy records are tenant-scoped reference data keyed by name. Stores
//! assign the numeric ids.

use serde::{Deserialize, Serialize};

/// Why personal data is collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purpose {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// Grouping of purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeCategory {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// A category of personally identifiable data; one per claim URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiCategory {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub display_name: String,
    pub sensitive: bool,
}

/// New purpose to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeInput {
    pub name: String,
    pub description: String,
}

impl PurposeInput {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// New purpose category to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeCategoryInput {
    pub name: String,
    pub description: String,
}

impl PurposeCategoryInput {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// New PII category to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiCategoryInput {
    pub name: String,
    pub description: String,
    pub display_name: String,
    pub sensitive: bool,
}

impl PiiCategoryInput {
    /// A non-sensitive category with the given name and display name.
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            display_name: display_name.into(),
            sensitive: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
