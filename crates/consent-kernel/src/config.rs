//! Configuration for the consent service.
//!
//! Everything has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};

use consent_kernel_core::{ConsentType, TerminationPolicy, SUPER_TENANT_DOMAIN};

use crate::error::Result;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentConfig {
    /// Tenant of services without an owner.
    pub default_tenant_domain: String,
    /// Metadata stamped on every written receipt.
    pub receipt: ReceiptPolicy,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            default_tenant_domain: SUPER_TENANT_DOMAIN.to_string(),
            receipt: ReceiptPolicy::default(),
        }
    }
}

impl ConsentConfig {
    /// Parse a JSON document, filling omitted fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Fixed receipt metadata and default taxonomy names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptPolicy {
    pub collection_method: String,
    pub jurisdiction: String,
    pub language: String,
    pub policy_url: String,
    pub consent_type: ConsentType,
    /// Validity attached to every consented PII category.
    pub termination: TerminationPolicy,
    pub default_purpose: String,
    pub default_purpose_category: String,
    /// Description for the default purpose and purpose category.
    pub default_purpose_description: String,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self {
            collection_method: "Web Form - Sign-in".to_string(),
            jurisdiction: "LK".to_string(),
            language: "us_EN".to_string(),
            policy_url: "http://nolink".to_string(),
            consent_type: ConsentType::Explicit,
            termination: TerminationPolicy::Indefinite,
            default_purpose: "DEFAULT".to_string(),
            default_purpose_category: "DEFAULT".to_string(),
            default_purpose_description: "Core functionality".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsentError;

    #[test]
    fn test_empty_json_is_default() {
        let config = ConsentConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ConsentConfig::default());
        assert_eq!(config.default_tenant_domain, "carbon.super");
        assert_eq!(config.receipt.termination.to_string(), "DATE_UNTIL:INDEFINITE");
    }

    #[test]
    fn test_partial_override() {
        let config = ConsentConfig::from_json_str(
            r#"{"default_tenant_domain": "wso2.com", "receipt": {"jurisdiction": "US"}}"#,
        )
        .unwrap();
        assert_eq!(config.default_tenant_domain, "wso2.com");
        assert_eq!(config.receipt.jurisdiction, "US");
        assert_eq!(config.receipt.language, "us_EN");
    }

    #[test]
    fn test_invalid_json() {
        let err = ConsentConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConsentError::Config(_)));
    }
}
