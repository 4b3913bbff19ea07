//! Claim metadata and the consent prompt data built from it.
//!
//! A [`ClaimMetaData`] is a request-scoped view of one tenant claim. Its
//! identity is the [`ClaimId`] alone: two values with the same id compare
//! equal even if their URI or display metadata differ, because the id is
//! what a consent prompt hands back when the subject approves a claim.

use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::types::ClaimId;

/// Catalog property holding a claim's human readable name.
pub const DISPLAY_NAME_PROPERTY: &str = "DisplayName";

/// Catalog property holding a claim's description.
pub const DESCRIPTION_PROPERTY: &str = "Description";

/// A claim as shown to the subject in a consent prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimMetaData {
    pub id: ClaimId,
    pub claim_uri: String,
    pub display_name: String,
    pub description: String,
}

impl ClaimMetaData {
    pub fn new(
        id: u32,
        claim_uri: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: ClaimId(id),
            claim_uri: claim_uri.into(),
            display_name: display_name.into(),
            description: description.into(),
        }
    }

    /// Build from a catalog entry, falling back to the URI for a blank
    /// display name and to the empty string for a blank description.
    pub fn from_local_claim(id: ClaimId, local: &LocalClaim) -> Self {
        let display_name = local
            .property(DISPLAY_NAME_PROPERTY)
            .unwrap_or(&local.claim_uri)
            .to_string();
        let description = local
            .property(DESCRIPTION_PROPERTY)
            .unwrap_or_default()
            .to_string();

        Self {
            id,
            claim_uri: local.claim_uri.clone(),
            display_name,
            description,
        }
    }
}

// Equality is keyed on the id only.
impl PartialEq for ClaimMetaData {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClaimMetaData {}

impl Hash for ClaimMetaData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Claims that still need a consent decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentClaimsData {
    pub mandatory_claims: Vec<ClaimMetaData>,
    pub requested_claims: Vec<ClaimMetaData>,
}

impl ConsentClaimsData {
    /// True when there is nothing to ask the subject.
    pub fn is_empty(&self) -> bool {
        self.mandatory_claims.is_empty() && self.requested_claims.is_empty()
    }

    /// Find a claim by id, mandatory claims first.
    pub fn find(&self, id: ClaimId) -> Option<&ClaimMetaData> {
        self.mandatory_claims
            .iter()
            .chain(self.requested_claims.iter())
            .find(|claim| claim.id == id)
    }

    /// All claims requiring consent, mandatory first.
    pub fn consent_required(&self) -> Vec<ClaimMetaData> {
        self.mandatory_claims
            .iter()
            .chain(self.requested_claims.iter())
            .cloned()
            .collect()
    }
}

/// The subject's decision on one consent prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConsent {
    pub approved_claims: Vec<ClaimMetaData>,
    pub disapproved_claims: Vec<ClaimMetaData>,
}

/// One entry of a tenant claim catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalClaim {
    pub claim_uri: String,
    pub properties: BTreeMap<String, String>,
}

impl LocalClaim {
    pub fn new(claim_uri: impl Into<String>) -> Self {
        Self {
            claim_uri: claim_uri.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Set the display name property.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.properties
            .insert(DISPLAY_NAME_PROPERTY.to_string(), display_name.into());
        self
    }

    /// Set the description property.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.properties
            .insert(DESCRIPTION_PROPERTY.to_string(), description.into());
        self
    }

    /// A non-blank property value.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Project the required claim URIs onto the tenant catalog.
///
/// Ids are assigned from 0 in catalog order. Traversal stops as soon as
/// every required URI has been matched; URIs missing from the catalog are
/// dropped. A URI listed as mandatory is never also emitted as requested.
pub fn project_catalog(
    catalog: &[LocalClaim],
    mandatory: &[String],
    requested: &[String],
) -> ConsentClaimsData {
    let mandatory: HashSet<&str> = mandatory.iter().map(String::as_str).collect();
    let requested: HashSet<&str> = requested
        .iter()
        .map(String::as_str)
        .filter(|uri| !mandatory.contains(uri))
        .collect();
    let wanted = mandatory.len() + requested.len();

    let mut data = ConsentClaimsData::default();
    let mut next_id = 0u32;

    for local in catalog {
        if data.mandatory_claims.len() + data.requested_claims.len() == wanted {
            break;
        }

        let uri = local.claim_uri.as_str();
        let target = if mandatory.contains(uri) {
            &mut data.mandatory_claims
        } else if requested.contains(uri) {
            &mut data.requested_claims
        } else {
            continue;
        };

        // Catalogs are keyed by URI; ignore a repeated entry.
        if target.iter().any(|claim| claim.claim_uri == uri) {
            continue;
        }

        target.push(ClaimMetaData::from_local_claim(ClaimId(next_id), local));
        next_id += 1;
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<LocalClaim> {
        vec![
            LocalClaim::new("http://wso2.org/claims/country").with_display_name("Country"),
            LocalClaim::new("http://wso2.org/claims/emailaddress")
                .with_display_name("Email")
                .with_description("Primary email address"),
            LocalClaim::new("http://wso2.org/claims/givenname").with_display_name("  "),
            LocalClaim::new("http://wso2.org/claims/telephone"),
        ]
    }

    fn uris(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_equality_is_by_id() {
        let a = ClaimMetaData::new(3, "email", "Email", "");
        let b = ClaimMetaData::new(3, "country", "Country", "other");
        let c = ClaimMetaData::new(4, "email", "Email", "");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_project_assigns_ids_in_catalog_order() {
        let data = project_catalog(
            &catalog(),
            &uris(&["http://wso2.org/claims/emailaddress"]),
            &uris(&["http://wso2.org/claims/country"]),
        );

        assert_eq!(data.requested_claims.len(), 1);
        assert_eq!(data.requested_claims[0].id, ClaimId(0));
        assert_eq!(data.requested_claims[0].display_name, "Country");
        assert_eq!(data.mandatory_claims.len(), 1);
        assert_eq!(data.mandatory_claims[0].id, ClaimId(1));
        assert_eq!(data.mandatory_claims[0].description, "Primary email address");
    }

    #[test]
    fn test_project_fallbacks() {
        let data = project_catalog(
            &catalog(),
            &uris(&["http://wso2.org/claims/givenname"]),
            &[],
        );
        let claim = &data.mandatory_claims[0];
        assert_eq!(claim.display_name, "http://wso2.org/claims/givenname");
        assert_eq!(claim.description, "");
    }

    #[test]
    fn test_project_omits_unknown_uris() {
        let data = project_catalog(
            &catalog(),
            &uris(&["http://wso2.org/claims/unknown"]),
            &uris(&["http://wso2.org/claims/telephone"]),
        );
        assert!(data.mandatory_claims.is_empty());
        assert_eq!(data.requested_claims.len(), 1);
        assert_eq!(data.requested_claims[0].id, ClaimId(0));
    }

    #[test]
    fn test_project_empty_requirements() {
        let data = project_catalog(&catalog(), &[], &[]);
        assert!(data.is_empty());
    }

    #[test]
    fn test_find_prefers_mandatory() {
        let data = ConsentClaimsData {
            mandatory_claims: vec![ClaimMetaData::new(0, "email", "Email", "")],
            requested_claims: vec![ClaimMetaData::new(1, "country", "Country", "")],
        };
        assert_eq!(data.find(ClaimId(1)).unwrap().claim_uri, "country");
        assert!(data.find(ClaimId(7)).is_none());
        assert_eq!(data.consent_required().len(), 2);
    }

    #[test]
    fn test_prompt_json_shape() {
        let data = ConsentClaimsData {
            mandatory_claims: vec![ClaimMetaData::new(0, "email", "Email", "")],
            requested_claims: vec![],
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["mandatory_claims"][0]["id"], 0);
        assert_eq!(json["mandatory_claims"][0]["claim_uri"], "email");
        assert!(json["requested_claims"].as_array().unwrap().is_empty());
    }
}
