//! Consent receipts: the durable record of a subject's consent.
//!
//! A receipt is immutable once written. Changing consent means writing a
//! new receipt that supersedes the active one.
//!
//! ## Structure
//!
//! ```text
//! Receipt
//! └── ReceiptService (one per relying service)
//!     └── ConsentPurpose (why the data is collected)
//!         └── PiiCategoryValidity (one per consented claim)
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::claims::ClaimMetaData;
use crate::error::CoreError;
use crate::types::{ClaimId, ConsentType, ReceiptId, ReceiptState};

const DATE_UNTIL_PREFIX: &str = "DATE_UNTIL:";
const INDEFINITE: &str = "INDEFINITE";

/// How long a consent stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TerminationPolicy {
    #[default]
    Indefinite,
    /// Valid until the given Unix time in milliseconds.
    Until(i64),
}

impl TerminationPolicy {
    /// Whether consent under this policy still holds at `now` (Unix ms).
    pub fn is_valid_at(&self, now: i64) -> bool {
        match self {
            TerminationPolicy::Indefinite => true,
            TerminationPolicy::Until(deadline) => now < *deadline,
        }
    }
}

impl fmt::Display for TerminationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationPolicy::Indefinite => write!(f, "{DATE_UNTIL_PREFIX}{INDEFINITE}"),
            TerminationPolicy::Until(ms) => write!(f, "{DATE_UNTIL_PREFIX}{ms}"),
        }
    }
}

impl FromStr for TerminationPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .strip_prefix(DATE_UNTIL_PREFIX)
            .ok_or_else(|| CoreError::Malformed(format!("termination policy: {s}")))?;

        if value == INDEFINITE {
            return Ok(TerminationPolicy::Indefinite);
        }
        value
            .parse::<i64>()
            .map(TerminationPolicy::Until)
            .map_err(|_| CoreError::Malformed(format!("termination policy: {s}")))
    }
}

/// A PII category id paired with its validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiCategoryValidity {
    pub id: i64,
    pub validity: String,
    /// Category name; filled in by stores when reading receipts.
    pub name: Option<String>,
    pub display_name: Option<String>,
}

impl PiiCategoryValidity {
    pub fn new(id: i64, termination: TerminationPolicy) -> Self {
        Self {
            id,
            validity: termination.to_string(),
            name: None,
            display_name: None,
        }
    }

    /// Whether this consent still holds at `now`.
    ///
    /// Validities that cannot be parsed are trusted as given.
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.validity
            .parse::<TerminationPolicy>()
            .map(|policy| policy.is_valid_at(now))
            .unwrap_or(true)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stored receipts
// ─────────────────────────────────────────────────────────────────────────────

/// A purpose recorded in a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPurpose {
    pub purpose_id: i64,
    pub purpose: String,
    pub purpose_category_ids: Vec<i64>,
    pub consent_type: ConsentType,
    pub primary_purpose: bool,
    pub third_party_disclosure: bool,
    pub third_party_name: Option<String>,
    pub termination: String,
    pub pii_categories: Vec<PiiCategoryValidity>,
}

/// A service section of a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptService {
    pub service: String,
    pub tenant_domain: String,
    pub sp_display_name: String,
    pub sp_description: String,
    pub purposes: Vec<ConsentPurpose>,
}

/// A persisted consent receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub consent_receipt_id: ReceiptId,
    pub pii_principal_id: String,
    /// Tenant the receipt was written in.
    pub tenant_domain: String,
    pub state: ReceiptState,
    pub created_at: i64,
    pub collection_method: String,
    pub jurisdiction: String,
    pub language: String,
    pub policy_url: String,
    pub properties: BTreeMap<String, String>,
    pub services: Vec<ReceiptService>,
}

impl Receipt {
    /// All PII category validities across services and purposes, in order.
    pub fn pii_categories(&self) -> impl Iterator<Item = &PiiCategoryValidity> {
        self.services
            .iter()
            .flat_map(|service| service.purposes.iter())
            .flat_map(|purpose| purpose.pii_categories.iter())
    }

    /// Claims the subject consented to and that are still valid at `now`.
    ///
    /// The claim URI is the PII category name. Ids are assigned from 0 in
    /// receipt order and carry no meaning beyond this list.
    pub fn consented_claims(&self, now: i64) -> Vec<ClaimMetaData> {
        self.pii_categories()
            .filter(|pii| pii.is_valid_at(now))
            .filter_map(|pii| {
                let uri = pii.name.clone()?;
                let display_name = pii.display_name.clone().unwrap_or_else(|| uri.clone());
                Some((uri, display_name))
            })
            .enumerate()
            .map(|(i, (uri, display_name))| ClaimMetaData {
                id: ClaimId(i as u32),
                claim_uri: uri,
                display_name,
                description: String::new(),
            })
            .collect()
    }
}

/// Search result row for receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptSummary {
    pub consent_receipt_id: ReceiptId,
    pub pii_principal_id: String,
    pub service: String,
    pub tenant_domain: String,
    pub state: ReceiptState,
}

// ─────────────────────────────────────────────────────────────────────────────
// Receipt inputs
// ─────────────────────────────────────────────────────────────────────────────

/// A purpose to record, referencing taxonomy entries by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptPurposeInput {
    pub purpose_id: i64,
    pub purpose_category_ids: Vec<i64>,
    pub consent_type: ConsentType,
    pub primary_purpose: bool,
    pub third_party_disclosure: bool,
    pub third_party_name: Option<String>,
    pub termination: String,
    pub pii_categories: Vec<PiiCategoryValidity>,
}

/// A service section to record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptServiceInput {
    pub service: String,
    pub tenant_domain: String,
    pub sp_display_name: String,
    pub sp_description: String,
    pub purposes: Vec<ReceiptPurposeInput>,
}

/// Everything a store needs to write a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptInput {
    pub pii_principal_id: String,
    pub collection_method: String,
    pub jurisdiction: String,
    pub language: String,
    pub policy_url: String,
    pub properties: BTreeMap<String, String>,
    pub services: Vec<ReceiptServiceInput>,
}

/// Store response to a successful receipt write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddReceiptResponse {
    pub consent_receipt_id: ReceiptId,
    pub pii_principal_id: String,
    pub tenant_domain: String,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pii(id: i64, name: &str, validity: &str) -> PiiCategoryValidity {
        PiiCategoryValidity {
            id,
            validity: validity.to_string(),
            name: Some(name.to_string()),
            display_name: None,
        }
    }

    fn receipt(pii_categories: Vec<PiiCategoryValidity>) -> Receipt {
        Receipt {
            consent_receipt_id: ReceiptId::new("r1"),
            pii_principal_id: "PRIMARY/alice".into(),
            tenant_domain: "carbon.super".into(),
            state: ReceiptState::Active,
            created_at: 0,
            collection_method: String::new(),
            jurisdiction: String::new(),
            language: String::new(),
            policy_url: String::new(),
            properties: BTreeMap::new(),
            services: vec![ReceiptService {
                service: "travelocity".into(),
                tenant_domain: "carbon.super".into(),
                sp_display_name: "travelocity".into(),
                sp_description: "travelocity".into(),
                purposes: vec![ConsentPurpose {
                    purpose_id: 1,
                    purpose: "DEFAULT".into(),
                    purpose_category_ids: vec![1],
                    consent_type: ConsentType::Explicit,
                    primary_purpose: true,
                    third_party_disclosure: false,
                    third_party_name: None,
                    termination: TerminationPolicy::Indefinite.to_string(),
                    pii_categories,
                }],
            }],
        }
    }

    #[test]
    fn test_termination_policy_format() {
        assert_eq!(TerminationPolicy::Indefinite.to_string(), "DATE_UNTIL:INDEFINITE");
        assert_eq!(TerminationPolicy::Until(42).to_string(), "DATE_UNTIL:42");
        assert_eq!(
            "DATE_UNTIL:INDEFINITE".parse::<TerminationPolicy>().unwrap(),
            TerminationPolicy::Indefinite
        );
        assert_eq!(
            "DATE_UNTIL:42".parse::<TerminationPolicy>().unwrap(),
            TerminationPolicy::Until(42)
        );
        assert!("forever".parse::<TerminationPolicy>().is_err());
    }

    #[test]
    fn test_consented_claims_skip_expired() {
        let r = receipt(vec![
            pii(1, "email", "DATE_UNTIL:INDEFINITE"),
            pii(2, "country", "DATE_UNTIL:1000"),
            pii(3, "telephone", "garbage"),
        ]);

        let claims = r.consented_claims(2000);
        let uris: Vec<_> = claims.iter().map(|c| c.claim_uri.as_str()).collect();
        assert_eq!(uris, vec!["email", "telephone"]);
        assert_eq!(claims[1].id, ClaimId(1));
        assert_eq!(claims[0].display_name, "email");

        assert_eq!(r.consented_claims(500).len(), 3);
    }
}
