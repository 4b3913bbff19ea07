//! Strong type definitions for the Consent Kernel.
//!
//! Identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Identifier of a claim inside one resolution round.
///
/// Ids are assigned sequentially from 0 while projecting the tenant claim
/// catalog and are only meaningful against the `ConsentClaimsData` they were
/// issued with.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub u32);

impl ClaimId {
    /// Get the raw value.
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClaimId({})", self.0)
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ClaimId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Store-assigned consent receipt identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReceiptId(pub String);

impl ReceiptId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive a fresh identifier from canonical receipt bytes.
    ///
    /// The digest covers the canonical bytes, the creation time and a random
    /// nonce, so two identical submissions still get distinct ids.
    pub fn derive(canonical: &[u8], created_at: i64) -> Self {
        let nonce: [u8; 16] = rand::random();
        let mut hasher = blake3::Hasher::new();
        hasher.update(canonical);
        hasher.update(&created_at.to_be_bytes());
        hasher.update(&nonce);
        Self(hex::encode(hasher.finalize().as_bytes()))
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.0.get(..16).unwrap_or(&self.0);
        write!(f, "ReceiptId({})", short)
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReceiptId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle state of a consent receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptState {
    Active,
    Revoked,
}

impl ReceiptState {
    /// Wire form used by consent stores.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReceiptState::Active => "ACTIVE",
            ReceiptState::Revoked => "REVOKED",
        }
    }
}

impl fmt::Display for ReceiptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiptState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(ReceiptState::Active),
            "REVOKED" => Ok(ReceiptState::Revoked),
            other => Err(CoreError::Malformed(format!("unknown receipt state: {other}"))),
        }
    }
}

/// How the consent was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsentType {
    Explicit,
    Implicit,
}

impl ConsentType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConsentType::Explicit => "EXPLICIT",
            ConsentType::Implicit => "IMPLICIT",
        }
    }
}

impl fmt::Display for ConsentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
