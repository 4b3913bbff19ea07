//! # Consent Kernel Core
//!
//! Pure primitives for the Consent Kernel: claims, consent decisions,
//! receipts and the consent taxonomy.
//!
//! This crate contains no I/O, no storage, no networking. Everything here
//! is request-scoped computation over values handed in by the caller.
//!
//! ## Key Types
//!
//! - [`ClaimMetaData`] - A claim shown in a consent prompt, equal by [`ClaimId`]
//! - [`ConsentClaimsData`] - Mandatory and requested claims still needing consent
//! - [`UserConsent`] - The approved/disapproved split of one decision
//! - [`Receipt`] - A persisted consent record
//! - [`TenantContext`] - Tenant and acting subject for store calls
//!
//! ## Decisions
//!
//! [`process_user_consent`] enforces that mandatory claims are never
//! silently dropped.

pub mod canonical;
pub mod claims;
pub mod decision;
pub mod error;
pub mod receipt;
pub mod service;
pub mod taxonomy;
pub mod types;

pub use canonical::{canonical_bytes, from_cbor, to_cbor};
pub use claims::{
    project_catalog, ClaimMetaData, ConsentClaimsData, LocalClaim, UserConsent,
    DESCRIPTION_PROPERTY, DISPLAY_NAME_PROPERTY,
};
pub use decision::{merge_claims_with_consent, process_user_consent};
pub use error::{CoreError, Result};
pub use receipt::{
    AddReceiptResponse, ConsentPurpose, PiiCategoryValidity, Receipt, ReceiptInput,
    ReceiptPurposeInput, ReceiptService, ReceiptServiceInput, ReceiptSummary, TerminationPolicy,
};
pub use service::{
    qualify_username, ClaimMapping, ClaimRequirements, ServiceDescriptor, SubjectIdentity,
    TenantContext, DOMAIN_SEPARATOR, SUPER_TENANT_DOMAIN,
};
pub use taxonomy::{
    PiiCategory, PiiCategoryInput, Purpose, PurposeCategory, PurposeCategoryInput, PurposeInput,
};
pub use types::{ClaimId, ConsentType, ReceiptId, ReceiptState};
