//! # Consent Kernel
//!
//! Consent-claim reconciliation for single-sign-on flows: which claims a
//! relying service needs, which of those a subject already consented to,
//! and recording fresh consent as an immutable receipt.
//!
//! ## Overview
//!
//! [`ConsentService`] composes four components:
//!
//! - **Resolver** ([`resolver`]): required claims, minus what an active receipt covers
//! - **Lookup** ([`lookup`]): the subject's single active receipt for a service
//! - **Decision processing** ([`process_user_consent`]): approved/disapproved split with mandatory enforcement
//! - **Writer** ([`writer`]): taxonomy provisioning and receipt submission
//!
//! ## Usage
//!
//! ```rust,no_run
//! use consent_kernel::{ConsentConfig, ConsentService};
//! use consent_kernel::core::{ClaimId, ClaimMapping, ServiceDescriptor, SubjectIdentity};
//! use consent_kernel::store::{MemoryClaimCatalog, MemoryServiceRegistry, SqliteStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::open("consent.db")?;
//!     let service = ConsentService::new(
//!         store,
//!         MemoryClaimCatalog::new(),
//!         MemoryServiceRegistry::new(),
//!         ConsentConfig::default(),
//!     );
//!
//!     let app = ServiceDescriptor::new("travelocity")
//!         .with_claim(ClaimMapping::mandatory("http://wso2.org/claims/emailaddress"));
//!     let subject = SubjectIdentity::new("alice", "PRIMARY", "carbon.super");
//!
//!     // Ask what needs consent, then record the subject's answer.
//!     let prompt = service.get_consent_required_claims(&app, &subject).await?;
//!     let approved: Vec<ClaimId> = prompt.mandatory_claims.iter().map(|c| c.id).collect();
//!     service.process_consent(&approved, &app, &subject, &prompt).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `consent_kernel::core` - Data model and pure decision logic
//! - `consent_kernel::store` - Collaborator traits and reference stores

pub mod config;
pub mod error;
pub mod lookup;
pub mod resolver;
pub mod service;
pub mod taxonomy;
pub mod writer;

pub use consent_kernel_core as core;
pub use consent_kernel_store as store;

pub use config::{ConsentConfig, ReceiptPolicy};
pub use error::{ConsentError, QueryFailure, Result};
pub use lookup::{ReceiptScope, RECEIPT_SEARCH_LIMIT};
pub use service::ConsentService;

pub use consent_kernel_core::{
    process_user_consent, ClaimId, ClaimMetaData, ConsentClaimsData, ReceiptId,
    ServiceDescriptor, SubjectIdentity, UserConsent,
};
