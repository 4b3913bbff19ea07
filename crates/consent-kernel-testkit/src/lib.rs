//! # Consent Kernel Testkit
//!
//! Testing utilities for the Consent Kernel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: in-memory collaborators seeded with a sample catalog, service and subject
//! - **Generators**: Proptest strategies for property-based testing
//! - **Recording**: a store wrapper that records which operations were called
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use consent_kernel_core::process_user_consent;
//! use consent_kernel_testkit::generators::prompt_with_approvals;
//!
//! proptest! {
//!     #[test]
//!     fn approved_claims_were_prompted((data, ids) in prompt_with_approvals(8)) {
//!         if let Ok(consent) = process_user_consent(&ids, &data) {
//!             for claim in consent.approved_claims {
//!                 prop_assert!(data.find(claim.id).is_some());
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use consent_kernel_testkit::fixtures::ConsentFixture;
//! use consent_kernel_testkit::recording::RecordingStore;
//! use consent_kernel_store::MemoryStore;
//!
//! let fixture = ConsentFixture::with_store(RecordingStore::new(MemoryStore::new()));
//! assert_eq!(fixture.subject.qualified_name(), "PRIMARY/alice");
//! ```

pub mod fixtures;
pub mod generators;
pub mod recording;

pub use fixtures::{sample_catalog, sample_service, sample_subject, ConsentFixture};
pub use recording::RecordingStore;
