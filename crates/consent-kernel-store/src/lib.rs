//! # Consent Kernel Store
//!
//! Collaborator abstractions for the Consent Kernel: the consent store, the
//! tenant claim catalog and the service registry, with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`ConsentStore`] - Receipts plus purpose, purpose category and PII category taxonomy
//! - [`ClaimCatalog`] - Local claims of a tenant
//! - [`ServiceRegistry`] - Relying service configuration
//! - [`SqliteStore`] - SQLite-based persistent consent store
//! - [`MemoryStore`] - In-memory consent store for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use consent_kernel_core::{PurposeInput, TenantContext};
//! use consent_kernel_store::{ConsentStore, SqliteStore};
//!
//! async fn example() -> consent_kernel_store::Result<()> {
//!     let store = SqliteStore::open("consent.db")?;
//!     let ctx = TenantContext::new("carbon.super", "PRIMARY/alice");
//!
//!     store
//!         .add_purpose(&ctx, &PurposeInput::new("DEFAULT", "Core functionality"))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Tenant scoped**: every store call carries a [`TenantContext`](consent_kernel_core::TenantContext)
//! - **Single active receipt**: adding a receipt revokes the active one for the same principal and service
//! - **Unique names**: taxonomy creates fail with `AlreadyExists` when the name is taken

pub mod error;
mod materialize;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use error::{Result, StoreError, TaxonomyKind};
pub use memory::{MemoryClaimCatalog, MemoryServiceRegistry, MemoryStore};
pub use sqlite::SqliteStore;
pub use traits::{ClaimCatalog, ConsentStore, ReceiptQuery, ServiceRegistry};
