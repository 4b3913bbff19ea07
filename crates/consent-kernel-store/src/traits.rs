//! Collaborator traits: the abstract interfaces the consent core calls.
//!
//! The consent core owns none of the data behind these traits. Receipts
//! and taxonomy live in a [`ConsentStore`], tenant claims in a
//! [`ClaimCatalog`] and service configuration in a [`ServiceRegistry`].

use async_trait::async_trait;
use consent_kernel_core::{
    AddReceiptResponse, LocalClaim, PiiCategory, PiiCategoryInput, Purpose, PurposeCategory,
    PurposeCategoryInput, PurposeInput, Receipt, ReceiptId, ReceiptInput, ReceiptState,
    ReceiptSummary, ServiceDescriptor, TenantContext,
};

use crate::error::Result;

/// Filter for receipt searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptQuery {
    pub pii_principal_id: String,
    pub service: String,
    /// Tenant of the service, not of the subject.
    pub service_tenant_domain: String,
    pub state: ReceiptState,
    pub limit: usize,
    pub offset: usize,
}

impl ReceiptQuery {
    /// Active receipts of a principal for one service.
    pub fn active(
        pii_principal_id: impl Into<String>,
        service: impl Into<String>,
        service_tenant_domain: impl Into<String>,
        limit: usize,
    ) -> Self {
        Self {
            pii_principal_id: pii_principal_id.into(),
            service: service.into(),
            service_tenant_domain: service_tenant_domain.into(),
            state: ReceiptState::Active,
            limit,
            offset: 0,
        }
    }
}

/// The consent store: receipts plus the taxonomy they reference.
///
/// Every call carries the [`TenantContext`] it runs in. Receipts are
/// partitioned by the context tenant; taxonomy names are unique per tenant.
///
/// # Errors
///
/// Taxonomy lookups by name fail with `StoreError::NameNotFound` when the
/// name is unknown, and creates fail with `StoreError::AlreadyExists` when
/// the name is taken. Any other error is a management failure.
#[async_trait]
pub trait ConsentStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Receipt Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Search receipts, newest first, honouring `limit` and `offset`.
    async fn search_receipts(
        &self,
        ctx: &TenantContext,
        query: &ReceiptQuery,
    ) -> Result<Vec<ReceiptSummary>>;

    /// Get a full receipt by id.
    async fn get_receipt(&self, ctx: &TenantContext, id: &ReceiptId) -> Result<Receipt>;

    /// Write a new receipt.
    ///
    /// Any receipt that is active for the same principal and service is
    /// revoked, so the new receipt supersedes it.
    async fn add_receipt(
        &self,
        ctx: &TenantContext,
        input: &ReceiptInput,
    ) -> Result<AddReceiptResponse>;

    /// Revoke a receipt.
    async fn revoke_receipt(&self, ctx: &TenantContext, id: &ReceiptId) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Taxonomy Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn get_purpose_by_name(&self, ctx: &TenantContext, name: &str) -> Result<Purpose>;

    async fn add_purpose(&self, ctx: &TenantContext, input: &PurposeInput) -> Result<Purpose>;

    async fn get_purpose_category_by_name(
        &self,
        ctx: &TenantContext,
        name: &str,
    ) -> Result<PurposeCategory>;

    async fn add_purpose_category(
        &self,
        ctx: &TenantContext,
        input: &PurposeCategoryInput,
    ) -> Result<PurposeCategory>;

    async fn get_pii_category_by_name(
        &self,
        ctx: &TenantContext,
        name: &str,
    ) -> Result<PiiCategory>;

    async fn add_pii_category(
        &self,
        ctx: &TenantContext,
        input: &PiiCategoryInput,
    ) -> Result<PiiCategory>;
}

/// Tenant claim metadata.
#[async_trait]
pub trait ClaimCatalog: Send + Sync {
    /// All local claims of a tenant, in catalog order.
    async fn local_claims(&self, tenant_domain: &str) -> Result<Vec<LocalClaim>>;
}

/// Relying service configuration.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Look up a service by application name within a tenant.
    async fn get_service(
        &self,
        application: &str,
        tenant_domain: &str,
    ) -> Result<Option<ServiceDescriptor>>;
}
