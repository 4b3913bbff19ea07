//! In-memory implementation of the collaborator traits.
//!
//! This is primarily for testing. [`MemoryStore`] has the same semantics as
//! the SQLite store but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use consent_kernel_core::{
    canonical_bytes, AddReceiptResponse, LocalClaim, PiiCategory, PiiCategoryInput, Purpose,
    PurposeCategory, PurposeCategoryInput, PurposeInput, Receipt, ReceiptId, ReceiptInput,
    ReceiptState, ReceiptSummary, ServiceDescriptor, TenantContext,
};

use crate::error::{Result, StoreError, TaxonomyKind};
use crate::materialize::{
    materialize_receipt, now_millis, require_context, ResolvedName, TaxonomyNames,
};
use crate::traits::{ClaimCatalog, ConsentStore, ReceiptQuery, ServiceRegistry};

/// Taxonomy key: (tenant domain, name).
type NameKey = (String, String);

/// In-memory consent store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Receipts in insertion order.
    receipts: Vec<Receipt>,

    purposes: HashMap<NameKey, Purpose>,
    purpose_categories: HashMap<NameKey, PurposeCategory>,
    pii_categories: HashMap<NameKey, PiiCategory>,

    /// Last assigned taxonomy id, shared by all kinds.
    last_id: i64,
}

impl MemoryStoreInner {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Id lookups scoped to one tenant.
struct TenantNames<'a> {
    inner: &'a MemoryStoreInner,
    tenant_domain: &'a str,
}

impl TaxonomyNames for TenantNames<'_> {
    fn purpose_name(&self, id: i64) -> Result<ResolvedName> {
        self.inner
            .purposes
            .iter()
            .find(|((tenant, _), p)| tenant == self.tenant_domain && p.id == id)
            .map(|(_, p)| ResolvedName {
                name: p.name.clone(),
                display_name: None,
            })
            .ok_or(StoreError::UnknownReference {
                kind: TaxonomyKind::Purpose,
                id,
            })
    }

    fn pii_category_name(&self, id: i64) -> Result<ResolvedName> {
        self.inner
            .pii_categories
            .iter()
            .find(|((tenant, _), p)| tenant == self.tenant_domain && p.id == id)
            .map(|(_, p)| ResolvedName {
                name: p.name.clone(),
                display_name: Some(p.display_name.clone()),
            })
            .ok_or(StoreError::UnknownReference {
                kind: TaxonomyKind::PiiCategory,
                id,
            })
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Number of receipts in any state.
    pub fn receipt_count(&self) -> usize {
        self.read().map(|inner| inner.receipts.len()).unwrap_or(0)
    }

    /// Write a receipt without revoking older ones.
    ///
    /// Lets tests reproduce stores that break the single-active invariant.
    pub fn insert_receipt_unchecked(
        &self,
        ctx: &TenantContext,
        input: &ReceiptInput,
    ) -> Result<ReceiptId> {
        let mut inner = self.write()?;
        let receipt = Self::build(&inner, ctx, input)?;
        let id = receipt.consent_receipt_id.clone();
        inner.receipts.push(receipt);
        Ok(id)
    }

    fn build(inner: &MemoryStoreInner, ctx: &TenantContext, input: &ReceiptInput) -> Result<Receipt> {
        let created_at = now_millis();
        let id = ReceiptId::derive(&canonical_bytes(input)?, created_at);
        let names = TenantNames {
            inner,
            tenant_domain: &ctx.tenant_domain,
        };
        materialize_receipt(id, ctx, input, created_at, &names)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_query(receipt: &Receipt, ctx: &TenantContext, query: &ReceiptQuery) -> bool {
    receipt.tenant_domain == ctx.tenant_domain
        && receipt.state == query.state
        && receipt.pii_principal_id == query.pii_principal_id
        && receipt.services.iter().any(|s| {
            s.service == query.service && s.tenant_domain == query.service_tenant_domain
        })
}

fn key(ctx: &TenantContext, name: &str) -> NameKey {
    (ctx.tenant_domain.clone(), name.to_string())
}

#[async_trait]
impl ConsentStore for MemoryStore {
    async fn search_receipts(
        &self,
        ctx: &TenantContext,
        query: &ReceiptQuery,
    ) -> Result<Vec<ReceiptSummary>> {
        require_context(ctx)?;
        let inner = self.read()?;

        // Newest first.
        let summaries = inner
            .receipts
            .iter()
            .rev()
            .filter(|r| matches_query(r, ctx, query))
            .skip(query.offset)
            .take(query.limit)
            .map(|r| ReceiptSummary {
                consent_receipt_id: r.consent_receipt_id.clone(),
                pii_principal_id: r.pii_principal_id.clone(),
                service: query.service.clone(),
                tenant_domain: query.service_tenant_domain.clone(),
                state: r.state,
            })
            .collect();

        Ok(summaries)
    }

    async fn get_receipt(&self, ctx: &TenantContext, id: &ReceiptId) -> Result<Receipt> {
        require_context(ctx)?;
        let inner = self.read()?;
        inner
            .receipts
            .iter()
            .find(|r| &r.consent_receipt_id == id && r.tenant_domain == ctx.tenant_domain)
            .cloned()
            .ok_or_else(|| StoreError::ReceiptNotFound(id.to_string()))
    }

    async fn add_receipt(
        &self,
        ctx: &TenantContext,
        input: &ReceiptInput,
    ) -> Result<AddReceiptResponse> {
        require_context(ctx)?;
        let mut inner = self.write()?;
        let receipt = Self::build(&inner, ctx, input)?;

        // Supersede whatever is active for the same principal and services.
        for existing in inner.receipts.iter_mut() {
            let same_service = receipt.services.iter().any(|new| {
                existing
                    .services
                    .iter()
                    .any(|old| old.service == new.service && old.tenant_domain == new.tenant_domain)
            });
            if existing.state == ReceiptState::Active
                && existing.tenant_domain == receipt.tenant_domain
                && existing.pii_principal_id == receipt.pii_principal_id
                && same_service
            {
                existing.state = ReceiptState::Revoked;
            }
        }

        let response = AddReceiptResponse {
            consent_receipt_id: receipt.consent_receipt_id.clone(),
            pii_principal_id: receipt.pii_principal_id.clone(),
            tenant_domain: receipt.tenant_domain.clone(),
            created_at: receipt.created_at,
        };
        inner.receipts.push(receipt);

        Ok(response)
    }

    async fn revoke_receipt(&self, ctx: &TenantContext, id: &ReceiptId) -> Result<()> {
        require_context(ctx)?;
        let mut inner = self.write()?;
        let receipt = inner
            .receipts
            .iter_mut()
            .find(|r| &r.consent_receipt_id == id && r.tenant_domain == ctx.tenant_domain)
            .ok_or_else(|| StoreError::ReceiptNotFound(id.to_string()))?;
        receipt.state = ReceiptState::Revoked;
        Ok(())
    }

    async fn get_purpose_by_name(&self, ctx: &TenantContext, name: &str) -> Result<Purpose> {
        require_context(ctx)?;
        let inner = self.read()?;
        inner
            .purposes
            .get(&key(ctx, name))
            .cloned()
            .ok_or_else(|| StoreError::NameNotFound {
                kind: TaxonomyKind::Purpose,
                name: name.to_string(),
            })
    }

    async fn add_purpose(&self, ctx: &TenantContext, input: &PurposeInput) -> Result<Purpose> {
        require_context(ctx)?;
        let mut inner = self.write()?;
        let key = key(ctx, &input.name);
        if inner.purposes.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: TaxonomyKind::Purpose,
                name: input.name.clone(),
            });
        }

        let purpose = Purpose {
            id: inner.next_id(),
            name: input.name.clone(),
            description: input.description.clone(),
        };
        inner.purposes.insert(key, purpose.clone());
        Ok(purpose)
    }

    async fn get_purpose_category_by_name(
        &self,
        ctx: &TenantContext,
        name: &str,
    ) -> Result<PurposeCategory> {
        require_context(ctx)?;
        let inner = self.read()?;
        inner
            .purpose_categories
            .get(&key(ctx, name))
            .cloned()
            .ok_or_else(|| StoreError::NameNotFound {
                kind: TaxonomyKind::PurposeCategory,
                name: name.to_string(),
            })
    }

    async fn add_purpose_category(
        &self,
        ctx: &TenantContext,
        input: &PurposeCategoryInput,
    ) -> Result<PurposeCategory> {
        require_context(ctx)?;
        let mut inner = self.write()?;
        let key = key(ctx, &input.name);
        if inner.purpose_categories.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: TaxonomyKind::PurposeCategory,
                name: input.name.clone(),
            });
        }

        let category = PurposeCategory {
            id: inner.next_id(),
            name: input.name.clone(),
            description: input.description.clone(),
        };
        inner.purpose_categories.insert(key, category.clone());
        Ok(category)
    }

    async fn get_pii_category_by_name(
        &self,
        ctx: &TenantContext,
        name: &str,
    ) -> Result<PiiCategory> {
        require_context(ctx)?;
        let inner = self.read()?;
        inner
            .pii_categories
            .get(&key(ctx, name))
            .cloned()
            .ok_or_else(|| StoreError::NameNotFound {
                kind: TaxonomyKind::PiiCategory,
                name: name.to_string(),
            })
    }

    async fn add_pii_category(
        &self,
        ctx: &TenantContext,
        input: &PiiCategoryInput,
    ) -> Result<PiiCategory> {
        require_context(ctx)?;
        let mut inner = self.write()?;
        let key = key(ctx, &input.name);
        if inner.pii_categories.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                kind: TaxonomyKind::PiiCategory,
                name: input.name.clone(),
            });
        }

        let category = PiiCategory {
            id: inner.next_id(),
            name: input.name.clone(),
            description: input.description.clone(),
            display_name: input.display_name.clone(),
            sensitive: input.sensitive,
        };
        inner.pii_categories.insert(key, category.clone());
        Ok(category)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog and registry
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory tenant claim catalog.
#[derive(Default)]
pub struct MemoryClaimCatalog {
    claims: RwLock<HashMap<String, Vec<LocalClaim>>>,
}

impl MemoryClaimCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Self::set_claims`].
    pub fn with_claims(mut self, tenant_domain: &str, claims: Vec<LocalClaim>) -> Self {
        self.claims
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant_domain.to_string(), claims);
        self
    }

    /// Replace the claims of a tenant.
    pub fn set_claims(&self, tenant_domain: &str, claims: Vec<LocalClaim>) -> Result<()> {
        let mut map = self
            .claims
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        map.insert(tenant_domain.to_string(), claims);
        Ok(())
    }
}

#[async_trait]
impl ClaimCatalog for MemoryClaimCatalog {
    async fn local_claims(&self, tenant_domain: &str) -> Result<Vec<LocalClaim>> {
        let map = self
            .claims
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        Ok(map.get(tenant_domain).cloned().unwrap_or_default())
    }
}

/// In-memory service registry keyed by (tenant, application).
#[derive(Default)]
pub struct MemoryServiceRegistry {
    services: RwLock<HashMap<(String, String), ServiceDescriptor>>,
}

impl MemoryServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Self::register`].
    pub fn with_service(mut self, service: ServiceDescriptor, default_tenant: &str) -> Self {
        let tenant = service.tenant_domain(default_tenant).to_string();
        self.services
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((tenant, service.application_name.clone()), service);
        self
    }

    /// Register a service under its owner tenant (or `default_tenant`).
    pub fn register(&self, service: ServiceDescriptor, default_tenant: &str) -> Result<()> {
        let tenant = service.tenant_domain(default_tenant).to_string();
        let mut map = self
            .services
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        map.insert((tenant, service.application_name.clone()), service);
        Ok(())
    }
}

#[async_trait]
impl ServiceRegistry for MemoryServiceRegistry {
    async fn get_service(
        &self,
        application: &str,
        tenant_domain: &str,
    ) -> Result<Option<ServiceDescriptor>> {
        let map = self
            .services
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        Ok(map
            .get(&(tenant_domain.to_string(), application.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{receipt_input, seed_taxonomy};

    fn ctx() -> TenantContext {
        TenantContext::new("carbon.super", "PRIMARY/alice")
    }

    #[tokio::test]
    async fn test_taxonomy_unique_per_tenant() {
        let store = MemoryStore::new();
        let input = PurposeInput::new("DEFAULT", "Core functionality");

        let first = store.add_purpose(&ctx(), &input).await.unwrap();
        let err = store.add_purpose(&ctx(), &input).await.unwrap_err();
        assert!(err.is_already_exists(TaxonomyKind::Purpose));

        let other = TenantContext::new("wso2.com", "PRIMARY/bob");
        let second = store.add_purpose(&other, &input).await.unwrap();
        assert_ne!(first.id, second.id);

        let found = store.get_purpose_by_name(&ctx(), "DEFAULT").await.unwrap();
        assert_eq!(found, first);
    }

    #[tokio::test]
    async fn test_lookup_unknown_name() {
        let store = MemoryStore::new();
        let err = store.get_pii_category_by_name(&ctx(), "email").await.unwrap_err();
        assert!(err.is_name_not_found(TaxonomyKind::PiiCategory));
        assert!(!err.is_name_not_found(TaxonomyKind::Purpose));
    }

    #[tokio::test]
    async fn test_add_receipt_supersedes_active() {
        let store = MemoryStore::new();
        let (purpose, pii) = seed_taxonomy(&store, &ctx(), "email").await;
        let input = receipt_input("PRIMARY/alice", "travelocity", purpose, &[pii]);

        let first = store.add_receipt(&ctx(), &input).await.unwrap();
        let second = store.add_receipt(&ctx(), &input).await.unwrap();
        assert_ne!(first.consent_receipt_id, second.consent_receipt_id);

        let query = ReceiptQuery::active("PRIMARY/alice", "travelocity", "carbon.super", 2);
        let active = store.search_receipts(&ctx(), &query).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].consent_receipt_id, second.consent_receipt_id);

        let old = store.get_receipt(&ctx(), &first.consent_receipt_id).await.unwrap();
        assert_eq!(old.state, ReceiptState::Revoked);
    }

    #[tokio::test]
    async fn test_receipt_carries_taxonomy_names() {
        let store = MemoryStore::new();
        let (purpose, pii) = seed_taxonomy(&store, &ctx(), "email").await;
        let input = receipt_input("PRIMARY/alice", "travelocity", purpose, &[pii]);

        let added = store.add_receipt(&ctx(), &input).await.unwrap();
        let receipt = store.get_receipt(&ctx(), &added.consent_receipt_id).await.unwrap();
        let names: Vec<_> = receipt.pii_categories().filter_map(|p| p.name.clone()).collect();
        assert_eq!(names, vec!["email"]);
        assert_eq!(receipt.services[0].purposes[0].purpose, "DEFAULT");
    }

    #[tokio::test]
    async fn test_unknown_reference_rejected() {
        let store = MemoryStore::new();
        let input = receipt_input("PRIMARY/alice", "travelocity", 99, &[98]);
        let err = store.add_receipt(&ctx(), &input).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownReference { .. }));
        assert_eq!(store.receipt_count(), 0);
    }

    #[tokio::test]
    async fn test_unchecked_insert_keeps_both_active() {
        let store = MemoryStore::new();
        let (purpose, pii) = seed_taxonomy(&store, &ctx(), "email").await;
        let input = receipt_input("PRIMARY/alice", "travelocity", purpose, &[pii]);

        store.insert_receipt_unchecked(&ctx(), &input).unwrap();
        store.insert_receipt_unchecked(&ctx(), &input).unwrap();

        let query = ReceiptQuery::active("PRIMARY/alice", "travelocity", "carbon.super", 2);
        assert_eq!(store.search_receipts(&ctx(), &query).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_context_rejected() {
        let store = MemoryStore::new();
        let ctx = TenantContext::new("", "PRIMARY/alice");
        let err = store.get_purpose_by_name(&ctx, "DEFAULT").await.unwrap_err();
        assert!(matches!(err, StoreError::MissingContext));
    }

    #[tokio::test]
    async fn test_catalog_and_registry() {
        let catalog = MemoryClaimCatalog::new();
        catalog
            .set_claims("carbon.super", vec![LocalClaim::new("email")])
            .unwrap();
        assert_eq!(catalog.local_claims("carbon.super").await.unwrap().len(), 1);
        assert!(catalog.local_claims("wso2.com").await.unwrap().is_empty());

        let registry = MemoryServiceRegistry::new();
        registry
            .register(ServiceDescriptor::new("travelocity"), "carbon.super")
            .unwrap();
        assert!(registry
            .get_service("travelocity", "carbon.super")
            .await
            .unwrap()
            .is_some());
        assert!(registry.get_service("travelocity", "wso2.com").await.unwrap().is_none());
    }
}
