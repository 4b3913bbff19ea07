//! A store wrapper that records every call.
//!
//! Lets tests assert which store operations a consent flow performed, and
//! that it stopped calling the store after an error.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use consent_kernel_core::{
    AddReceiptResponse, PiiCategory, PiiCategoryInput, Purpose, PurposeCategory,
    PurposeCategoryInput, PurposeInput, Receipt, ReceiptId, ReceiptInput, ReceiptSummary,
    TenantContext,
};
use consent_kernel_store::{ConsentStore, ReceiptQuery, Result};

pub const SEARCH_RECEIPTS: &str = "search_receipts";
pub const GET_RECEIPT: &str = "get_receipt";
pub const ADD_RECEIPT: &str = "add_receipt";
pub const REVOKE_RECEIPT: &str = "revoke_receipt";
pub const GET_PURPOSE: &str = "get_purpose_by_name";
pub const ADD_PURPOSE: &str = "add_purpose";
pub const GET_PURPOSE_CATEGORY: &str = "get_purpose_category_by_name";
pub const ADD_PURPOSE_CATEGORY: &str = "add_purpose_category";
pub const GET_PII_CATEGORY: &str = "get_pii_category_by_name";
pub const ADD_PII_CATEGORY: &str = "add_pii_category";

/// Records the name of each store operation, then delegates.
pub struct RecordingStore<S> {
    inner: S,
    calls: Mutex<Vec<&'static str>>,
}

impl<S> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Operations called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `operation` was called.
    pub fn count(&self, operation: &str) -> usize {
        self.calls().into_iter().filter(|op| *op == operation).count()
    }

    /// Forget recorded calls.
    pub fn reset(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, operation: &'static str) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(operation);
    }
}

#[async_trait]
impl<S: ConsentStore> ConsentStore for RecordingStore<S> {
    async fn search_receipts(
        &self,
        ctx: &TenantContext,
        query: &ReceiptQuery,
    ) -> Result<Vec<ReceiptSummary>> {
        self.record(SEARCH_RECEIPTS);
        self.inner.search_receipts(ctx, query).await
    }

    async fn get_receipt(&self, ctx: &TenantContext, id: &ReceiptId) -> Result<Receipt> {
        self.record(GET_RECEIPT);
        self.inner.get_receipt(ctx, id).await
    }

    async fn add_receipt(
        &self,
        ctx: &TenantContext,
        input: &ReceiptInput,
    ) -> Result<AddReceiptResponse> {
        self.record(ADD_RECEIPT);
        self.inner.add_receipt(ctx, input).await
    }

    async fn revoke_receipt(&self, ctx: &TenantContext, id: &ReceiptId) -> Result<()> {
        self.record(REVOKE_RECEIPT);
        self.inner.revoke_receipt(ctx, id).await
    }

    async fn get_purpose_by_name(&self, ctx: &TenantContext, name: &str) -> Result<Purpose> {
        self.record(GET_PURPOSE);
        self.inner.get_purpose_by_name(ctx, name).await
    }

    async fn add_purpose(&self, ctx: &TenantContext, input: &PurposeInput) -> Result<Purpose> {
        self.record(ADD_PURPOSE);
        self.inner.add_purpose(ctx, input).await
    }

    async fn get_purpose_category_by_name(
        &self,
        ctx: &TenantContext,
        name: &str,
    ) -> Result<PurposeCategory> {
        self.record(GET_PURPOSE_CATEGORY);
        self.inner.get_purpose_category_by_name(ctx, name).await
    }

    async fn add_purpose_category(
        &self,
        ctx: &TenantContext,
        input: &PurposeCategoryInput,
    ) -> Result<PurposeCategory> {
        self.record(ADD_PURPOSE_CATEGORY);
        self.inner.add_purpose_category(ctx, input).await
    }

    async fn get_pii_category_by_name(
        &self,
        ctx: &TenantContext,
        name: &str,
    ) -> Result<PiiCategory> {
        self.record(GET_PII_CATEGORY);
        self.inner.get_pii_category_by_name(ctx, name).await
    }

    async fn add_pii_category(
        &self,
        ctx: &TenantContext,
        input: &PiiCategoryInput,
    ) -> Result<PiiCategory> {
        self.record(ADD_PII_CATEGORY);
        self.inner.add_pii_category(ctx, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_kernel_store::MemoryStore;

    #[tokio::test]
    async fn test_records_in_order() {
        let store = RecordingStore::new(MemoryStore::new());
        let ctx = TenantContext::new("carbon.super", "PRIMARY/alice");

        let _ = store.get_purpose_by_name(&ctx, "DEFAULT").await;
        store
            .add_purpose(&ctx, &PurposeInput::new("DEFAULT", ""))
            .await
            .unwrap();

        assert_eq!(store.calls(), vec![GET_PURPOSE, ADD_PURPOSE]);
        assert_eq!(store.count(ADD_PURPOSE), 1);

        store.reset();
        assert!(store.calls().is_empty());
    }
}
