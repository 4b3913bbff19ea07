//! Receipt lookup: the subject's current consent for one service.
//!
//! Searches run in the subject's tenant context with a page of two, which
//! is enough to detect a broken single-active-receipt invariant.

use std::future::Future;

use tracing::Instrument;

use consent_kernel_core::{
    ClaimMetaData, Receipt, ReceiptSummary, ServiceDescriptor, SubjectIdentity, TenantContext,
};
use consent_kernel_store::{ConsentStore, ReceiptQuery};

use crate::error::{ConsentError, QueryFailure, Result};

/// Page size for active receipt searches.
pub const RECEIPT_SEARCH_LIMIT: usize = 2;

/// A subject and the service whose consent is being looked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptScope {
    /// Subject's tenant flow; every store call runs in it.
    pub ctx: TenantContext,
    pub service: String,
    pub service_tenant_domain: String,
}

impl ReceiptScope {
    pub fn new(service: &ServiceDescriptor, subject: &SubjectIdentity, default_tenant: &str) -> Self {
        Self {
            ctx: subject.context(),
            service: service.application_name.clone(),
            service_tenant_domain: service.tenant_domain(default_tenant).to_string(),
        }
    }

    /// Canonical subject key.
    pub fn subject(&self) -> &str {
        &self.ctx.username
    }

    pub(crate) fn query_error(
        &self,
        operation: &'static str,
        reason: impl Into<QueryFailure>,
    ) -> ConsentError {
        ConsentError::ConsentQuery {
            operation,
            tenant_domain: self.ctx.tenant_domain.clone(),
            subject: self.ctx.username.clone(),
            reason: reason.into(),
        }
    }
}

/// Run `fut` inside the tenant flow of `ctx`.
///
/// The span is exited when the future completes, whatever the outcome.
pub(crate) async fn in_tenant_flow<F: Future>(
    ctx: &TenantContext,
    operation: &'static str,
    fut: F,
) -> F::Output {
    let span = tracing::debug_span!(
        "tenant_flow",
        tenant = %ctx.tenant_domain,
        subject = %ctx.username,
        operation
    );
    fut.instrument(span).await
}

/// Active receipts of the subject for the service; at most one.
pub async fn active_receipts<S>(store: &S, scope: &ReceiptScope) -> Result<Vec<ReceiptSummary>>
where
    S: ConsentStore + ?Sized,
{
    let query = ReceiptQuery::active(
        scope.subject(),
        scope.service.clone(),
        scope.service_tenant_domain.clone(),
        RECEIPT_SEARCH_LIMIT,
    );

    let receipts = in_tenant_flow(
        &scope.ctx,
        "search_receipts",
        store.search_receipts(&scope.ctx, &query),
    )
    .await
    .map_err(|e| scope.query_error("searching receipts", e))?;

    tracing::debug!(
        count = receipts.len(),
        subject = scope.subject(),
        service = %scope.service,
        tenant = %scope.service_tenant_domain,
        "retrieved receipts"
    );

    if receipts.len() > 1 {
        tracing::warn!(
            count = receipts.len(),
            subject = scope.subject(),
            service = %scope.service,
            "more than one active receipt"
        );
        return Err(scope.query_error(
            "searching receipts",
            QueryFailure::MultipleActive(receipts.len()),
        ));
    }

    Ok(receipts)
}

/// The full active receipt, if the subject has one.
pub async fn current_receipt<S>(store: &S, scope: &ReceiptScope) -> Result<Option<Receipt>>
where
    S: ConsentStore + ?Sized,
{
    let Some(summary) = active_receipts(store, scope).await?.into_iter().next() else {
        return Ok(None);
    };

    let receipt = in_tenant_flow(
        &scope.ctx,
        "get_receipt",
        store.get_receipt(&scope.ctx, &summary.consent_receipt_id),
    )
    .await
    .map_err(|e| scope.query_error("reading receipt", e))?;

    Ok(Some(receipt))
}

/// Claims the subject has valid consent for at `now`.
pub async fn consented_claims<S>(
    store: &S,
    scope: &ReceiptScope,
    now: i64,
) -> Result<Vec<ClaimMetaData>>
where
    S: ConsentStore + ?Sized,
{
    Ok(current_receipt(store, scope)
        .await?
        .map(|receipt| receipt.consented_claims(now))
        .unwrap_or_default())
}
