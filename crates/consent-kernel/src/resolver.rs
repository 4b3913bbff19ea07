//! Claim requirement resolution: what the subject must still consent to.

use consent_kernel_core::{project_catalog, ConsentClaimsData, ServiceDescriptor};
use consent_kernel_store::{ClaimCatalog, ConsentStore};

use crate::error::Result;
use crate::lookup::{current_receipt, ReceiptScope};

/// Claims of `service` still needing a decision from the subject.
///
/// With an active receipt, mandatory claims it covers are dropped and no
/// optional claims are asked for again. The remaining URIs are projected
/// onto the service tenant's claim catalog.
pub async fn resolve_required_claims<S, C>(
    store: &S,
    catalog: &C,
    service: &ServiceDescriptor,
    scope: &ReceiptScope,
    now: i64,
) -> Result<ConsentClaimsData>
where
    S: ConsentStore + ?Sized,
    C: ClaimCatalog + ?Sized,
{
    if service.claim_mappings.is_empty() {
        return Ok(ConsentClaimsData::default());
    }

    let mut requirements = service.claim_requirements();

    if let Some(receipt) = current_receipt(store, scope).await? {
        let consented: Vec<String> = receipt
            .consented_claims(now)
            .into_iter()
            .map(|claim| claim.claim_uri)
            .collect();
        requirements.reconcile_with_consented(&consented);
    }

    if requirements.mandatory.is_empty() && requirements.requested.is_empty() {
        return Ok(ConsentClaimsData::default());
    }

    let local_claims = catalog
        .local_claims(&scope.service_tenant_domain)
        .await
        .map_err(|e| scope.query_error("reading local claims", e))?;

    Ok(project_catalog(
        &local_claims,
        &requirements.mandatory,
        &requirements.requested,
    ))
}
