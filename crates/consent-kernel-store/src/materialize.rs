//! Turning a receipt submission into a stored receipt.
//!
//! Inputs reference taxonomy records by id; stored receipts carry the
//! resolved names so readers can map PII categories back to claims.

use consent_kernel_core::{
    ConsentPurpose, PiiCategoryValidity, Receipt, ReceiptId, ReceiptInput, ReceiptService,
    ReceiptState, TenantContext,
};

use crate::error::{Result, StoreError};

/// Name and display name of a taxonomy record.
pub(crate) struct ResolvedName {
    pub name: String,
    pub display_name: Option<String>,
}

/// Taxonomy id lookups needed to materialize a receipt.
pub(crate) trait TaxonomyNames {
    fn purpose_name(&self, id: i64) -> Result<ResolvedName>;
    fn pii_category_name(&self, id: i64) -> Result<ResolvedName>;
}

/// Build the stored form of `input`.
pub(crate) fn materialize_receipt(
    id: ReceiptId,
    ctx: &TenantContext,
    input: &ReceiptInput,
    created_at: i64,
    names: &dyn TaxonomyNames,
) -> Result<Receipt> {
    let mut services = Vec::with_capacity(input.services.len());

    for service in &input.services {
        let mut purposes = Vec::with_capacity(service.purposes.len());
        for purpose in &service.purposes {
            let mut pii_categories = Vec::with_capacity(purpose.pii_categories.len());
            for pii in &purpose.pii_categories {
                let resolved = names.pii_category_name(pii.id)?;
                pii_categories.push(PiiCategoryValidity {
                    id: pii.id,
                    validity: pii.validity.clone(),
                    name: Some(resolved.name),
                    display_name: resolved.display_name,
                });
            }

            purposes.push(ConsentPurpose {
                purpose_id: purpose.purpose_id,
                purpose: names.purpose_name(purpose.purpose_id)?.name,
                purpose_category_ids: purpose.purpose_category_ids.clone(),
                consent_type: purpose.consent_type,
                primary_purpose: purpose.primary_purpose,
                third_party_disclosure: purpose.third_party_disclosure,
                third_party_name: purpose.third_party_name.clone(),
                termination: purpose.termination.clone(),
                pii_categories,
            });
        }

        services.push(ReceiptService {
            service: service.service.clone(),
            tenant_domain: service.tenant_domain.clone(),
            sp_display_name: service.sp_display_name.clone(),
            sp_description: service.sp_description.clone(),
            purposes,
        });
    }

    Ok(Receipt {
        consent_receipt_id: id,
        pii_principal_id: input.pii_principal_id.clone(),
        tenant_domain: ctx.tenant_domain.clone(),
        state: ReceiptState::Active,
        created_at,
        collection_method: input.collection_method.clone(),
        jurisdiction: input.jurisdiction.clone(),
        language: input.language.clone(),
        policy_url: input.policy_url.clone(),
        properties: input.properties.clone(),
        services,
    })
}

/// Reject calls made outside a tenant context.
pub(crate) fn require_context(ctx: &TenantContext) -> Result<()> {
    if ctx.is_established() {
        Ok(())
    } else {
        Err(StoreError::MissingContext)
    }
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
