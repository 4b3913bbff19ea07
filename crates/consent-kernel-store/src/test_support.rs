//! Shared helpers for the store unit tests.

use std::collections::BTreeMap;

use consent_kernel_core::{
    ConsentType, PiiCategoryInput, PiiCategoryValidity, PurposeInput, ReceiptInput,
    ReceiptPurposeInput, ReceiptServiceInput, TenantContext, TerminationPolicy,
};

use crate::traits::ConsentStore;

/// Register a DEFAULT purpose and one PII category, returning their ids.
pub(crate) async fn seed_taxonomy(
    store: &dyn ConsentStore,
    ctx: &TenantContext,
    pii_name: &str,
) -> (i64, i64) {
    let purpose = store
        .add_purpose(ctx, &PurposeInput::new("DEFAULT", "Core functionality"))
        .await
        .unwrap();
    let pii = store
        .add_pii_category(ctx, &PiiCategoryInput::new(pii_name, pii_name))
        .await
        .unwrap();
    (purpose.id, pii.id)
}

/// A single-service receipt input for `principal`.
pub(crate) fn receipt_input(
    principal: &str,
    service: &str,
    purpose_id: i64,
    pii_ids: &[i64],
) -> ReceiptInput {
    ReceiptInput {
        pii_principal_id: principal.to_string(),
        collection_method: "Web Form - Sign-in".to_string(),
        jurisdiction: "LK".to_string(),
        language: "us_EN".to_string(),
        policy_url: "http://nolink".to_string(),
        properties: BTreeMap::new(),
        services: vec![ReceiptServiceInput {
            service: service.to_string(),
            tenant_domain: "carbon.super".to_string(),
            sp_display_name: service.to_string(),
            sp_description: service.to_string(),
            purposes: vec![ReceiptPurposeInput {
                purpose_id,
                purpose_category_ids: vec![],
                consent_type: ConsentType::Explicit,
                primary_purpose: true,
                third_party_disclosure: false,
                third_party_name: None,
                termination: TerminationPolicy::Indefinite.to_string(),
                pii_categories: pii_ids
                    .iter()
                    .map(|id| PiiCategoryValidity::new(*id, TerminationPolicy::Indefinite))
                    .collect(),
            }],
        }],
    }
}
