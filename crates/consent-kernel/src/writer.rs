//! Receipt writer: persist the claims a subject consented to.

use std::collections::BTreeMap;

use consent_kernel_core::{
    ClaimMetaData, PiiCategoryValidity, ReceiptId, ReceiptInput, ReceiptPurposeInput,
    ReceiptServiceInput, ServiceDescriptor,
};
use consent_kernel_store::{ConsentStore, StoreError};

use crate::config::ReceiptPolicy;
use crate::error::{ConsentError, Result};
use crate::lookup::{in_tenant_flow, ReceiptScope};
use crate::taxonomy::{ensure_pii_category, ensure_purpose, ensure_purpose_category};

fn write_error(scope: &ReceiptScope, operation: &'static str, source: StoreError) -> ConsentError {
    ConsentError::ReceiptWrite {
        operation,
        tenant_domain: scope.ctx.tenant_domain.clone(),
        subject: scope.ctx.username.clone(),
        source,
    }
}

/// Build the receipt submission for `claims`.
///
/// Provisions the default purpose, the default purpose category and one
/// PII category per claim in the subject's tenant.
pub async fn build_receipt_input<S>(
    store: &S,
    policy: &ReceiptPolicy,
    scope: &ReceiptScope,
    service: &ServiceDescriptor,
    claims: &[ClaimMetaData],
) -> Result<ReceiptInput>
where
    S: ConsentStore + ?Sized,
{
    let ctx = &scope.ctx;

    let purpose = in_tenant_flow(
        ctx,
        "resolve_purpose",
        ensure_purpose(
            store,
            ctx,
            &policy.default_purpose,
            &policy.default_purpose_description,
        ),
    )
    .await
    .map_err(|e| write_error(scope, "resolving purpose", e))?;

    let category = in_tenant_flow(
        ctx,
        "resolve_purpose_category",
        ensure_purpose_category(
            store,
            ctx,
            &policy.default_purpose_category,
            &policy.default_purpose_description,
        ),
    )
    .await
    .map_err(|e| write_error(scope, "resolving purpose category", e))?;

    let mut pii_categories = Vec::with_capacity(claims.len());
    for claim in claims {
        let category = in_tenant_flow(
            ctx,
            "resolve_pii_category",
            ensure_pii_category(store, ctx, claim),
        )
        .await
        .map_err(|e| write_error(scope, "resolving PII category", e))?;
        pii_categories.push(PiiCategoryValidity::new(category.id, policy.termination));
    }

    let purpose = ReceiptPurposeInput {
        purpose_id: purpose.id,
        purpose_category_ids: vec![category.id],
        consent_type: policy.consent_type,
        primary_purpose: true,
        third_party_disclosure: false,
        third_party_name: None,
        termination: policy.termination.to_string(),
        pii_categories,
    };

    let service = ReceiptServiceInput {
        service: service.application_name.clone(),
        tenant_domain: scope.service_tenant_domain.clone(),
        sp_display_name: service.display_description().to_string(),
        sp_description: service.display_description().to_string(),
        purposes: vec![purpose],
    };

    Ok(ReceiptInput {
        pii_principal_id: scope.subject().to_string(),
        collection_method: policy.collection_method.clone(),
        jurisdiction: policy.jurisdiction.clone(),
        language: policy.language.clone(),
        policy_url: policy.policy_url.clone(),
        properties: BTreeMap::new(),
        services: vec![service],
    })
}

/// Write a receipt recording consent for `claims` and return its id.
pub async fn write_receipt<S>(
    store: &S,
    policy: &ReceiptPolicy,
    scope: &ReceiptScope,
    service: &ServiceDescriptor,
    claims: &[ClaimMetaData],
) -> Result<ReceiptId>
where
    S: ConsentStore + ?Sized,
{
    let input = build_receipt_input(store, policy, scope, service, claims).await?;

    let response = in_tenant_flow(
        &scope.ctx,
        "add_receipt",
        store.add_receipt(&scope.ctx, &input),
    )
    .await
    .map_err(|e| write_error(scope, "adding receipt", e))?;

    tracing::debug!(
        receipt = %response.consent_receipt_id,
        subject = scope.subject(),
        service = %scope.service,
        claims = claims.len(),
        "added consent receipt"
    );

    Ok(response.consent_receipt_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_kernel_core::{ConsentType, SubjectIdentity, TerminationPolicy};
    use consent_kernel_store::MemoryStore;

    fn scope() -> ReceiptScope {
        let service = ServiceDescriptor::new("travelocity");
        let subject = SubjectIdentity::new("alice", "primary", "carbon.super");
        ReceiptScope::new(&service, &subject, "carbon.super")
    }

    #[tokio::test]
    async fn test_receipt_input_shape() {
        let store = MemoryStore::new();
        let service = ServiceDescriptor::new("travelocity").with_description("  ");
        let claims = vec![
            ClaimMetaData::new(0, "http://wso2.org/claims/emailaddress", "Email", ""),
            ClaimMetaData::new(1, "http://wso2.org/claims/country", "Country", ""),
        ];

        let input = build_receipt_input(&store, &ReceiptPolicy::default(), &scope(), &service, &claims)
            .await
            .unwrap();

        assert_eq!(input.pii_principal_id, "PRIMARY/alice");
        assert_eq!(input.collection_method, "Web Form - Sign-in");
        assert_eq!(input.jurisdiction, "LK");
        assert_eq!(input.language, "us_EN");
        assert_eq!(input.policy_url, "http://nolink");
        assert!(input.properties.is_empty());

        let service = &input.services[0];
        assert_eq!(service.tenant_domain, "carbon.super");
        assert_eq!(service.sp_display_name, "travelocity");
        assert_eq!(service.sp_description, "travelocity");

        let purpose = &service.purposes[0];
        assert!(purpose.primary_purpose);
        assert!(!purpose.third_party_disclosure);
        assert_eq!(purpose.consent_type, ConsentType::Explicit);
        assert_eq!(purpose.purpose_category_ids.len(), 1);
        assert_eq!(purpose.pii_categories.len(), 2);
        assert!(purpose
            .pii_categories
            .iter()
            .all(|pii| pii.validity == TerminationPolicy::Indefinite.to_string()));
    }

    #[tokio::test]
    async fn test_receipt_service_uses_description() {
        let store = MemoryStore::new();
        let service = ServiceDescriptor::new("travelocity").with_description("Travel booking");
        let claims = vec![ClaimMetaData::new(0, "email", "Email", "")];

        let input = build_receipt_input(&store, &ReceiptPolicy::default(), &scope(), &service, &claims)
            .await
            .unwrap();

        let service = &input.services[0];
        assert_eq!(service.service, "travelocity");
        assert_eq!(service.sp_display_name, "Travel booking");
        assert_eq!(service.sp_description, "Travel booking");
    }

    #[tokio::test]
    async fn test_write_receipt_reuses_taxonomy() {
        let store = MemoryStore::new();
        let service = ServiceDescriptor::new("travelocity");
        let claims = vec![ClaimMetaData::new(0, "email", "Email", "")];
        let policy = ReceiptPolicy::default();

        let first = build_receipt_input(&store, &policy, &scope(), &service, &claims)
            .await
            .unwrap();
        let second = build_receipt_input(&store, &policy, &scope(), &service, &claims)
            .await
            .unwrap();
        assert_eq!(first, second);

        let id = write_receipt(&store, &policy, &scope(), &service, &claims)
            .await
            .unwrap();
        assert!(!id.as_str().is_empty());
        assert_eq!(store.receipt_count(), 1);
    }

    #[tokio::test]
    async fn test_write_outside_tenant_fails() {
        let store = MemoryStore::new();
        let service = ServiceDescriptor::new("travelocity");
        let subject = SubjectIdentity::new("alice", "PRIMARY", "");
        let scope = ReceiptScope::new(&service, &subject, "carbon.super");
        let claims = vec![ClaimMetaData::new(0, "email", "Email", "")];

        let err = write_receipt(&store, &ReceiptPolicy::default(), &scope, &service, &claims)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConsentError::ReceiptWrite {
                operation: "resolving purpose",
                ..
            }
        ));
    }
}
