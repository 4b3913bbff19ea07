//! Lazy provisioning of the consent taxonomy.
//!
//! Records are looked up by name and created on a miss. A create that
//! loses a race against another writer reads the winner's record back.

use std::future::Future;

use consent_kernel_core::{
    ClaimMetaData, PiiCategory, PiiCategoryInput, Purpose, PurposeCategory, PurposeCategoryInput,
    PurposeInput, TenantContext,
};
use consent_kernel_store::{ConsentStore, StoreError, TaxonomyKind};

type StoreResult<T> = std::result::Result<T, StoreError>;

async fn resolve_or_create<T, G, GF, A, AF>(
    kind: TaxonomyKind,
    name: &str,
    get: G,
    add: A,
) -> StoreResult<T>
where
    G: Fn() -> GF,
    GF: Future<Output = StoreResult<T>>,
    A: FnOnce() -> AF,
    AF: Future<Output = StoreResult<T>>,
{
    match get().await {
        Ok(record) => return Ok(record),
        Err(e) if e.is_name_not_found(kind) => {}
        Err(e) => return Err(e),
    }

    match add().await {
        Ok(record) => {
            tracing::debug!(%kind, name, "created taxonomy record");
            Ok(record)
        }
        Err(e) if e.is_already_exists(kind) => {
            tracing::debug!(%kind, name, "taxonomy record created concurrently");
            get().await
        }
        Err(e) => Err(e),
    }
}

/// The purpose named `name`, created with `description` if missing.
pub async fn ensure_purpose<S>(
    store: &S,
    ctx: &TenantContext,
    name: &str,
    description: &str,
) -> StoreResult<Purpose>
where
    S: ConsentStore + ?Sized,
{
    let input = PurposeInput::new(name, description);
    resolve_or_create(
        TaxonomyKind::Purpose,
        name,
        move || store.get_purpose_by_name(ctx, name),
        || store.add_purpose(ctx, &input),
    )
    .await
}

/// The purpose category named `name`, created with `description` if missing.
pub async fn ensure_purpose_category<S>(
    store: &S,
    ctx: &TenantContext,
    name: &str,
    description: &str,
) -> StoreResult<PurposeCategory>
where
    S: ConsentStore + ?Sized,
{
    let input = PurposeCategoryInput::new(name, description);
    resolve_or_create(
        TaxonomyKind::PurposeCategory,
        name,
        move || store.get_purpose_category_by_name(ctx, name),
        || store.add_purpose_category(ctx, &input),
    )
    .await
}

/// The PII category for `claim`, keyed by its URI.
pub async fn ensure_pii_category<S>(
    store: &S,
    ctx: &TenantContext,
    claim: &ClaimMetaData,
) -> StoreResult<PiiCategory>
where
    S: ConsentStore + ?Sized,
{
    let name = claim.claim_uri.as_str();
    let input = PiiCategoryInput::new(name, claim.display_name.as_str())
        .with_description(claim.description.as_str());
    resolve_or_create(
        TaxonomyKind::PiiCategory,
        name,
        move || store.get_pii_category_by_name(ctx, name),
        || store.add_pii_category(ctx, &input),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_kernel_store::MemoryStore;

    fn ctx() -> TenantContext {
        TenantContext::new("carbon.super", "PRIMARY/alice")
    }

    #[tokio::test]
    async fn test_ensure_purpose_is_idempotent() {
        let store = MemoryStore::new();
        let first = ensure_purpose(&store, &ctx(), "DEFAULT", "Core functionality")
            .await
            .unwrap();
        let second = ensure_purpose(&store, &ctx(), "DEFAULT", "ignored")
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(second.description, "Core functionality");
    }

    #[tokio::test]
    async fn test_ensure_pii_category_uses_claim_metadata() {
        let store = MemoryStore::new();
        let claim = ClaimMetaData::new(0, "http://wso2.org/claims/emailaddress", "Email", "Mail");
        let category = ensure_pii_category(&store, &ctx(), &claim).await.unwrap();
        assert_eq!(category.name, "http://wso2.org/claims/emailaddress");
        assert_eq!(category.display_name, "Email");
        assert_eq!(category.description, "Mail");
        assert!(!category.sensitive);
    }

    #[tokio::test]
    async fn test_lost_create_race_reads_back() {
        let store = MemoryStore::new();
        let winner = store
            .add_purpose_category(&ctx(), &PurposeCategoryInput::new("DEFAULT", "first"))
            .await
            .unwrap();

        // The first lookup misses, then the create collides with the winner.
        let lookups = std::sync::atomic::AtomicUsize::new(0);
        let found = resolve_or_create(
            TaxonomyKind::PurposeCategory,
            "DEFAULT",
            || {
                let attempt = lookups.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                let store = &store;
                async move {
                    if attempt == 0 {
                        Err(StoreError::NameNotFound {
                            kind: TaxonomyKind::PurposeCategory,
                            name: "DEFAULT".into(),
                        })
                    } else {
                        store.get_purpose_category_by_name(&ctx(), "DEFAULT").await
                    }
                }
            },
            || async {
                let input = PurposeCategoryInput::new("DEFAULT", "second");
                store.add_purpose_category(&ctx(), &input).await
            },
        )
        .await
        .unwrap();

        assert_eq!(found, winner);
    }

    #[tokio::test]
    async fn test_management_error_propagates() {
        let store = MemoryStore::new();
        let ctx = TenantContext::new("", "PRIMARY/alice");
        let err = ensure_purpose(&store, &ctx, "DEFAULT", "").await.unwrap_err();
        assert!(matches!(err, StoreError::MissingContext));
    }
}
