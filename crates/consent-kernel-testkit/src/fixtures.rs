//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use consent_kernel_core::{
    ClaimMapping, LocalClaim, ServiceDescriptor, SubjectIdentity, SUPER_TENANT_DOMAIN,
};
use consent_kernel_store::{MemoryClaimCatalog, MemoryServiceRegistry, MemoryStore};

pub const COUNTRY: &str = "http://wso2.org/claims/country";
pub const EMAIL: &str = "http://wso2.org/claims/emailaddress";
pub const GIVEN_NAME: &str = "http://wso2.org/claims/givenname";
pub const TELEPHONE: &str = "http://wso2.org/claims/telephone";

/// Application registered by [`ConsentFixture`].
pub const SAMPLE_APPLICATION: &str = "travelocity.com";

/// A small claim catalog, in the order a catalog service would return it.
pub fn sample_catalog() -> Vec<LocalClaim> {
    vec![
        LocalClaim::new(COUNTRY).with_display_name("Country"),
        LocalClaim::new(EMAIL)
            .with_display_name("Email")
            .with_description("Email Address"),
        LocalClaim::new(GIVEN_NAME).with_display_name("First Name"),
        LocalClaim::new(TELEPHONE),
    ]
}

/// Mandatory email; requested country and telephone; given name mapped
/// but neither mandatory nor requested.
pub fn sample_service() -> ServiceDescriptor {
    ServiceDescriptor::new(SAMPLE_APPLICATION)
        .with_description("Travel booking")
        .with_claim(ClaimMapping::mandatory(EMAIL))
        .with_claim(ClaimMapping::requested(COUNTRY))
        .with_claim(ClaimMapping::requested(TELEPHONE))
        .with_claim(ClaimMapping::ignored(GIVEN_NAME))
}

/// `PRIMARY/alice` in the super tenant.
pub fn sample_subject() -> SubjectIdentity {
    SubjectIdentity::new("alice", "primary", SUPER_TENANT_DOMAIN)
}

/// Collaborators seeded with the sample catalog and service.
pub struct ConsentFixture<S = MemoryStore> {
    pub store: Arc<S>,
    pub catalog: Arc<MemoryClaimCatalog>,
    pub registry: Arc<MemoryServiceRegistry>,
    pub service: ServiceDescriptor,
    pub subject: SubjectIdentity,
}

impl ConsentFixture<MemoryStore> {
    /// Create a fixture over a fresh in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl Default for ConsentFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ConsentFixture<S> {
    /// Create a fixture over the given store.
    pub fn with_store(store: S) -> Self {
        let service = sample_service();
        let catalog =
            MemoryClaimCatalog::new().with_claims(SUPER_TENANT_DOMAIN, sample_catalog());
        let registry =
            MemoryServiceRegistry::new().with_service(service.clone(), SUPER_TENANT_DOMAIN);

        Self {
            store: Arc::new(store),
            catalog: Arc::new(catalog),
            registry: Arc::new(registry),
            service,
            subject: sample_subject(),
        }
    }

    /// Another subject in the same tenant.
    pub fn other_subject(&self, username: &str) -> SubjectIdentity {
        SubjectIdentity::new(
            username,
            self.subject.user_store_domain.clone(),
            self.subject.tenant_domain.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consent_kernel_store::{ClaimCatalog, ServiceRegistry};

    #[tokio::test]
    async fn test_fixture_is_seeded() {
        let fixture = ConsentFixture::new();

        let claims = fixture.catalog.local_claims(SUPER_TENANT_DOMAIN).await.unwrap();
        assert_eq!(claims.len(), 4);

        let service = fixture
            .registry
            .get_service(SAMPLE_APPLICATION, SUPER_TENANT_DOMAIN)
            .await
            .unwrap();
        assert_eq!(service, Some(fixture.service.clone()));
        assert_eq!(fixture.subject.qualified_name(), "PRIMARY/alice");
    }
}
