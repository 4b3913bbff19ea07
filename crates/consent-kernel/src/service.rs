//! The consent service: unified API over the consent components.

use std::sync::Arc;

use consent_kernel_core::{
    merge_claims_with_consent, process_user_consent, ClaimId, ClaimMetaData, ConsentClaimsData,
    ReceiptId, ServiceDescriptor, SubjectIdentity,
};
use consent_kernel_store::{ClaimCatalog, ConsentStore, ServiceRegistry};

use crate::config::ConsentConfig;
use crate::error::{ConsentError, Result};
use crate::lookup::{consented_claims, ReceiptScope};
use crate::resolver::resolve_required_claims;
use crate::writer::write_receipt;

/// The consent service.
///
/// Answers which claims a subject must consent to before a service gets
/// them, and records the subject's decision as a receipt. Holds no state
/// across calls beyond its collaborators and configuration.
pub struct ConsentService<S, C, R> {
    store: Arc<S>,
    catalog: Arc<C>,
    registry: Arc<R>,
    config: ConsentConfig,
}

impl<S, C, R> ConsentService<S, C, R>
where
    S: ConsentStore,
    C: ClaimCatalog,
    R: ServiceRegistry,
{
    /// Create a new consent service.
    pub fn new(store: S, catalog: C, registry: R, config: ConsentConfig) -> Self {
        Self::from_shared(Arc::new(store), Arc::new(catalog), Arc::new(registry), config)
    }

    /// Create a service over collaborators shared with other owners.
    pub fn from_shared(store: Arc<S>, catalog: Arc<C>, registry: Arc<R>, config: ConsentConfig) -> Self {
        Self {
            store,
            catalog,
            registry,
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> &ConsentConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Consent Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Claims the subject must still consent to for `service`.
    pub async fn get_consent_required_claims(
        &self,
        service: &ServiceDescriptor,
        subject: &SubjectIdentity,
    ) -> Result<ConsentClaimsData> {
        let scope = self.scope(service, subject)?;
        resolve_required_claims(
            self.store.as_ref(),
            self.catalog.as_ref(),
            service,
            &scope,
            now_millis(),
        )
        .await
    }

    /// Record the subject's answer to a consent prompt.
    ///
    /// `prompted` is the data the prompt was built from. Claims approved
    /// now are merged with claims consented earlier and written as one
    /// receipt. Returns `None` without writing when nothing is consented.
    pub async fn process_consent(
        &self,
        approved_ids: &[ClaimId],
        service: &ServiceDescriptor,
        subject: &SubjectIdentity,
        prompted: &ConsentClaimsData,
    ) -> Result<Option<ReceiptId>> {
        let scope = self.scope(service, subject)?;
        tracing::debug!(subject = scope.subject(), service = %scope.service, "processing consent");

        let consent = process_user_consent(approved_ids, prompted).map_err(|e| {
            tracing::warn!(subject = scope.subject(), service = %scope.service, error = %e, "consent rejected");
            ConsentError::from(e)
        })?;

        let previously = consented_claims(self.store.as_ref(), &scope, now_millis()).await?;
        let claims = merge_claims_with_consent(&consent.approved_claims, &previously);

        if claims.is_empty() {
            tracing::debug!(subject = scope.subject(), "no claims with consent, skipping receipt");
            return Ok(None);
        }

        let id = write_receipt(
            self.store.as_ref(),
            &self.config.receipt,
            &scope,
            service,
            &claims,
        )
        .await?;
        Ok(Some(id))
    }

    /// Claims the subject currently has valid consent for.
    pub async fn get_claims_with_consents(
        &self,
        service: &ServiceDescriptor,
        subject: &SubjectIdentity,
    ) -> Result<Vec<ClaimMetaData>> {
        let scope = self.scope(service, subject)?;
        consented_claims(self.store.as_ref(), &scope, now_millis()).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registry-backed Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// [`Self::get_consent_required_claims`] for a registered application.
    pub async fn get_consent_required_claims_for_application(
        &self,
        application: &str,
        tenant_domain: &str,
        subject: &SubjectIdentity,
    ) -> Result<ConsentClaimsData> {
        let service = self.lookup_service(application, tenant_domain, subject).await?;
        self.get_consent_required_claims(&service, subject).await
    }

    /// [`Self::process_consent`] for a registered application.
    pub async fn process_consent_for_application(
        &self,
        approved_ids: &[ClaimId],
        application: &str,
        tenant_domain: &str,
        subject: &SubjectIdentity,
        prompted: &ConsentClaimsData,
    ) -> Result<Option<ReceiptId>> {
        let service = self.lookup_service(application, tenant_domain, subject).await?;
        self.process_consent(approved_ids, &service, subject, prompted)
            .await
    }

    /// [`Self::get_claims_with_consents`] for a registered application.
    pub async fn get_claims_with_consents_for_application(
        &self,
        application: &str,
        tenant_domain: &str,
        subject: &SubjectIdentity,
    ) -> Result<Vec<ClaimMetaData>> {
        let service = self.lookup_service(application, tenant_domain, subject).await?;
        self.get_claims_with_consents(&service, subject).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn scope(&self, service: &ServiceDescriptor, subject: &SubjectIdentity) -> Result<ReceiptScope> {
        if service.application_name.trim().is_empty() {
            return Err(ConsentError::InvalidArgument(
                "service cannot be unset".to_string(),
            ));
        }
        if subject.username.trim().is_empty() {
            return Err(ConsentError::InvalidArgument(
                "subject username cannot be empty".to_string(),
            ));
        }
        Ok(ReceiptScope::new(
            service,
            subject,
            &self.config.default_tenant_domain,
        ))
    }

    async fn lookup_service(
        &self,
        application: &str,
        tenant_domain: &str,
        subject: &SubjectIdentity,
    ) -> Result<ServiceDescriptor> {
        if application.trim().is_empty() {
            return Err(ConsentError::InvalidArgument(
                "application name cannot be empty".to_string(),
            ));
        }

        self.registry
            .get_service(application, tenant_domain)
            .await
            .map_err(|e| ConsentError::ConsentQuery {
                operation: "reading service",
                tenant_domain: tenant_domain.to_string(),
                subject: subject.qualified_name(),
                reason: e.into(),
            })?
            .ok_or_else(|| {
                ConsentError::InvalidArgument(format!(
                    "unknown application {} in tenant {}",
                    application, tenant_domain
                ))
            })
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
