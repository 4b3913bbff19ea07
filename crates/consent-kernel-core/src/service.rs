//! Relying services, subjects and the tenant context store calls run in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between the user-store domain and the username.
pub const DOMAIN_SEPARATOR: char = '/';

/// Tenant domain used when a service has no owner.
pub const SUPER_TENANT_DOMAIN: &str = "carbon.super";

/// One claim a service asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimMapping {
    pub claim_uri: String,
    pub mandatory: bool,
    pub requested: bool,
}

impl ClaimMapping {
    pub fn mandatory(claim_uri: impl Into<String>) -> Self {
        Self {
            claim_uri: claim_uri.into(),
            mandatory: true,
            requested: true,
        }
    }

    pub fn requested(claim_uri: impl Into<String>) -> Self {
        Self {
            claim_uri: claim_uri.into(),
            mandatory: false,
            requested: true,
        }
    }

    /// Mapped but neither mandatory nor requested.
    pub fn ignored(claim_uri: impl Into<String>) -> Self {
        Self {
            claim_uri: claim_uri.into(),
            mandatory: false,
            requested: false,
        }
    }
}

/// A relying application and its claim configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub application_name: String,
    pub description: Option<String>,
    pub owner_tenant_domain: Option<String>,
    pub claim_mappings: Vec<ClaimMapping>,
}

impl ServiceDescriptor {
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_owner_tenant(mut self, tenant_domain: impl Into<String>) -> Self {
        self.owner_tenant_domain = Some(tenant_domain.into());
        self
    }

    pub fn with_claim(mut self, mapping: ClaimMapping) -> Self {
        self.claim_mappings.push(mapping);
        self
    }

    /// The owner's tenant domain, or `default_tenant` when unowned.
    pub fn tenant_domain<'a>(&'a self, default_tenant: &'a str) -> &'a str {
        self.owner_tenant_domain.as_deref().unwrap_or(default_tenant)
    }

    /// Description to show on receipts; the application name when blank.
    pub fn display_description(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(&self.application_name)
    }

    /// Split the claim mappings into mandatory and requested URIs.
    ///
    /// A mapping flagged mandatory is never also listed as requested.
    pub fn claim_requirements(&self) -> ClaimRequirements {
        let mut requirements = ClaimRequirements::default();
        for mapping in &self.claim_mappings {
            if mapping.mandatory {
                requirements.mandatory.push(mapping.claim_uri.clone());
            } else if mapping.requested {
                requirements.requested.push(mapping.claim_uri.clone());
            }
        }
        requirements
    }
}

/// Claim URIs a service needs, before reconciling against receipts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimRequirements {
    pub mandatory: Vec<String>,
    pub requested: Vec<String>,
}

impl ClaimRequirements {
    /// Apply an existing receipt: drop already consented mandatory claims
    /// and stop asking for optional ones.
    pub fn reconcile_with_consented<S: AsRef<str>>(&mut self, consented: &[S]) {
        self.mandatory
            .retain(|uri| !consented.iter().any(|c| c.as_ref() == uri));
        self.requested.clear();
    }
}

/// The authenticated subject asking for, or giving, consent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectIdentity {
    pub username: String,
    pub user_store_domain: String,
    pub tenant_domain: String,
}

impl SubjectIdentity {
    pub fn new(
        username: impl Into<String>,
        user_store_domain: impl Into<String>,
        tenant_domain: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            user_store_domain: user_store_domain.into(),
            tenant_domain: tenant_domain.into(),
        }
    }

    /// Canonical subject key, e.g. `PRIMARY/alice`.
    pub fn qualified_name(&self) -> String {
        qualify_username(&self.username, &self.user_store_domain)
    }

    /// The context store calls for this subject run in.
    pub fn context(&self) -> TenantContext {
        TenantContext::new(self.tenant_domain.clone(), self.qualified_name())
    }
}

/// Prefix a username with its upper-cased user-store domain.
///
/// Names that are already qualified, and empty domains, are left unchanged.
pub fn qualify_username(username: &str, user_store_domain: &str) -> String {
    let domain = user_store_domain.trim();
    if domain.is_empty() || username.contains(DOMAIN_SEPARATOR) {
        return username.to_string();
    }
    format!("{}{}{}", domain.to_uppercase(), DOMAIN_SEPARATOR, username)
}

/// Tenant and acting subject for a store call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_domain: String,
    pub username: String,
}

impl TenantContext {
    pub fn new(tenant_domain: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            tenant_domain: tenant_domain.into(),
            username: username.into(),
        }
    }

    /// A context is usable once a tenant has been set.
    pub fn is_established(&self) -> bool {
        !self.tenant_domain.trim().is_empty()
    }
}

impl fmt::Display for TenantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.tenant_domain)
    }
}
