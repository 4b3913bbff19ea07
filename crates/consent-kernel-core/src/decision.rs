//! Consent decisions: reconciling approved ids against the prompt.

use std::collections::HashSet;

use crate::claims::{ClaimMetaData, ConsentClaimsData, UserConsent};
use crate::error::{CoreError, Result};
use crate::types::ClaimId;

/// Split the prompted claims into approved and disapproved.
///
/// Approved ids are matched against mandatory claims first, then requested
/// ones. Ids that were never prompted are ignored and a repeated id counts
/// once. Fails with [`CoreError::MandatoryConsentDenied`] when any
/// mandatory claim ends up disapproved.
pub fn process_user_consent(
    approved_ids: &[ClaimId],
    prompted: &ConsentClaimsData,
) -> Result<UserConsent> {
    let mut approved_claims: Vec<ClaimMetaData> = Vec::new();
    for id in approved_ids {
        if approved_claims.iter().any(|claim| claim.id == *id) {
            continue;
        }
        if let Some(claim) = prompted.find(*id) {
            approved_claims.push(claim.clone());
        }
    }

    let approved: HashSet<&ClaimMetaData> = approved_claims.iter().collect();
    let disapproved_claims: Vec<ClaimMetaData> = prompted
        .consent_required()
        .into_iter()
        .filter(|claim| !approved.contains(claim))
        .collect();

    let denied: Vec<String> = prompted
        .mandatory_claims
        .iter()
        .filter(|claim| disapproved_claims.contains(claim))
        .map(|claim| claim.claim_uri.clone())
        .collect();
    if !denied.is_empty() {
        return Err(CoreError::MandatoryConsentDenied { claims: denied });
    }

    Ok(UserConsent {
        approved_claims,
        disapproved_claims,
    })
}

/// Union of freshly approved and previously consented claims, by URI.
///
/// Fresh approvals come first and win on conflicts.
pub fn merge_claims_with_consent(
    approved: &[ClaimMetaData],
    previously_consented: &[ClaimMetaData],
) -> Vec<ClaimMetaData> {
    let mut seen: HashSet<&str> = HashSet::new();
    approved
        .iter()
        .chain(previously_consented.iter())
        .filter(|claim| seen.insert(claim.claim_uri.as_str()))
        .cloned()
        .collect()
}
