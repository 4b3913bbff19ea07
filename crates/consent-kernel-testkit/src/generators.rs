//! Proptest generators for property-based testing.

use proptest::prelude::*;

use consent_kernel_core::{
    ClaimId, ClaimMetaData, ConsentClaimsData, LocalClaim, TerminationPolicy,
};

/// Generate a claim URI.
pub fn claim_uri() -> impl Strategy<Value = String> {
    "[a-z]{2,12}".prop_map(|name| format!("http://wso2.org/claims/{}", name))
}

/// Generate a username.
pub fn username() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9._]{0,15}".prop_map(String::from)
}

/// Generate a user-store domain, possibly empty.
pub fn user_store_domain() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("primary".to_string()),
        "[a-zA-Z]{1,10}".prop_map(String::from),
    ]
}

/// Generate a termination policy.
pub fn termination_policy() -> impl Strategy<Value = TerminationPolicy> {
    prop_oneof![
        Just(TerminationPolicy::Indefinite),
        (0i64..=i64::MAX / 2).prop_map(TerminationPolicy::Until),
    ]
}

/// Generate a catalog of distinct claims in arbitrary order.
pub fn local_catalog(max_len: usize) -> impl Strategy<Value = Vec<LocalClaim>> {
    prop::collection::btree_set(claim_uri(), 0..=max_len)
        .prop_map(|uris| uris.into_iter().map(LocalClaim::new).collect::<Vec<_>>())
        .prop_shuffle()
}

/// Generate consent prompt data with distinct ids and URIs.
///
/// Ids are assigned from 0, mandatory claims first, the way a resolver
/// assigns them.
pub fn prompt_data(max_len: usize) -> impl Strategy<Value = ConsentClaimsData> {
    prop::collection::btree_set(claim_uri(), 0..=max_len)
        .prop_flat_map(|uris| {
            let len = uris.len();
            (Just(uris), 0..=len)
        })
        .prop_map(|(uris, mandatory_len)| {
            let mut data = ConsentClaimsData::default();
            for (i, uri) in uris.into_iter().enumerate() {
                let claim = ClaimMetaData::new(i as u32, uri.clone(), uri, "");
                if i < mandatory_len {
                    data.mandatory_claims.push(claim);
                } else {
                    data.requested_claims.push(claim);
                }
            }
            data
        })
}

/// Generate prompt data together with a subset of its ids, possibly
/// repeated and mixed with ids that were never prompted.
pub fn prompt_with_approvals(
    max_len: usize,
) -> impl Strategy<Value = (ConsentClaimsData, Vec<ClaimId>)> {
    prompt_data(max_len).prop_flat_map(|data| {
        let len = data.consent_required().len() as u32;
        let ids = prop::collection::vec(0u32..len + 3, 0..=(len as usize + 3))
            .prop_map(|ids| ids.into_iter().map(ClaimId).collect::<Vec<_>>());
        (Just(data), ids)
    })
}
