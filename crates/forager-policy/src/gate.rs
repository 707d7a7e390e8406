//! Pure capability evaluation

use std::collections::{BTreeMap, BTreeSet};

use forager_core::{CapabilityDecision, PolicySnapshot, ReasonCode};

/// Evaluate requested capabilities against a policy snapshot.
///
/// Requested ids are deduplicated, then partitioned by membership in the
/// policy's granted set. Both output lists come back sorted so the decision
/// hashes deterministically. `allowed` holds exactly when nothing was
/// denied.
///
/// The grant list is ordered: a later entry for the same capability
/// overrides an earlier one, so a revocation appended to a snapshot wins.
pub fn evaluate(policy: &PolicySnapshot, requested: &[String]) -> CapabilityDecision {
    let mut effective: BTreeMap<&str, bool> = BTreeMap::new();
    for grant in &policy.grants {
        effective.insert(grant.capability.as_str(), grant.granted);
    }

    let requested: BTreeSet<&String> = requested.iter().collect();

    let mut granted = Vec::new();
    let mut denied = Vec::new();
    for capability in requested {
        if effective.get(capability.as_str()).copied().unwrap_or(false) {
            granted.push(capability.clone());
        } else {
            denied.push(capability.clone());
        }
    }

    let allowed = denied.is_empty();
    CapabilityDecision {
        allowed,
        reason_code: if allowed {
            ReasonCode::Ok
        } else {
            ReasonCode::CapabilityDenied
        },
        granted,
        denied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use forager_core::CapabilityGrant;

    fn policy(grants: Vec<CapabilityGrant>) -> PolicySnapshot {
        PolicySnapshot::new("policy-1", Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap())
            .with_grants(grants)
    }

    fn requested(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_all_granted() {
        let policy = policy(vec![
            CapabilityGrant::new("forager.read", true),
            CapabilityGrant::new("forager.write", true),
        ]);
        let decision = evaluate(&policy, &requested(&["forager.write", "forager.read"]));
        assert!(decision.allowed);
        assert_eq!(decision.reason_code, ReasonCode::Ok);
        assert_eq!(decision.granted, requested(&["forager.read", "forager.write"]));
        assert!(decision.denied.is_empty());
    }

    #[test]
    fn test_partial_denial() {
        let policy = policy(vec![CapabilityGrant::new("forager.read", true)]);
        let decision = evaluate(&policy, &requested(&["forager.write", "forager.read"]));
        assert!(!decision.allowed);
        assert_eq!(decision.reason_code, ReasonCode::CapabilityDenied);
        assert_eq!(decision.granted, requested(&["forager.read"]));
        assert_eq!(decision.denied, requested(&["forager.write"]));
    }

    #[test]
    fn test_empty_policy_denies_everything() {
        let policy = policy(Vec::new());
        let decision = evaluate(&policy, &requested(&["forager.read"]));
        assert!(!decision.allowed);
        assert_eq!(decision.denied, requested(&["forager.read"]));
    }

    #[test]
    fn test_revoked_grant_denies() {
        let policy = policy(vec![
            CapabilityGrant::new("forager.read", false).with_reason("suspended"),
        ]);
        let decision = evaluate(&policy, &requested(&["forager.read"]));
        assert!(!decision.allowed);
        assert_eq!(decision.denied, requested(&["forager.read"]));
    }

    #[test]
    fn test_later_grant_overrides_earlier() {
        let policy = policy(vec![
            CapabilityGrant::new("forager.read", true),
            CapabilityGrant::new("forager.read", false),
        ]);
        let decision = evaluate(&policy, &requested(&["forager.read"]));
        assert!(!decision.allowed);
    }

    #[test]
    fn test_duplicates_deduplicated() {
        let policy = policy(vec![CapabilityGrant::new("forager.read", true)]);
        let decision = evaluate(
            &policy,
            &requested(&["forager.read", "forager.read", "forager.read"]),
        );
        assert!(decision.allowed);
        assert_eq!(decision.granted, requested(&["forager.read"]));
    }

    #[test]
    fn test_empty_request_is_allowed() {
        let policy = policy(Vec::new());
        let decision = evaluate(&policy, &[]);
        assert!(decision.allowed);
        assert!(decision.granted.is_empty());
        assert!(decision.denied.is_empty());
    }
}
