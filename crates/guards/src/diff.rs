use serde::{Deserialize, Serialize};
use payguard_types::GuardResult;

/// One policy whose outcome differs between the original evaluation and a
/// replay against the current policy set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardDiff {
    pub policy_id: String,
    pub policy_name: String,
    pub original_passed: bool,
    /// None when the policy no longer exists in the current set
    pub current_passed: Option<bool>,
}

/// Pair each original guard result with its same-id current counterpart and
/// report every policy whose pass/fail flipped. Policies removed since the
/// original evaluation are reported with `current_passed: None`.
pub fn diff_results(original: &[GuardResult], current: &[GuardResult]) -> Vec<GuardDiff> {
    original
        .iter()
        .filter_map(|orig| {
            let counterpart = current.iter().find(|c| c.policy_id == orig.policy_id);
            match counterpart {
                Some(cur) if cur.passed == orig.passed => None,
                Some(cur) => Some(GuardDiff {
                    policy_id: orig.policy_id.clone(),
                    policy_name: orig.policy_name.clone(),
                    original_passed: orig.passed,
                    current_passed: Some(cur.passed),
                }),
                None => Some(GuardDiff {
                    policy_id: orig.policy_id.clone(),
                    policy_name: orig.policy_name.clone(),
                    original_passed: orig.passed,
                    current_passed: None,
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, passed: bool) -> GuardResult {
        GuardResult {
            policy_id: id.to_string(),
            policy_name: format!("policy {id}"),
            passed,
            reason: None,
        }
    }

    #[test]
    fn test_unchanged_outcomes_produce_no_diff() {
        let original = vec![result("a", true), result("b", false)];
        let current = vec![result("a", true), result("b", false)];
        assert!(diff_results(&original, &current).is_empty());
    }

    #[test]
    fn test_flipped_outcome_is_reported() {
        let original = vec![result("a", true)];
        let current = vec![result("a", false)];
        let diffs = diff_results(&original, &current);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].policy_id, "a");
        assert!(diffs[0].original_passed);
        assert_eq!(diffs[0].current_passed, Some(false));
    }

    #[test]
    fn test_removed_policy_reported_as_not_evaluated() {
        let original = vec![result("a", true), result("b", true)];
        let current = vec![result("a", true)];
        let diffs = diff_results(&original, &current);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].policy_id, "b");
        assert_eq!(diffs[0].current_passed, None);
    }

    #[test]
    fn test_newly_added_policies_are_ignored() {
        // Diffs pair from the original side; a policy added after the fact
        // has no original outcome to flip.
        let original = vec![result("a", true)];
        let current = vec![result("a", true), result("c", false)];
        assert!(diff_results(&original, &current).is_empty());
    }
}
