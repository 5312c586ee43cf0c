use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Policy kinds the evaluator knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    /// Fail when a single payment exceeds the limit
    SingleTransactionLimit,
    /// Fail when window spend plus this payment exceeds the limit
    RollingBudgetLimit,
    /// Fail when the recipient address is not on the configured list
    RecipientAllowlist,
    /// Advisory: payments at or under the threshold skip manual approval
    AutoApproveThreshold,
}

/// A configured guard rule. Owned by the policy-configuration collaborator;
/// read-only from the engine's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardPolicy {
    pub id: String,
    pub name: String,
    pub kind: GuardKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Limit or threshold, in the payment currency; unused by allowlists
    #[serde(default)]
    pub limit: Decimal,
    /// Rolling window for budget policies, seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_secs: Option<u64>,
    /// Recipient addresses an allowlist policy accepts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl GuardPolicy {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: GuardKind,
        limit: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            enabled: true,
            limit,
            window_secs: None,
            allowed: Vec::new(),
        }
    }

    /// A recipient allowlist policy. An empty list blocks every payment,
    /// which configuration validation refuses.
    pub fn allowlist(
        id: impl Into<String>,
        name: impl Into<String>,
        allowed: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: GuardKind::RecipientAllowlist,
            enabled: true,
            limit: Decimal::ZERO,
            window_secs: None,
            allowed,
        }
    }

    pub fn with_window_secs(mut self, window_secs: u64) -> Self {
        self.window_secs = Some(window_secs);
        self
    }
}

/// Outcome of evaluating one policy against one payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardResult {
    pub policy_id: String,
    pub policy_name: String,
    pub passed: bool,
    pub reason: Option<String>,
}

impl GuardResult {
    pub fn pass(policy: &GuardPolicy) -> Self {
        Self {
            policy_id: policy.id.clone(),
            policy_name: policy.name.clone(),
            passed: true,
            reason: None,
        }
    }

    pub fn fail(policy: &GuardPolicy, reason: impl Into<String>) -> Self {
        Self {
            policy_id: policy.id.clone(),
            policy_name: policy.name.clone(),
            passed: false,
            reason: Some(reason.into()),
        }
    }
}
