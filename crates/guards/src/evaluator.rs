use rust_decimal::Decimal;
use payguard_types::{GuardKind, GuardPolicy, GuardResult};

/// Facts a guard evaluation runs against. The window spend aggregate is
/// supplied by the caller; the evaluator never scans history itself.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardContext {
    pub amount: Decimal,
    pub recipient_address: String,
    pub timestamp: u64,
    /// Amount already spent in the rolling-budget window
    pub spent_in_window: Decimal,
}

impl GuardContext {
    pub fn new(amount: Decimal, recipient_address: impl Into<String>, timestamp: u64) -> Self {
        Self {
            amount,
            recipient_address: recipient_address.into(),
            timestamp,
            spent_in_window: Decimal::ZERO,
        }
    }

    pub fn with_spent_in_window(mut self, spent: Decimal) -> Self {
        self.spent_in_window = spent;
        self
    }
}

/// Evaluate every enabled blocking policy against the payment.
///
/// Results preserve the policy set's insertion order, one entry per enabled
/// blocking policy. A single failure is sufficient to block the payment.
pub fn evaluate(ctx: &GuardContext, policies: &[GuardPolicy]) -> Vec<GuardResult> {
    policies
        .iter()
        .filter(|p| p.enabled)
        .filter_map(|policy| apply(ctx, policy))
        .collect()
}

/// Apply one policy; `None` for advisory kinds that never block.
fn apply(ctx: &GuardContext, policy: &GuardPolicy) -> Option<GuardResult> {
    match policy.kind {
        GuardKind::SingleTransactionLimit => {
            if ctx.amount > policy.limit {
                Some(GuardResult::fail(
                    policy,
                    format!(
                        "amount {} exceeds the single-transaction limit of {}",
                        ctx.amount, policy.limit
                    ),
                ))
            } else {
                Some(GuardResult::pass(policy))
            }
        }
        GuardKind::RollingBudgetLimit => {
            let projected = ctx.spent_in_window + ctx.amount;
            if projected > policy.limit {
                Some(GuardResult::fail(
                    policy,
                    format!(
                        "window spend {} plus amount {} would exceed the budget limit of {}",
                        ctx.spent_in_window, ctx.amount, policy.limit
                    ),
                ))
            } else {
                Some(GuardResult::pass(policy))
            }
        }
        GuardKind::RecipientAllowlist => {
            // Address comparison is case-insensitive: hex addresses appear
            // in both checksummed and lowercased forms.
            let listed = policy
                .allowed
                .iter()
                .any(|a| a.eq_ignore_ascii_case(&ctx.recipient_address));
            if listed {
                Some(GuardResult::pass(policy))
            } else {
                Some(GuardResult::fail(
                    policy,
                    format!(
                        "recipient {} is not on the allowlist",
                        ctx.recipient_address
                    ),
                ))
            }
        }
        // Advisory; consumed by auto_approve_eligible, never blocks
        GuardKind::AutoApproveThreshold => None,
    }
}

/// Whether the payment clears every enabled auto-approve threshold.
///
/// Returns false when no threshold policy is configured: without an
/// explicit pre-clearance rule, approval stays manual.
pub fn auto_approve_eligible(amount: Decimal, policies: &[GuardPolicy]) -> bool {
    let thresholds: Vec<_> = policies
        .iter()
        .filter(|p| p.enabled && p.kind == GuardKind::AutoApproveThreshold)
        .collect();

    !thresholds.is_empty() && thresholds.iter().all(|p| amount <= p.limit)
}
