use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{GuardResult, StepKind, StepRecord, StepStatus, WalletBinding};

/// Lifecycle status of a payment intent. Mutated only by the state machine;
/// advances monotonically along the edges in `admits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Pending,
    Simulating,
    /// A guard failed; terminal
    Blocked,
    AwaitingApproval,
    Approved,
    /// Explicitly declined by a human; terminal
    Rejected,
    Executing,
    /// Suspended until the wallet owner signs out of band
    AwaitingUserSignature,
    Succeeded,
    Failed,
}

impl IntentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntentStatus::Blocked
                | IntentStatus::Rejected
                | IntentStatus::Succeeded
                | IntentStatus::Failed
        )
    }

    /// The transition graph, consulted by the state machine on every
    /// status change. A transient simulation failure returns the intent to
    /// `Pending`; `Succeeded` admits only the `Failed` edge, taken when
    /// confirmation sync learns the transfer reverted after submission.
    pub fn admits(&self, next: IntentStatus) -> bool {
        use IntentStatus::*;
        match self {
            Pending => matches!(next, Simulating | Executing | AwaitingUserSignature | Failed),
            Simulating => matches!(next, Pending | Blocked | AwaitingApproval | Failed),
            AwaitingApproval => {
                matches!(
                    next,
                    Approved | Rejected | Executing | AwaitingUserSignature | Failed
                )
            }
            Approved => matches!(next, Executing | AwaitingUserSignature | Failed),
            Executing => matches!(next, Succeeded | Failed | AwaitingUserSignature),
            AwaitingUserSignature => matches!(next, Executing | Failed),
            Succeeded => matches!(next, Failed),
            Blocked | Rejected | Failed => false,
        }
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IntentStatus::Pending => "pending",
            IntentStatus::Simulating => "simulating",
            IntentStatus::Blocked => "blocked",
            IntentStatus::AwaitingApproval => "awaiting_approval",
            IntentStatus::Approved => "approved",
            IntentStatus::Rejected => "rejected",
            IntentStatus::Executing => "executing",
            IntentStatus::AwaitingUserSignature => "awaiting_user_signature",
            IntentStatus::Succeeded => "succeeded",
            IntentStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Durable references produced by a successful execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionArtifacts {
    /// Backend transfer id; always present once execution succeeds
    pub transfer_id: String,
    /// On-chain hash; may arrive later via `sync`
    pub tx_hash: Option<String>,
    pub explorer_url: Option<String>,
    /// Whether the chain has confirmed the transaction
    pub confirmed: bool,
}

impl ExecutionArtifacts {
    pub fn provisional(transfer_id: impl Into<String>) -> Self {
        Self {
            transfer_id: transfer_id.into(),
            tx_hash: None,
            explorer_url: None,
            confirmed: false,
        }
    }
}

/// A requested payment, before and during its execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Opaque unique id, created once, immutable
    pub id: String,

    /// Positive payment amount
    pub amount: Decimal,

    /// Currency code, e.g. "USD"
    pub currency: String,

    /// Human-readable recipient label
    pub recipient_label: String,

    /// Recipient on-chain address
    pub recipient_address: String,

    /// Source chain identifier
    pub chain: String,

    /// Destination chain when it differs from the source; drives the
    /// companion [`crate::CrossChainTransfer`] record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_chain: Option<String>,

    /// Custody binding, set once at creation
    pub from_wallet: WalletBinding,

    pub status: IntentStatus,

    /// Fixed checkpoints: Simulation, Approval, Execution, Confirmation
    #[serde(deserialize_with = "deserialize_steps")]
    pub steps: Vec<StepRecord>,

    /// Most recent guard evaluation, replaced as a whole batch
    pub guard_results: Vec<GuardResult>,

    /// Set iff the intent succeeded
    pub artifacts: Option<ExecutionArtifacts>,

    /// Opaque extension bag; serialization only, never drives control flow
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,

    pub created_at: u64,
    pub updated_at: u64,
}

/// Rebuild the step list in canonical order, restoring any checkpoint a
/// stored record is missing as `Pending`. Keeps `step()` total even for
/// records written by an older schema.
fn deserialize_steps<'de, D>(deserializer: D) -> Result<Vec<StepRecord>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Vec::<StepRecord>::deserialize(deserializer)?;
    Ok(StepKind::ALL
        .iter()
        .map(|kind| {
            raw.iter()
                .find(|s| s.kind == *kind)
                .cloned()
                .unwrap_or_else(|| StepRecord::pending(*kind))
        })
        .collect())
}

impl PaymentIntent {
    /// Derive an intent id from the payment's identifying facts plus the
    /// creation timestamp, so retried creations produce distinct ids.
    pub fn derive_id(
        wallet_reference: &str,
        recipient_address: &str,
        amount: Decimal,
        created_at: u64,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(wallet_reference.as_bytes());
        hasher.update(recipient_address.as_bytes());
        hasher.update(amount.to_string().as_bytes());
        hasher.update(created_at.to_le_bytes());
        let hash: [u8; 32] = hasher.finalize().into();
        format!("pi-{}", hex::encode(&hash[..16]))
    }

    /// Construction and deserialization both guarantee all four steps.
    pub fn step(&self, kind: StepKind) -> &StepRecord {
        self.steps
            .iter()
            .find(|s| s.kind == kind)
            .unwrap_or_else(|| unreachable!("intent always carries all four steps"))
    }

    /// True when the payment settles on a chain other than its source.
    pub fn is_cross_chain(&self) -> bool {
        self.destination_chain
            .as_deref()
            .is_some_and(|dest| dest != self.chain)
    }

    pub fn set_step(&mut self, kind: StepKind, status: StepStatus, detail: Option<String>) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.kind == kind) {
            step.status = status;
            step.detail = detail;
        }
    }

    /// Bump `updated_at`. Call on every mutation.
    pub fn touch(&mut self, now: u64) {
        self.updated_at = now;
    }

    /// True when the approval checkpoint has already been satisfied
    /// (either manually or via the auto-approve threshold).
    pub fn approval_satisfied(&self) -> bool {
        self.step(StepKind::Approval).status == StepStatus::Completed
    }
}
