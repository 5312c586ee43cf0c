use serde::{Deserialize, Serialize};

use crate::{StepKind, StepRecord, StepStatus};

/// Lifecycle of a cross-chain transfer. Reduced relative to payment
/// intents: the backend's routing decision substitutes for policy gating,
/// so there is no approval stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Created,
    Executing,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }

    pub fn admits(&self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        match self {
            Created => matches!(next, Executing | Failed),
            Executing => matches!(next, Completed | Failed),
            Completed | Failed => false,
        }
    }
}

/// Companion record for a payment whose destination chain differs from its
/// source chain. Shares the step shape of payment intents, keyed by the
/// chain pair and the route the backend chose for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossChainTransfer {
    pub id: String,
    pub intent_id: String,
    pub source_chain: String,
    pub destination_chain: String,
    /// Bridge route chosen by the backend dry run; unknown until then
    pub route: Option<String>,
    pub status: TransferStatus,
    /// Execution and Confirmation checkpoints; no approval stage
    pub steps: Vec<StepRecord>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl CrossChainTransfer {
    /// Record planned during simulation, before any funds move.
    pub fn planned(
        intent_id: impl Into<String>,
        source_chain: impl Into<String>,
        destination_chain: impl Into<String>,
        route: Option<String>,
        now: u64,
    ) -> Self {
        let intent_id = intent_id.into();
        Self {
            id: format!("xct-{intent_id}"),
            intent_id,
            source_chain: source_chain.into(),
            destination_chain: destination_chain.into(),
            route,
            status: TransferStatus::Created,
            steps: vec![
                StepRecord::pending(StepKind::Execution),
                StepRecord::pending(StepKind::Confirmation),
            ],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn executing(mut self, now: u64) -> Self {
        self.set_step(StepKind::Execution, StepStatus::InProgress, None);
        self.status = TransferStatus::Executing;
        self.updated_at = now;
        self
    }

    pub fn completed(mut self, now: u64) -> Self {
        self.set_step(StepKind::Execution, StepStatus::Completed, None);
        self.set_step(StepKind::Confirmation, StepStatus::Completed, None);
        self.status = TransferStatus::Completed;
        self.updated_at = now;
        self
    }

    pub fn failed(mut self, reason: impl Into<String>, now: u64) -> Self {
        self.set_step(StepKind::Execution, StepStatus::Failed, Some(reason.into()));
        self.status = TransferStatus::Failed;
        self.updated_at = now;
        self
    }

    fn set_step(&mut self, kind: StepKind, status: StepStatus, detail: Option<String>) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.kind == kind) {
            step.status = status;
            step.detail = detail;
        }
    }
}
