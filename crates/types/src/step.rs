use serde::{Deserialize, Serialize};

/// The four fixed checkpoints every payment intent walks through.
/// Used for progress display and audit, never for branching logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Simulation,
    Approval,
    Execution,
    Confirmation,
}

impl StepKind {
    pub const ALL: [StepKind; 4] = [
        StepKind::Simulation,
        StepKind::Approval,
        StepKind::Execution,
        StepKind::Confirmation,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// One checkpoint's sub-status plus optional free-text detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub kind: StepKind,
    pub status: StepStatus,
    pub detail: Option<String>,
}

impl StepRecord {
    pub fn pending(kind: StepKind) -> Self {
        Self {
            kind,
            status: StepStatus::Pending,
            detail: None,
        }
    }
}

/// Produce the initial step list for a freshly created intent.
pub fn initial_steps() -> Vec<StepRecord> {
    StepKind::ALL.iter().copied().map(StepRecord::pending).collect()
}
