use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use payguard_backend::{BackendApi, TransferRequest};
use payguard_guards::auto_approve_eligible;
use payguard_store::IntentStore;
use payguard_types::{
    initial_steps, ExecutionArtifacts, IntentStatus, PaymentIntent, PaymentRequest, StepKind,
    StepStatus,
};

use crate::error::EngineError;
use crate::machine::{current_timestamp, PaymentStateMachine};

/// Progress notifications emitted while an agent payment flow runs.
/// Delivered synchronously, in order, in the task driving the flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    CreatingIntent,
    Simulating { intent_id: String },
    CheckingGuards { intent_id: String },
    Executing { intent_id: Option<String> },
    Completed {
        intent_id: Option<String>,
        transfer_id: String,
        tx_hash: Option<String>,
    },
    RequiresApproval { intent_id: String },
    RequiresSignature { intent_id: String },
    Failed {
        intent_id: Option<String>,
        reason: String,
        requires_manual_approval: bool,
    },
}

/// Where progress events go. Implemented for any `Fn(ProgressEvent)` so
/// callers can pass a closure.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Terminal result of one flow run. A failed flow always asks for a human:
/// `requires_manual_approval` is never false on the `Failed` arm.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    Completed {
        /// None while a fast-path record write is still outstanding
        intent: Option<PaymentIntent>,
        transfer_id: String,
        tx_hash: Option<String>,
    },
    RequiresApproval { intent: PaymentIntent },
    RequiresSignature { intent: PaymentIntent },
    Failed {
        intent: Option<PaymentIntent>,
        reason: String,
        requires_manual_approval: bool,
    },
}

/// Drives create → simulate → execute → sync as one logical operation for
/// agent-initiated payments.
pub struct PaymentFlowOrchestrator {
    machine: Arc<PaymentStateMachine>,
    backend: Arc<dyn BackendApi>,
    store: Arc<dyn IntentStore>,
    /// Execute sub-threshold payments directly, skipping intent bookkeeping
    /// until after completion.
    fast_path: bool,
}

impl PaymentFlowOrchestrator {
    pub fn new(
        machine: Arc<PaymentStateMachine>,
        backend: Arc<dyn BackendApi>,
        store: Arc<dyn IntentStore>,
    ) -> Self {
        Self {
            machine,
            backend,
            store,
            fast_path: true,
        }
    }

    pub fn with_fast_path(mut self, fast_path: bool) -> Self {
        self.fast_path = fast_path;
        self
    }

    /// Run the full payment flow, reporting progress to `sink`. Never
    /// returns an error: every failure becomes a `Failed` outcome that
    /// flags the payment for manual attention.
    pub async fn run(&self, request: PaymentRequest, sink: &dyn ProgressSink) -> FlowOutcome {
        if self.eligible_for_fast_path(&request) {
            return self.run_fast_path(request, sink).await;
        }

        sink.emit(ProgressEvent::CreatingIntent);
        let intent = match self.machine.create(request).await {
            Ok(intent) => intent,
            Err(e) => return fail(sink, None, e),
        };

        sink.emit(ProgressEvent::Simulating {
            intent_id: intent.id.clone(),
        });
        sink.emit(ProgressEvent::CheckingGuards {
            intent_id: intent.id.clone(),
        });
        let intent = match self.machine.simulate(&intent.id).await {
            Ok(intent) => intent,
            Err(e) => return fail(sink, self.latest(intent).await, e),
        };

        if !intent.approval_satisfied() {
            sink.emit(ProgressEvent::RequiresApproval {
                intent_id: intent.id.clone(),
            });
            info!(intent_id = %intent.id, "payment waiting for manual approval");
            return FlowOutcome::RequiresApproval { intent };
        }

        sink.emit(ProgressEvent::Executing {
            intent_id: Some(intent.id.clone()),
        });
        let intent = match self.machine.execute(&intent.id).await {
            Ok(intent) => intent,
            Err(e) => return fail(sink, self.latest(intent).await, e),
        };

        if intent.status == IntentStatus::AwaitingUserSignature {
            sink.emit(ProgressEvent::RequiresSignature {
                intent_id: intent.id.clone(),
            });
            return FlowOutcome::RequiresSignature { intent };
        }

        // Best-effort confirmation sync; the payment already succeeded.
        let intent = match self.machine.sync(&intent.id).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(intent_id = %intent.id, error = %e, "confirmation sync failed");
                intent
            }
        };

        match &intent.artifacts {
            Some(artifacts) => {
                sink.emit(ProgressEvent::Completed {
                    intent_id: Some(intent.id.clone()),
                    transfer_id: artifacts.transfer_id.clone(),
                    tx_hash: artifacts.tx_hash.clone(),
                });
                let transfer_id = artifacts.transfer_id.clone();
                let tx_hash = artifacts.tx_hash.clone();
                FlowOutcome::Completed {
                    intent: Some(intent),
                    transfer_id,
                    tx_hash,
                }
            }
            // Sync reported the transfer failed after submission
            None => {
                let reason = intent
                    .step(StepKind::Execution)
                    .detail
                    .clone()
                    .unwrap_or_else(|| "transfer failed after submission".to_string());
                fail_outcome(sink, Some(intent), reason)
            }
        }
    }

    /// Durable view of the intent after a failed step, falling back to the
    /// in-memory snapshot if the store cannot be read.
    async fn latest(&self, snapshot: PaymentIntent) -> Option<PaymentIntent> {
        Some(self.machine.get(&snapshot.id).await.unwrap_or(snapshot))
    }

    /// Cross-chain payments never qualify: they need the simulation dry run
    /// to pick a route before funds move.
    fn eligible_for_fast_path(&self, request: &PaymentRequest) -> bool {
        self.fast_path
            && request.validate().is_ok()
            && request.from_wallet.is_autonomous()
            && !request.is_cross_chain()
            && auto_approve_eligible(request.amount, &self.machine.active_policies())
    }

    /// Sub-threshold payments are pre-cleared by policy; call the backend
    /// directly and write the record after the funds have moved.
    async fn run_fast_path(&self, request: PaymentRequest, sink: &dyn ProgressSink) -> FlowOutcome {
        sink.emit(ProgressEvent::Executing { intent_id: None });

        let transfer = TransferRequest {
            wallet_reference: request.from_wallet.reference.clone(),
            recipient_address: request.recipient_address.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            chain: request.chain.clone(),
            destination_chain: None,
            idempotency_key: Uuid::new_v4().to_string(),
        };
        let receipt = match self.backend.transfer(&transfer).await {
            Ok(receipt) => receipt,
            Err(e) => return fail(sink, None, e.into()),
        };
        info!(
            transfer_id = %receipt.transfer_id,
            amount = %request.amount,
            "fast-path payment executed"
        );

        sink.emit(ProgressEvent::Completed {
            intent_id: None,
            transfer_id: receipt.transfer_id.clone(),
            tx_hash: receipt.tx_hash.clone(),
        });

        // Post-hoc bookkeeping: the record exists only after completion.
        let intent = match self.record_fast_path(&request, &receipt).await {
            Ok(intent) => Some(intent),
            Err(e) => {
                warn!(
                    transfer_id = %receipt.transfer_id,
                    error = %e,
                    "failed to record fast-path payment"
                );
                None
            }
        };
        FlowOutcome::Completed {
            intent,
            transfer_id: receipt.transfer_id,
            tx_hash: receipt.tx_hash,
        }
    }

    async fn record_fast_path(
        &self,
        request: &PaymentRequest,
        receipt: &payguard_backend::TransferReceipt,
    ) -> Result<PaymentIntent, EngineError> {
        let now = current_timestamp();
        let id = PaymentIntent::derive_id(
            &request.from_wallet.reference,
            &request.recipient_address,
            request.amount,
            now,
        );
        let mut artifacts = ExecutionArtifacts::provisional(receipt.transfer_id.clone());
        artifacts.tx_hash = receipt.tx_hash.clone();
        artifacts.explorer_url = receipt.explorer_url.clone();

        let mut intent = PaymentIntent {
            id,
            amount: request.amount,
            currency: request.currency.clone(),
            recipient_label: request.recipient_label.clone(),
            recipient_address: request.recipient_address.clone(),
            chain: request.chain.clone(),
            destination_chain: None,
            from_wallet: request.from_wallet.clone(),
            status: IntentStatus::Succeeded,
            steps: initial_steps(),
            guard_results: Vec::new(),
            artifacts: Some(artifacts),
            metadata: request.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        intent.set_step(
            StepKind::Simulation,
            StepStatus::Completed,
            Some("skipped on fast path".to_string()),
        );
        intent.set_step(
            StepKind::Approval,
            StepStatus::Completed,
            Some("auto-approved under threshold".to_string()),
        );
        intent.set_step(StepKind::Execution, StepStatus::Completed, None);
        intent.set_step(
            StepKind::Confirmation,
            StepStatus::Completed,
            Some("submitted".to_string()),
        );
        self.store.put(&intent).await?;
        Ok(intent)
    }
}

fn fail(sink: &dyn ProgressSink, intent: Option<PaymentIntent>, err: EngineError) -> FlowOutcome {
    fail_outcome(sink, intent, err.to_string())
}

fn fail_outcome(
    sink: &dyn ProgressSink,
    intent: Option<PaymentIntent>,
    reason: String,
) -> FlowOutcome {
    warn!(%reason, "payment flow failed; flagging for manual attention");
    sink.emit(ProgressEvent::Failed {
        intent_id: intent.as_ref().map(|i| i.id.clone()),
        reason: reason.clone(),
        requires_manual_approval: true,
    });
    FlowOutcome::Failed {
        intent,
        reason,
        requires_manual_approval: true,
    }
}
