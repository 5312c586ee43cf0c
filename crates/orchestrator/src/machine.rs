use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use payguard_backend::{BackendApi, TransferRequest, TxState};
use payguard_guards::{auto_approve_eligible, evaluate, GuardContext};
use payguard_store::IntentStore;
use payguard_types::{
    initial_steps, CrossChainTransfer, ExecutionArtifacts, GuardKind, GuardPolicy, IntentStatus,
    PaymentIntent, PaymentRequest, SettlementRecord, StepKind, StepStatus,
};

use crate::error::EngineError;
use crate::router::{self, ExecutionRoute};

/// Window applied to rolling-budget policies that do not carry their own.
const DEFAULT_BUDGET_WINDOW_SECS: u64 = 86_400;

pub(crate) fn current_timestamp() -> u64 {
    Utc::now().timestamp() as u64
}

/// Advance the intent along the status graph. Every transition the machine
/// makes goes through here so the graph in `IntentStatus::admits` stays the
/// single source of truth.
fn advance(intent: &mut PaymentIntent, next: IntentStatus) {
    debug_assert!(
        intent.status.admits(next),
        "status {} does not admit {}",
        intent.status,
        next
    );
    intent.status = next;
}

/// Where the state machine reads the active guard policy set from.
/// Policies are owned by configuration; the machine never mutates them.
pub trait PolicySource: Send + Sync {
    fn current(&self) -> Vec<GuardPolicy>;
}

/// A fixed policy set, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticPolicySource {
    policies: Vec<GuardPolicy>,
}

impl StaticPolicySource {
    pub fn new(policies: Vec<GuardPolicy>) -> Self {
        Self { policies }
    }
}

impl PolicySource for StaticPolicySource {
    fn current(&self) -> Vec<GuardPolicy> {
        self.policies.clone()
    }
}

/// Knobs that change how the machine moves intents, not what the moves are.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// When set, every payment waits for a human even if an auto-approve
    /// threshold would pre-clear it.
    pub require_manual_approval: bool,
    /// Check the wallet balance before creating an intent. The check is
    /// advisory: if it cannot be performed, creation proceeds and the
    /// simulation dry run catches funding problems later.
    pub balance_precheck: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            require_manual_approval: false,
            balance_precheck: true,
        }
    }
}

/// Owns every status transition a payment intent can make. Collaborators are
/// injected so the transition logic is testable without a live backend.
///
/// Callers must not issue concurrent `execute` calls for the same intent id;
/// read-modify-write against the store is not atomic.
pub struct PaymentStateMachine {
    store: Arc<dyn IntentStore>,
    backend: Arc<dyn BackendApi>,
    policies: Arc<dyn PolicySource>,
    config: MachineConfig,
}

impl PaymentStateMachine {
    pub fn new(
        store: Arc<dyn IntentStore>,
        backend: Arc<dyn BackendApi>,
        policies: Arc<dyn PolicySource>,
        config: MachineConfig,
    ) -> Self {
        Self {
            store,
            backend,
            policies,
            config,
        }
    }

    pub fn active_policies(&self) -> Vec<GuardPolicy> {
        self.policies.current()
    }

    pub async fn get(&self, intent_id: &str) -> Result<PaymentIntent, EngineError> {
        self.load(intent_id).await
    }

    /// Validate the request and persist a `pending` intent plus its
    /// zero-value settlement placeholder.
    pub async fn create(&self, request: PaymentRequest) -> Result<PaymentIntent, EngineError> {
        request.validate().map_err(|e| EngineError::Validation {
            reason: e.to_string(),
        })?;

        if self.config.balance_precheck && request.from_wallet.is_autonomous() {
            match self.backend.balance(&request.from_wallet.reference).await {
                Ok(balance) if balance.available < request.amount => {
                    return Err(EngineError::Validation {
                        reason: format!(
                            "insufficient balance: wallet holds {} {}, payment needs {}",
                            balance.available, balance.currency, request.amount
                        ),
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        wallet = %request.from_wallet.reference,
                        error = %e,
                        "balance pre-check failed; continuing, simulation will catch funding problems"
                    );
                }
            }
        }

        let now = current_timestamp();
        let id = PaymentIntent::derive_id(
            &request.from_wallet.reference,
            &request.recipient_address,
            request.amount,
            now,
        );
        let intent = PaymentIntent {
            id: id.clone(),
            amount: request.amount,
            currency: request.currency,
            recipient_label: request.recipient_label,
            recipient_address: request.recipient_address,
            chain: request.chain,
            destination_chain: request.destination_chain,
            from_wallet: request.from_wallet,
            status: IntentStatus::Pending,
            steps: initial_steps(),
            guard_results: Vec::new(),
            artifacts: None,
            metadata: request.metadata,
            created_at: now,
            updated_at: now,
        };

        self.store.put(&intent).await?;
        self.store
            .put_settlement(&SettlementRecord::placeholder(&id, &intent.currency, now))
            .await?;

        info!(intent_id = %id, amount = %intent.amount, "payment intent created");
        Ok(intent)
    }

    /// Dry-run the payment through the backend, then evaluate guards.
    /// Ends in `blocked` or `awaiting_approval`; a transient backend failure
    /// leaves the intent back in `pending` so simulation can be retried.
    pub async fn simulate(&self, intent_id: &str) -> Result<PaymentIntent, EngineError> {
        let mut intent = self.load(intent_id).await?;
        if intent.status != IntentStatus::Pending {
            return Err(EngineError::InvalidTransition {
                intent_id: intent.id,
                from: intent.status,
                action: "simulate",
            });
        }

        let now = current_timestamp();
        advance(&mut intent, IntentStatus::Simulating);
        intent.set_step(StepKind::Simulation, StepStatus::InProgress, None);

        let outcome = match self.backend.simulate(&transfer_request_for(&intent)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Retryable: back to pending with the failure recorded
                advance(&mut intent, IntentStatus::Pending);
                intent.set_step(
                    StepKind::Simulation,
                    StepStatus::Failed,
                    Some(e.to_string()),
                );
                intent.touch(now);
                self.store.put(&intent).await?;
                warn!(intent_id = %intent.id, error = %e, "simulation dry run failed");
                return Err(e.into());
            }
        };

        if !outcome.would_succeed {
            let reason = outcome
                .reason
                .unwrap_or_else(|| "backend rejected the payment in simulation".to_string());
            intent.set_step(
                StepKind::Simulation,
                StepStatus::Failed,
                Some(reason.clone()),
            );
            intent.set_step(
                StepKind::Approval,
                StepStatus::Failed,
                Some("blocked by failed simulation".to_string()),
            );
            advance(&mut intent, IntentStatus::Blocked);
            intent.touch(now);
            self.store.put(&intent).await?;
            warn!(intent_id = %intent.id, %reason, "payment blocked by simulation");
            return Err(EngineError::PolicyBlocked {
                intent_id: intent.id,
                failed: vec![format!("backend simulation: {reason}")],
            });
        }

        intent.set_step(
            StepKind::Simulation,
            StepStatus::Completed,
            Some(format!(
                "route {}, estimated fee {}",
                outcome.route, outcome.estimated_fee
            )),
        );

        let policies = self.policies.current();
        let spent = self.spent_in_window(&policies, now).await?;
        let ctx = GuardContext::new(intent.amount, &intent.recipient_address, now)
            .with_spent_in_window(spent);
        let results = evaluate(&ctx, &policies);
        let failed: Vec<String> = results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.policy_name.clone())
            .collect();
        intent.guard_results = results;

        if !failed.is_empty() {
            advance(&mut intent, IntentStatus::Blocked);
            intent.set_step(
                StepKind::Approval,
                StepStatus::Failed,
                Some(format!("blocked by: {}", failed.join(", "))),
            );
            intent.touch(now);
            self.store.put(&intent).await?;
            warn!(intent_id = %intent.id, policies = ?failed, "payment blocked by guard policies");
            return Err(EngineError::PolicyBlocked {
                intent_id: intent.id,
                failed,
            });
        }

        // Cross-chain payments get a companion record carrying the route
        // the dry run picked, planned before any funds move.
        if let Some(dest) = intent.destination_chain.clone().filter(|_| intent.is_cross_chain()) {
            self.store
                .put_transfer(&CrossChainTransfer::planned(
                    &intent.id,
                    &intent.chain,
                    dest,
                    Some(outcome.route.clone()),
                    now,
                ))
                .await?;
        }

        advance(&mut intent, IntentStatus::AwaitingApproval);
        if !self.config.require_manual_approval && auto_approve_eligible(intent.amount, &policies)
        {
            intent.set_step(
                StepKind::Approval,
                StepStatus::Completed,
                Some("auto-approved under threshold".to_string()),
            );
            info!(intent_id = %intent.id, "payment auto-approved under threshold");
        }
        intent.touch(now);
        self.store.put(&intent).await?;
        Ok(intent)
    }

    /// Human approval of a payment awaiting it.
    pub async fn approve(&self, intent_id: &str) -> Result<PaymentIntent, EngineError> {
        let mut intent = self.load(intent_id).await?;
        if intent.status != IntentStatus::AwaitingApproval {
            return Err(EngineError::InvalidTransition {
                intent_id: intent.id,
                from: intent.status,
                action: "approve",
            });
        }

        intent.set_step(
            StepKind::Approval,
            StepStatus::Completed,
            Some("approved".to_string()),
        );
        advance(&mut intent, IntentStatus::Approved);
        intent.touch(current_timestamp());
        self.store.put(&intent).await?;
        info!(intent_id = %intent.id, "payment approved");
        Ok(intent)
    }

    /// Human rejection; terminal.
    pub async fn reject(
        &self,
        intent_id: &str,
        reason: Option<String>,
    ) -> Result<PaymentIntent, EngineError> {
        let mut intent = self.load(intent_id).await?;
        if intent.status != IntentStatus::AwaitingApproval {
            return Err(EngineError::InvalidTransition {
                intent_id: intent.id,
                from: intent.status,
                action: "reject",
            });
        }

        intent.set_step(
            StepKind::Approval,
            StepStatus::Failed,
            Some(reason.unwrap_or_else(|| "rejected".to_string())),
        );
        advance(&mut intent, IntentStatus::Rejected);
        intent.touch(current_timestamp());
        self.store.put(&intent).await?;
        info!(intent_id = %intent.id, "payment rejected");
        Ok(intent)
    }

    /// Move funds. Admitted from `approved`, a pre-approved
    /// `awaiting_approval`, an auto-approvable `pending` (fast path), or
    /// `awaiting_user_signature` once the owner has signed.
    pub async fn execute(&self, intent_id: &str) -> Result<PaymentIntent, EngineError> {
        let mut intent = self.load(intent_id).await?;
        let policies = self.policies.current();
        let from = intent.status;

        match from {
            IntentStatus::Pending => {
                if self.config.require_manual_approval
                    || !auto_approve_eligible(intent.amount, &policies)
                {
                    return Err(EngineError::InvalidTransition {
                        intent_id: intent.id,
                        from,
                        action: "execute",
                    });
                }
                intent.set_step(
                    StepKind::Approval,
                    StepStatus::Completed,
                    Some("auto-approved under threshold".to_string()),
                );
            }
            IntentStatus::AwaitingApproval if intent.approval_satisfied() => {}
            IntentStatus::Approved | IntentStatus::AwaitingUserSignature => {}
            _ => {
                return Err(EngineError::InvalidTransition {
                    intent_id: intent.id,
                    from,
                    action: "execute",
                });
            }
        }

        let now = current_timestamp();
        let route = match router::route(&intent.from_wallet) {
            Ok(route) => route,
            Err(e) => {
                return self.fail_custody(intent, now, e).await;
            }
        };

        if route == ExecutionRoute::ManualSignature && from != IntentStatus::AwaitingUserSignature
        {
            // Suspend until the wallet owner signs out of band; execute()
            // called again on this intent resumes past this point.
            advance(&mut intent, IntentStatus::AwaitingUserSignature);
            intent.set_step(
                StepKind::Execution,
                StepStatus::InProgress,
                Some("awaiting user signature".to_string()),
            );
            intent.touch(now);
            self.store.put(&intent).await?;
            info!(intent_id = %intent.id, "payment suspended for user signature");
            return Ok(intent);
        }

        // Custody re-check immediately before funds move, guarding against
        // a stale or tampered stored intent.
        if let Err(e) = intent.from_wallet.validate() {
            let err = EngineError::CustodyViolation {
                reason: e.to_string(),
            };
            return self.fail_custody(intent, now, err).await;
        }

        advance(&mut intent, IntentStatus::Executing);
        intent.set_step(StepKind::Execution, StepStatus::InProgress, None);
        intent.touch(now);
        self.store.put(&intent).await?;

        let transfer_record = match self.cross_chain_record(&intent, now).await? {
            Some(record) => {
                let record = record.executing(now);
                self.store.put_transfer(&record).await?;
                Some(record)
            }
            None => None,
        };

        match self.backend.transfer(&transfer_request_for(&intent)).await {
            Ok(receipt) => {
                let tx_hash = receipt.tx_hash.clone();
                let mut artifacts = ExecutionArtifacts::provisional(receipt.transfer_id);
                artifacts.tx_hash = receipt.tx_hash;
                artifacts.explorer_url = receipt.explorer_url;
                intent.artifacts = Some(artifacts);
                advance(&mut intent, IntentStatus::Succeeded);
                intent.set_step(StepKind::Execution, StepStatus::Completed, None);
                intent.set_step(
                    StepKind::Confirmation,
                    StepStatus::Completed,
                    Some(match &tx_hash {
                        Some(hash) => format!("submitted, tx {hash}"),
                        None => "submitted, awaiting on-chain confirmation".to_string(),
                    }),
                );
                intent.touch(now);
                info!(intent_id = %intent.id, amount = %intent.amount, "payment executed");

                // Money already moved; a persistence failure here must not
                // report the payment as failed.
                if let Err(e) = self.persist_success(&intent, tx_hash, now).await {
                    error!(
                        intent_id = %intent.id,
                        error = %e,
                        "failed to persist a succeeded payment"
                    );
                }
                if let Some(record) = transfer_record {
                    if let Err(e) = self.store.put_transfer(&record.completed(now)).await {
                        error!(
                            intent_id = %intent.id,
                            error = %e,
                            "failed to persist a completed cross-chain record"
                        );
                    }
                }
                Ok(intent)
            }
            Err(e) => {
                advance(&mut intent, IntentStatus::Failed);
                // Backend message kept verbatim for operator diagnosis
                intent.set_step(StepKind::Execution, StepStatus::Failed, Some(e.to_string()));
                intent.touch(now);
                self.store.put(&intent).await?;
                if let Some(record) = transfer_record {
                    self.store
                        .put_transfer(&record.failed(e.to_string(), now))
                        .await?;
                }
                error!(intent_id = %intent.id, error = %e, "payment execution failed");
                Err(e.into())
            }
        }
    }

    /// Idempotent reconciliation against the backend's view of the transfer.
    /// Upgrades a provisional artifact to a confirmed one; flips a
    /// `succeeded` intent to `failed` only if the backend reports the
    /// transfer itself failed after submission.
    pub async fn sync(&self, intent_id: &str) -> Result<PaymentIntent, EngineError> {
        let mut intent = self.load(intent_id).await?;
        let Some(artifacts) = intent.artifacts.clone() else {
            return Ok(intent);
        };
        if artifacts.confirmed {
            return Ok(intent);
        }

        let status = self.backend.transaction_status(&artifacts.transfer_id).await?;
        let now = current_timestamp();
        match status.state {
            TxState::Pending => Ok(intent),
            TxState::Confirmed => {
                let mut artifacts = artifacts;
                artifacts.tx_hash = status.tx_hash.or(artifacts.tx_hash);
                artifacts.explorer_url = status.explorer_url.or(artifacts.explorer_url);
                artifacts.confirmed = true;
                let tx_hash = artifacts.tx_hash.clone();
                intent.artifacts = Some(artifacts);
                intent.set_step(
                    StepKind::Confirmation,
                    StepStatus::Completed,
                    Some("confirmed on chain".to_string()),
                );
                intent.touch(now);
                self.store.put(&intent).await?;
                if let Some(record) = self.store.settlement_for_intent(&intent.id).await? {
                    self.store
                        .put_settlement(&record.settled(intent.amount, tx_hash, now))
                        .await?;
                }
                info!(intent_id = %intent.id, "transfer confirmed on chain");
                Ok(intent)
            }
            TxState::Failed => {
                let reason = status
                    .failure_reason
                    .unwrap_or_else(|| "transfer failed after submission".to_string());
                // The backend is the single point of truth for whether money
                // actually moved, so even a succeeded intent flips here.
                advance(&mut intent, IntentStatus::Failed);
                intent.artifacts = None;
                intent.set_step(
                    StepKind::Execution,
                    StepStatus::Failed,
                    Some(format!("transfer {}: {reason}", artifacts.transfer_id)),
                );
                intent.set_step(StepKind::Confirmation, StepStatus::Failed, Some(reason));
                intent.touch(now);
                self.store.put(&intent).await?;
                warn!(intent_id = %intent.id, "transfer failed after submission");
                Ok(intent)
            }
        }
    }

    async fn load(&self, intent_id: &str) -> Result<PaymentIntent, EngineError> {
        self.store
            .get(intent_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                intent_id: intent_id.to_string(),
            })
    }

    /// Complete the transition to `failed` before surfacing a custody error.
    async fn fail_custody(
        &self,
        mut intent: PaymentIntent,
        now: u64,
        err: EngineError,
    ) -> Result<PaymentIntent, EngineError> {
        advance(&mut intent, IntentStatus::Failed);
        intent.set_step(
            StepKind::Execution,
            StepStatus::Failed,
            Some("wallet custody configuration error".to_string()),
        );
        intent.touch(now);
        self.store.put(&intent).await?;
        error!(intent_id = %intent.id, error = %err, "custody violation at execution");
        Err(err)
    }

    /// The companion record for a cross-chain intent. Planted during
    /// simulation; the fast path skips simulation for cross-chain payments,
    /// so a missing record means the intent is same-chain.
    async fn cross_chain_record(
        &self,
        intent: &PaymentIntent,
        now: u64,
    ) -> Result<Option<CrossChainTransfer>, EngineError> {
        if !intent.is_cross_chain() {
            return Ok(None);
        }
        match self.store.transfer_for_intent(&intent.id).await? {
            Some(record) => Ok(Some(record)),
            None => {
                let Some(dest) = intent.destination_chain.clone() else {
                    return Ok(None);
                };
                Ok(Some(CrossChainTransfer::planned(
                    &intent.id,
                    &intent.chain,
                    dest,
                    None,
                    now,
                )))
            }
        }
    }

    async fn persist_success(
        &self,
        intent: &PaymentIntent,
        tx_hash: Option<String>,
        now: u64,
    ) -> Result<(), EngineError> {
        self.store.put(intent).await?;
        if let Some(record) = self.store.settlement_for_intent(&intent.id).await? {
            self.store
                .put_settlement(&record.settled(intent.amount, tx_hash, now))
                .await?;
        }
        Ok(())
    }

    async fn spent_in_window(
        &self,
        policies: &[GuardPolicy],
        now: u64,
    ) -> Result<Decimal, EngineError> {
        spent_in_window(self.store.as_ref(), policies, now, None).await
    }
}

/// Sum of succeeded payments inside the widest configured budget window,
/// optionally excluding one intent id (used when replaying that intent).
/// Returns zero without touching the store when no rolling policy is enabled.
pub(crate) async fn spent_in_window(
    store: &dyn IntentStore,
    policies: &[GuardPolicy],
    now: u64,
    exclude: Option<&str>,
) -> Result<Decimal, EngineError> {
    let window = policies
        .iter()
        .filter(|p| p.enabled && p.kind == GuardKind::RollingBudgetLimit)
        .map(|p| p.window_secs.unwrap_or(DEFAULT_BUDGET_WINDOW_SECS))
        .max();
    let Some(window) = window else {
        return Ok(Decimal::ZERO);
    };

    let cutoff = now.saturating_sub(window);
    let intents = store.list_all().await?;
    Ok(intents
        .iter()
        .filter(|i| i.status == IntentStatus::Succeeded && i.updated_at >= cutoff)
        .filter(|i| exclude != Some(i.id.as_str()))
        .map(|i| i.amount)
        .sum())
}

/// Build the backend call parameters for one simulate or execute run.
/// The idempotency key is minted fresh per run: retries inside a single
/// backend call reuse it, so a transfer that landed but timed out on the
/// wire is deduplicated instead of paid twice.
pub(crate) fn transfer_request_for(intent: &PaymentIntent) -> TransferRequest {
    TransferRequest {
        wallet_reference: intent.from_wallet.reference.clone(),
        recipient_address: intent.recipient_address.clone(),
        amount: intent.amount,
        currency: intent.currency.clone(),
        chain: intent.chain.clone(),
        destination_chain: intent.destination_chain.clone(),
        idempotency_key: Uuid::new_v4().to_string(),
    }
}
