use std::sync::Arc;

use serde::Serialize;

use payguard_guards::{diff_results, evaluate, GuardContext, GuardDiff};
use payguard_store::IntentStore;
use payguard_types::GuardResult;

use crate::error::EngineError;
use crate::machine::{spent_in_window, PolicySource};

/// Original-vs-current guard outcomes for one intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub intent_id: String,
    /// Guard results recorded when the intent was last simulated
    pub original: Vec<GuardResult>,
    /// Results of re-evaluating the same payment under today's policies
    pub current: Vec<GuardResult>,
    /// Policies whose outcome flipped, or that no longer exist
    pub differences: Vec<GuardDiff>,
}

/// Answers "would this payment be decided differently under the current
/// policy configuration?" for incident review. Read-only; never mutates
/// the intent or its stored guard results.
pub struct IncidentReplayEngine {
    store: Arc<dyn IntentStore>,
    policies: Arc<dyn PolicySource>,
}

impl IncidentReplayEngine {
    pub fn new(store: Arc<dyn IntentStore>, policies: Arc<dyn PolicySource>) -> Self {
        Self { store, policies }
    }

    pub async fn replay(&self, intent_id: &str) -> Result<ReplayReport, EngineError> {
        let intent = self
            .store
            .get(intent_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                intent_id: intent_id.to_string(),
            })?;

        let policies = self.policies.current();
        // Reconstruct the spend aggregate as of the original evaluation,
        // leaving the replayed intent itself out of its own window.
        let spent = spent_in_window(
            self.store.as_ref(),
            &policies,
            intent.created_at,
            Some(&intent.id),
        )
        .await?;
        let ctx = GuardContext::new(intent.amount, &intent.recipient_address, intent.created_at)
            .with_spent_in_window(spent);
        let current = evaluate(&ctx, &policies);
        let differences = diff_results(&intent.guard_results, &current);

        Ok(ReplayReport {
            intent_id: intent.id,
            original: intent.guard_results,
            current,
            differences,
        })
    }
}
