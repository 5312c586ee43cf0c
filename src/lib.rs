//! Payguard: policy-guarded stablecoin payment orchestration.
//!
//! The engine takes payment requests, runs them through guard policies and a
//! backend dry run, routes them by wallet custody, and executes them against
//! a single configured execution backend with retry and confirmation sync.
//!
//! Each concern lives in its own crate; this facade re-exports them and
//! provides [`Engine`], the wired-up entry point built from configuration.

use std::sync::Arc;
use std::time::Duration;

pub use payguard_backend as backend;
pub use payguard_config as config;
pub use payguard_guards as guards;
pub use payguard_orchestrator as orchestrator;
pub use payguard_store as store;
pub use payguard_types as types;

use payguard_backend::{BackendApi, BackendClient, BackendConfig};
use payguard_config::{validate_config, EngineConfig};
use payguard_orchestrator::{
    IncidentReplayEngine, MachineConfig, PaymentFlowOrchestrator, PaymentStateMachine,
    PolicySource, StaticPolicySource,
};
use payguard_store::IntentStore;

/// The fully wired engine: state machine, streaming flow, and replay.
pub struct Engine {
    pub machine: Arc<PaymentStateMachine>,
    pub flow: PaymentFlowOrchestrator,
    pub replay: IncidentReplayEngine,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

impl Engine {
    /// Validate the configuration and wire every collaborator together.
    /// The store is supplied by the caller; everything else is built here.
    pub fn from_config(
        config: &EngineConfig,
        store: Arc<dyn IntentStore>,
    ) -> anyhow::Result<Self> {
        validate_config(config)?;

        let client = BackendClient::new(
            BackendConfig::new(
                config.backend.endpoint.clone(),
                config.backend.bearer_token.clone(),
            )
            .with_timeout(Duration::from_millis(config.backend.timeout_ms))
            .with_max_retries(config.backend.max_retries),
        )?;
        let backend: Arc<dyn BackendApi> = Arc::new(client);
        let policies: Arc<dyn PolicySource> =
            Arc::new(StaticPolicySource::new(config.policies.clone()));

        let machine = Arc::new(PaymentStateMachine::new(
            store.clone(),
            backend.clone(),
            policies.clone(),
            MachineConfig {
                require_manual_approval: config.approval.require_manual,
                balance_precheck: config.approval.balance_precheck,
            },
        ));
        let flow = PaymentFlowOrchestrator::new(machine.clone(), backend, store.clone())
            .with_fast_path(config.approval.fast_path);
        let replay = IncidentReplayEngine::new(store, policies);

        Ok(Self {
            machine,
            flow,
            replay,
        })
    }
}
