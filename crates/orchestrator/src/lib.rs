//! Payment orchestration core: the intent state machine, custody routing,
//! guard-gated execution, the streaming agent payment flow, and incident
//! replay.
//!
//! Collaborators (persistence, the execution backend, policy configuration)
//! are injected behind traits; this crate owns only the decision logic.

pub mod error;
pub mod flow;
pub mod machine;
pub mod replay;
pub mod router;

pub use error::{EngineError, ErrorCategory};
pub use flow::{FlowOutcome, PaymentFlowOrchestrator, ProgressEvent, ProgressSink};
pub use machine::{MachineConfig, PaymentStateMachine, PolicySource, StaticPolicySource};
pub use replay::{IncidentReplayEngine, ReplayReport};
pub use router::{route, ExecutionRoute};
