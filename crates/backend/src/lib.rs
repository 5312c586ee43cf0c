//! Client for the external execution backend (wallet custody plus on-chain
//! execution). The single point of truth for "did money move".
//!
//! Transport is JSON request/response to one configured endpoint with a
//! bearer credential. Transient network failures are retried with capped
//! exponential backoff; application-level failures never are. A
//! transport-successful response can still signal failure two ways
//! (structured error object, or a result whose own `status` is `"error"`)
//! and both are raised to the caller.

pub mod api;
pub mod backoff;
pub mod client;
pub mod error;

pub use api::{
    BackendApi, BalanceInfo, SimulationOutcome, TransferReceipt, TransferRequest, TxState,
    TxStatusInfo,
};
pub use backoff::ExponentialBackoff;
pub use client::{BackendClient, BackendConfig};
pub use error::BackendError;
