use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::BackendClient;
use crate::error::BackendError;

/// Wallet balance as reported by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BalanceInfo {
    pub wallet_reference: String,
    pub available: Decimal,
    pub currency: String,
}

/// Outcome of a dry-run simulation: route plus fee estimate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationOutcome {
    pub would_succeed: bool,
    pub route: String,
    pub estimated_fee: Decimal,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Parameters for a transfer execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRequest {
    pub wallet_reference: String,
    pub recipient_address: String,
    pub amount: Decimal,
    pub currency: String,
    pub chain: String,
    /// Destination chain for cross-chain transfers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_chain: Option<String>,
    /// Deduplication handle, fixed for one execution run. A transfer that
    /// landed but timed out on the wire is retried with the same key, so
    /// the backend can drop the duplicate instead of paying twice.
    pub idempotency_key: String,
}

/// What the backend hands back after moving funds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub explorer_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    Pending,
    Confirmed,
    Failed,
}

/// Current backend-side view of a transfer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TxStatusInfo {
    pub state: TxState,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub explorer_url: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// The operations the engine needs from the execution backend. Seam for
/// substituting a mock in state-machine and orchestrator tests.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn balance(&self, wallet_reference: &str) -> Result<BalanceInfo, BackendError>;

    async fn simulate(&self, request: &TransferRequest) -> Result<SimulationOutcome, BackendError>;

    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, BackendError>;

    async fn transaction_status(&self, transfer_id: &str) -> Result<TxStatusInfo, BackendError>;
}

fn parse<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> Result<T, BackendError> {
    serde_json::from_value(value).map_err(|e| BackendError::Protocol {
        message: format!("unexpected {method} result shape: {e}"),
    })
}

#[async_trait]
impl BackendApi for BackendClient {
    async fn balance(&self, wallet_reference: &str) -> Result<BalanceInfo, BackendError> {
        let result = self
            .call("wallet.balance", json!({"wallet": wallet_reference}))
            .await?;
        parse("wallet.balance", result)
    }

    async fn simulate(&self, request: &TransferRequest) -> Result<SimulationOutcome, BackendError> {
        let result = self
            .call("payment.simulate", serde_json::to_value(request).map_err(
                |e| BackendError::Protocol {
                    message: format!("failed to encode simulate params: {e}"),
                },
            )?)
            .await?;
        parse("payment.simulate", result)
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, BackendError> {
        let result = self
            .call("payment.transfer", serde_json::to_value(request).map_err(
                |e| BackendError::Protocol {
                    message: format!("failed to encode transfer params: {e}"),
                },
            )?)
            .await?;
        parse("payment.transfer", result)
    }

    async fn transaction_status(&self, transfer_id: &str) -> Result<TxStatusInfo, BackendError> {
        let result = self
            .call("transaction.status", json!({"transfer_id": transfer_id}))
            .await?;
        parse("transaction.status", result)
    }
}
