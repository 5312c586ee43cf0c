//! Persistence collaborator for the Payguard engine.
//!
//! The engine only sees the [`IntentStore`] trait; whether records live in
//! memory, an embedded database, or a remote service is the implementor's
//! concern. [`InMemoryStore`] is the reference implementation used in tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use payguard_types::{CrossChainTransfer, PaymentIntent, SettlementRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Durable key-value storage keyed by intent id.
#[async_trait]
pub trait IntentStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<PaymentIntent>, StoreError>;

    /// Insert or replace the intent snapshot.
    async fn put(&self, intent: &PaymentIntent) -> Result<(), StoreError>;

    /// Full scan; used by replay and what-if paths, never the hot path.
    async fn list_all(&self) -> Result<Vec<PaymentIntent>, StoreError>;

    async fn put_settlement(&self, record: &SettlementRecord) -> Result<(), StoreError>;

    async fn settlement_for_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<SettlementRecord>, StoreError>;

    /// Insert or replace the cross-chain companion record.
    async fn put_transfer(&self, transfer: &CrossChainTransfer) -> Result<(), StoreError>;

    async fn transfer_for_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<CrossChainTransfer>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    intents: Arc<RwLock<HashMap<String, PaymentIntent>>>,
    settlements: Arc<RwLock<HashMap<String, SettlementRecord>>>,
    transfers: Arc<RwLock<HashMap<String, CrossChainTransfer>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.intents.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.read().unwrap().is_empty()
    }
}

#[async_trait]
impl IntentStore for InMemoryStore {
    async fn get(&self, id: &str) -> Result<Option<PaymentIntent>, StoreError> {
        Ok(self.intents.read().unwrap().get(id).cloned())
    }

    async fn put(&self, intent: &PaymentIntent) -> Result<(), StoreError> {
        self.intents
            .write()
            .unwrap()
            .insert(intent.id.clone(), intent.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<PaymentIntent>, StoreError> {
        let mut intents: Vec<_> = self.intents.read().unwrap().values().cloned().collect();
        intents.sort_by_key(|i| i.created_at);
        Ok(intents)
    }

    async fn put_settlement(&self, record: &SettlementRecord) -> Result<(), StoreError> {
        self.settlements
            .write()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn settlement_for_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<SettlementRecord>, StoreError> {
        Ok(self
            .settlements
            .read()
            .unwrap()
            .values()
            .find(|r| r.intent_id == intent_id)
            .cloned())
    }

    async fn put_transfer(&self, transfer: &CrossChainTransfer) -> Result<(), StoreError> {
        self.transfers
            .write()
            .unwrap()
            .insert(transfer.id.clone(), transfer.clone());
        Ok(())
    }

    async fn transfer_for_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<CrossChainTransfer>, StoreError> {
        Ok(self
            .transfers
            .read()
            .unwrap()
            .values()
            .find(|t| t.intent_id == intent_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payguard_types::{
        initial_steps, CustodyType, IntentStatus, WalletBinding, WalletRole,
    };
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;

    fn test_intent(id: &str, created_at: u64) -> PaymentIntent {
        PaymentIntent {
            id: id.to_string(),
            amount: Decimal::new(10, 0),
            currency: "USD".to_string(),
            recipient_label: String::new(),
            recipient_address: "0xr".to_string(),
            chain: "BASE".to_string(),
            destination_chain: None,
            from_wallet: WalletBinding::new(
                WalletRole::Agent,
                CustodyType::PlatformManaged,
                "wallet-1",
            ),
            status: IntentStatus::Pending,
            steps: initial_steps(),
            guard_results: Vec::new(),
            artifacts: None,
            metadata: BTreeMap::new(),
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_put_and_get_round_trip() {
        let store = InMemoryStore::new();
        let intent = test_intent("pi-1", 100);

        store.put(&intent).await.unwrap();
        let loaded = store.get("pi-1").await.unwrap();
        assert_eq!(loaded, Some(intent));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = InMemoryStore::new();
        assert!(store.get("pi-unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_snapshot() {
        let store = InMemoryStore::new();
        let mut intent = test_intent("pi-1", 100);
        store.put(&intent).await.unwrap();

        intent.status = IntentStatus::Simulating;
        intent.touch(200);
        store.put(&intent).await.unwrap();

        let loaded = store.get("pi-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, IntentStatus::Simulating);
        assert_eq!(loaded.updated_at, 200);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_list_all_sorted_by_creation() {
        let store = InMemoryStore::new();
        store.put(&test_intent("pi-b", 200)).await.unwrap();
        store.put(&test_intent("pi-a", 100)).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "pi-a");
        assert_eq!(all[1].id, "pi-b");
    }

    #[tokio::test]
    async fn test_settlement_lookup_by_intent() {
        let store = InMemoryStore::new();
        let record = SettlementRecord::placeholder("pi-1", "USD", 100);
        store.put_settlement(&record).await.unwrap();

        let found = store.settlement_for_intent("pi-1").await.unwrap();
        assert_eq!(found, Some(record));
        assert!(store.settlement_for_intent("pi-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transfer_lookup_by_intent() {
        let store = InMemoryStore::new();
        let transfer = CrossChainTransfer::planned(
            "pi-1",
            "BASE",
            "ARBITRUM",
            Some("bridge-usdc".to_string()),
            100,
        );
        store.put_transfer(&transfer).await.unwrap();

        let found = store.transfer_for_intent("pi-1").await.unwrap();
        assert_eq!(found, Some(transfer.clone()));

        // Replaced wholesale on update
        store.put_transfer(&transfer.executing(110)).await.unwrap();
        let found = store.transfer_for_intent("pi-1").await.unwrap().unwrap();
        assert_eq!(found.updated_at, 110);
        assert!(store.transfer_for_intent("pi-2").await.unwrap().is_none());
    }
}
