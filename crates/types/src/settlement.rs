use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Audit-trail settlement record kept alongside each intent.
///
/// A zero-value placeholder is written at intent creation so the payment is
/// auditable before any funds move; the record is filled in once execution
/// produces artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub id: String,
    pub intent_id: String,
    /// Zero until execution settles an actual amount
    pub amount: Decimal,
    pub currency: String,
    pub tx_hash: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl SettlementRecord {
    /// The zero-value placeholder written at intent creation.
    pub fn placeholder(intent_id: impl Into<String>, currency: impl Into<String>, now: u64) -> Self {
        let intent_id = intent_id.into();
        Self {
            id: format!("stl-{intent_id}"),
            intent_id,
            amount: Decimal::ZERO,
            currency: currency.into(),
            tx_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fill the record in after a successful execution.
    pub fn settled(mut self, amount: Decimal, tx_hash: Option<String>, now: u64) -> Self {
        self.amount = amount;
        self.tx_hash = tx_hash;
        self.updated_at = now;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_zero_value() {
        let record = SettlementRecord::placeholder("pi-1", "USD", 100);
        assert_eq!(record.amount, Decimal::ZERO);
        assert_eq!(record.intent_id, "pi-1");
        assert!(record.tx_hash.is_none());
    }

    #[test]
    fn test_settled_fills_in_amount_and_hash() {
        let record = SettlementRecord::placeholder("pi-1", "USD", 100)
            .settled(Decimal::new(50, 0), Some("0xhash".to_string()), 200);
        assert_eq!(record.amount, Decimal::new(50, 0));
        assert_eq!(record.tx_hash.as_deref(), Some("0xhash"));
        assert_eq!(record.updated_at, 200);
        assert_eq!(record.created_at, 100);
    }
}
