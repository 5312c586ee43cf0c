use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CustodyError, WalletBinding};

/// Caller input for creating a payment intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default)]
    pub recipient_label: String,

    pub recipient_address: String,

    pub chain: String,

    /// Destination chain for cross-chain payments; same-chain when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_chain: Option<String>,

    pub from_wallet: WalletBinding,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("amount must be positive, got {amount}")]
    NonPositiveAmount { amount: String },

    #[error("recipient address is required")]
    MissingRecipientAddress,

    #[error("target chain is required")]
    MissingChain,

    #[error("wallet reference is required")]
    MissingWalletReference,

    #[error(transparent)]
    Custody(#[from] CustodyError),
}

impl PaymentRequest {
    /// Validate the request's required fields and the custody invariant.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.amount <= Decimal::ZERO {
            return Err(RequestError::NonPositiveAmount {
                amount: self.amount.to_string(),
            });
        }
        if self.recipient_address.trim().is_empty() {
            return Err(RequestError::MissingRecipientAddress);
        }
        if self.chain.trim().is_empty() {
            return Err(RequestError::MissingChain);
        }
        if self.from_wallet.reference.trim().is_empty() {
            return Err(RequestError::MissingWalletReference);
        }
        self.from_wallet.validate()?;
        Ok(())
    }

    pub fn is_cross_chain(&self) -> bool {
        self.destination_chain
            .as_deref()
            .is_some_and(|dest| dest != self.chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CustodyType, WalletRole};

    fn valid_request() -> PaymentRequest {
        PaymentRequest {
            amount: Decimal::new(1050, 2),
            currency: "USD".to_string(),
            recipient_label: "Vendor".to_string(),
            recipient_address: "0xdeadbeef".to_string(),
            chain: "BASE".to_string(),
            destination_chain: None,
            from_wallet: WalletBinding::new(
                WalletRole::Agent,
                CustodyType::PlatformManaged,
                "wallet-1",
            ),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let mut req = valid_request();
        req.amount = Decimal::ZERO;
        assert!(matches!(
            req.validate(),
            Err(RequestError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut req = valid_request();
        req.amount = Decimal::new(-5, 0);
        assert!(matches!(
            req.validate(),
            Err(RequestError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn test_missing_recipient_rejected() {
        let mut req = valid_request();
        req.recipient_address = "  ".to_string();
        assert_eq!(req.validate(), Err(RequestError::MissingRecipientAddress));
    }

    #[test]
    fn test_missing_chain_rejected() {
        let mut req = valid_request();
        req.chain = String::new();
        assert_eq!(req.validate(), Err(RequestError::MissingChain));
    }

    #[test]
    fn test_agent_self_custodied_rejected_at_request_level() {
        let mut req = valid_request();
        req.from_wallet =
            WalletBinding::new(WalletRole::Agent, CustodyType::SelfCustodied, "0xabc");
        assert!(matches!(req.validate(), Err(RequestError::Custody(_))));
    }
}
