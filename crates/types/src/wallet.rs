use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who operates the sending wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletRole {
    /// An autonomous agent acting without a human in the loop
    Agent,
    /// An end user who may be asked to sign
    User,
}

/// Whether the platform holds the keys or the wallet owner does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustodyType {
    /// Platform-managed wallet; the execution backend can sign on its behalf
    PlatformManaged,
    /// Self-custodied wallet; only the owner can produce a signature
    SelfCustodied,
}

/// Custody binding of a payment intent, set once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBinding {
    pub role: WalletRole,
    pub custody: CustodyType,
    /// Opaque wallet handle understood by the execution backend
    pub reference: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CustodyError {
    #[error(
        "agent wallets must be platform-managed: self-custodied wallets require human signing \
         and cannot be driven autonomously (wallet reference: {reference})"
    )]
    AgentSelfCustodied { reference: String },
}

impl WalletBinding {
    pub fn new(role: WalletRole, custody: CustodyType, reference: impl Into<String>) -> Self {
        Self {
            role,
            custody,
            reference: reference.into(),
        }
    }

    /// Infer custody from the wallet reference shape. Used once, at intent
    /// creation, when the caller did not state the custody type explicitly.
    /// A bare chain address (`0x` + 40 hex chars) can only be self-custodied;
    /// anything else is a platform wallet handle.
    pub fn infer(role: WalletRole, reference: impl Into<String>) -> Self {
        let reference = reference.into();
        let custody = if looks_like_chain_address(&reference) {
            CustodyType::SelfCustodied
        } else {
            CustodyType::PlatformManaged
        };
        Self {
            role,
            custody,
            reference,
        }
    }

    /// Enforce the custody invariant: role=agent requires platform custody.
    pub fn validate(&self) -> Result<(), CustodyError> {
        if self.role == WalletRole::Agent && self.custody == CustodyType::SelfCustodied {
            return Err(CustodyError::AgentSelfCustodied {
                reference: self.reference.clone(),
            });
        }
        Ok(())
    }

    /// True when the execution backend can move funds without a human signature.
    pub fn is_autonomous(&self) -> bool {
        self.custody == CustodyType::PlatformManaged
    }
}

fn looks_like_chain_address(reference: &str) -> bool {
    reference.len() == 42
        && reference.starts_with("0x")
        && reference[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_platform_managed_is_valid() {
        let binding = WalletBinding::new(WalletRole::Agent, CustodyType::PlatformManaged, "w-1");
        assert!(binding.validate().is_ok());
        assert!(binding.is_autonomous());
    }

    #[test]
    fn test_agent_self_custodied_is_rejected() {
        let binding = WalletBinding::new(WalletRole::Agent, CustodyType::SelfCustodied, "0xabc");
        assert!(matches!(
            binding.validate(),
            Err(CustodyError::AgentSelfCustodied { .. })
        ));
    }

    #[test]
    fn test_user_self_custodied_is_valid_but_not_autonomous() {
        let binding = WalletBinding::new(WalletRole::User, CustodyType::SelfCustodied, "0xabc");
        assert!(binding.validate().is_ok());
        assert!(!binding.is_autonomous());
    }

    #[test]
    fn test_infer_from_chain_address() {
        let addr = format!("0x{}", "ab".repeat(20));
        let binding = WalletBinding::infer(WalletRole::User, addr);
        assert_eq!(binding.custody, CustodyType::SelfCustodied);

        let binding = WalletBinding::infer(WalletRole::Agent, "wallet-1234");
        assert_eq!(binding.custody, CustodyType::PlatformManaged);
    }
}
