use payguard_types::{CustodyType, WalletBinding, WalletRole};

use crate::error::EngineError;

/// How a payment reaches the chain, decided purely from the wallet binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionRoute {
    /// The execution backend signs and submits on the platform's keys
    Autonomous,
    /// The wallet owner must sign out of band before funds can move
    ManualSignature,
}

/// Decide the execution route for a wallet binding.
///
/// The decision table is total over role and custody:
///
/// | role  | custody          | route                       |
/// |-------|------------------|-----------------------------|
/// | agent | platform-managed | autonomous                  |
/// | user  | platform-managed | autonomous                  |
/// | user  | self-custodied   | manual signature            |
/// | agent | self-custodied   | error, never reaches backend|
pub fn route(binding: &WalletBinding) -> Result<ExecutionRoute, EngineError> {
    match (binding.role, binding.custody) {
        (_, CustodyType::PlatformManaged) => Ok(ExecutionRoute::Autonomous),
        (WalletRole::User, CustodyType::SelfCustodied) => Ok(ExecutionRoute::ManualSignature),
        (WalletRole::Agent, CustodyType::SelfCustodied) => Err(EngineError::CustodyViolation {
            reason: format!(
                "agent wallet {} is self-custodied; autonomous execution is impossible",
                binding.reference
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_table_is_total() {
        let agent_platform =
            WalletBinding::new(WalletRole::Agent, CustodyType::PlatformManaged, "w-1");
        assert_eq!(route(&agent_platform).unwrap(), ExecutionRoute::Autonomous);

        let user_platform =
            WalletBinding::new(WalletRole::User, CustodyType::PlatformManaged, "w-2");
        assert_eq!(route(&user_platform).unwrap(), ExecutionRoute::Autonomous);

        let user_self = WalletBinding::new(WalletRole::User, CustodyType::SelfCustodied, "0xabc");
        assert_eq!(route(&user_self).unwrap(), ExecutionRoute::ManualSignature);

        let agent_self = WalletBinding::new(WalletRole::Agent, CustodyType::SelfCustodied, "0xdef");
        assert!(matches!(
            route(&agent_self),
            Err(EngineError::CustodyViolation { .. })
        ));
    }
}
