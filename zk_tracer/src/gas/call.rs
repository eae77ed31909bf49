use ethereum_types::U256;
use zk_tracer_common::gas::{G_CALL_STIPEND, G_CALL_VALUE, G_NEW_ACCOUNT};

use super::access_cost;
use crate::opcode::OpCode;
use crate::witness::errors::HostError;
use crate::witness::state::{saturating_u64, OperandSnapshot};

/// All but one 64th of `gas` (EIP-150).
pub const fn all_but_one_64th(gas: u64) -> u64 {
    gas - gas / 64
}

/// Operand-dependent costs of the CALL family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallGas {
    /// Gas the caller asks to forward.
    pub requested: U256,
    pub value: U256,
    /// Whether the callee exists. CALLCODE and DELEGATECALL run code in the
    /// caller's account, which always exists.
    pub exists: bool,
    pub warm: bool,
    pub access: u64,
    pub value_transfer: u64,
    pub account_creation: u64,
    pub stipend: u64,
    pub memory_expansion: u64,
}

impl CallGas {
    pub fn new(snapshot: &OperandSnapshot, memory_expansion: u64) -> Result<Self, HostError> {
        let opcode = snapshot.opcode;
        let callee = snapshot.account()?;
        let requested = snapshot.stack(0)?;
        let value = match opcode {
            OpCode::Call | OpCode::CallCode => snapshot.stack(2)?,
            _ => U256::zero(),
        };
        let exists = match opcode {
            OpCode::CallCode | OpCode::DelegateCall => true,
            _ => callee.exists,
        };
        let transfers_value = !value.is_zero();

        Ok(Self {
            requested,
            value,
            exists,
            warm: callee.warm,
            access: access_cost(callee.warm),
            value_transfer: if transfers_value { G_CALL_VALUE } else { 0 },
            account_creation: if opcode == OpCode::Call && transfers_value && !exists {
                G_NEW_ACCOUNT
            } else {
                0
            },
            stipend: if transfers_value { G_CALL_STIPEND } else { 0 },
            memory_expansion,
        })
    }

    pub fn upfront(&self) -> u64 {
        [
            self.value_transfer,
            self.account_creation,
            self.memory_expansion,
        ]
        .into_iter()
        .fold(self.access, u64::saturating_add)
    }

    /// Gas forwarded to the callee, stipend excluded: the requested gas,
    /// capped by all but one 64th of what remains once the upfront cost is
    /// paid. Nothing is forwarded when the upfront cost cannot be paid.
    pub fn child_allowance(&self, gas_actual: u64, upfront: u64) -> u64 {
        match gas_actual.checked_sub(upfront) {
            Some(remaining) => all_but_one_64th(remaining).min(saturating_u64(self.requested)),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::project;
    use crate::structlog::AccountFacts;

    fn call(opcode: OpCode, gas: u64, value: u64, callee: AccountFacts) -> OperandSnapshot {
        let mut stack = vec![
            U256::from(gas),
            U256::from(0xca11ee_u64),
            U256::from(value),
            U256::zero(),
            U256::zero(),
            U256::zero(),
            U256::zero(),
        ];
        if !matches!(opcode, OpCode::Call | OpCode::CallCode) {
            stack.remove(2);
        }
        stack.reverse();
        OperandSnapshot {
            opcode,
            stack,
            gas: 100_000,
            account: Some(callee),
            ..Default::default()
        }
    }

    const COLD_MISSING: AccountFacts = AccountFacts {
        exists: false,
        warm: false,
        balance: U256::zero(),
        nonce: 0,
        has_code: false,
        code_size: 0,
    };

    const WARM_EXISTING: AccountFacts = AccountFacts {
        exists: true,
        warm: true,
        ..COLD_MISSING
    };

    #[test]
    fn requested_gas_is_capped() {
        assert_eq!(all_but_one_64th(6400), 6300);
        let gas = CallGas::new(&call(OpCode::Call, 1 << 40, 0, WARM_EXISTING), 0).unwrap();
        assert_eq!(gas.child_allowance(100_000, 100), all_but_one_64th(99_900));
        assert_eq!(gas.child_allowance(99, 100), 0);
    }

    #[test]
    fn value_to_a_cold_new_account() {
        let projection = project(&call(OpCode::Call, 5000, 1, COLD_MISSING)).unwrap();
        assert_eq!(projection.access, 2600);
        assert_eq!(projection.value_transfer, 9000);
        assert_eq!(projection.account_creation, 25000);
        assert_eq!(projection.stipend, 2300);
        assert_eq!(projection.upfront(), 36600);
        assert_eq!(projection.total(), 36600 + 5000);
    }

    #[test]
    fn value_to_a_warm_existing_account() {
        let projection = project(&call(OpCode::Call, 5000, 1, WARM_EXISTING)).unwrap();
        assert_eq!(projection.upfront(), 100 + 9000);
        assert_eq!(projection.child_allowance, 5000);
        assert_eq!(projection.total(), 14100);
    }

    #[test]
    fn callcode_never_creates_accounts() {
        let projection = project(&call(OpCode::CallCode, 5000, 1, COLD_MISSING)).unwrap();
        assert_eq!(projection.account_creation, 0);
        assert_eq!(projection.upfront(), 2600 + 9000);
    }

    #[test]
    fn static_and_delegate_calls_carry_no_value() {
        for opcode in [OpCode::StaticCall, OpCode::DelegateCall] {
            let projection = project(&call(opcode, 5000, 0, COLD_MISSING)).unwrap();
            assert_eq!(projection.upfront(), 2600, "{opcode}");
            assert_eq!(projection.stipend, 0);
            assert_eq!(projection.total(), 7600);
        }
    }

    #[test]
    fn out_of_gas_forwards_nothing() {
        let mut snapshot = call(OpCode::Call, 5000, 0, COLD_MISSING);
        snapshot.gas = 2000;
        let projection = project(&snapshot).unwrap();
        assert_eq!(projection.child_allowance, 0);
        assert_eq!(projection.total(), 2600);
    }
}
