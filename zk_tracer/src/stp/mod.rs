//! Stipend and gas forwarding of the CALL and CREATE families.

pub(crate) mod columns;

use ethereum_types::U256;

use crate::gas::{self, CallGas};
use crate::imc::exo::ExoCalls;
use crate::opcode::OpCode;
use crate::witness::errors::HostError;
use crate::witness::state::{saturating_u64, OperandSnapshot};

/// The computation of the STP module for one CALL or CREATE.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StpCall {
    pub opcode: OpCode,
    /// Gas requested by a call, zero for creates.
    pub gas: U256,
    pub value: U256,
    pub exists: bool,
    pub warm: bool,
    pub gas_actual: u64,
    pub gas_mxp: u64,
    pub gas_upfront: u64,
    /// Gas handed to the child context, stipend excluded.
    pub gas_out_of_pocket: u64,
    pub gas_stipend: u64,
    pub oogx: bool,
    pub exo_calls: ExoCalls,
}

impl StpCall {
    pub fn new(snapshot: &OperandSnapshot) -> Result<Self, HostError> {
        let opcode = snapshot.opcode;
        let projection = gas::project(snapshot)?;
        let gas_actual = snapshot.gas;
        let gas_upfront = projection.upfront();

        let mut call = Self {
            opcode,
            gas: U256::zero(),
            value: U256::zero(),
            exists: false,
            warm: false,
            gas_actual,
            gas_mxp: projection.memory_expansion,
            gas_upfront,
            gas_out_of_pocket: 0,
            gas_stipend: 0,
            oogx: false,
            exo_calls: ExoCalls::new(0),
        };

        if opcode.is_create() {
            call.value = snapshot.stack(0)?;
            let mut exo = ExoCalls::new(2);
            call.oogx = exo.lt(0, gas_actual.into(), gas_upfront.into());
            if !call.oogx {
                let remaining = gas_actual - gas_upfront;
                let one_64th = exo.div(1, remaining.into(), U256::from(64));
                call.gas_out_of_pocket = remaining - one_64th.low_u64();
            }
            call.exo_calls = exo;
            return Ok(call);
        }

        let call_gas = CallGas::new(snapshot, projection.memory_expansion)?;
        call.gas = call_gas.requested;
        call.value = call_gas.value;
        call.exists = call_gas.exists;
        call.warm = call_gas.warm;
        call.gas_stipend = call_gas.stipend;

        let mut exo = ExoCalls::new(4);
        if matches!(opcode, OpCode::Call | OpCode::CallCode) {
            exo.is_zero(0, call.value);
        }
        call.oogx = exo.lt(1, gas_actual.into(), gas_upfront.into());
        if !call.oogx {
            let remaining = gas_actual - gas_upfront;
            let one_64th = exo.div(2, remaining.into(), U256::from(64));
            let allowance = remaining - one_64th.low_u64();
            let requested_fits = exo.lt(3, call.gas, allowance.into());
            call.gas_out_of_pocket = if requested_fits {
                saturating_u64(call.gas)
            } else {
                allowance
            };
        }
        call.exo_calls = exo;
        Ok(call)
    }

    /// Index of the last row of the call.
    pub fn ct_max(&self) -> usize {
        if self.opcode.is_create() {
            1
        } else {
            3
        }
    }
}
