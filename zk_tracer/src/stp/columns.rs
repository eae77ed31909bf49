use zk_tracer_common::hi_lo;
use zk_tracer_proc_macro::TraceRow;

use super::StpCall;
use crate::opcode::OpCode;
use crate::trace::{Trace, TraceResult, TraceTable};

/// An STP call, stamped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StpEntry {
    pub(crate) stamp: u64,
    pub(crate) call: StpCall,
}

#[derive(TraceRow)]
#[trace(module = "stp")]
pub(crate) struct StpRow {
    #[column(width = 4)]
    stamp: u64,
    #[column(width = 1)]
    ct: usize,
    #[column(width = 1)]
    ct_max: usize,
    #[column(width = 1)]
    instruction: u8,
    #[column(width = 1)]
    is_create: bool,
    #[column(width = 1)]
    is_create2: bool,
    #[column(width = 1)]
    is_call: bool,
    #[column(width = 1)]
    is_callcode: bool,
    #[column(width = 1)]
    is_delegatecall: bool,
    #[column(width = 1)]
    is_staticcall: bool,
    #[column(width = 16)]
    gas_hi: u128,
    #[column(width = 16)]
    gas_lo: u128,
    #[column(width = 16)]
    val_hi: u128,
    #[column(width = 16)]
    val_lo: u128,
    #[column(width = 1)]
    exists: bool,
    #[column(width = 1)]
    warm: bool,
    #[column(width = 8)]
    gas_actual: u64,
    #[column(width = 8)]
    gas_mxp: u64,
    #[column(width = 8)]
    gas_upfront: u64,
    #[column(width = 8)]
    gas_out_of_pocket: u64,
    #[column(width = 8)]
    gas_stipend: u64,
    #[column(width = 1)]
    out_of_gas_exception: bool,
    #[column(width = 1)]
    wcp_flag: bool,
    #[column(width = 1)]
    mod_flag: bool,
    #[column(width = 1)]
    exogenous_module_instruction: u8,
    #[column(width = 16)]
    arg_1_hi: u128,
    #[column(width = 16)]
    arg_1_lo: u128,
    #[column(width = 16)]
    arg_2_lo: u128,
    #[column(width = 16)]
    res_lo: u128,
}

impl StpEntry {
    fn write_rows(&self, trace: &mut Trace) -> TraceResult<()> {
        let call = &self.call;
        let (gas_hi, gas_lo) = hi_lo(call.gas);
        let (val_hi, val_lo) = hi_lo(call.value);
        for ct in 0..=call.ct_max() {
            let exo = call.exo_calls.get(ct);
            let (arg_1_hi, arg_1_lo) = exo.map_or((0, 0), |exo| hi_lo(exo.arg_1));
            trace.push(&StpRow {
                stamp: self.stamp,
                ct,
                ct_max: call.ct_max(),
                instruction: call.opcode.byte(),
                is_create: call.opcode == OpCode::Create,
                is_create2: call.opcode == OpCode::Create2,
                is_call: call.opcode == OpCode::Call,
                is_callcode: call.opcode == OpCode::CallCode,
                is_delegatecall: call.opcode == OpCode::DelegateCall,
                is_staticcall: call.opcode == OpCode::StaticCall,
                gas_hi,
                gas_lo,
                val_hi,
                val_lo,
                exists: call.exists,
                warm: call.warm,
                gas_actual: call.gas_actual,
                gas_mxp: call.gas_mxp,
                gas_upfront: call.gas_upfront,
                gas_out_of_pocket: call.gas_out_of_pocket,
                gas_stipend: call.gas_stipend,
                out_of_gas_exception: call.oogx,
                wcp_flag: exo.is_some_and(|exo| exo.wcp().is_some()),
                mod_flag: exo.is_some_and(|exo| exo.is_mod()),
                exogenous_module_instruction: exo.map_or(0, |exo| exo.instruction.byte()),
                arg_1_hi,
                arg_1_lo,
                arg_2_lo: exo.map_or(0, |exo| exo.arg_2.low_u128()),
                res_lo: exo.map_or(0, |exo| exo.result.low_u128()),
            })?;
        }
        Ok(())
    }
}

pub(crate) fn generate_trace(ops: &[StpEntry], padding_rows: usize) -> TraceResult<TraceTable> {
    let mut trace = Trace::for_row::<StpRow>();
    for op in ops {
        op.write_rows(&mut trace)?;
    }
    trace.pad(padding_rows)?;
    trace.build()
}
