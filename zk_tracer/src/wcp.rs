//! Word comparisons requested by other modules.
//!
//! The OOB and STP modules, and the hash-data module, justify their
//! booleans through lookups into this table: one row per comparison.

use ethereum_types::U256;
use zk_tracer_common::hi_lo;

use crate::trace::{Trace, TraceResult, TraceTable};

/// A comparison instruction, identified by its EVM opcode byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WcpInstruction {
    Lt,
    Gt,
    Eq,
    IsZero,
}

impl WcpInstruction {
    pub const fn byte(self) -> u8 {
        match self {
            Self::Lt => 0x10,
            Self::Gt => 0x11,
            Self::Eq => 0x14,
            Self::IsZero => 0x15,
        }
    }

    /// Evaluates the comparison. `IsZero` ignores its second argument.
    pub fn eval(self, arg_1: U256, arg_2: U256) -> bool {
        match self {
            Self::Lt => arg_1 < arg_2,
            Self::Gt => arg_1 > arg_2,
            Self::Eq => arg_1 == arg_2,
            Self::IsZero => arg_1.is_zero(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct WcpOperation {
    pub(crate) stamp: u64,
    pub(crate) instruction: WcpInstruction,
    pub(crate) arg_1: U256,
    pub(crate) arg_2: U256,
    pub(crate) result: bool,
}

impl WcpOperation {
    pub(crate) fn new(stamp: u64, instruction: WcpInstruction, arg_1: U256, arg_2: U256) -> Self {
        let arg_2 = match instruction {
            WcpInstruction::IsZero => U256::zero(),
            _ => arg_2,
        };
        Self {
            stamp,
            instruction,
            arg_1,
            arg_2,
            result: instruction.eval(arg_1, arg_2),
        }
    }
}

pub(crate) mod columns {
    use zk_tracer_proc_macro::TraceRow;

    #[derive(TraceRow)]
    #[trace(module = "wcp")]
    pub(crate) struct WcpRow {
        #[column(width = 4, name = "WORD_COMPARISON_STAMP")]
        pub(crate) stamp: u64,
        #[column(width = 1, name = "INST")]
        pub(crate) instruction: u8,
        #[column(width = 16, name = "ARGUMENT_1_HI")]
        pub(crate) arg_1_hi: u128,
        #[column(width = 16, name = "ARGUMENT_1_LO")]
        pub(crate) arg_1_lo: u128,
        #[column(width = 16, name = "ARGUMENT_2_HI")]
        pub(crate) arg_2_hi: u128,
        #[column(width = 16, name = "ARGUMENT_2_LO")]
        pub(crate) arg_2_lo: u128,
        #[column(width = 1)]
        pub(crate) result: bool,
        #[column(width = 1)]
        pub(crate) is_lt: bool,
        #[column(width = 1)]
        pub(crate) is_gt: bool,
        #[column(width = 1)]
        pub(crate) is_eq: bool,
        #[column(width = 1)]
        pub(crate) is_iszero: bool,
    }
}

pub(crate) fn generate_trace(ops: &[WcpOperation], padding_rows: usize) -> TraceResult<TraceTable> {
    let mut trace = Trace::for_row::<columns::WcpRow>();
    for op in ops {
        let (arg_1_hi, arg_1_lo) = hi_lo(op.arg_1);
        let (arg_2_hi, arg_2_lo) = hi_lo(op.arg_2);
        trace.push(&columns::WcpRow {
            stamp: op.stamp,
            instruction: op.instruction.byte(),
            arg_1_hi,
            arg_1_lo,
            arg_2_hi,
            arg_2_lo,
            result: op.result,
            is_lt: op.instruction == WcpInstruction::Lt,
            is_gt: op.instruction == WcpInstruction::Gt,
            is_eq: op.instruction == WcpInstruction::Eq,
            is_iszero: op.instruction == WcpInstruction::IsZero,
        })?;
    }
    trace.pad(padding_rows)?;
    trace.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_row_per_comparison() {
        let ops = [
            WcpOperation::new(1, WcpInstruction::Lt, 3.into(), 5.into()),
            WcpOperation::new(2, WcpInstruction::IsZero, U256::MAX, 9.into()),
        ];
        assert!(ops[0].result);
        assert!(!ops[1].result);
        assert_eq!(ops[1].arg_2, U256::zero());

        let table = generate_trace(&ops, 2).unwrap();
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.value("wcp.ARGUMENT_1_HI", 1), Some(U256::from(u128::MAX)));
        assert_eq!(table.value("wcp.INST", 1), Some(U256::from(0x15)));
        assert_eq!(table.values("wcp.RESULT"), vec![1.into(), 0.into(), 0.into(), 0.into()]);
    }
}
