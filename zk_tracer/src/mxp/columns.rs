use ethereum_types::U256;
use zk_tracer_common::{hi_lo, words_for};
use zk_tracer_proc_macro::TraceRow;

use super::{MxpCall, MxpType};
use crate::trace::{Trace, TraceResult, TraceTable};

/// An MXP call, stamped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MxpOperation {
    pub(crate) stamp: u64,
    pub(crate) context_number: u64,
    pub(crate) call: MxpCall,
}

#[derive(TraceRow)]
#[trace(module = "mxp")]
pub(crate) struct MxpRow {
    #[column(width = 4)]
    stamp: u64,
    #[column(width = 4, name = "CN")]
    context_number: u64,
    #[column(width = 1)]
    ct: usize,
    #[column(width = 1, name = "INST")]
    instruction: u8,
    #[column(width = 1)]
    mxp_type_1: bool,
    #[column(width = 1)]
    mxp_type_2: bool,
    #[column(width = 1)]
    mxp_type_3: bool,
    #[column(width = 1)]
    mxp_type_4: bool,
    #[column(width = 1)]
    mxp_type_5: bool,
    #[column(width = 8)]
    gbyte: u64,
    #[column(width = 8)]
    gword: u64,
    #[column(width = 1)]
    deploys: bool,
    #[column(width = 16)]
    offset_1_hi: u128,
    #[column(width = 16)]
    offset_1_lo: u128,
    #[column(width = 16)]
    offset_2_hi: u128,
    #[column(width = 16)]
    offset_2_lo: u128,
    #[column(width = 16)]
    size_1_hi: u128,
    #[column(width = 16)]
    size_1_lo: u128,
    #[column(width = 16)]
    size_2_hi: u128,
    #[column(width = 16)]
    size_2_lo: u128,
    #[column(width = 17)]
    max_offset_1: U256,
    #[column(width = 17)]
    max_offset_2: U256,
    #[column(width = 17)]
    max_offset: U256,
    #[column(width = 1)]
    roob: bool,
    #[column(width = 1)]
    noop: bool,
    #[column(width = 1)]
    mxpx: bool,
    #[column(width = 1)]
    comp: bool,
    #[column(width = 17)]
    acc_1: U256,
    #[column(width = 17)]
    acc_2: U256,
    #[column(width = 17)]
    acc_3: U256,
    #[column(width = 17)]
    acc_4: U256,
    #[column(width = 17)]
    acc_a: U256,
    #[column(width = 1)]
    byte_1: u8,
    #[column(width = 1)]
    byte_2: u8,
    #[column(width = 1)]
    byte_3: u8,
    #[column(width = 1)]
    byte_4: u8,
    #[column(width = 1)]
    byte_a: u8,
    #[column(width = 8)]
    words: u64,
    #[column(width = 8)]
    words_new: u64,
    #[column(width = 8)]
    c_mem: u64,
    #[column(width = 8)]
    c_mem_new: u64,
    #[column(width = 8)]
    quad_cost: u64,
    #[column(width = 8)]
    lin_cost: u64,
    #[column(width = 8)]
    gas_mxp: u64,
    #[column(width = 1)]
    expands: bool,
    #[column(width = 1)]
    mtntop: bool,
    #[column(width = 1)]
    size_1_nonzero_no_mxpx: bool,
    #[column(width = 1)]
    size_2_nonzero_no_mxpx: bool,
}

/// Byte decomposition of a value over the rows of a computation: on row `i`,
/// the accumulator holds the first `i + 1` of its last `rows` bytes.
struct Accumulator {
    bytes: [u8; 32],
    rows: usize,
}

impl Accumulator {
    fn new(value: U256, rows: usize) -> Self {
        let mut bytes = [0; 32];
        value.to_big_endian(&mut bytes);
        Self { bytes, rows }
    }

    fn at(&self, i: usize) -> (U256, u8) {
        let tail = &self.bytes[32 - self.rows..];
        (U256::from_big_endian(&tail[..=i]), tail[i])
    }
}

/// Values decomposed by the byte accumulators.
struct Accumulated {
    acc_1: U256,
    acc_2: U256,
    acc_3: U256,
    acc_4: U256,
    acc_a: U256,
}

impl Accumulated {
    fn of(call: &MxpCall) -> Self {
        let zero = U256::zero();
        let two_pow_32 = U256::from(1u64 << 32);
        let (acc_1, acc_2) = match (call.roob, call.mxpx) {
            (true, _) => (zero, zero),
            (false, true) if call.max_offset_1 >= two_pow_32 => {
                (call.max_offset_1 - two_pow_32, zero)
            }
            (false, true) => (zero, call.max_offset_2.saturating_sub(two_pow_32)),
            (false, false) => (call.max_offset_1, call.max_offset_2),
        };
        let acc_3 = if call.comp() {
            call.max_offset_1 - call.max_offset_2
        } else {
            call.max_offset_2 - call.max_offset_1 - 1
        };
        let non_trivial = !call.is_trivial() && !call.mxpx;
        let acc_a = if non_trivial {
            U256::from(words_for(call.max_offset.low_u64() + 1))
        } else {
            zero
        };
        let acc_4 = match (non_trivial, call.expands) {
            (false, _) => zero,
            (true, true) => acc_a - call.words - 1,
            (true, false) => U256::from(call.words) - acc_a,
        };
        Self {
            acc_1,
            acc_2,
            acc_3,
            acc_4,
            acc_a,
        }
    }
}

impl MxpOperation {
    pub(crate) fn row_count(&self) -> usize {
        self.call.ct_max() + 1
    }

    fn write_rows(&self, trace: &mut Trace) -> TraceResult<()> {
        let call = &self.call;
        let rows = self.row_count();
        let accumulated = Accumulated::of(call);
        let [acc_1, acc_2, acc_3, acc_4, acc_a] = [
            accumulated.acc_1,
            accumulated.acc_2,
            accumulated.acc_3,
            accumulated.acc_4,
            accumulated.acc_a,
        ]
        .map(|value| Accumulator::new(value, rows));

        let (offset_1_hi, offset_1_lo) = hi_lo(call.offset_1);
        let (offset_2_hi, offset_2_lo) = hi_lo(call.offset_2);
        let (size_1_hi, size_1_lo) = hi_lo(call.size_1);
        let (size_2_hi, size_2_lo) = hi_lo(call.size_2);

        for ct in 0..rows {
            let (acc_1, byte_1) = acc_1.at(ct);
            let (acc_2, byte_2) = acc_2.at(ct);
            let (acc_3, byte_3) = acc_3.at(ct);
            let (acc_4, byte_4) = acc_4.at(ct);
            let (acc_a, byte_a) = acc_a.at(ct);
            trace.push(&MxpRow {
                stamp: self.stamp,
                context_number: self.context_number,
                ct,
                instruction: call.opcode.byte(),
                mxp_type_1: call.mxp_type == MxpType::Type1,
                mxp_type_2: call.mxp_type == MxpType::Type2,
                mxp_type_3: call.mxp_type == MxpType::Type3,
                mxp_type_4: call.mxp_type == MxpType::Type4,
                mxp_type_5: call.mxp_type == MxpType::Type5,
                gbyte: call.billing.per_byte(),
                gword: call.billing.per_word(),
                deploys: call.deploys,
                offset_1_hi,
                offset_1_lo,
                offset_2_hi,
                offset_2_lo,
                size_1_hi,
                size_1_lo,
                size_2_hi,
                size_2_lo,
                max_offset_1: call.max_offset_1,
                max_offset_2: call.max_offset_2,
                max_offset: call.max_offset,
                roob: call.roob,
                noop: call.noop,
                mxpx: call.mxpx,
                comp: call.comp(),
                acc_1,
                acc_2,
                acc_3,
                acc_4,
                acc_a,
                byte_1,
                byte_2,
                byte_3,
                byte_4,
                byte_a,
                words: call.words,
                words_new: call.words_new,
                c_mem: call.c_mem,
                c_mem_new: call.c_mem_new,
                quad_cost: call.quad_cost,
                lin_cost: call.lin_cost,
                gas_mxp: call.gas_mxp,
                expands: call.expands,
                mtntop: call.mtntop(),
                size_1_nonzero_no_mxpx: call.size_1_nonzero_no_mxpx(),
                size_2_nonzero_no_mxpx: call.size_2_nonzero_no_mxpx(),
            })?;
        }
        Ok(())
    }
}

pub(crate) fn generate_trace(ops: &[MxpOperation], padding_rows: usize) -> TraceResult<TraceTable> {
    let mut trace = Trace::for_row::<MxpRow>();
    for op in ops {
        op.write_rows(&mut trace)?;
    }
    trace.pad(padding_rows)?;
    trace.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::OpCode;
    use crate::witness::state::OperandSnapshot;

    fn operation(opcode: OpCode, stack_top_first: &[u64]) -> MxpOperation {
        let snapshot = OperandSnapshot {
            opcode,
            stack: stack_top_first.iter().rev().map(|v| U256::from(*v)).collect(),
            ..Default::default()
        };
        MxpOperation {
            stamp: 1,
            context_number: 2,
            call: MxpCall::new(&snapshot).unwrap(),
        }
    }

    #[test]
    fn rows_follow_the_execution_path() {
        let ops = [
            operation(OpCode::MStore, &[0x1234, 0]),
            operation(OpCode::MStore8, &[1 << 33, 0]),
            operation(OpCode::MSize, &[]),
        ];
        let table = generate_trace(&ops, 2).unwrap();
        assert_eq!(table.row_count(), 4 + 17 + 1 + 2);

        let w = |v: u64| U256::from(v);
        // 0x1234 + 31 = 0x1253 spread over the last 4 bytes.
        let acc_1 = table.values("mxp.ACC_1");
        assert_eq!(&acc_1[..4], &[w(0), w(0), w(0x12), w(0x1253)]);
        assert_eq!(table.value("mxp.BYTE_1", 3), Some(w(0x53)));

        // mxpx rows decompose the excess over 2^32.
        assert_eq!(table.value("mxp.ACC_1", 4 + 16), Some(w(1 << 32)));
        assert_eq!(table.value("mxp.MXPX", 4), Some(w(1)));
        assert_eq!(table.value("mxp.NOOP", 21), Some(w(1)));
        assert_eq!(table.value("mxp.STAMP", 22), Some(w(0)));
    }
}
