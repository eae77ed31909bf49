use zk_tracer_common::hi_lo;
use zk_tracer_proc_macro::TraceRow;

use super::{ExoModule, MmuCall, MmuInstruction};
use crate::trace::{Trace, TraceResult, TraceTable};

/// An MMU call, stamped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MmuEntry {
    pub(crate) stamp: u64,
    pub(crate) call: MmuCall,
}

/// The macro row of an instruction.
#[derive(TraceRow)]
#[trace(module = "mmu")]
pub(crate) struct MmuRow {
    #[column(width = 4)]
    stamp: u64,
    #[column(width = 2, name = "INST")]
    instruction: u16,
    #[column(width = 4)]
    src_id: u64,
    #[column(width = 4)]
    tgt_id: u64,
    #[column(width = 4)]
    aux_id: u64,
    #[column(width = 16)]
    src_offset_hi: u128,
    #[column(width = 16)]
    src_offset_lo: u128,
    #[column(width = 16)]
    tgt_offset_lo: u128,
    #[column(width = 8)]
    size: u64,
    #[column(width = 8)]
    ref_offset: u64,
    #[column(width = 8)]
    ref_size: u64,
    #[column(width = 1)]
    success_bit: bool,
    #[column(width = 16)]
    limb_1: u128,
    #[column(width = 16)]
    limb_2: u128,
    #[column(width = 4)]
    phase: u16,
    #[column(width = 1)]
    exo_sum: u8,
    #[column(width = 1)]
    exo_is_rom: bool,
    #[column(width = 1)]
    exo_is_kec: bool,
    #[column(width = 1)]
    exo_is_log: bool,
    #[column(width = 1)]
    exo_is_txcd: bool,
    #[column(width = 1)]
    exo_is_ecdata: bool,
    #[column(width = 1)]
    exo_is_ripsha: bool,
    #[column(width = 1)]
    exo_is_blakemodexp: bool,
    #[column(width = 1)]
    is_mload: bool,
    #[column(width = 1)]
    is_mstore: bool,
    #[column(width = 1)]
    is_mstore8: bool,
    #[column(width = 1)]
    is_ram_to_exo_with_padding: bool,
    #[column(width = 1)]
    is_exo_to_ram_transplants: bool,
    #[column(width = 1)]
    is_ram_to_ram_sans_padding: bool,
    #[column(width = 1)]
    is_any_to_ram_with_padding: bool,
}

impl MmuEntry {
    fn row(&self) -> MmuRow {
        let call = &self.call;
        let (src_offset_hi, src_offset_lo) = hi_lo(call.source_offset);
        let is = |instruction: MmuInstruction| call.instruction == instruction;
        MmuRow {
            stamp: self.stamp,
            instruction: call.instruction.code(),
            src_id: call.source_id,
            tgt_id: call.target_id,
            aux_id: call.aux_id,
            src_offset_hi,
            src_offset_lo,
            tgt_offset_lo: hi_lo(call.target_offset).1,
            size: call.size,
            ref_offset: call.reference_offset,
            ref_size: call.reference_size,
            success_bit: call.success_bit,
            limb_1: call.limb_1,
            limb_2: call.limb_2,
            phase: call.phase,
            exo_sum: call.exo_sum,
            exo_is_rom: call.involves(ExoModule::Rom),
            exo_is_kec: call.involves(ExoModule::Kec),
            exo_is_log: call.involves(ExoModule::Log),
            exo_is_txcd: call.involves(ExoModule::Txcd),
            exo_is_ecdata: call.involves(ExoModule::EcData),
            exo_is_ripsha: call.involves(ExoModule::RipSha),
            exo_is_blakemodexp: call.involves(ExoModule::BlakeModexp),
            is_mload: is(MmuInstruction::MLoad),
            is_mstore: is(MmuInstruction::MStore),
            is_mstore8: is(MmuInstruction::MStore8),
            is_ram_to_exo_with_padding: is(MmuInstruction::RamToExoWithPadding),
            is_exo_to_ram_transplants: is(MmuInstruction::ExoToRamTransplants),
            is_ram_to_ram_sans_padding: is(MmuInstruction::RamToRamSansPadding),
            is_any_to_ram_with_padding: is(MmuInstruction::AnyToRamWithPadding),
        }
    }
}

pub(crate) fn generate_trace(ops: &[MmuEntry], padding_rows: usize) -> TraceResult<TraceTable> {
    let mut trace = Trace::for_row::<MmuRow>();
    for op in ops {
        trace.push(&op.row())?;
    }
    trace.pad(padding_rows)?;
    trace.build()
}

#[cfg(test)]
mod tests {
    use ethereum_types::U256;

    use super::*;
    use crate::callstack::MemoryRange;

    #[test]
    fn one_macro_row_per_instruction() {
        let ops = [
            MmuEntry {
                stamp: 1,
                call: MmuCall::precompile_call_data(
                    3,
                    8,
                    MemoryRange::new(32, 64),
                    ExoModule::RipSha,
                    3,
                ),
            },
            MmuEntry {
                stamp: 2,
                call: MmuCall::blake(3, 8, MemoryRange::new(0, 213), 12, 1),
            },
        ];
        let table = generate_trace(&ops, 2).unwrap();
        assert_eq!(table.row_count(), 4);

        let w = |v: u64| U256::from(v);
        assert_eq!(table.value("mmu.INST", 0), Some(w(0xfe20)));
        assert_eq!(table.value("mmu.SRC_OFFSET_LO", 0), Some(w(32)));
        assert_eq!(table.value("mmu.EXO_IS_RIPSHA", 0), Some(w(1)));
        assert_eq!(table.value("mmu.EXO_SUM", 1), Some(w(64)));
        assert_eq!(table.value("mmu.LIMB_1", 1), Some(w(12)));
        assert_eq!(table.value("mmu.IS_RAM_TO_EXO_WITH_PADDING", 1), Some(w(0)));
        assert_eq!(table.value("mmu.INST", 2), Some(w(0)));
    }
}
