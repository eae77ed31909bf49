use zk_tracer_proc_macro::TraceRow;

use super::HubEntry;
use crate::callstack::CallStack;
use crate::structlog::ExceptionalHalt;
use crate::trace::{Trace, TraceResult, TraceTable};

#[derive(TraceRow)]
#[trace(module = "hub")]
pub(crate) struct HubRow {
    #[column(width = 4)]
    hub_stamp: u64,
    #[column(width = 4)]
    cn: u64,
    #[column(width = 4)]
    caller_cn: u64,
    #[column(width = 2)]
    depth: usize,
    #[column(width = 4)]
    pc: u64,
    #[column(width = 1)]
    opcode: u8,
    #[column(width = 8)]
    gas_actual: u64,
    #[column(width = 8)]
    gas_cost: u64,
    #[column(width = 8)]
    gas_next: u64,
    #[column(width = 8)]
    refund_counter: u64,
    #[column(width = 1)]
    sux: bool,
    #[column(width = 1)]
    sox: bool,
    #[column(width = 1)]
    oogx: bool,
    #[column(width = 1)]
    mxpx: bool,
    #[column(width = 1)]
    jumpx: bool,
    #[column(width = 1)]
    staticx: bool,
    #[column(width = 1)]
    sstorex: bool,
    #[column(width = 1)]
    icpx: bool,
    #[column(width = 1)]
    maxcsx: bool,
    #[column(width = 1)]
    rdcx: bool,
    #[column(width = 1)]
    opcx: bool,
    #[column(width = 1)]
    mxp_flag: bool,
    #[column(width = 1)]
    stp_flag: bool,
    #[column(width = 1)]
    oob_flag: bool,
    #[column(width = 1)]
    exp_flag: bool,
    #[column(width = 1)]
    mmu_flag: bool,
    #[column(width = 4)]
    mxp_stamp: u64,
    #[column(width = 4)]
    stp_stamp: u64,
    #[column(width = 4)]
    oob_stamp: u64,
    #[column(width = 4)]
    exp_stamp: u64,
    #[column(width = 4)]
    mmu_stamp: u64,
    #[column(width = 1)]
    context_will_revert: bool,
    #[column(width = 4)]
    revert_stamp: u64,
}

impl HubEntry {
    fn row(&self, call_stack: &CallStack) -> HubRow {
        let frame = call_stack.get_by_id(self.frame_id);
        let signals = self.signals;
        let stamps = self.module_stamps;
        HubRow {
            hub_stamp: self.stamp,
            cn: self.context_number,
            caller_cn: self.caller_context_number,
            depth: self.depth,
            pc: self.pc,
            opcode: self.opcode.byte(),
            gas_actual: self.gas_actual,
            gas_cost: self.gas_cost,
            gas_next: self.gas_next,
            refund_counter: self.refund_counter,
            sux: self.has(ExceptionalHalt::StackUnderflow),
            sox: self.has(ExceptionalHalt::StackOverflow),
            oogx: self.has(ExceptionalHalt::OutOfGas),
            mxpx: self.has(ExceptionalHalt::MemoryExpansion),
            jumpx: self.has(ExceptionalHalt::InvalidJumpDestination),
            staticx: self.has(ExceptionalHalt::StaticViolation),
            sstorex: self.has(ExceptionalHalt::OutOfSStore),
            icpx: self.has(ExceptionalHalt::InvalidCodePrefix),
            maxcsx: self.has(ExceptionalHalt::MaxCodeSizeExceeded),
            rdcx: self.has(ExceptionalHalt::ReturnDataOutOfBounds),
            opcx: self.has(ExceptionalHalt::InvalidOpcode),
            mxp_flag: signals.mxp,
            stp_flag: signals.stp,
            oob_flag: signals.oob,
            exp_flag: signals.exp,
            mmu_flag: signals.mmu,
            mxp_stamp: stamps.mxp,
            stp_stamp: stamps.stp,
            oob_stamp: stamps.oob,
            exp_stamp: stamps.exp,
            mmu_stamp: stamps.mmu,
            context_will_revert: frame.will_revert(),
            revert_stamp: frame.revert_stamp().unwrap_or_default(),
        }
    }
}

/// Resolves the revert status of every row against the final call stack.
pub(crate) fn generate_trace(
    ops: &[HubEntry],
    call_stack: &CallStack,
    padding_rows: usize,
) -> TraceResult<TraceTable> {
    let mut trace = Trace::for_row::<HubRow>();
    for op in ops {
        trace.push(&op.row(call_stack))?;
    }
    trace.pad(padding_rows)?;
    trace.build()
}

#[cfg(test)]
mod tests {
    use ethereum_types::U256;

    use super::*;
    use crate::callstack::{CallFrameType, FrameDescriptor};
    use crate::hub::ModuleStamps;
    use crate::imc::ImcSignals;
    use crate::opcode::OpCode;

    fn entry(stamp: u64, frame_id: usize, exception: Option<ExceptionalHalt>) -> HubEntry {
        HubEntry {
            stamp,
            frame_id,
            context_number: 2,
            caller_context_number: 1,
            depth: 0,
            pc: stamp - 1,
            opcode: OpCode::MStore,
            gas_actual: 100,
            gas_cost: 6,
            gas_next: 94,
            refund_counter: 0,
            exception,
            signals: ImcSignals {
                mxp: true,
                mmu: exception.is_none(),
                ..Default::default()
            },
            module_stamps: ModuleStamps {
                mxp: stamp,
                ..Default::default()
            },
        }
    }

    #[test]
    fn revert_status_is_resolved_at_the_end() {
        let mut call_stack = CallStack::default();
        let root = call_stack
            .new_transaction(
                FrameDescriptor::default(),
                FrameDescriptor {
                    frame_type: CallFrameType::Root,
                    context_number: 2,
                    ..Default::default()
                },
            )
            .unwrap();
        let ops = [
            entry(1, root, None),
            entry(2, root, Some(ExceptionalHalt::MemoryExpansion)),
        ];
        call_stack.revert_current(2).unwrap();

        let table = generate_trace(&ops, &call_stack, 2).unwrap();
        assert_eq!(table.row_count(), 4);
        let w = |v: u64| U256::from(v);
        assert_eq!(table.values("hub.CONTEXT_WILL_REVERT")[..2], [w(1), w(1)]);
        assert_eq!(table.value("hub.REVERT_STAMP", 0), Some(w(2)));
        assert_eq!(table.value("hub.MXPX", 1), Some(w(1)));
        assert_eq!(table.value("hub.MMU_FLAG", 1), Some(w(0)));
        assert_eq!(table.value("hub.OPCODE", 0), Some(w(0x52)));
        assert_eq!(table.value("hub.HUB_STAMP", 3), Some(w(0)));
    }

    #[test]
    fn stamps_share_one_width() {
        let table = generate_trace(&[], &CallStack::default(), 0).unwrap();
        let stamps: Vec<_> = table
            .headers()
            .iter()
            .filter(|header| header.name.ends_with("_STAMP") && header.name != "hub.REVERT_STAMP")
            .map(|header| (header.name.as_str(), header.bytes_per_element))
            .collect();
        assert_eq!(
            stamps,
            [
                ("hub.HUB_STAMP", 4),
                ("hub.MXP_STAMP", 4),
                ("hub.STP_STAMP", 4),
                ("hub.OOB_STAMP", 4),
                ("hub.EXP_STAMP", 4),
                ("hub.MMU_STAMP", 4),
            ]
        );
    }
}
