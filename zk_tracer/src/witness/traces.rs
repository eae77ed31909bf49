use crate::callstack::CallStack;
use crate::exp::columns::ExpEntry;
use crate::generation::state::Stamps;
use crate::hash_data::{self, HashDataOperation};
use crate::hub::columns as hub_columns;
use crate::hub::{HubEntry, ModuleStamps};
use crate::imc::exo::ExoCall;
use crate::imc::ImcFragment;
use crate::mmu::columns::MmuEntry;
use crate::mxp::columns::MxpOperation;
use crate::oob::columns::OobEntry;
use crate::stp::columns::StpEntry;
use crate::trace::{TraceResult, TraceTable};
use crate::wcp::{self, WcpOperation};
use crate::{exp, mmu, mxp, oob, stp};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TraceCheckpoint {
    pub(self) hub_len: usize,
    pub(self) mxp_len: usize,
    pub(self) stp_len: usize,
    pub(self) oob_len: usize,
    pub(self) exp_len: usize,
    pub(self) mmu_len: usize,
    pub(self) hash_data_len: usize,
    pub(self) wcp_len: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Traces {
    pub(crate) hub: Vec<HubEntry>,
    pub(crate) mxp_ops: Vec<MxpOperation>,
    pub(crate) stp_ops: Vec<StpEntry>,
    pub(crate) oob_ops: Vec<OobEntry>,
    pub(crate) exp_ops: Vec<ExpEntry>,
    pub(crate) mmu_ops: Vec<MmuEntry>,
    pub(crate) hash_data_ops: Vec<HashDataOperation>,
    pub(crate) wcp_ops: Vec<WcpOperation>,
}

impl Traces {
    pub(crate) const fn new() -> Self {
        Traces {
            hub: vec![],
            mxp_ops: vec![],
            stp_ops: vec![],
            oob_ops: vec![],
            exp_ops: vec![],
            mmu_ops: vec![],
            hash_data_ops: vec![],
            wcp_ops: vec![],
        }
    }

    /// Returns the number of rows of each table, before padding.
    //  Uses a `TraceCheckpoint` as return object for convenience.
    pub(crate) fn get_lengths(&self) -> TraceCheckpoint {
        TraceCheckpoint {
            hub_len: self.hub.len(),
            mxp_len: self.mxp_ops.iter().map(MxpOperation::row_count).sum(),
            stp_len: self.stp_ops.iter().map(|op| op.call.ct_max() + 1).sum(),
            oob_len: self.oob_ops.iter().map(|op| op.operation.row_count()).sum(),
            exp_len: self
                .exp_ops
                .iter()
                .map(|op| 1 + op.operation.call.preprocessing_rows() + 16)
                .sum(),
            mmu_len: self.mmu_ops.len(),
            hash_data_len: self
                .hash_data_ops
                .iter()
                .map(|op| op.data_rows() + 2)
                .sum(),
            wcp_len: self.wcp_ops.len(),
        }
    }

    /// Returns the number of operations for each table.
    pub(crate) fn checkpoint(&self) -> TraceCheckpoint {
        TraceCheckpoint {
            hub_len: self.hub.len(),
            mxp_len: self.mxp_ops.len(),
            stp_len: self.stp_ops.len(),
            oob_len: self.oob_ops.len(),
            exp_len: self.exp_ops.len(),
            mmu_len: self.mmu_ops.len(),
            hash_data_len: self.hash_data_ops.len(),
            wcp_len: self.wcp_ops.len(),
        }
    }

    pub(crate) fn rollback(&mut self, checkpoint: TraceCheckpoint) {
        self.hub.truncate(checkpoint.hub_len);
        self.mxp_ops.truncate(checkpoint.mxp_len);
        self.stp_ops.truncate(checkpoint.stp_len);
        self.oob_ops.truncate(checkpoint.oob_len);
        self.exp_ops.truncate(checkpoint.exp_len);
        self.mmu_ops.truncate(checkpoint.mmu_len);
        self.hash_data_ops.truncate(checkpoint.hash_data_len);
        self.wcp_ops.truncate(checkpoint.wcp_len);
    }

    /// Records the comparisons of a module operation, in row order.
    fn push_comparisons<'a>(
        &mut self,
        stamps: &mut Stamps,
        calls: impl Iterator<Item = &'a ExoCall>,
    ) {
        for call in calls {
            if let Some(instruction) = call.wcp() {
                stamps.wcp += 1;
                self.wcp_ops
                    .push(WcpOperation::new(stamps.wcp, instruction, call.arg_1, call.arg_2));
            }
        }
    }

    /// Stamps and records the module operations of a fragment.
    pub(crate) fn push_fragment(
        &mut self,
        stamps: &mut Stamps,
        context_number: u64,
        fragment: ImcFragment,
    ) -> ModuleStamps {
        let mut assigned = ModuleStamps::default();
        if let Some(call) = fragment.mxp {
            stamps.mxp += 1;
            assigned.mxp = stamps.mxp;
            self.mxp_ops.push(MxpOperation {
                stamp: stamps.mxp,
                context_number,
                call,
            });
        }
        if let Some(operation) = fragment.oob {
            stamps.oob += 1;
            assigned.oob = stamps.oob;
            self.push_comparisons(stamps, operation.exo_calls.wcp_calls());
            self.oob_ops.push(OobEntry {
                stamp: stamps.oob,
                operation,
            });
        }
        if let Some(call) = fragment.stp {
            stamps.stp += 1;
            assigned.stp = stamps.stp;
            self.push_comparisons(stamps, call.exo_calls.wcp_calls());
            self.stp_ops.push(StpEntry {
                stamp: stamps.stp,
                call,
            });
        }
        if let Some(operation) = fragment.exp {
            stamps.exp += 1;
            assigned.exp = stamps.exp;
            self.push_comparisons(stamps, operation.preprocessing.wcp_calls());
            self.exp_ops.push(ExpEntry {
                stamp: stamps.exp,
                operation,
            });
        }
        if let Some(call) = fragment.mmu {
            stamps.mmu += 1;
            assigned.mmu = stamps.mmu;
            self.mmu_ops.push(MmuEntry {
                stamp: stamps.mmu,
                call,
            });
        }
        assigned
    }

    /// Records a hash computation, whose id must exceed the one of the
    /// previous computation.
    pub(crate) fn push_hash(
        &mut self,
        stamps: &mut Stamps,
        previous_id: &mut Option<u64>,
        op: HashDataOperation,
    ) -> TraceResult<()> {
        if let Some(comparison) = hash_data::check_id(*previous_id, op.id, stamps.wcp + 1)? {
            stamps.wcp += 1;
            self.wcp_ops.push(comparison);
        }
        *previous_id = Some(op.id);
        stamps.hash += 1;
        self.hash_data_ops.push(op);
        Ok(())
    }

    pub(crate) fn into_tables(
        self,
        call_stack: &CallStack,
        padding_rows: usize,
    ) -> TraceResult<Vec<TraceTable>> {
        let trace_lengths = self.get_lengths();
        let Traces {
            hub,
            mxp_ops,
            stp_ops,
            oob_ops,
            exp_ops,
            mmu_ops,
            hash_data_ops,
            wcp_ops,
        } = self;

        let tables = vec![
            hub_columns::generate_trace(&hub, call_stack, padding_rows)?,
            mxp::columns::generate_trace(&mxp_ops, padding_rows)?,
            stp::columns::generate_trace(&stp_ops, padding_rows)?,
            oob::columns::generate_trace(&oob_ops, padding_rows)?,
            exp::columns::generate_trace(&exp_ops, padding_rows)?,
            mmu::columns::generate_trace(&mmu_ops, padding_rows)?,
            hash_data::columns::generate_trace(&hash_data_ops, padding_rows)?,
            wcp::generate_trace(&wcp_ops, padding_rows)?,
        ];

        log::info!("Trace lengths (before padding): {:?}", trace_lengths);

        Ok(tables)
    }
}
