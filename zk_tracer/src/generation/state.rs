use crate::callstack::CallStack;
use crate::deployment::DeploymentInfo;
use crate::witness::traces::{TraceCheckpoint, Traces};

/// The counters of a conflation. Each module stamps its operations from 1
/// on, a stamp of 0 meaning "no operation".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stamps {
    pub hub: u64,
    pub mxp: u64,
    pub stp: u64,
    pub oob: u64,
    pub exp: u64,
    pub mmu: u64,
    pub wcp: u64,
    pub hash: u64,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ConflationCheckpoint {
    pub(self) stamps: Stamps,
    pub(self) context_number: u64,
    pub(self) traces: TraceCheckpoint,
    pub(self) previous_hash_id: Option<u64>,
    pub(self) refund_counter: u64,
}

/// Everything the tracer accumulates over a conflation.
#[derive(Debug)]
pub struct ConflationContext {
    pub(crate) stamps: Stamps,
    /// Last context number handed out.
    pub(crate) context_number: u64,
    pub(crate) call_stack: CallStack,
    pub(crate) deployments: DeploymentInfo,
    /// Id of the latest hash computation.
    pub(crate) previous_hash_id: Option<u64>,
    /// Refunds accumulated by the current transaction.
    pub(crate) refund_counter: u64,
    /// Number of events rejected because of a host error.
    pub(crate) aborted_events: usize,
    pub(crate) traces: Traces,
}

impl ConflationContext {
    pub(crate) fn new(max_call_stack_depth: usize) -> Self {
        Self {
            stamps: Stamps::default(),
            context_number: 0,
            call_stack: CallStack::new(max_call_stack_depth),
            deployments: DeploymentInfo::new(),
            previous_hash_id: None,
            refund_counter: 0,
            aborted_events: 0,
            traces: Traces::new(),
        }
    }

    pub(crate) fn next_context_number(&mut self) -> u64 {
        self.context_number += 1;
        self.context_number
    }

    pub(crate) fn checkpoint(&self) -> ConflationCheckpoint {
        ConflationCheckpoint {
            stamps: self.stamps,
            context_number: self.context_number,
            traces: self.traces.checkpoint(),
            previous_hash_id: self.previous_hash_id,
            refund_counter: self.refund_counter,
        }
    }

    /// Drops every row recorded since `checkpoint`. The call stack and the
    /// deployment numbers are only mutated once an event has been accepted.
    pub(crate) fn rollback(&mut self, checkpoint: ConflationCheckpoint) {
        self.stamps = checkpoint.stamps;
        self.context_number = checkpoint.context_number;
        self.traces.rollback(checkpoint.traces);
        self.previous_hash_id = checkpoint.previous_hash_id;
        self.refund_counter = checkpoint.refund_counter;
    }

    pub const fn stamps(&self) -> Stamps {
        self.stamps
    }

    pub const fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    pub const fn deployments(&self) -> &DeploymentInfo {
        &self.deployments
    }

    pub const fn aborted_events(&self) -> usize {
        self.aborted_events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_data::{HashDataOperation, HashFunction};

    #[test]
    fn rollback_restores_stamps_and_rows() {
        let mut ctx = ConflationContext::new(1024);
        let checkpoint = ctx.checkpoint();

        ctx.stamps.hub += 1;
        ctx.next_context_number();
        ctx.refund_counter = 4800;
        let ConflationContext {
            traces,
            stamps,
            previous_hash_id,
            ..
        } = &mut ctx;
        let keccak = HashDataOperation::new(2, HashFunction::Keccak, vec![]);
        traces.push_hash(stamps, previous_hash_id, keccak).unwrap();
        assert_eq!(ctx.stamps().hash, 1);

        ctx.rollback(checkpoint);
        assert_eq!(ctx.stamps(), Stamps::default());
        assert_eq!(ctx.previous_hash_id, None);
        assert_eq!(ctx.refund_counter, 0);
        assert!(ctx.traces.hash_data_ops.is_empty());
        assert_eq!(ctx.next_context_number(), 1);
    }
}
