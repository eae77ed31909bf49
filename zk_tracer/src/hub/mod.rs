//! The hub: one row per opcode, linking the executing context to the rows
//! of the modules the opcode triggered.

pub(crate) mod columns;

use crate::imc::ImcSignals;
use crate::opcode::OpCode;
use crate::structlog::ExceptionalHalt;

/// Stamps of the module operations triggered by an opcode, zero for the
/// modules it did not trigger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModuleStamps {
    pub mxp: u64,
    pub stp: u64,
    pub oob: u64,
    pub exp: u64,
    pub mmu: u64,
}

/// An opcode, as seen by the hub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct HubEntry {
    pub(crate) stamp: u64,
    /// Call stack id of the executing frame. Its revert status is only known
    /// at the end of the conflation.
    pub(crate) frame_id: usize,
    pub(crate) context_number: u64,
    pub(crate) caller_context_number: u64,
    pub(crate) depth: usize,
    pub(crate) pc: u64,
    pub(crate) opcode: OpCode,
    pub(crate) gas_actual: u64,
    pub(crate) gas_cost: u64,
    pub(crate) gas_next: u64,
    pub(crate) refund_counter: u64,
    pub(crate) exception: Option<ExceptionalHalt>,
    pub(crate) signals: ImcSignals,
    pub(crate) module_stamps: ModuleStamps,
}

impl HubEntry {
    pub(crate) fn has(&self, exception: ExceptionalHalt) -> bool {
        self.exception == Some(exception)
    }
}
