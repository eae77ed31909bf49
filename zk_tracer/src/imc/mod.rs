//! Inter-module calls: which of the MXP, STP, OOB, EXP and MMU modules an
//! opcode triggers, and the calls themselves.

pub mod exo;

use std::fmt;

use crate::callstack::CallStack;
use crate::exp::{ExpCall, ExpOperation};
use crate::mmu::{has_nontrivial_payload, MmuCall};
use crate::mxp::{MxpCall, MxpType};
use crate::oob::{OobCall, OobOperation, OobOutcome};
use crate::opcode::OpCode;
use crate::stp::StpCall;
use crate::structlog::ExceptionalHalt;
use crate::trace::TraceResult;
use crate::witness::errors::{HostError, ProtocolViolation, TracerResult};
use crate::witness::state::OperandSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImcModule {
    Mxp,
    Stp,
    Oob,
    Exp,
    Mmu,
}

impl ImcModule {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mxp => "mxp",
            Self::Stp => "stp",
            Self::Oob => "oob",
            Self::Exp => "exp",
            Self::Mmu => "mmu",
        }
    }
}

impl fmt::Display for ImcModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The modules an opcode triggers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImcSignals {
    pub mxp: bool,
    pub stp: bool,
    pub oob: bool,
    pub exp: bool,
    pub mmu: bool,
}

impl ImcSignals {
    pub fn compute(snapshot: &OperandSnapshot) -> Result<Self, HostError> {
        let opcode = snapshot.opcode;
        let exception = snapshot.exception;
        if snapshot.has_stack_exception() {
            return Ok(Self::default());
        }
        if exception == Some(ExceptionalHalt::StaticViolation) {
            return Ok(Self {
                oob: opcode == OpCode::Call,
                ..Self::default()
            });
        }

        let no_exception = exception.is_none();
        let mxp = MxpType::of(opcode).is_some()
            && !(opcode == OpCode::ReturnDataCopy
                && exception == Some(ExceptionalHalt::ReturnDataOutOfBounds));
        let stp = (opcode.is_call() || opcode.is_create())
            && exception != Some(ExceptionalHalt::MemoryExpansion);
        let oob = match opcode {
            OpCode::Jump
            | OpCode::JumpI
            | OpCode::CallDataLoad
            | OpCode::ReturnDataCopy
            | OpCode::SStore => true,
            OpCode::Call
            | OpCode::CallCode
            | OpCode::DelegateCall
            | OpCode::StaticCall
            | OpCode::Create
            | OpCode::Create2 => no_exception,
            // The code size limit is enforced by the OOB module, so the
            // matching exception still triggers it.
            OpCode::Return => {
                snapshot.deploying
                    && matches!(exception, None | Some(ExceptionalHalt::MaxCodeSizeExceeded))
            }
            _ => false,
        };
        let mmu = no_exception && has_nontrivial_payload(snapshot)?;

        Ok(Self {
            mxp,
            stp,
            oob,
            exp: opcode == OpCode::Exp,
            mmu,
        })
    }

    pub const fn any(&self) -> bool {
        self.mxp || self.stp || self.oob || self.exp || self.mmu
    }
}

/// The calls of one opcode, or of one step of a precompile, to the other
/// modules. Each module is called at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImcFragment {
    pub mxp: Option<MxpCall>,
    pub stp: Option<StpCall>,
    pub oob: Option<OobOperation>,
    pub exp: Option<ExpOperation>,
    pub mmu: Option<MmuCall>,
}

fn fire<T>(slot: &mut Option<T>, module: ImcModule, call: T) -> TraceResult<&T> {
    if slot.is_some() {
        return Err(ProtocolViolation::ImcCalledTwice(module));
    }
    Ok(slot.insert(call))
}

impl ImcFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_mxp(&mut self, call: MxpCall) -> TraceResult<&MxpCall> {
        fire(&mut self.mxp, ImcModule::Mxp, call)
    }

    pub fn call_stp(&mut self, call: StpCall) -> TraceResult<&StpCall> {
        fire(&mut self.stp, ImcModule::Stp, call)
    }

    pub fn call_oob(&mut self, call: OobCall) -> TraceResult<&OobOperation> {
        fire(&mut self.oob, ImcModule::Oob, OobOperation::new(call))
    }

    pub fn call_exp(&mut self, call: ExpCall) -> TraceResult<&ExpOperation> {
        fire(&mut self.exp, ImcModule::Exp, ExpOperation::new(call))
    }

    pub fn call_mmu(&mut self, call: MmuCall) -> TraceResult<&MmuCall> {
        fire(&mut self.mmu, ImcModule::Mmu, call)
    }

    /// Builds the fragment of the opcode of `snapshot`, calling the modules
    /// selected by `signals`.
    pub fn for_opcode(
        snapshot: &OperandSnapshot,
        signals: ImcSignals,
        call_stack: &CallStack,
        exo_id: u64,
    ) -> TracerResult<Self> {
        let opcode = snapshot.opcode;
        let mut fragment = Self::new();
        if signals.mxp {
            if MxpType::of(opcode).is_none() {
                return Err(unsupported(ImcModule::Mxp, opcode).into());
            }
            fragment.call_mxp(MxpCall::new(snapshot)?)?;
        }
        if signals.oob {
            fragment.call_oob(OobCall::for_opcode(snapshot)?)?;
        }
        if signals.stp {
            fragment.call_stp(StpCall::new(snapshot)?)?;
        }
        if signals.exp {
            fragment.call_exp(ExpCall::for_opcode(snapshot)?)?;
        }
        if signals.mmu {
            fragment.call_mmu(MmuCall::for_opcode(snapshot, call_stack, exo_id)?)?;
        }
        Ok(fragment)
    }

    /// Checks the exceptions the modules computed against the one the host
    /// reported.
    pub fn check_exceptions(&self, snapshot: &OperandSnapshot) -> Result<(), HostError> {
        let reported = snapshot.exception;
        let check = |module: ImcModule,
                     condition: &'static str,
                     computed: bool,
                     expected: ExceptionalHalt| {
            if computed == (reported == Some(expected)) {
                Ok(())
            } else {
                Err(HostError::InconsistentException {
                    context: snapshot.context,
                    module: module.name(),
                    condition,
                    computed,
                })
            }
        };

        if let Some(mxp) = &self.mxp {
            check(ImcModule::Mxp, "mxpx", mxp.mxpx, ExceptionalHalt::MemoryExpansion)?;
        }
        if let Some(oob) = &self.oob {
            match oob.outcome {
                OobOutcome::ReturnDataCopy { rdcx } => check(
                    ImcModule::Oob,
                    "rdcx",
                    rdcx,
                    ExceptionalHalt::ReturnDataOutOfBounds,
                )?,
                OobOutcome::SStore { sstorex } => {
                    check(ImcModule::Oob, "sstorex", sstorex, ExceptionalHalt::OutOfSStore)?
                }
                OobOutcome::Deployment {
                    max_code_size_exception,
                } => check(
                    ImcModule::Oob,
                    "maxcsx",
                    max_code_size_exception,
                    ExceptionalHalt::MaxCodeSizeExceeded,
                )?,
                // A jump to a valid position may still land outside a
                // JUMPDEST, or run out of gas first.
                OobOutcome::Jump {
                    guaranteed_exception: true,
                    ..
                }
                | OobOutcome::JumpI {
                    guaranteed_exception: true,
                    ..
                } if !matches!(
                    reported,
                    Some(ExceptionalHalt::InvalidJumpDestination | ExceptionalHalt::OutOfGas)
                ) =>
                {
                    return Err(HostError::InconsistentException {
                        context: snapshot.context,
                        module: ImcModule::Oob.name(),
                        condition: "jumpx",
                        computed: true,
                    })
                }
                _ => {}
            }
        }
        if let Some(stp) = &self.stp {
            if stp.oogx && reported != Some(ExceptionalHalt::OutOfGas) {
                return Err(HostError::InconsistentException {
                    context: snapshot.context,
                    module: ImcModule::Stp.name(),
                    condition: "oogx",
                    computed: true,
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn unsupported(module: ImcModule, opcode: OpCode) -> ProtocolViolation {
    ProtocolViolation::UnsupportedInstruction {
        module: module.name(),
        instruction: opcode.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use ethereum_types::U256;

    use super::*;
    use crate::structlog::{AccountFacts, StorageFacts};

    fn snapshot(opcode: OpCode, stack_top_first: &[u64]) -> OperandSnapshot {
        OperandSnapshot {
            opcode,
            stack: stack_top_first.iter().rev().map(|v| U256::from(*v)).collect(),
            gas: 100_000,
            ..Default::default()
        }
    }

    #[test]
    fn stack_exceptions_trigger_nothing() {
        let mut call = snapshot(OpCode::Call, &[]);
        call.exception = Some(ExceptionalHalt::StackUnderflow);
        assert_eq!(ImcSignals::compute(&call).unwrap(), ImcSignals::default());
    }

    #[test]
    fn static_violations_only_check_the_call_value() {
        let mut call = snapshot(OpCode::Call, &[0, 0, 1, 0, 0, 0, 0]);
        call.exception = Some(ExceptionalHalt::StaticViolation);
        let signals = ImcSignals::compute(&call).unwrap();
        assert!(signals.oob);
        assert!(!signals.mxp && !signals.stp && !signals.mmu);
        assert!(matches!(
            OobCall::for_opcode(&call).unwrap(),
            OobCall::XCall { .. }
        ));

        let mut sstore = snapshot(OpCode::SStore, &[0, 1]);
        sstore.exception = Some(ExceptionalHalt::StaticViolation);
        assert!(!ImcSignals::compute(&sstore).unwrap().any());
    }

    #[test]
    fn return_data_copy_out_of_bounds_skips_mxp() {
        let mut rdc = snapshot(OpCode::ReturnDataCopy, &[0, 0, 32]);
        rdc.exception = Some(ExceptionalHalt::ReturnDataOutOfBounds);
        let signals = ImcSignals::compute(&rdc).unwrap();
        assert!(signals.oob && !signals.mxp && !signals.mmu);

        rdc.exception = None;
        rdc.return_data_size = 32;
        let signals = ImcSignals::compute(&rdc).unwrap();
        assert!(signals.oob && signals.mxp && signals.mmu);
    }

    #[test]
    fn calls_skip_stp_on_memory_expansion_exceptions() {
        let mut call = snapshot(OpCode::StaticCall, &[100, 0xca11, 1 << 40, 1, 0, 0]);
        call.exception = Some(ExceptionalHalt::MemoryExpansion);
        let signals = ImcSignals::compute(&call).unwrap();
        assert!(signals.mxp && !signals.stp && !signals.oob);

        call.exception = Some(ExceptionalHalt::OutOfGas);
        let signals = ImcSignals::compute(&call).unwrap();
        assert!(signals.mxp && signals.stp && !signals.oob);
    }

    #[test]
    fn deployment_checks_fire_on_max_code_size() {
        let mut ret = snapshot(OpCode::Return, &[0, 30_000]);
        ret.deploying = true;
        ret.exception = Some(ExceptionalHalt::MaxCodeSizeExceeded);
        let signals = ImcSignals::compute(&ret).unwrap();
        assert!(signals.oob && signals.mxp && !signals.mmu);

        ret.deploying = false;
        ret.exception = None;
        assert!(!ImcSignals::compute(&ret).unwrap().oob);
    }

    #[test]
    fn modules_are_called_once() {
        let sstore = OperandSnapshot {
            storage: Some(StorageFacts::default()),
            ..snapshot(OpCode::SStore, &[0, 1])
        };
        let mut fragment = ImcFragment::for_opcode(
            &sstore,
            ImcSignals::compute(&sstore).unwrap(),
            &CallStack::default(),
            1,
        )
        .unwrap();
        assert!(fragment.oob.is_some() && fragment.mxp.is_none());
        assert_eq!(
            fragment.call_oob(OobCall::SStore { gas: 1 }).unwrap_err(),
            ProtocolViolation::ImcCalledTwice(ImcModule::Oob)
        );
    }

    #[test]
    fn unsupported_opcodes_are_protocol_violations() {
        let add = snapshot(OpCode::Add, &[1, 2]);
        let signals = ImcSignals {
            oob: true,
            ..Default::default()
        };
        assert!(matches!(
            ImcFragment::for_opcode(&add, signals, &CallStack::default(), 1),
            Err(crate::witness::errors::TracerError::Protocol(
                ProtocolViolation::UnsupportedInstruction { module: "oob", .. }
            ))
        ));
    }

    #[test]
    fn host_exceptions_are_cross_checked() {
        let mut sstore = snapshot(OpCode::SStore, &[0, 1]);
        sstore.gas = 2000;
        sstore.storage = Some(StorageFacts::default());
        let signals = ImcSignals::compute(&sstore).unwrap();
        let fragment = ImcFragment::for_opcode(&sstore, signals, &CallStack::default(), 1)
            .unwrap();
        assert!(matches!(
            fragment.check_exceptions(&sstore),
            Err(HostError::InconsistentException {
                condition: "sstorex",
                computed: true,
                ..
            })
        ));
        sstore.exception = Some(ExceptionalHalt::OutOfSStore);
        assert_eq!(fragment.check_exceptions(&sstore), Ok(()));

        let mut call = snapshot(OpCode::Call, &[5000, 0xca11, 0, 0, 0, 0, 0]);
        call.account = Some(AccountFacts::default());
        call.gas = 100;
        let signals = ImcSignals::compute(&call).unwrap();
        let fragment = ImcFragment::for_opcode(&call, signals, &CallStack::default(), 1)
            .unwrap();
        assert!(fragment.stp.as_ref().is_some_and(|stp| stp.oogx));
        assert!(fragment.check_exceptions(&call).is_err());
    }
}
