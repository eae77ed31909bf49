//! Byte moves between the memories of execution contexts and the exogenous
//! data modules (ROM, hashes, logs, transaction call data, precompiles).
//!
//! The tracer records one macro instruction per move. Instructions address
//! memory by context number; exogenous modules are addressed by an
//! auxiliary id, which is the hub stamp of the triggering opcode plus one.

pub(crate) mod columns;

use ethereum_types::U256;
use zk_tracer_common::{hi_lo, WORD_SIZE};

use crate::callstack::{CallFrameType, CallStack, MemoryRange};
use crate::imc::{unsupported, ImcModule};
use crate::opcode::OpCode;
use crate::witness::errors::{HostError, TracerResult};
use crate::witness::state::OperandSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MmuInstruction {
    MLoad,
    MStore,
    MStore8,
    RightPaddedWordExtraction,
    RamToExoWithPadding,
    ExoToRamTransplants,
    RamToRamSansPadding,
    AnyToRamWithPadding,
    ModexpZero,
    ModexpData,
    Blake,
}

impl MmuInstruction {
    pub const fn code(self) -> u16 {
        match self {
            Self::MLoad => 0xfe01,
            Self::MStore => 0xfe02,
            Self::MStore8 => 0xfe03,
            Self::RightPaddedWordExtraction => 0xfe10,
            Self::RamToExoWithPadding => 0xfe20,
            Self::ExoToRamTransplants => 0xfe30,
            Self::RamToRamSansPadding => 0xfe40,
            Self::AnyToRamWithPadding => 0xfe50,
            Self::ModexpZero => 0xfe60,
            Self::ModexpData => 0xfe70,
            Self::Blake => 0xfe80,
        }
    }
}

/// A module bytes are moved to or from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExoModule {
    Rom,
    Kec,
    Log,
    Txcd,
    EcData,
    RipSha,
    BlakeModexp,
}

impl ExoModule {
    pub const ALL: [Self; 7] = [
        Self::Rom,
        Self::Kec,
        Self::Log,
        Self::Txcd,
        Self::EcData,
        Self::RipSha,
        Self::BlakeModexp,
    ];

    /// Weight of the module in the exo sum.
    pub const fn weight(self) -> u8 {
        match self {
            Self::Rom => 1,
            Self::Kec => 2,
            Self::Log => 4,
            Self::Txcd => 8,
            Self::EcData => 16,
            Self::RipSha => 32,
            Self::BlakeModexp => 64,
        }
    }
}

/// One MMU instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MmuCall {
    pub instruction: MmuInstruction,
    pub source_id: u64,
    pub target_id: u64,
    pub aux_id: u64,
    pub source_offset: U256,
    pub target_offset: U256,
    pub size: u64,
    pub reference_offset: u64,
    pub reference_size: u64,
    pub success_bit: bool,
    pub limb_1: u128,
    pub limb_2: u128,
    pub phase: u16,
    /// Sum of the weights of the exogenous modules involved.
    pub exo_sum: u8,
}

impl MmuCall {
    pub const fn new(instruction: MmuInstruction) -> Self {
        Self {
            instruction,
            source_id: 0,
            target_id: 0,
            aux_id: 0,
            source_offset: U256::zero(),
            target_offset: U256::zero(),
            size: 0,
            reference_offset: 0,
            reference_size: 0,
            success_bit: false,
            limb_1: 0,
            limb_2: 0,
            phase: 0,
            exo_sum: 0,
        }
    }

    pub const fn with_exo(mut self, module: ExoModule) -> Self {
        self.exo_sum |= module.weight();
        self
    }

    pub const fn involves(&self, module: ExoModule) -> bool {
        self.exo_sum & module.weight() != 0
    }

    /// The bytes of a word, as two limbs.
    fn with_word(mut self, word: U256) -> Self {
        (self.limb_1, self.limb_2) = hi_lo(word);
        self
    }

    /// Copies `size` bytes of the memory of `source_id` at `offset` to an
    /// exogenous module.
    const fn ram_to_exo(source_id: u64, aux_id: u64, offset: U256, size: u64) -> Self {
        let mut call = Self::new(MmuInstruction::RamToExoWithPadding);
        call.source_id = source_id;
        call.aux_id = aux_id;
        call.source_offset = offset;
        call.size = size;
        call.reference_size = size;
        call
    }

    /// The MMU call of an opcode. `exo_id` identifies the operation of the
    /// exogenous module receiving the bytes, if any.
    pub fn for_opcode(
        snapshot: &OperandSnapshot,
        call_stack: &CallStack,
        exo_id: u64,
    ) -> TracerResult<Self> {
        let s = |i| snapshot.stack(i);
        let size = |i| snapshot.stack_u64(i);
        let current = call_stack.current();
        let parent = call_stack.parent();
        let context_number = current.context_number();

        let call = match snapshot.opcode {
            OpCode::MLoad => {
                let offset = s(0)?;
                let word = snapshot.memory_slice(offset.low_u64(), WORD_SIZE as u64)?;
                let mut call = Self::new(MmuInstruction::MLoad)
                    .with_word(U256::from_big_endian(&word));
                call.source_id = context_number;
                call.source_offset = offset;
                call
            }
            OpCode::MStore => {
                let mut call = Self::new(MmuInstruction::MStore).with_word(s(1)?);
                call.target_id = context_number;
                call.target_offset = s(0)?;
                call
            }
            OpCode::MStore8 => {
                let mut call = Self::new(MmuInstruction::MStore8);
                call.target_id = context_number;
                call.target_offset = s(0)?;
                call.limb_2 = u128::from(s(1)?.byte(0));
                call
            }
            OpCode::CallDataLoad => {
                let offset = size(0)?;
                let call_data = current.call_data();
                let mut word = [0; WORD_SIZE];
                if let Ok(start) = usize::try_from(offset) {
                    if start < call_data.len() {
                        let available = (call_data.len() - start).min(WORD_SIZE);
                        word[..available].copy_from_slice(&call_data[start..start + available]);
                    }
                }
                let mut call = Self::new(MmuInstruction::RightPaddedWordExtraction)
                    .with_word(U256::from_big_endian(&word));
                call.source_id = parent.context_number();
                call.source_offset = s(0)?;
                call.reference_offset = current.call_data_range().offset;
                call.reference_size = snapshot.call_data_size;
                call.success_bit = offset < snapshot.call_data_size;
                if current.frame_type() == CallFrameType::Root {
                    call = call.with_exo(ExoModule::Txcd);
                }
                call
            }
            OpCode::Keccak256 => {
                Self::ram_to_exo(context_number, exo_id, s(0)?, size(1)?).with_exo(ExoModule::Kec)
            }
            OpCode::Log(_) => {
                Self::ram_to_exo(context_number, exo_id, s(0)?, size(1)?).with_exo(ExoModule::Log)
            }
            opcode @ (OpCode::Create | OpCode::Create2) => {
                let call = Self::ram_to_exo(context_number, exo_id, s(1)?, size(2)?)
                    .with_exo(ExoModule::Rom);
                if opcode == OpCode::Create2 {
                    call.with_exo(ExoModule::Kec)
                } else {
                    call
                }
            }
            OpCode::Return if snapshot.deploying => {
                Self::ram_to_exo(context_number, exo_id, s(0)?, size(1)?)
                    .with_exo(ExoModule::Rom)
                    .with_exo(ExoModule::Kec)
            }
            OpCode::Return | OpCode::Revert => {
                let return_at = current.return_at_range();
                let mut call = Self::new(MmuInstruction::RamToRamSansPadding);
                call.source_id = context_number;
                call.target_id = parent.context_number();
                call.source_offset = s(0)?;
                call.size = size(1)?;
                call.reference_offset = return_at.offset;
                call.reference_size = return_at.length;
                call
            }
            OpCode::CallDataCopy => {
                let call_data_range = current.call_data_range();
                let mut call = Self::new(MmuInstruction::AnyToRamWithPadding);
                call.source_id = parent.context_number();
                call.target_id = context_number;
                call.target_offset = s(0)?;
                call.source_offset = s(1)?;
                call.size = size(2)?;
                call.reference_offset = call_data_range.offset;
                call.reference_size = snapshot.call_data_size;
                if current.frame_type() == CallFrameType::Root {
                    call = call.with_exo(ExoModule::Txcd);
                }
                call
            }
            OpCode::CodeCopy => {
                let mut call =
                    Self::new(MmuInstruction::AnyToRamWithPadding).with_exo(ExoModule::Rom);
                call.source_id = exo_id;
                call.target_id = context_number;
                call.target_offset = s(0)?;
                call.source_offset = s(1)?;
                call.size = size(2)?;
                call.reference_size = snapshot.code_size;
                call
            }
            OpCode::ExtCodeCopy => {
                let mut call =
                    Self::new(MmuInstruction::AnyToRamWithPadding).with_exo(ExoModule::Rom);
                call.source_id = exo_id;
                call.target_id = context_number;
                call.target_offset = s(1)?;
                call.source_offset = s(2)?;
                call.size = size(3)?;
                call.reference_size = snapshot.account()?.code_size;
                call
            }
            OpCode::ReturnDataCopy => {
                let returner = current
                    .return_data_source()
                    .map_or(0, |id| call_stack.get_by_id(id).context_number());
                let return_data_range = current.return_data_range();
                let mut call = Self::new(MmuInstruction::AnyToRamWithPadding);
                call.source_id = returner;
                call.target_id = context_number;
                call.target_offset = s(0)?;
                call.source_offset = s(1)?;
                call.size = size(2)?;
                call.reference_offset = return_data_range.offset;
                call.reference_size = return_data_range.length;
                call
            }
            OpCode::MCopy => {
                let mut call = Self::new(MmuInstruction::RamToRamSansPadding);
                call.source_id = context_number;
                call.target_id = context_number;
                call.target_offset = s(0)?;
                call.source_offset = s(1)?;
                call.size = size(2)?;
                call.reference_offset = size(0)?;
                call.reference_size = call.size;
                call
            }
            opcode => return Err(unsupported(ImcModule::Mmu, opcode).into()),
        };
        Ok(call)
    }

    /// Hands the call data of a precompile, read from the memory of the
    /// caller, to the module computing it.
    pub fn precompile_call_data(
        caller: u64,
        exo_id: u64,
        call_data_range: MemoryRange,
        module: ExoModule,
        phase: u16,
    ) -> Self {
        let mut call = Self::ram_to_exo(
            caller,
            exo_id,
            U256::from(call_data_range.offset),
            call_data_range.length,
        )
        .with_exo(module);
        call.target_id = exo_id;
        call.phase = phase;
        call.success_bit = true;
        call
    }

    /// Writes the output of a precompile into the memory of its return data
    /// frame.
    pub fn precompile_result(
        precompile: u64,
        exo_id: u64,
        size: u64,
        module: ExoModule,
        phase: u16,
    ) -> Self {
        let mut call = Self::new(MmuInstruction::ExoToRamTransplants).with_exo(module);
        call.source_id = exo_id;
        call.target_id = precompile;
        call.size = size;
        call.phase = phase;
        call
    }

    /// Copies the output of a precompile into the range of the memory of the
    /// caller expecting it.
    pub fn precompile_return_data_copy(
        precompile: u64,
        caller: u64,
        output_size: u64,
        return_at: MemoryRange,
    ) -> Self {
        let mut call = Self::new(MmuInstruction::RamToRamSansPadding);
        call.source_id = precompile;
        call.target_id = caller;
        call.size = output_size;
        call.reference_offset = return_at.offset;
        call.reference_size = return_at.length;
        call
    }

    /// Extracts one of the MODEXP operands, or zero-fills its slot when it
    /// is absent from the call data.
    pub fn modexp_operand(
        caller: u64,
        exo_id: u64,
        offset: u64,
        size: u64,
        present: bool,
        phase: u16,
    ) -> Self {
        let instruction = if present {
            MmuInstruction::ModexpData
        } else {
            MmuInstruction::ModexpZero
        };
        let mut call = Self::new(instruction).with_exo(ExoModule::BlakeModexp);
        if present {
            call.source_id = caller;
            call.source_offset = U256::from(offset);
            call.size = size;
        }
        call.target_id = exo_id;
        call.phase = phase;
        call
    }

    /// Extracts the rounds and flag of a BLAKE2f call.
    pub fn blake(
        caller: u64,
        exo_id: u64,
        call_data_range: MemoryRange,
        rounds: u64,
        f: u8,
    ) -> Self {
        let mut call = Self::new(MmuInstruction::Blake).with_exo(ExoModule::BlakeModexp);
        call.source_id = caller;
        call.target_id = exo_id;
        call.source_offset = U256::from(call_data_range.offset);
        call.limb_1 = u128::from(rounds);
        call.limb_2 = u128::from(f);
        call.success_bit = f <= 1;
        call
    }
}

/// Whether a memory-touching opcode actually moves bytes.
pub fn has_nontrivial_payload(snapshot: &OperandSnapshot) -> Result<bool, HostError> {
    let nonzero = |i| snapshot.stack(i).map(|size| !size.is_zero());
    Ok(match snapshot.opcode {
        OpCode::MLoad | OpCode::MStore | OpCode::MStore8 => true,
        OpCode::CallDataLoad => snapshot.stack(0)? < U256::from(snapshot.call_data_size),
        OpCode::Keccak256 | OpCode::Log(_) => nonzero(1)?,
        OpCode::CallDataCopy
        | OpCode::CodeCopy
        | OpCode::ReturnDataCopy
        | OpCode::MCopy
        | OpCode::Create
        | OpCode::Create2 => nonzero(2)?,
        OpCode::ExtCodeCopy => nonzero(3)?,
        OpCode::Return if snapshot.deploying => nonzero(1)?,
        OpCode::Return | OpCode::Revert => nonzero(1)? && snapshot.return_at_capacity > 0,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callstack::FrameDescriptor;
    use crate::structlog::MemoryChunk;
    use crate::trace::TraceResult;

    fn snapshot(opcode: OpCode, stack_top_first: &[u64]) -> OperandSnapshot {
        OperandSnapshot {
            opcode,
            stack: stack_top_first.iter().rev().map(|&v| U256::from(v)).collect(),
            ..Default::default()
        }
    }

    fn call_stack() -> TraceResult<CallStack> {
        let mut stack = CallStack::default();
        stack.new_transaction(
            FrameDescriptor {
                context_number: 1,
                ..Default::default()
            },
            FrameDescriptor {
                frame_type: CallFrameType::Root,
                context_number: 2,
                call_data: vec![0xab; 40],
                ..Default::default()
            },
        )?;
        stack.enter(FrameDescriptor {
            frame_type: CallFrameType::StandardCall,
            context_number: 5,
            call_data: vec![0xcd; 4],
            call_data_range: MemoryRange::new(64, 4),
            return_at_range: MemoryRange::new(0, 32),
            ..Default::default()
        })?;
        Ok(stack)
    }

    #[test]
    fn exo_weights_are_distinct_bits() {
        let sum = ExoModule::ALL
            .iter()
            .fold(0u8, |sum, module| sum | module.weight());
        assert_eq!(sum, 127);
        let call = MmuCall::new(MmuInstruction::RamToExoWithPadding)
            .with_exo(ExoModule::Rom)
            .with_exo(ExoModule::Kec);
        assert_eq!(call.exo_sum, 3);
        assert!(call.involves(ExoModule::Kec) && !call.involves(ExoModule::Log));
    }

    #[test]
    fn trivial_payloads() {
        assert!(has_nontrivial_payload(&snapshot(OpCode::MStore8, &[0, 0])).unwrap());
        assert!(!has_nontrivial_payload(&snapshot(OpCode::Keccak256, &[64, 0])).unwrap());
        assert!(has_nontrivial_payload(&snapshot(OpCode::Log(2), &[0, 1, 9, 9])).unwrap());
        assert!(!has_nontrivial_payload(&snapshot(OpCode::CallDataLoad, &[0])).unwrap());

        let mut revert = snapshot(OpCode::Revert, &[0, 32]);
        assert!(!has_nontrivial_payload(&revert).unwrap());
        revert.return_at_capacity = 32;
        assert!(has_nontrivial_payload(&revert).unwrap());

        let mut deploy = snapshot(OpCode::Return, &[0, 32]);
        deploy.deploying = true;
        assert!(has_nontrivial_payload(&deploy).unwrap());
        assert!(has_nontrivial_payload(&snapshot(OpCode::ExtCodeCopy, &[0, 0, 0])).is_err());
    }

    #[test]
    fn mload_reads_both_limbs() {
        let stack = call_stack().unwrap();
        let mut mload = snapshot(OpCode::MLoad, &[0]);
        mload.memory_size = 32;
        mload.memory = vec![MemoryChunk {
            offset: 0,
            bytes: (0..32).collect(),
        }];
        let call = MmuCall::for_opcode(&mload, &stack, 0).unwrap();
        assert_eq!(call.source_id, 5);
        assert_eq!(call.limb_1, u128::from_be_bytes(core::array::from_fn(|i| i as u8)));
        assert_eq!(call.limb_2 & 0xff, 31);
    }

    #[test]
    fn call_data_load_reads_from_the_caller() {
        let stack = call_stack().unwrap();
        let mut cdl = snapshot(OpCode::CallDataLoad, &[2]);
        cdl.call_data_size = 4;
        let call = MmuCall::for_opcode(&cdl, &stack, 0).unwrap();
        assert_eq!(call.instruction.code(), 0xfe10);
        assert_eq!(call.source_id, 2);
        assert_eq!(call.reference_offset, 64);
        assert_eq!(call.limb_1, 0xcdcd << 112);
        assert!(call.success_bit);
        assert_eq!(call.exo_sum, 0);
    }

    #[test]
    fn revert_targets_the_return_at_range() {
        let stack = call_stack().unwrap();
        let call = MmuCall::for_opcode(&snapshot(OpCode::Revert, &[4, 8]), &stack, 0).unwrap();
        assert_eq!(call.instruction, MmuInstruction::RamToRamSansPadding);
        assert_eq!((call.source_id, call.target_id), (5, 2));
        assert_eq!((call.size, call.reference_size), (8, 32));
    }

    #[test]
    fn sha3_goes_to_keccak() {
        let stack = call_stack().unwrap();
        let call =
            MmuCall::for_opcode(&snapshot(OpCode::Keccak256, &[0, 33]), &stack, 12).unwrap();
        assert_eq!(call.aux_id, 12);
        assert_eq!(call.exo_sum, ExoModule::Kec.weight());
        assert!(MmuCall::for_opcode(&snapshot(OpCode::Add, &[1, 2]), &stack, 0).is_err());
    }
}
