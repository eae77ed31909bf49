//! Memory expansion: the largest memory offset an opcode touches, whether it
//! raises a memory expansion exception, and the gas it costs.

pub(crate) mod columns;

use ethereum_types::U256;
use zk_tracer_common::gas::{
    G_CODE_DEPOSIT, G_COPY, G_KECCAK256_WORD, G_LOG_DATA, G_MEMORY, G_QUAD_COEFFICIENT_DIV,
};
use zk_tracer_common::words_for;

use crate::opcode::OpCode;
use crate::witness::errors::HostError;
use crate::witness::state::{saturating_u64, OperandSnapshot};

/// Addressing convention of a memory-touching opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MxpType {
    /// MSIZE, which reads the memory size only.
    Type1,
    /// MLOAD and MSTORE, touching a word at an offset.
    Type2,
    /// MSTORE8, touching a byte at an offset.
    Type3,
    /// One (offset, size) pair.
    Type4,
    /// Two (offset, size) pairs.
    Type5,
}

impl MxpType {
    pub const fn of(opcode: OpCode) -> Option<Self> {
        match opcode {
            OpCode::MSize => Some(Self::Type1),
            OpCode::MLoad | OpCode::MStore => Some(Self::Type2),
            OpCode::MStore8 => Some(Self::Type3),
            OpCode::Keccak256
            | OpCode::Log(_)
            | OpCode::Return
            | OpCode::Revert
            | OpCode::CallDataCopy
            | OpCode::CodeCopy
            | OpCode::ReturnDataCopy
            | OpCode::ExtCodeCopy
            | OpCode::Create
            | OpCode::Create2 => Some(Self::Type4),
            OpCode::Call
            | OpCode::CallCode
            | OpCode::DelegateCall
            | OpCode::StaticCall
            | OpCode::MCopy => Some(Self::Type5),
            _ => None,
        }
    }
}

/// Per-unit cost of the payload of an opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Billing {
    None,
    ByWord(u64),
    ByByte(u64),
}

impl Billing {
    pub const fn of(opcode: OpCode) -> Self {
        match opcode {
            OpCode::Keccak256 | OpCode::Create2 => Self::ByWord(G_KECCAK256_WORD),
            OpCode::CallDataCopy
            | OpCode::CodeCopy
            | OpCode::ReturnDataCopy
            | OpCode::ExtCodeCopy
            | OpCode::MCopy => Self::ByWord(G_COPY),
            OpCode::Log(_) => Self::ByByte(G_LOG_DATA),
            OpCode::Return => Self::ByByte(G_CODE_DEPOSIT),
            _ => Self::None,
        }
    }

    pub const fn per_word(self) -> u64 {
        match self {
            Self::ByWord(cost) => cost,
            _ => 0,
        }
    }

    pub const fn per_byte(self) -> u64 {
        match self {
            Self::ByByte(cost) => cost,
            _ => 0,
        }
    }

    fn cost(self, size: u64) -> u64 {
        match self {
            Self::None => 0,
            Self::ByWord(cost) => cost.saturating_mul(words_for(size)),
            Self::ByByte(cost) => cost.saturating_mul(size),
        }
    }
}

/// Total cost of a memory of `words` words.
pub fn memory_cost(words: u64) -> u64 {
    let square = words.saturating_mul(words) / G_QUAD_COEFFICIENT_DIV;
    G_MEMORY.saturating_mul(words).saturating_add(square)
}

/// Gas charged to expand memory from `old_words` to `new_words`.
pub fn memory_expansion_cost(old_words: u64, new_words: u64) -> u64 {
    memory_cost(new_words).saturating_sub(memory_cost(old_words))
}

const TWO_POW_32: u64 = 1 << 32;

/// The computation of the MXP module for one opcode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MxpCall {
    pub opcode: OpCode,
    pub mxp_type: MxpType,
    pub billing: Billing,
    pub deploys: bool,
    pub offset_1: U256,
    pub size_1: U256,
    pub offset_2: U256,
    pub size_2: U256,
    pub max_offset_1: U256,
    pub max_offset_2: U256,
    pub max_offset: U256,
    /// Ridiculously out of bounds: an offset or size that no gas budget could
    /// ever pay for.
    pub roob: bool,
    pub noop: bool,
    pub mxpx: bool,
    pub words: u64,
    pub words_new: u64,
    pub c_mem: u64,
    pub c_mem_new: u64,
    pub quad_cost: u64,
    pub lin_cost: u64,
    pub gas_mxp: u64,
    pub expands: bool,
}

fn is_roob(offset: U256, size: U256) -> bool {
    let bound = U256::one() << 128;
    size >= bound || (offset >= bound && !size.is_zero())
}

fn last_byte(offset: U256, size: U256) -> U256 {
    if size.is_zero() {
        U256::zero()
    } else {
        offset + size - 1
    }
}

impl MxpCall {
    /// Runs the MXP computation of the opcode of `snapshot`, which must
    /// have an MXP type.
    pub fn new(snapshot: &OperandSnapshot) -> Result<Self, HostError> {
        let opcode = snapshot.opcode;
        let mxp_type = MxpType::of(opcode).ok_or_else(|| {
            HostError::malformed(snapshot.context, format!("{opcode} does not touch memory"))
        })?;

        let s = |i| snapshot.stack(i);
        let zero = U256::zero();
        let (offset_1, size_1, offset_2, size_2) = match opcode {
            OpCode::MSize => (zero, zero, zero, zero),
            OpCode::MLoad | OpCode::MStore | OpCode::MStore8 => (s(0)?, zero, zero, zero),
            OpCode::CallDataCopy | OpCode::CodeCopy | OpCode::ReturnDataCopy => {
                (s(0)?, s(2)?, zero, zero)
            }
            OpCode::ExtCodeCopy => (s(1)?, s(3)?, zero, zero),
            OpCode::Create | OpCode::Create2 => (s(1)?, s(2)?, zero, zero),
            OpCode::Call | OpCode::CallCode => (s(3)?, s(4)?, s(5)?, s(6)?),
            OpCode::DelegateCall | OpCode::StaticCall => (s(2)?, s(3)?, s(4)?, s(5)?),
            OpCode::MCopy => (s(0)?, s(2)?, s(1)?, s(2)?),
            // SHA3, LOGn, RETURN and REVERT
            _ => (s(0)?, s(1)?, zero, zero),
        };

        let roob = match mxp_type {
            MxpType::Type1 => false,
            MxpType::Type2 | MxpType::Type3 => offset_1 >= U256::one() << 128,
            MxpType::Type4 => is_roob(offset_1, size_1),
            MxpType::Type5 => is_roob(offset_1, size_1) || is_roob(offset_2, size_2),
        };
        let noop = match mxp_type {
            MxpType::Type1 => true,
            MxpType::Type2 | MxpType::Type3 => false,
            MxpType::Type4 => size_1.is_zero(),
            MxpType::Type5 => size_1.is_zero() && size_2.is_zero(),
        };

        let words = snapshot.memory_words();
        let c_mem = memory_cost(words);
        let mut call = Self {
            opcode,
            mxp_type,
            billing: Billing::of(opcode),
            deploys: snapshot.deploying,
            offset_1,
            size_1,
            offset_2,
            size_2,
            max_offset_1: zero,
            max_offset_2: zero,
            max_offset: zero,
            roob,
            noop,
            mxpx: roob,
            words,
            words_new: words,
            c_mem,
            c_mem_new: c_mem,
            quad_cost: 0,
            lin_cost: 0,
            gas_mxp: 0,
            expands: false,
        };
        if roob || noop {
            return Ok(call);
        }

        match mxp_type {
            MxpType::Type2 => call.max_offset_1 = offset_1 + 31,
            MxpType::Type3 => call.max_offset_1 = offset_1,
            _ => {
                call.max_offset_1 = last_byte(offset_1, size_1);
                call.max_offset_2 = last_byte(offset_2, size_2);
            }
        }
        call.max_offset = call.max_offset_1.max(call.max_offset_2);
        call.mxpx = call.max_offset >= U256::from(TWO_POW_32);
        if call.mxpx {
            return Ok(call);
        }

        let accessed_words = words_for(call.max_offset.low_u64() + 1);
        call.expands = accessed_words > words;
        if call.expands {
            call.words_new = accessed_words;
            call.c_mem_new = memory_cost(accessed_words);
        }
        call.quad_cost = call.c_mem_new - c_mem;
        call.lin_cost = call.billing.cost(saturating_u64(size_1));
        call.gas_mxp = call.quad_cost + call.effective_lin_cost();
        Ok(call)
    }

    /// Linear cost actually charged with the expansion. The code deposit of
    /// RETURN only applies when the current context is deploying.
    pub fn effective_lin_cost(&self) -> u64 {
        match self.opcode {
            OpCode::Return if !self.deploys => 0,
            _ => self.lin_cost,
        }
    }

    /// Out of bounds or a no-op, the computation then takes a single row.
    pub const fn is_trivial(&self) -> bool {
        self.roob || self.noop
    }

    /// Index of the last row of the computation.
    pub const fn ct_max(&self) -> usize {
        if self.is_trivial() {
            0
        } else if self.mxpx {
            16
        } else {
            3
        }
    }

    /// Gas charged for the expansion, saturating when it cannot be paid for.
    pub const fn expansion_gas(&self) -> u64 {
        if self.mxpx {
            u64::MAX
        } else {
            self.quad_cost
        }
    }

    /// A non-trivial byte copy follows the expansion.
    pub fn mtntop(&self) -> bool {
        self.mxp_type == MxpType::Type4 && !self.mxpx && !self.size_1.is_zero()
    }

    pub fn size_1_nonzero_no_mxpx(&self) -> bool {
        !self.mxpx && !self.size_1.is_zero()
    }

    pub fn size_2_nonzero_no_mxpx(&self) -> bool {
        !self.mxpx && !self.size_2.is_zero()
    }

    pub fn comp(&self) -> bool {
        self.max_offset_1 >= self.max_offset_2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(opcode: OpCode, stack_top_first: &[u64], memory_size: u64) -> OperandSnapshot {
        OperandSnapshot {
            opcode,
            stack: stack_top_first.iter().rev().map(|v| U256::from(*v)).collect(),
            memory_size,
            ..Default::default()
        }
    }

    #[test]
    fn memory_cost_is_quadratic() {
        assert_eq!(memory_cost(0), 0);
        assert_eq!(memory_cost(1), 3);
        assert_eq!(memory_cost(32), 98);
        assert_eq!(memory_cost(1024), 5120);
        assert_eq!(memory_expansion_cost(1, 32), 95);
    }

    #[test]
    fn mload_expands_by_one_word() {
        let call = MxpCall::new(&snapshot(OpCode::MLoad, &[32], 32)).unwrap();
        assert_eq!(call.mxp_type, MxpType::Type2);
        assert_eq!(call.max_offset, U256::from(63));
        assert!(call.expands);
        assert_eq!((call.words, call.words_new), (1, 2));
        assert_eq!(call.quad_cost, 3);
        assert_eq!(call.gas_mxp, 3);
        assert_eq!(call.ct_max(), 3);
    }

    #[test]
    fn sha3_bills_words() {
        // offset 0, size 64 on an empty memory.
        let call = MxpCall::new(&snapshot(OpCode::Keccak256, &[0, 64], 0)).unwrap();
        assert_eq!(call.words_new, 2);
        assert_eq!(call.quad_cost, 6);
        assert_eq!(call.lin_cost, 12);
        assert_eq!(call.gas_mxp, 18);
        assert!(call.mtntop());
    }

    #[test]
    fn zero_sizes_are_noops() {
        let call = MxpCall::new(&snapshot(OpCode::Log(0), &[1 << 40, 0], 0)).unwrap();
        assert!(call.noop && !call.mxpx && !call.roob);
        assert_eq!(call.ct_max(), 0);

        let msize = MxpCall::new(&snapshot(OpCode::MSize, &[], 64)).unwrap();
        assert!(msize.noop);
    }

    #[test]
    fn huge_offsets() {
        // An offset past 2^32 raises mxpx without being ridiculously out of bounds.
        let call = MxpCall::new(&snapshot(OpCode::MStore8, &[1 << 32, 0], 0)).unwrap();
        assert!(call.mxpx && !call.roob);
        assert_eq!(call.ct_max(), 16);
        assert_eq!(call.expansion_gas(), u64::MAX);

        let mut roob = snapshot(OpCode::Return, &[0, 0], 0);
        roob.stack[0] = U256::one() << 200;
        let call = MxpCall::new(&roob).unwrap();
        assert!(call.roob && call.mxpx);
        assert_eq!(call.ct_max(), 0);
    }

    #[test]
    fn call_takes_the_larger_pair() {
        // gas, to, value, args offset, args size, return offset, return size
        let call = MxpCall::new(&snapshot(OpCode::Call, &[0, 0, 0, 0, 32, 64, 64], 0)).unwrap();
        assert_eq!(call.max_offset_1, U256::from(31));
        assert_eq!(call.max_offset_2, U256::from(127));
        assert!(!call.comp());
        assert_eq!(call.words_new, 4);
        assert_eq!(call.gas_mxp, 12);
    }

    #[test]
    fn code_deposit_only_when_deploying() {
        let mut return_snapshot = snapshot(OpCode::Return, &[0, 10], 32);
        let call = MxpCall::new(&return_snapshot).unwrap();
        assert_eq!(call.lin_cost, 2000);
        assert_eq!(call.gas_mxp, 0);

        return_snapshot.deploying = true;
        let call = MxpCall::new(&return_snapshot).unwrap();
        assert_eq!(call.gas_mxp, 2000);
    }
}
