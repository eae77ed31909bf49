//! Gas projection: the decomposition of the cost of an opcode into named
//! components, computed before the opcode runs.

mod call;
mod sstore;

pub use call::{all_but_one_64th, CallGas};
pub use sstore::{sstore_cost, SStoreBucket, SStoreCost};
use zk_tracer_common::gas::*;
use zk_tracer_common::{byte_len, words_for};

use crate::mxp::{MxpCall, MxpType};
use crate::opcode::OpCode;
use crate::witness::errors::HostError;
use crate::witness::state::OperandSnapshot;

/// Constant-cost tiers of the fee schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GasTier {
    Zero,
    Base,
    VeryLow,
    Low,
    Mid,
    High,
    JumpDest,
    BlockHash,
    WarmAccess,
}

impl GasTier {
    pub const fn cost(self) -> u64 {
        match self {
            Self::Zero => G_ZERO,
            Self::Base => G_BASE,
            Self::VeryLow => G_VERY_LOW,
            Self::Low => G_LOW,
            Self::Mid => G_MID,
            Self::High => G_HIGH,
            Self::JumpDest => G_JUMPDEST,
            Self::BlockHash => G_BLOCKHASH,
            Self::WarmAccess => G_WARM_ACCESS,
        }
    }
}

/// How the cost of an opcode is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GasCategory {
    Fixed(GasTier),
    Exp,
    Keccak,
    /// CALLDATACOPY, CODECOPY, RETURNDATACOPY and MCOPY.
    Copy,
    ExtCodeCopy,
    /// BALANCE, EXTCODESIZE and EXTCODEHASH.
    AccountAccess,
    SLoad,
    SStore,
    Log(u8),
    Create,
    Create2,
    Call,
    SelfDestruct,
    /// MLOAD, MSTORE and MSTORE8.
    Memory,
    /// RETURN and REVERT, which only pay for memory expansion.
    MemoryOnly,
}

impl GasCategory {
    pub const fn of(opcode: OpCode) -> Self {
        use OpCode::*;

        match opcode {
            Stop | Invalid => Self::Fixed(GasTier::Zero),
            Address | Origin | Caller | CallValue | CallDataSize | CodeSize | GasPrice
            | Coinbase | Timestamp | Number | PrevRandao | GasLimit | ChainId | ReturnDataSize
            | Pop | Pc | MSize | Gas | BaseFee | BlobBaseFee | Push(0) => {
                Self::Fixed(GasTier::Base)
            }
            Add | Sub | Not | Lt | Gt | Slt | Sgt | Eq | IsZero | And | Or | Xor | Byte | Shl
            | Shr | Sar | CallDataLoad | Push(_) | Dup(_) | Swap(_) | BlobHash => {
                Self::Fixed(GasTier::VeryLow)
            }
            Mul | Div | SDiv | Mod | SMod | SignExtend | SelfBalance => Self::Fixed(GasTier::Low),
            AddMod | MulMod | Jump => Self::Fixed(GasTier::Mid),
            JumpI => Self::Fixed(GasTier::High),
            JumpDest => Self::Fixed(GasTier::JumpDest),
            BlockHash => Self::Fixed(GasTier::BlockHash),
            TLoad | TStore => Self::Fixed(GasTier::WarmAccess),
            Exp => Self::Exp,
            Keccak256 => Self::Keccak,
            CallDataCopy | CodeCopy | ReturnDataCopy | MCopy => Self::Copy,
            ExtCodeCopy => Self::ExtCodeCopy,
            Balance | ExtCodeSize | ExtCodeHash => Self::AccountAccess,
            SLoad => Self::SLoad,
            SStore => Self::SStore,
            Log(n) => Self::Log(n),
            Create => Self::Create,
            Create2 => Self::Create2,
            Call | CallCode | DelegateCall | StaticCall => Self::Call,
            SelfDestruct => Self::SelfDestruct,
            MLoad | MStore | MStore8 => Self::Memory,
            Return | Revert => Self::MemoryOnly,
        }
    }

    /// The part of the cost that does not depend on operands.
    pub const fn static_cost(self) -> u64 {
        match self {
            Self::Fixed(tier) => tier.cost(),
            Self::Exp => G_EXP,
            Self::Keccak => G_KECCAK256,
            Self::Copy | Self::Memory => G_VERY_LOW,
            Self::Log(n) => G_LOG + G_LOG_TOPIC * n as u64,
            Self::Create | Self::Create2 => G_CREATE,
            Self::SelfDestruct => G_SELFDESTRUCT,
            Self::ExtCodeCopy
            | Self::AccountAccess
            | Self::SLoad
            | Self::SStore
            | Self::Call
            | Self::MemoryOnly => 0,
        }
    }
}

/// The cost of one opcode, split into named components.
///
/// The components sum to what the EVM charges for the opcode, including the
/// gas handed to a child context. The stipend is granted on top of the child
/// allowance and is not charged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasProjection {
    pub category: GasCategory,
    pub static_cost: u64,
    pub memory_expansion: u64,
    /// Costs proportional to a payload size.
    pub linear: u64,
    pub access: u64,
    pub account_creation: u64,
    pub value_transfer: u64,
    pub storage: u64,
    pub stipend: u64,
    pub child_allowance: u64,
    pub refund: i64,
    pub sstore: Option<SStoreBucket>,
}

impl GasProjection {
    pub const fn new(category: GasCategory) -> Self {
        Self {
            category,
            static_cost: category.static_cost(),
            memory_expansion: 0,
            linear: 0,
            access: 0,
            account_creation: 0,
            value_transfer: 0,
            storage: 0,
            stipend: 0,
            child_allowance: 0,
            refund: 0,
            sstore: None,
        }
    }

    /// Cost paid before any child context is spawned.
    pub fn upfront(&self) -> u64 {
        [
            self.memory_expansion,
            self.linear,
            self.access,
            self.account_creation,
            self.value_transfer,
            self.storage,
        ]
        .into_iter()
        .fold(self.static_cost, u64::saturating_add)
    }

    pub fn total(&self) -> u64 {
        self.upfront().saturating_add(self.child_allowance)
    }

    pub const fn refund(&self) -> i64 {
        self.refund
    }
}

fn access_cost(warm: bool) -> u64 {
    if warm {
        G_WARM_ACCESS
    } else {
        G_COLD_ACCOUNT_ACCESS
    }
}

/// Projects the cost of the opcode of `snapshot`.
pub fn project(snapshot: &OperandSnapshot) -> Result<GasProjection, HostError> {
    let opcode = snapshot.opcode;
    let category = GasCategory::of(opcode);
    let mut projection = GasProjection::new(category);

    let mxp = match MxpType::of(opcode) {
        Some(_) => Some(MxpCall::new(snapshot)?),
        None => None,
    };
    projection.memory_expansion = mxp.as_ref().map_or(0, MxpCall::expansion_gas);
    let size_words = |index| snapshot.stack_u64(index).map(words_for);

    match category {
        GasCategory::Fixed(_) | GasCategory::Memory | GasCategory::MemoryOnly => {}
        GasCategory::Exp => {
            projection.linear = G_EXP_BYTE * byte_len(snapshot.stack(1)?);
        }
        GasCategory::Keccak => {
            projection.linear = G_KECCAK256_WORD.saturating_mul(size_words(1)?);
        }
        GasCategory::Copy => {
            projection.linear = G_COPY.saturating_mul(size_words(2)?);
        }
        GasCategory::ExtCodeCopy => {
            projection.access = access_cost(snapshot.account()?.warm);
            projection.linear = G_COPY.saturating_mul(size_words(3)?);
        }
        GasCategory::AccountAccess => {
            projection.access = access_cost(snapshot.account()?.warm);
        }
        GasCategory::SLoad => {
            projection.access = if snapshot.storage()?.warm {
                G_WARM_ACCESS
            } else {
                G_COLD_SLOAD
            };
        }
        GasCategory::SStore => {
            let cost = sstore_cost(snapshot.storage()?, snapshot.stack(1)?);
            projection.storage = cost.storage;
            projection.access = cost.access;
            projection.refund = cost.refund;
            projection.sstore = Some(cost.bucket);
        }
        GasCategory::Log(_) => {
            projection.linear = G_LOG_DATA.saturating_mul(snapshot.stack_u64(1)?);
        }
        GasCategory::Create | GasCategory::Create2 => {
            let words = size_words(2)?;
            let per_word = match category {
                GasCategory::Create2 => G_INIT_CODE_WORD + G_KECCAK256_WORD,
                _ => G_INIT_CODE_WORD,
            };
            projection.linear = per_word.saturating_mul(words);
            projection.child_allowance = snapshot
                .gas
                .checked_sub(projection.upfront())
                .map_or(0, all_but_one_64th);
        }
        GasCategory::Call => {
            let gas = CallGas::new(snapshot, projection.memory_expansion)?;
            projection.access = gas.access;
            projection.value_transfer = gas.value_transfer;
            projection.account_creation = gas.account_creation;
            projection.stipend = gas.stipend;
            projection.child_allowance = gas.child_allowance(snapshot.gas, projection.upfront());
        }
        GasCategory::SelfDestruct => {
            let beneficiary = snapshot.account()?;
            if !beneficiary.warm {
                projection.access = G_COLD_ACCOUNT_ACCESS;
            }
            if !beneficiary.exists && !snapshot.self_balance.is_zero() {
                projection.account_creation = G_NEW_ACCOUNT;
            }
        }
    }
    Ok(projection)
}
