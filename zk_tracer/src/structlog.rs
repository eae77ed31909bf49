//! Execution events emitted by the host interpreter, as read from JSON.
//!
//! The input of the tracer is a flat sequence of [`TraceEvent`]s, tagged by
//! their `kind`. Words and addresses are `0x`-prefixed hex strings, bytes are
//! hex strings with an optional `0x` prefix.

use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::callstack::{CallFrameType, MemoryRange};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    TransactionStart(TransactionStart),
    Opcode(OpcodeEvent),
    ContextEnter(ContextEnter),
    ContextExit(ContextExit),
    TransactionEnd,
    BlockEnd,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStart {
    pub sender: Address,
    /// `None` for a deployment transaction.
    #[serde(default)]
    pub recipient: Option<Address>,
    /// Address of the deployed account, for a deployment transaction.
    #[serde(default)]
    pub created_address: Option<Address>,
    #[serde(default)]
    pub value: U256,
    pub gas: u64,
    /// Call data, or init code for a deployment transaction.
    #[serde(default, with = "hex_bytes")]
    pub call_data: Vec<u8>,
    #[serde(default)]
    pub code_size: u64,
    #[serde(default)]
    pub recipient_exists: bool,
    #[serde(default)]
    pub recipient_warm: bool,
}

/// Why the host aborted the current context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionalHalt {
    StackUnderflow,
    StackOverflow,
    OutOfGas,
    MemoryExpansion,
    InvalidJumpDestination,
    StaticViolation,
    ReturnDataOutOfBounds,
    OutOfSStore,
    InvalidCodePrefix,
    MaxCodeSizeExceeded,
    InvalidOpcode,
}

impl ExceptionalHalt {
    pub const fn is_stack_exception(self) -> bool {
        matches!(self, Self::StackUnderflow | Self::StackOverflow)
    }
}

/// Facts about the account an opcode targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFacts {
    pub exists: bool,
    pub warm: bool,
    #[serde(default)]
    pub balance: U256,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default)]
    pub has_code: bool,
    #[serde(default)]
    pub code_size: u64,
}

/// Facts about the storage slot an opcode targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageFacts {
    /// Value at the start of the transaction.
    pub original: U256,
    pub current: U256,
    pub warm: bool,
}

/// Contents of memory at `offset`, before the opcode ran.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryChunk {
    pub offset: u64,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

/// One opcode about to be executed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpcodeEvent {
    pub pc: u64,
    pub op: u8,
    /// Gas available before the opcode.
    pub gas: u64,
    /// Gas charged by the host for the opcode.
    pub gas_cost: u64,
    /// Depth of the executing context, 0 for the root context.
    pub depth: usize,
    /// Stack items, from bottom to top.
    #[serde(default)]
    pub stack: Vec<U256>,
    /// Memory size in bytes.
    #[serde(default)]
    pub memory_size: u64,
    #[serde(default)]
    pub memory: Vec<MemoryChunk>,
    #[serde(default)]
    pub exception: Option<ExceptionalHalt>,
    /// Target of account-touching opcodes.
    #[serde(default)]
    pub account: Option<AccountFacts>,
    #[serde(default)]
    pub storage: Option<StorageFacts>,
    /// Balance of the executing account.
    #[serde(default)]
    pub self_balance: U256,
    /// Nonce of the executing account.
    #[serde(default)]
    pub self_nonce: u64,
    /// Address of the account created by CREATE or CREATE2.
    #[serde(default)]
    pub created_address: Option<Address>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEnter {
    pub frame_type: CallFrameType,
    pub address: Address,
    pub code_address: Address,
    pub caller: Address,
    #[serde(default)]
    pub value: U256,
    pub gas: u64,
    #[serde(default, with = "hex_bytes")]
    pub call_data: Vec<u8>,
    #[serde(default)]
    pub call_data_range: MemoryRange,
    #[serde(default)]
    pub return_at_range: MemoryRange,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub code_size: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextExit {
    #[serde(default, with = "hex_bytes")]
    pub output: Vec<u8>,
    /// Range of the output in the memory of the exiting context.
    #[serde(default)]
    pub output_range: MemoryRange,
    pub success: bool,
}

/// (De)serializes bytes as a hex string, with an optional `0x` prefix.
pub(crate) mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let data = String::deserialize(deserializer)?;
        let data = data
            .strip_prefix("0x")
            .or_else(|| data.strip_prefix("0X"))
            .unwrap_or(&data);
        hex::decode(data).map_err(Error::custom)
    }
}
