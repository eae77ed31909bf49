use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

/// A byte range of the memory of some execution context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRange {
    pub offset: u64,
    pub length: u64,
}

impl MemoryRange {
    pub const EMPTY: Self = Self {
        offset: 0,
        length: 0,
    };

    pub const fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallFrameType {
    /// The frame of the transaction's target, or of its init code for a
    /// deployment transaction.
    Root,
    StandardCall,
    StaticCall,
    DelegateCall,
    CallCode,
    InitCode,
    /// Parent of a root frame, holding the call data of the transaction.
    PhantomCallDataHolder,
    /// Child frame of a precompile call, holding its output.
    PrecompileReturnData,
    /// Sentinel returned for unknown frames.
    #[default]
    Empty,
}

impl CallFrameType {
    /// Phantom frames do not count toward the call stack depth.
    pub const fn is_phantom(self) -> bool {
        matches!(self, Self::PhantomCallDataHolder | Self::Empty)
    }
}

/// Everything needed to open a new frame.
#[derive(Clone, Debug, Default)]
pub struct FrameDescriptor {
    pub frame_type: CallFrameType,
    pub context_number: u64,
    pub hub_stamp: u64,
    pub account_address: Address,
    pub byte_code_address: Address,
    pub caller_address: Address,
    pub value: U256,
    pub gas_at_entry: u64,
    pub gas_stipend: u64,
    pub is_static: bool,
    pub call_data: Vec<u8>,
    pub call_data_range: MemoryRange,
    pub return_at_range: MemoryRange,
    pub code_size: u64,
    pub deployment_number: u64,
}

/// An execution context. Frames are never removed from the call stack, so
/// that their revert status can be resolved once the conflation is over.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallFrame {
    pub(super) id: usize,
    pub(super) context_number: u64,
    pub(super) depth: usize,
    pub(super) parent_id: Option<usize>,
    pub(super) children: Vec<usize>,
    pub(super) frame_type: CallFrameType,

    pub(super) account_address: Address,
    pub(super) byte_code_address: Address,
    pub(super) caller_address: Address,
    pub(super) value: U256,
    pub(super) gas_at_entry: u64,
    pub(super) gas_stipend: u64,
    pub(super) is_static: bool,
    pub(super) code_size: u64,
    pub(super) deployment_number: u64,

    pub(super) call_data: Vec<u8>,
    pub(super) call_data_range: MemoryRange,
    pub(super) return_at_range: MemoryRange,
    pub(super) return_data_range: MemoryRange,
    pub(super) return_data: Vec<u8>,
    pub(super) return_data_source: Option<usize>,
    pub(super) output: Vec<u8>,

    pub(super) hub_stamp_at_entry: u64,
    pub(super) hub_stamp_at_exit: Option<u64>,

    pub(super) self_reverts: bool,
    pub(super) gets_reverted: bool,
    pub(super) revert_stamp: Option<u64>,
}

impl CallFrame {
    pub(super) fn new(
        id: usize,
        depth: usize,
        parent_id: Option<usize>,
        descriptor: FrameDescriptor,
    ) -> Self {
        Self {
            id,
            context_number: descriptor.context_number,
            depth,
            parent_id,
            frame_type: descriptor.frame_type,
            account_address: descriptor.account_address,
            byte_code_address: descriptor.byte_code_address,
            caller_address: descriptor.caller_address,
            value: descriptor.value,
            gas_at_entry: descriptor.gas_at_entry,
            gas_stipend: descriptor.gas_stipend,
            is_static: descriptor.is_static,
            code_size: descriptor.code_size,
            deployment_number: descriptor.deployment_number,
            call_data: descriptor.call_data,
            call_data_range: descriptor.call_data_range,
            return_at_range: descriptor.return_at_range,
            hub_stamp_at_entry: descriptor.hub_stamp,
            ..Default::default()
        }
    }

    pub const fn id(&self) -> usize {
        self.id
    }

    pub const fn context_number(&self) -> u64 {
        self.context_number
    }

    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub const fn parent_id(&self) -> Option<usize> {
        self.parent_id
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    pub const fn frame_type(&self) -> CallFrameType {
        self.frame_type
    }

    pub fn is_empty(&self) -> bool {
        self.frame_type == CallFrameType::Empty
    }

    pub const fn account_address(&self) -> Address {
        self.account_address
    }

    pub const fn byte_code_address(&self) -> Address {
        self.byte_code_address
    }

    pub const fn caller_address(&self) -> Address {
        self.caller_address
    }

    pub const fn value(&self) -> U256 {
        self.value
    }

    pub const fn gas_at_entry(&self) -> u64 {
        self.gas_at_entry
    }

    pub const fn gas_stipend(&self) -> u64 {
        self.gas_stipend
    }

    pub const fn is_static(&self) -> bool {
        self.is_static
    }

    pub const fn code_size(&self) -> u64 {
        self.code_size
    }

    pub const fn deployment_number(&self) -> u64 {
        self.deployment_number
    }

    pub fn call_data(&self) -> &[u8] {
        &self.call_data
    }

    pub const fn call_data_range(&self) -> MemoryRange {
        self.call_data_range
    }

    pub const fn return_at_range(&self) -> MemoryRange {
        self.return_at_range
    }

    /// Range, in the memory of [`Self::return_data_source`], of the latest
    /// return data handed back to this frame.
    pub const fn return_data_range(&self) -> MemoryRange {
        self.return_data_range
    }

    pub fn return_data(&self) -> &[u8] {
        &self.return_data
    }

    /// Id of the child frame that produced the latest return data.
    pub const fn return_data_source(&self) -> Option<usize> {
        self.return_data_source
    }

    /// Bytes returned or reverted by this frame.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub const fn hub_stamp_at_entry(&self) -> u64 {
        self.hub_stamp_at_entry
    }

    pub const fn hub_stamp_at_exit(&self) -> Option<u64> {
        self.hub_stamp_at_exit
    }

    pub const fn self_reverts(&self) -> bool {
        self.self_reverts
    }

    pub const fn gets_reverted(&self) -> bool {
        self.gets_reverted
    }

    /// Whether the effects of this frame are eventually undone.
    pub const fn will_revert(&self) -> bool {
        self.self_reverts || self.gets_reverted
    }

    pub const fn revert_stamp(&self) -> Option<u64> {
        self.revert_stamp
    }

    /// Lowers the revert stamp to `stamp`, if earlier.
    pub(super) fn lower_revert_stamp(&mut self, stamp: u64) {
        self.revert_stamp = Some(self.revert_stamp.map_or(stamp, |s| s.min(stamp)));
    }
}
