use ethereum_types::{Address, U256};
use zk_tracer_common::words_for;

use crate::opcode::OpCode;
use crate::structlog::{AccountFacts, ExceptionalHalt, MemoryChunk, OpcodeEvent, StorageFacts};
use crate::witness::errors::{EventContext, HostError, MissingInput};

/// Everything the tracer knows about an opcode before it runs: the host's
/// event, enriched with the facts of the executing frame.
#[derive(Clone, Debug, Default)]
pub struct OperandSnapshot {
    pub opcode: OpCode,
    pub context: EventContext,
    /// Stack items, from bottom to top.
    pub stack: Vec<U256>,
    pub memory_size: u64,
    pub memory: Vec<MemoryChunk>,
    pub gas: u64,
    pub gas_cost: u64,
    pub exception: Option<ExceptionalHalt>,
    pub account: Option<AccountFacts>,
    pub storage: Option<StorageFacts>,
    pub self_balance: U256,
    pub self_nonce: u64,
    pub created_address: Option<Address>,

    pub depth: usize,
    pub is_static: bool,
    pub deploying: bool,
    pub call_data_size: u64,
    pub return_data_size: u64,
    /// Length of the range of the caller's memory expecting the output.
    pub return_at_capacity: u64,
    pub code_size: u64,
}

impl OperandSnapshot {
    pub fn from_event(event: &OpcodeEvent, opcode: OpCode, context: EventContext) -> Self {
        Self {
            opcode,
            context,
            stack: event.stack.clone(),
            memory_size: event.memory_size,
            memory: event.memory.clone(),
            gas: event.gas,
            gas_cost: event.gas_cost,
            exception: event.exception,
            account: event.account,
            storage: event.storage,
            self_balance: event.self_balance,
            self_nonce: event.self_nonce,
            created_address: event.created_address,
            depth: event.depth,
            ..Default::default()
        }
    }

    /// Stack item `index`, counting from the top of the stack.
    pub fn stack(&self, index: usize) -> Result<U256, HostError> {
        self.stack
            .len()
            .checked_sub(index + 1)
            .map(|i| self.stack[i])
            .ok_or(HostError::missing(self.context, MissingInput::StackItem(index)))
    }

    /// Stack item `index` as a small integer, saturating at `u64::MAX`.
    pub fn stack_u64(&self, index: usize) -> Result<u64, HostError> {
        self.stack(index).map(saturating_u64)
    }

    pub fn account(&self) -> Result<AccountFacts, HostError> {
        self.account
            .ok_or(HostError::missing(self.context, MissingInput::Account))
    }

    pub fn storage(&self) -> Result<StorageFacts, HostError> {
        self.storage
            .ok_or(HostError::missing(self.context, MissingInput::Storage))
    }

    /// Memory size in words, before the opcode.
    pub fn memory_words(&self) -> u64 {
        words_for(self.memory_size)
    }

    pub const fn has_exception(&self) -> bool {
        self.exception.is_some()
    }

    pub fn has_stack_exception(&self) -> bool {
        self.exception
            .is_some_and(ExceptionalHalt::is_stack_exception)
    }

    /// Reads `size` bytes of memory at `offset`. Bytes past the current memory
    /// size read as zero.
    pub fn memory_slice(&self, offset: u64, size: u64) -> Result<Vec<u8>, HostError> {
        let missing =
            || HostError::missing(self.context, MissingInput::MemoryRead { offset, size });
        let len = usize::try_from(size).map_err(|_| missing())?;
        let mut bytes = vec![0; len];
        let end = offset.saturating_add(size).min(self.memory_size);
        if offset >= end {
            return Ok(bytes);
        }
        let chunk = self
            .memory
            .iter()
            .find(|chunk| {
                chunk.offset <= offset && chunk.offset + chunk.bytes.len() as u64 >= end
            })
            .ok_or_else(missing)?;
        let start = (offset - chunk.offset) as usize;
        let stop = (end - chunk.offset) as usize;
        bytes[..stop - start].copy_from_slice(&chunk.bytes[start..stop]);
        Ok(bytes)
    }
}

/// Narrows a word to `u64`, saturating.
pub(crate) fn saturating_u64(word: U256) -> u64 {
    if word > U256::from(u64::MAX) {
        u64::MAX
    } else {
        word.low_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_is_indexed_from_the_top() {
        let snapshot = OperandSnapshot {
            stack: vec![U256::from(1), U256::from(2), U256::from(3)],
            ..Default::default()
        };
        assert_eq!(snapshot.stack(0), Ok(U256::from(3)));
        assert_eq!(snapshot.stack(2), Ok(U256::from(1)));
        assert!(matches!(
            snapshot.stack(3),
            Err(HostError::MissingInput {
                missing: MissingInput::StackItem(3),
                ..
            })
        ));
    }

    #[test]
    fn memory_past_the_end_reads_as_zero() {
        let snapshot = OperandSnapshot {
            memory_size: 32,
            memory: vec![MemoryChunk {
                offset: 16,
                bytes: vec![0xaa; 16],
            }],
            ..Default::default()
        };
        let bytes = snapshot.memory_slice(24, 16).unwrap();
        assert_eq!(&bytes[..8], &[0xaa; 8]);
        assert_eq!(&bytes[8..], &[0; 8]);
        assert_eq!(snapshot.memory_slice(64, 4).unwrap(), vec![0; 4]);
        assert!(snapshot.memory_slice(0, 4).is_err());
    }
}
