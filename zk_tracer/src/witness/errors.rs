use std::fmt;

use crate::imc::ImcModule;

/// Position of an opcode event in the input stream, attached to every host
/// error so that the failing event can be located.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventContext {
    pub hub_stamp: u64,
    pub pc: u64,
    pub opcode: u8,
    pub context_number: u64,
}

impl fmt::Display for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "opcode 0x{:02x} at pc {} (hub stamp {}, context {})",
            self.opcode, self.pc, self.hub_stamp, self.context_number
        )
    }
}

/// A logic defect of the tracer itself. These are never recovered from: a
/// wrong or missing row silently produces an invalid proof.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("{column} has already been set")]
    ColumnAlreadySet { column: &'static str },

    #[error("{column} has not been filled")]
    ColumnNotFilled { column: &'static str },

    #[error("{column} has invalid width: value needs {bytes} bytes, column holds {width}")]
    InvalidWidth {
        column: &'static str,
        width: usize,
        bytes: usize,
    },

    #[error("{module} has no column at index {index}")]
    UnknownColumn { module: &'static str, index: usize },

    #[error("cannot build {module} trace with a non-validated row")]
    OpenRow { module: &'static str },

    #[error("{0} has already been called for this opcode")]
    ImcCalledTwice(ImcModule),

    #[error("call stack overflow: depth {depth} exceeds {max}")]
    CallStackOverflow { depth: usize, max: usize },

    #[error("call stack underflow")]
    CallStackUnderflow,

    #[error("no call frame has id {0}")]
    UnknownFrame(usize),

    #[error("context {context_number} already self-reverts")]
    SelfRevertTwice { context_number: u64 },

    #[error("{module} has no case for {instruction}")]
    UnsupportedInstruction {
        module: &'static str,
        instruction: String,
    },

    #[error("hash-data id {id} does not exceed previous id {previous}")]
    NonIncreasingId { id: u64, previous: u64 },

    #[error("no deployment is in progress at {0:?}")]
    NotUnderDeployment(ethereum_types::Address),

    #[error("no transaction is in progress")]
    NoActiveTransaction,

    #[error("a transaction is already in progress")]
    TransactionInProgress,
}

/// An input fact the host did not provide for an opcode that needs it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MissingInput {
    #[error("stack item {0}")]
    StackItem(usize),

    #[error("account state")]
    Account,

    #[error("storage state")]
    Storage,

    #[error("memory read of {size} bytes at offset {offset}")]
    MemoryRead { offset: u64, size: u64 },

    #[error("created address")]
    CreatedAddress,
}

/// A malformed or incomplete event coming from the host interpreter. No row is
/// committed for the offending event.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("malformed event for {context}: {reason}")]
    MalformedEvent {
        context: EventContext,
        reason: String,
    },

    #[error("missing {missing} for {context}")]
    MissingInput {
        context: EventContext,
        missing: MissingInput,
    },

    #[error("{context} reported at depth {reported}, call stack is at depth {expected}")]
    DepthMismatch {
        context: EventContext,
        reported: usize,
        expected: usize,
    },

    #[error("{module} computed {condition} = {computed} for {context}, host disagrees")]
    InconsistentException {
        context: EventContext,
        module: &'static str,
        condition: &'static str,
        computed: bool,
    },

    #[error("projected gas {projected} differs from charged gas {charged} for {context}")]
    GasMismatch {
        context: EventContext,
        projected: u64,
        charged: u64,
    },
}

impl HostError {
    pub(crate) fn malformed(context: EventContext, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            context,
            reason: reason.into(),
        }
    }

    pub(crate) const fn missing(context: EventContext, missing: MissingInput) -> Self {
        Self::MissingInput { context, missing }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TracerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("failed to write trace: {0}")]
    Io(#[from] std::io::Error),
}

pub type TracerResult<T> = Result<T, TracerError>;
