use std::fmt;

/// Instruction families, grouping opcodes by the modules that arithmetize
/// their semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstructionFamily {
    Add,
    Mod,
    Mul,
    Ext,
    Wcp,
    Bin,
    Shf,
    Kec,
    Context,
    Account,
    Copy,
    Transaction,
    Batch,
    StackRam,
    Storage,
    Transient,
    Jump,
    MachineState,
    PushPop,
    Dup,
    Swap,
    Log,
    Create,
    Call,
    Halt,
    Invalid,
}

macro_rules! simple_opcodes {
    ($($variant:ident = $byte:literal, $mnemonic:literal, $family:ident, $inputs:literal;)*) => {
        /// A decoded EVM instruction, as of Cancun.
        ///
        /// Sized families carry their size: `Push(n)` pushes `n` bytes (`PUSH0` is
        /// `Push(0)`), `Dup(n)` and `Swap(n)` range over 1 to 16 and `Log(n)` over
        /// 0 to 4.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum OpCode {
            $($variant,)*
            Push(u8),
            Dup(u8),
            Swap(u8),
            Log(u8),
        }

        impl OpCode {
            fn decode_simple(byte: u8) -> Option<Self> {
                match byte {
                    $($byte => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub const fn byte(self) -> u8 {
                match self {
                    $(Self::$variant => $byte,)*
                    Self::Push(n) => 0x5f + n,
                    Self::Dup(n) => 0x7f + n,
                    Self::Swap(n) => 0x8f + n,
                    Self::Log(n) => 0xa0 + n,
                }
            }

            pub const fn family(self) -> InstructionFamily {
                match self {
                    $(Self::$variant => InstructionFamily::$family,)*
                    Self::Push(_) => InstructionFamily::PushPop,
                    Self::Dup(_) => InstructionFamily::Dup,
                    Self::Swap(_) => InstructionFamily::Swap,
                    Self::Log(_) => InstructionFamily::Log,
                }
            }

            /// Number of stack items consumed by the instruction.
            pub const fn stack_inputs(self) -> usize {
                match self {
                    $(Self::$variant => $inputs,)*
                    Self::Push(_) => 0,
                    Self::Dup(n) => n as usize,
                    Self::Swap(n) => n as usize + 1,
                    Self::Log(n) => n as usize + 2,
                }
            }

            fn simple_mnemonic(self) -> Option<&'static str> {
                match self {
                    $(Self::$variant => Some($mnemonic),)*
                    _ => None,
                }
            }
        }
    };
}

simple_opcodes! {
    Stop = 0x00, "STOP", Halt, 0;
    Add = 0x01, "ADD", Add, 2;
    Mul = 0x02, "MUL", Mul, 2;
    Sub = 0x03, "SUB", Add, 2;
    Div = 0x04, "DIV", Mod, 2;
    SDiv = 0x05, "SDIV", Mod, 2;
    Mod = 0x06, "MOD", Mod, 2;
    SMod = 0x07, "SMOD", Mod, 2;
    AddMod = 0x08, "ADDMOD", Ext, 3;
    MulMod = 0x09, "MULMOD", Ext, 3;
    Exp = 0x0a, "EXP", Mul, 2;
    SignExtend = 0x0b, "SIGNEXTEND", Bin, 2;
    Lt = 0x10, "LT", Wcp, 2;
    Gt = 0x11, "GT", Wcp, 2;
    Slt = 0x12, "SLT", Wcp, 2;
    Sgt = 0x13, "SGT", Wcp, 2;
    Eq = 0x14, "EQ", Wcp, 2;
    IsZero = 0x15, "ISZERO", Wcp, 1;
    And = 0x16, "AND", Bin, 2;
    Or = 0x17, "OR", Bin, 2;
    Xor = 0x18, "XOR", Bin, 2;
    Not = 0x19, "NOT", Bin, 1;
    Byte = 0x1a, "BYTE", Bin, 2;
    Shl = 0x1b, "SHL", Shf, 2;
    Shr = 0x1c, "SHR", Shf, 2;
    Sar = 0x1d, "SAR", Shf, 2;
    Keccak256 = 0x20, "KECCAK256", Kec, 2;
    Address = 0x30, "ADDRESS", Context, 0;
    Balance = 0x31, "BALANCE", Account, 1;
    Origin = 0x32, "ORIGIN", Transaction, 0;
    Caller = 0x33, "CALLER", Context, 0;
    CallValue = 0x34, "CALLVALUE", Context, 0;
    CallDataLoad = 0x35, "CALLDATALOAD", Context, 1;
    CallDataSize = 0x36, "CALLDATASIZE", Context, 0;
    CallDataCopy = 0x37, "CALLDATACOPY", Copy, 3;
    CodeSize = 0x38, "CODESIZE", Context, 0;
    CodeCopy = 0x39, "CODECOPY", Copy, 3;
    GasPrice = 0x3a, "GASPRICE", Transaction, 0;
    ExtCodeSize = 0x3b, "EXTCODESIZE", Account, 1;
    ExtCodeCopy = 0x3c, "EXTCODECOPY", Copy, 4;
    ReturnDataSize = 0x3d, "RETURNDATASIZE", Context, 0;
    ReturnDataCopy = 0x3e, "RETURNDATACOPY", Copy, 3;
    ExtCodeHash = 0x3f, "EXTCODEHASH", Account, 1;
    BlockHash = 0x40, "BLOCKHASH", Batch, 1;
    Coinbase = 0x41, "COINBASE", Batch, 0;
    Timestamp = 0x42, "TIMESTAMP", Batch, 0;
    Number = 0x43, "NUMBER", Batch, 0;
    PrevRandao = 0x44, "PREVRANDAO", Batch, 0;
    GasLimit = 0x45, "GASLIMIT", Batch, 0;
    ChainId = 0x46, "CHAINID", Batch, 0;
    SelfBalance = 0x47, "SELFBALANCE", Account, 0;
    BaseFee = 0x48, "BASEFEE", Batch, 0;
    BlobHash = 0x49, "BLOBHASH", Transaction, 1;
    BlobBaseFee = 0x4a, "BLOBBASEFEE", Batch, 0;
    Pop = 0x50, "POP", PushPop, 1;
    MLoad = 0x51, "MLOAD", StackRam, 1;
    MStore = 0x52, "MSTORE", StackRam, 2;
    MStore8 = 0x53, "MSTORE8", StackRam, 2;
    SLoad = 0x54, "SLOAD", Storage, 1;
    SStore = 0x55, "SSTORE", Storage, 2;
    Jump = 0x56, "JUMP", Jump, 1;
    JumpI = 0x57, "JUMPI", Jump, 2;
    Pc = 0x58, "PC", MachineState, 0;
    MSize = 0x59, "MSIZE", MachineState, 0;
    Gas = 0x5a, "GAS", MachineState, 0;
    JumpDest = 0x5b, "JUMPDEST", MachineState, 0;
    TLoad = 0x5c, "TLOAD", Transient, 1;
    TStore = 0x5d, "TSTORE", Transient, 2;
    MCopy = 0x5e, "MCOPY", Copy, 3;
    Create = 0xf0, "CREATE", Create, 3;
    Call = 0xf1, "CALL", Call, 7;
    CallCode = 0xf2, "CALLCODE", Call, 7;
    Return = 0xf3, "RETURN", Halt, 2;
    DelegateCall = 0xf4, "DELEGATECALL", Call, 6;
    Create2 = 0xf5, "CREATE2", Create, 4;
    StaticCall = 0xfa, "STATICCALL", Call, 6;
    Revert = 0xfd, "REVERT", Halt, 2;
    Invalid = 0xfe, "INVALID", Invalid, 0;
    SelfDestruct = 0xff, "SELFDESTRUCT", Halt, 1;
}

impl Default for OpCode {
    fn default() -> Self {
        Self::Stop
    }
}

impl OpCode {
    /// Decodes an opcode byte, or returns `None` if the byte is unassigned.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x5f..=0x7f => Some(Self::Push(byte - 0x5f)),
            0x80..=0x8f => Some(Self::Dup(byte - 0x7f)),
            0x90..=0x9f => Some(Self::Swap(byte - 0x8f)),
            0xa0..=0xa4 => Some(Self::Log(byte - 0xa0)),
            _ => Self::decode_simple(byte),
        }
    }

    /// Decodes an opcode byte, mapping unassigned bytes to [`OpCode::Invalid`].
    pub fn decode(byte: u8) -> Self {
        Self::from_byte(byte).unwrap_or_else(|| {
            log::warn!("Invalid opcode: 0x{:02x}", byte);
            Self::Invalid
        })
    }

    pub const fn is_call(self) -> bool {
        matches!(self.family(), InstructionFamily::Call)
    }

    pub const fn is_create(self) -> bool {
        matches!(self.family(), InstructionFamily::Create)
    }

    /// Whether the instruction writes state, and is forbidden in a static
    /// context.
    pub const fn writes_state(self) -> bool {
        matches!(
            self,
            Self::SStore
                | Self::TStore
                | Self::Log(_)
                | Self::Create
                | Self::Create2
                | Self::SelfDestruct
        )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.simple_mnemonic(), self) {
            (Some(mnemonic), _) => f.write_str(mnemonic),
            (None, Self::Push(n)) => write!(f, "PUSH{n}"),
            (None, Self::Dup(n)) => write!(f, "DUP{n}"),
            (None, Self::Swap(n)) => write!(f, "SWAP{n}"),
            (None, Self::Log(n)) => write!(f, "LOG{n}"),
            (None, _) => write!(f, "0x{:02x}", self.byte()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_assigned_byte_round_trips() {
        let assigned = (0..=u8::MAX)
            .filter_map(|byte| OpCode::from_byte(byte).map(|op| (byte, op)))
            .collect::<Vec<_>>();
        for (byte, op) in &assigned {
            assert_eq!(op.byte(), *byte, "{op}");
        }
        // 79 simple opcodes, 33 pushes, 16 dups, 16 swaps and 5 logs.
        assert_eq!(assigned.len(), 149);
    }

    #[test]
    fn sized_families() {
        assert_eq!(OpCode::from_byte(0x5f), Some(OpCode::Push(0)));
        assert_eq!(OpCode::from_byte(0x7f), Some(OpCode::Push(32)));
        assert_eq!(OpCode::from_byte(0x80), Some(OpCode::Dup(1)));
        assert_eq!(OpCode::from_byte(0x9f), Some(OpCode::Swap(16)));
        assert_eq!(OpCode::from_byte(0xa4), Some(OpCode::Log(4)));
        assert_eq!(OpCode::Swap(16).stack_inputs(), 17);
        assert_eq!(OpCode::Log(2).stack_inputs(), 4);
        assert_eq!(OpCode::Push(32).to_string(), "PUSH32");
    }

    #[test]
    fn unassigned_bytes_decode_to_invalid() {
        for byte in [0x0c, 0x1e, 0x21, 0x4b, 0xa5, 0xef, 0xf6, 0xfb, 0xfc] {
            assert_eq!(OpCode::from_byte(byte), None);
            assert_eq!(OpCode::decode(byte), OpCode::Invalid);
        }
    }

    #[test]
    fn families() {
        assert_eq!(OpCode::StaticCall.family(), InstructionFamily::Call);
        assert_eq!(OpCode::Create2.family(), InstructionFamily::Create);
        assert_eq!(OpCode::MCopy.family(), InstructionFamily::Copy);
        assert!(OpCode::SStore.writes_state());
        assert!(!OpCode::SLoad.writes_state());
    }
}
