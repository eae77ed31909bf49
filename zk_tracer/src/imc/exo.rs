//! Calls from a module row into the arithmetic and comparison modules.

use ethereum_types::U256;

use crate::wcp::WcpInstruction;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExoInstruction {
    Add,
    Div,
    Mod,
    Wcp(WcpInstruction),
}

impl ExoInstruction {
    pub const fn byte(self) -> u8 {
        match self {
            Self::Add => 0x01,
            Self::Div => 0x04,
            Self::Mod => 0x06,
            Self::Wcp(instruction) => instruction.byte(),
        }
    }
}

/// One outgoing call and its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExoCall {
    pub instruction: ExoInstruction,
    pub arg_1: U256,
    pub arg_2: U256,
    pub result: U256,
}

impl ExoCall {
    pub const fn is_add(&self) -> bool {
        matches!(self.instruction, ExoInstruction::Add)
    }

    pub const fn is_mod(&self) -> bool {
        matches!(self.instruction, ExoInstruction::Div | ExoInstruction::Mod)
    }

    pub const fn wcp(&self) -> Option<WcpInstruction> {
        match self.instruction {
            ExoInstruction::Wcp(instruction) => Some(instruction),
            _ => None,
        }
    }
}

/// The outgoing calls of a computation spanning several rows, at most one per
/// row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExoCalls {
    rows: Vec<Option<ExoCall>>,
}

impl ExoCalls {
    pub fn new(rows: usize) -> Self {
        Self {
            rows: vec![None; rows],
        }
    }

    fn record(
        &mut self,
        row: usize,
        instruction: ExoInstruction,
        arg_1: U256,
        arg_2: U256,
        result: U256,
    ) -> U256 {
        debug_assert!(self.rows[row].is_none(), "row {row} already calls out");
        self.rows[row] = Some(ExoCall {
            instruction,
            arg_1,
            arg_2,
            result,
        });
        result
    }

    fn compare(
        &mut self,
        row: usize,
        instruction: WcpInstruction,
        arg_1: U256,
        arg_2: U256,
    ) -> bool {
        let result = instruction.eval(arg_1, arg_2);
        self.record(row, ExoInstruction::Wcp(instruction), arg_1, arg_2, U256::from(result as u8));
        result
    }

    pub fn add(&mut self, row: usize, arg_1: U256, arg_2: U256) -> U256 {
        let (sum, _) = arg_1.overflowing_add(arg_2);
        self.record(row, ExoInstruction::Add, arg_1, arg_2, sum)
    }

    /// Integer division, following the EVM convention that dividing by zero
    /// yields zero.
    pub fn div(&mut self, row: usize, arg_1: U256, arg_2: U256) -> U256 {
        let quotient = arg_1.checked_div(arg_2).unwrap_or_default();
        self.record(row, ExoInstruction::Div, arg_1, arg_2, quotient)
    }

    pub fn modulo(&mut self, row: usize, arg_1: U256, arg_2: U256) -> U256 {
        let remainder = arg_1.checked_rem(arg_2).unwrap_or_default();
        self.record(row, ExoInstruction::Mod, arg_1, arg_2, remainder)
    }

    pub fn lt(&mut self, row: usize, arg_1: U256, arg_2: U256) -> bool {
        self.compare(row, WcpInstruction::Lt, arg_1, arg_2)
    }

    pub fn gt(&mut self, row: usize, arg_1: U256, arg_2: U256) -> bool {
        self.compare(row, WcpInstruction::Gt, arg_1, arg_2)
    }

    pub fn eq(&mut self, row: usize, arg_1: U256, arg_2: U256) -> bool {
        self.compare(row, WcpInstruction::Eq, arg_1, arg_2)
    }

    pub fn is_zero(&mut self, row: usize, arg: U256) -> bool {
        self.compare(row, WcpInstruction::IsZero, arg, U256::zero())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&ExoCall> {
        self.rows.get(row).and_then(Option::as_ref)
    }

    /// The comparisons, in row order.
    pub fn wcp_calls(&self) -> impl Iterator<Item = &ExoCall> {
        self.rows.iter().flatten().filter(|call| call.wcp().is_some())
    }
}
