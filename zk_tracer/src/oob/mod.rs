//! Out-of-bounds checks: the bounds and abort conditions of instructions and
//! precompiles, justified through lookups into the ADD, MOD and WCP modules.
//!
//! Every call lays out its arguments and results in nine 16-byte data slots.
//! The layout of each instruction is documented on its [`OobCall`] variant,
//! slots not listed are zero.

pub(crate) mod columns;

use ethereum_types::U256;
use zk_tracer_common::gas::{G_CALL_STIPEND, G_QUAD_DIVISOR, MODEXP_MIN_COST};
use zk_tracer_common::{hi_lo, EIP2681_MAX_NONCE, MAX_CALL_STACK_DEPTH, MAX_CODE_SIZE};

use crate::imc::exo::ExoCalls;
use crate::imc::{unsupported, ImcModule};
use crate::opcode::OpCode;
use crate::structlog::ExceptionalHalt;
use crate::witness::errors::TracerResult;
use crate::witness::state::OperandSnapshot;

/// Precompiles sharing the common checks on call data and return capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommonPrecompile {
    EcRecover,
    Sha2,
    Ripemd,
    Identity,
    EcAdd,
    EcMul,
    EcPairing,
}

/// Which of the three byte sizes a MODEXP_XBS call bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum XbsOperand {
    Bbs,
    Ebs,
    Mbs,
}

/// An OOB instruction and its inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OobCall {
    /// `[pc_new_hi, pc_new_lo, _, _, code_size, _, guaranteed_exception,
    /// must_be_attempted, _]`
    Jump { pc_new: U256, code_size: u64 },
    /// `[pc_new_hi, pc_new_lo, condition_hi, condition_lo, code_size,
    /// not_attempted, guaranteed_exception, must_be_attempted, _]`
    JumpI {
        pc_new: U256,
        condition: U256,
        code_size: u64,
    },
    /// `[offset_hi, offset_lo, size_hi, size_lo, return_data_size, _, rdcx, _,
    /// _]`
    ReturnDataCopy {
        offset: U256,
        size: U256,
        return_data_size: u64,
    },
    /// `[offset_hi, offset_lo, _, _, call_data_size, _, out_of_bounds, _, _]`
    CallDataLoad { offset: U256, call_data_size: u64 },
    /// `[_, _, _, _, gas, _, sstorex, _, _]`
    SStore { gas: u64 },
    /// `[size_hi, size_lo, _, _, _, _, max_code_size_exception, _, _]`
    Deployment { size: U256 },
    /// `[value_hi, value_lo, _, _, _, _, value_is_nonzero, value_is_zero, _]`
    XCall { value: U256 },
    /// `[value_hi, value_lo, balance, _, _, depth, value_is_zero, aborting,
    /// _]`
    Call {
        value: U256,
        balance: U256,
        depth: usize,
    },
    /// `[value_hi, value_lo, balance, nonce, has_code, depth, aborting,
    /// failure, creator_nonce]`
    Create {
        value: U256,
        balance: U256,
        nonce: u64,
        has_code: bool,
        depth: usize,
        creator_nonce: u64,
    },
    /// `[callee_gas, cds, return_at_capacity, hub_success, return_gas,
    /// extract_call_data, empty_call_data, return_at_capacity_nonzero, _]`
    Precompile {
        precompile: CommonPrecompile,
        callee_gas: u64,
        cds: u64,
        return_at_capacity: u64,
    },
    /// `[_, cds, extract_bbs, extract_ebs, extract_mbs, _, _, _, _]`
    ModexpCds { cds: u64 },
    /// `[xbs_hi, xbs_lo, ybs_lo, compute_max, _, _, max_xbs_ybs, xbs_nonzero,
    /// _]`
    ModexpXbs {
        which: XbsOperand,
        xbs: U256,
        ybs: u64,
        compute_max: bool,
    },
    /// `[bbs, cds, ebs, load_lead, _, cds_cutoff, ebs_cutoff, sub_ebs_32, _]`
    ModexpLead { bbs: u64, cds: u64, ebs: u64 },
    /// `[call_gas, _, return_at_capacity, ram_success, return_gas,
    /// exponent_log, max_mbs_bbs, return_at_capacity_nonzero, _]`
    ModexpPricing {
        call_gas: u64,
        return_at_capacity: u64,
        exponent_log: u64,
        max_mbs_bbs: u64,
    },
    /// `[_, cds, bbs, ebs, mbs, extract_base, extract_exponent,
    /// extract_modulus, _]`
    ModexpExtract {
        cds: u64,
        bbs: u64,
        ebs: u64,
        mbs: u64,
    },
    /// `[_, cds, return_at_capacity, hub_success, _, _, _,
    /// return_at_capacity_nonzero, _]`
    BlakeCds { cds: u64, return_at_capacity: u64 },
    /// `[callee_gas, _, _, ram_success, return_gas, blake_r, blake_f, _, _]`
    BlakeParams {
        callee_gas: u64,
        blake_r: u64,
        blake_f: u8,
    },
}

/// The results of an OOB call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OobOutcome {
    Jump {
        guaranteed_exception: bool,
        must_be_attempted: bool,
    },
    JumpI {
        not_attempted: bool,
        guaranteed_exception: bool,
        must_be_attempted: bool,
    },
    ReturnDataCopy {
        rdcx: bool,
    },
    CallDataLoad {
        out_of_bounds: bool,
    },
    SStore {
        sstorex: bool,
    },
    Deployment {
        max_code_size_exception: bool,
    },
    XCall {
        value_is_zero: bool,
    },
    Call {
        value_is_zero: bool,
        aborting: bool,
    },
    Create {
        aborting: bool,
        failure: bool,
    },
    Precompile {
        hub_success: bool,
        return_gas: u64,
        return_at_capacity_nonzero: bool,
        cds_is_zero: bool,
    },
    ModexpCds {
        extract_bbs: bool,
        extract_ebs: bool,
        extract_mbs: bool,
    },
    ModexpXbs {
        max_xbs_ybs: u64,
        xbs_nonzero: bool,
    },
    ModexpLead {
        load_lead: bool,
        cds_cutoff: u64,
        ebs_cutoff: u64,
        sub_ebs_32: u64,
    },
    ModexpPricing {
        ram_success: bool,
        return_gas: u64,
        return_at_capacity_nonzero: bool,
    },
    ModexpExtract {
        extract_base: bool,
        extract_exponent: bool,
        extract_modulus: bool,
    },
    BlakeCds {
        hub_success: bool,
        return_at_capacity_nonzero: bool,
    },
    BlakeParams {
        ram_success: bool,
        return_gas: u64,
    },
}

impl OobCall {
    /// The OOB call of an opcode.
    pub fn for_opcode(snapshot: &OperandSnapshot) -> TracerResult<Self> {
        let s = |i| snapshot.stack(i);
        let call = match snapshot.opcode {
            OpCode::Jump => Self::Jump {
                pc_new: s(0)?,
                code_size: snapshot.code_size,
            },
            OpCode::JumpI => Self::JumpI {
                pc_new: s(0)?,
                condition: s(1)?,
                code_size: snapshot.code_size,
            },
            OpCode::ReturnDataCopy => Self::ReturnDataCopy {
                offset: s(1)?,
                size: s(2)?,
                return_data_size: snapshot.return_data_size,
            },
            OpCode::CallDataLoad => Self::CallDataLoad {
                offset: s(0)?,
                call_data_size: snapshot.call_data_size,
            },
            OpCode::SStore => Self::SStore { gas: snapshot.gas },
            OpCode::Return => Self::Deployment { size: s(1)? },
            OpCode::Call if snapshot.exception == Some(ExceptionalHalt::StaticViolation) => {
                Self::XCall { value: s(2)? }
            }
            opcode if opcode.is_call() => {
                Self::Call {
                    value: match opcode {
                        OpCode::Call | OpCode::CallCode => s(2)?,
                        _ => U256::zero(),
                    },
                    balance: snapshot.self_balance,
                    depth: snapshot.depth,
                }
            }
            OpCode::Create | OpCode::Create2 => {
                let target = snapshot.account()?;
                Self::Create {
                    value: s(0)?,
                    balance: snapshot.self_balance,
                    nonce: target.nonce,
                    has_code: target.has_code,
                    depth: snapshot.depth,
                    creator_nonce: snapshot.self_nonce,
                }
            }
            opcode => return Err(unsupported(ImcModule::Oob, opcode).into()),
        };
        Ok(call)
    }

    /// The instruction code of the call: the opcode byte for instructions,
    /// and a precompile-specific code otherwise.
    pub const fn instruction(&self) -> u16 {
        match self {
            Self::Jump { .. } => 0x56,
            Self::JumpI { .. } => 0x57,
            Self::ReturnDataCopy { .. } => 0x3e,
            Self::CallDataLoad { .. } => 0x35,
            Self::SStore { .. } => 0x55,
            Self::Deployment { .. } => 0xf3,
            Self::XCall { .. } => 0xcc,
            Self::Call { .. } => 0xca,
            Self::Create { .. } => 0xce,
            Self::Precompile { precompile, .. } => match precompile {
                CommonPrecompile::EcRecover => 0xff01,
                CommonPrecompile::Sha2 => 0xff02,
                CommonPrecompile::Ripemd => 0xff03,
                CommonPrecompile::Identity => 0xff04,
                CommonPrecompile::EcAdd => 0xff06,
                CommonPrecompile::EcMul => 0xff07,
                CommonPrecompile::EcPairing => 0xff08,
            },
            Self::ModexpCds { .. } => 0xfa05,
            Self::ModexpXbs { .. } => 0xfb05,
            Self::ModexpLead { .. } => 0xfc05,
            Self::ModexpPricing { .. } => 0xfd05,
            Self::ModexpExtract { .. } => 0xfe05,
            Self::BlakeCds { .. } => 0xfa09,
            Self::BlakeParams { .. } => 0xfb09,
        }
    }

    /// Index of the last row of the call.
    pub const fn ct_max(&self) -> usize {
        match self {
            Self::Jump { .. }
            | Self::CallDataLoad { .. }
            | Self::SStore { .. }
            | Self::Deployment { .. }
            | Self::XCall { .. } => 0,
            Self::JumpI { .. } | Self::BlakeCds { .. } | Self::BlakeParams { .. } => 1,
            Self::ReturnDataCopy { .. }
            | Self::Call { .. }
            | Self::ModexpCds { .. }
            | Self::ModexpXbs { .. } => 2,
            Self::Create { .. } | Self::ModexpLead { .. } | Self::ModexpExtract { .. } => 3,
            Self::Precompile { precompile, .. } => match precompile {
                CommonPrecompile::EcRecover
                | CommonPrecompile::EcAdd
                | CommonPrecompile::EcMul => 2,
                CommonPrecompile::Sha2
                | CommonPrecompile::Ripemd
                | CommonPrecompile::Identity => 3,
                CommonPrecompile::EcPairing => 4,
            },
            Self::ModexpPricing { .. } => 5,
        }
    }

    pub const fn is_precompile(&self) -> bool {
        !matches!(
            self,
            Self::Jump { .. }
                | Self::JumpI { .. }
                | Self::ReturnDataCopy { .. }
                | Self::CallDataLoad { .. }
                | Self::SStore { .. }
                | Self::Deployment { .. }
                | Self::XCall { .. }
                | Self::Call { .. }
                | Self::Create { .. }
        )
    }
}

/// An OOB call, with its outcome and the outgoing calls of each of its rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OobOperation {
    pub call: OobCall,
    pub outcome: OobOutcome,
    pub data: [U256; 9],
    pub exo_calls: ExoCalls,
}

fn word(value: impl Into<U256>) -> U256 {
    value.into()
}

fn flag(value: bool) -> U256 {
    U256::from(value as u8)
}

fn hi(value: U256) -> U256 {
    U256::from(hi_lo(value).0)
}

fn lo(value: U256) -> U256 {
    U256::from(hi_lo(value).1)
}

/// Gas left to the caller once a precompile of the given cost has run.
fn return_gas(success: bool, gas: u64, cost: U256) -> u64 {
    if success {
        gas.saturating_sub(cost.low_u64())
    } else {
        0
    }
}

impl OobOperation {
    pub fn new(call: OobCall) -> Self {
        let mut exo = ExoCalls::new(call.ct_max() + 1);
        let zero = U256::zero();
        let (outcome, data) = match call {
            OobCall::Jump { pc_new, code_size } => {
                let valid_pc_new = exo.lt(0, pc_new, word(code_size));
                (
                    OobOutcome::Jump {
                        guaranteed_exception: !valid_pc_new,
                        must_be_attempted: valid_pc_new,
                    },
                    [
                        hi(pc_new),
                        lo(pc_new),
                        zero,
                        zero,
                        word(code_size),
                        zero,
                        flag(!valid_pc_new),
                        flag(valid_pc_new),
                        zero,
                    ],
                )
            }
            OobCall::JumpI {
                pc_new,
                condition,
                code_size,
            } => {
                let valid_pc_new = exo.lt(0, pc_new, word(code_size));
                let not_attempted = exo.is_zero(1, condition);
                let guaranteed_exception = !not_attempted && !valid_pc_new;
                let must_be_attempted = !not_attempted && valid_pc_new;
                (
                    OobOutcome::JumpI {
                        not_attempted,
                        guaranteed_exception,
                        must_be_attempted,
                    },
                    [
                        hi(pc_new),
                        lo(pc_new),
                        hi(condition),
                        lo(condition),
                        word(code_size),
                        flag(not_attempted),
                        flag(guaranteed_exception),
                        flag(must_be_attempted),
                        zero,
                    ],
                )
            }
            OobCall::ReturnDataCopy {
                offset,
                size,
                return_data_size,
            } => {
                // Both high parts vanish iff their sum does.
                let roob = !exo.is_zero(0, hi(offset) + hi(size));
                let soob = !roob && {
                    let end = exo.add(1, lo(offset), lo(size));
                    exo.gt(2, end, word(return_data_size))
                };
                let rdcx = roob || soob;
                (
                    OobOutcome::ReturnDataCopy { rdcx },
                    [
                        hi(offset),
                        lo(offset),
                        hi(size),
                        lo(size),
                        word(return_data_size),
                        zero,
                        flag(rdcx),
                        zero,
                        zero,
                    ],
                )
            }
            OobCall::CallDataLoad {
                offset,
                call_data_size,
            } => {
                let touches_ram = exo.lt(0, offset, word(call_data_size));
                (
                    OobOutcome::CallDataLoad {
                        out_of_bounds: !touches_ram,
                    },
                    [
                        hi(offset),
                        lo(offset),
                        zero,
                        zero,
                        word(call_data_size),
                        zero,
                        flag(!touches_ram),
                        zero,
                        zero,
                    ],
                )
            }
            OobCall::SStore { gas } => {
                let sufficient_gas = exo.lt(0, word(G_CALL_STIPEND), word(gas));
                (
                    OobOutcome::SStore {
                        sstorex: !sufficient_gas,
                    },
                    [
                        zero,
                        zero,
                        zero,
                        zero,
                        word(gas),
                        zero,
                        flag(!sufficient_gas),
                        zero,
                        zero,
                    ],
                )
            }
            OobCall::Deployment { size } => {
                let exceeds = exo.lt(0, word(MAX_CODE_SIZE), size);
                (
                    OobOutcome::Deployment {
                        max_code_size_exception: exceeds,
                    },
                    [
                        hi(size),
                        lo(size),
                        zero,
                        zero,
                        zero,
                        zero,
                        flag(exceeds),
                        zero,
                        zero,
                    ],
                )
            }
            OobCall::XCall { value } => {
                let value_is_zero = exo.is_zero(0, value);
                (
                    OobOutcome::XCall { value_is_zero },
                    [
                        hi(value),
                        lo(value),
                        zero,
                        zero,
                        zero,
                        zero,
                        flag(!value_is_zero),
                        flag(value_is_zero),
                        zero,
                    ],
                )
            }
            OobCall::Call {
                value,
                balance,
                depth,
            } => {
                let insufficient_balance = exo.lt(0, balance, value);
                let depth_abort = !exo.lt(1, word(depth), word(MAX_CALL_STACK_DEPTH));
                let value_is_zero = exo.is_zero(2, value);
                let aborting = insufficient_balance || depth_abort;
                (
                    OobOutcome::Call {
                        value_is_zero,
                        aborting,
                    },
                    [
                        hi(value),
                        lo(value),
                        balance,
                        zero,
                        zero,
                        word(depth),
                        flag(value_is_zero),
                        flag(aborting),
                        zero,
                    ],
                )
            }
            OobCall::Create {
                value,
                balance,
                nonce,
                has_code,
                depth,
                creator_nonce,
            } => {
                let insufficient_balance = exo.lt(0, balance, value);
                let depth_abort = !exo.lt(1, word(depth), word(MAX_CALL_STACK_DEPTH));
                let nonzero_nonce = !exo.is_zero(2, word(nonce));
                let nonce_abort = !exo.lt(3, word(creator_nonce), word(EIP2681_MAX_NONCE));
                let aborting = insufficient_balance || depth_abort || nonce_abort;
                let failure = !aborting && (has_code || nonzero_nonce);
                (
                    OobOutcome::Create { aborting, failure },
                    [
                        hi(value),
                        lo(value),
                        balance,
                        word(nonce),
                        flag(has_code),
                        word(depth),
                        flag(aborting),
                        flag(failure),
                        word(creator_nonce),
                    ],
                )
            }
            OobCall::Precompile {
                precompile,
                callee_gas,
                cds,
                return_at_capacity,
            } => {
                let cds_is_zero = exo.is_zero(0, word(cds));
                let return_at_capacity_nonzero = !exo.is_zero(1, word(return_at_capacity));
                let gas = word(callee_gas);
                let (hub_success, cost) = match precompile {
                    CommonPrecompile::EcRecover
                    | CommonPrecompile::EcAdd
                    | CommonPrecompile::EcMul => {
                        let cost = word(match precompile {
                            CommonPrecompile::EcRecover => 3000u64,
                            CommonPrecompile::EcAdd => 150,
                            _ => 6000,
                        });
                        (!exo.lt(2, gas, cost), cost)
                    }
                    CommonPrecompile::Sha2
                    | CommonPrecompile::Ripemd
                    | CommonPrecompile::Identity => {
                        let words = exo.div(2, word(cds) + 31, word(32u64));
                        let factor = match precompile {
                            CommonPrecompile::Sha2 => 12u64,
                            CommonPrecompile::Ripemd => 120,
                            _ => 3,
                        };
                        let cost = (words + 5) * factor;
                        (!exo.lt(3, gas, cost), cost)
                    }
                    CommonPrecompile::EcPairing => {
                        let remainder = exo.modulo(2, word(cds), word(192u64));
                        let is_multiple_of_192 = exo.is_zero(3, remainder);
                        if is_multiple_of_192 {
                            let cost = word(45000u64) + word(34000u64) * (cds / 192);
                            (!exo.lt(4, gas, cost), cost)
                        } else {
                            (false, zero)
                        }
                    }
                };
                let return_gas = return_gas(hub_success, callee_gas, cost);
                (
                    OobOutcome::Precompile {
                        hub_success,
                        return_gas,
                        return_at_capacity_nonzero,
                        cds_is_zero,
                    },
                    [
                        gas,
                        word(cds),
                        word(return_at_capacity),
                        flag(hub_success),
                        word(return_gas),
                        flag(hub_success && !cds_is_zero),
                        flag(cds_is_zero),
                        flag(return_at_capacity_nonzero),
                        zero,
                    ],
                )
            }
            OobCall::ModexpCds { cds } => {
                let extract_bbs = exo.lt(0, zero, word(cds));
                let extract_ebs = exo.lt(1, word(32u64), word(cds));
                let extract_mbs = exo.lt(2, word(64u64), word(cds));
                (
                    OobOutcome::ModexpCds {
                        extract_bbs,
                        extract_ebs,
                        extract_mbs,
                    },
                    [
                        zero,
                        word(cds),
                        flag(extract_bbs),
                        flag(extract_ebs),
                        flag(extract_mbs),
                        zero,
                        zero,
                        zero,
                        zero,
                    ],
                )
            }
            OobCall::ModexpXbs {
                xbs,
                ybs,
                compute_max,
                ..
            } => {
                exo.lt(0, xbs, word(513u64));
                let xbs_lo = lo(xbs);
                let comp = exo.lt(1, xbs_lo, word(ybs));
                let xbs_is_zero = exo.is_zero(2, xbs_lo);
                let (max_xbs_ybs, xbs_nonzero) = if compute_max {
                    (if comp { ybs } else { xbs_lo.low_u64() }, !xbs_is_zero)
                } else {
                    (0, false)
                };
                (
                    OobOutcome::ModexpXbs {
                        max_xbs_ybs,
                        xbs_nonzero,
                    },
                    [
                        hi(xbs),
                        xbs_lo,
                        word(ybs),
                        flag(compute_max),
                        zero,
                        zero,
                        word(max_xbs_ybs),
                        flag(xbs_nonzero),
                        zero,
                    ],
                )
            }
            OobCall::ModexpLead { bbs, cds, ebs } => {
                let ebs_is_zero = exo.is_zero(0, word(ebs));
                let ebs_lt_32 = exo.lt(1, word(ebs), word(32u64));
                let exponent_start = 96 + bbs;
                let contains_exponent = exo.lt(2, word(exponent_start), word(cds));
                let cds_cutoff = if contains_exponent {
                    let available = cds - exponent_start;
                    if exo.lt(3, word(available), word(32u64)) {
                        available
                    } else {
                        32
                    }
                } else {
                    0
                };
                let load_lead = contains_exponent && !ebs_is_zero;
                let ebs_cutoff = if ebs_lt_32 { ebs } else { 32 };
                let sub_ebs_32 = if ebs_lt_32 { 0 } else { ebs - 32 };
                (
                    OobOutcome::ModexpLead {
                        load_lead,
                        cds_cutoff,
                        ebs_cutoff,
                        sub_ebs_32,
                    },
                    [
                        word(bbs),
                        word(cds),
                        word(ebs),
                        flag(load_lead),
                        zero,
                        word(cds_cutoff),
                        word(ebs_cutoff),
                        word(sub_ebs_32),
                        zero,
                    ],
                )
            }
            OobCall::ModexpPricing {
                call_gas,
                return_at_capacity,
                exponent_log,
                max_mbs_bbs,
            } => {
                let return_at_capacity_nonzero = !exo.is_zero(0, word(return_at_capacity));
                let exponent_log_is_zero = exo.is_zero(1, word(exponent_log));
                let ceiling = exo.div(2, word(max_mbs_bbs) + 7, word(8u64));
                let f_of_max = ceiling * ceiling;
                let numerator = if exponent_log_is_zero {
                    f_of_max
                } else {
                    f_of_max * exponent_log
                };
                let quotient = exo.div(3, numerator, word(G_QUAD_DIVISOR));
                let cost = if exo.lt(4, quotient, word(MODEXP_MIN_COST)) {
                    word(MODEXP_MIN_COST)
                } else {
                    quotient
                };
                let ram_success = !exo.lt(5, word(call_gas), cost);
                let return_gas = return_gas(ram_success, call_gas, cost);
                (
                    OobOutcome::ModexpPricing {
                        ram_success,
                        return_gas,
                        return_at_capacity_nonzero,
                    },
                    [
                        word(call_gas),
                        zero,
                        word(return_at_capacity),
                        flag(ram_success),
                        word(return_gas),
                        word(exponent_log),
                        word(max_mbs_bbs),
                        flag(return_at_capacity_nonzero),
                        zero,
                    ],
                )
            }
            OobCall::ModexpExtract { cds, bbs, ebs, mbs } => {
                let bbs_is_zero = exo.is_zero(0, word(bbs));
                let ebs_is_zero = exo.is_zero(1, word(ebs));
                let mbs_is_zero = exo.is_zero(2, word(mbs));
                let beyond_exponent = exo.lt(3, word(96 + bbs + ebs), word(cds));
                let extract_modulus = beyond_exponent && !mbs_is_zero;
                let extract_base = extract_modulus && !bbs_is_zero;
                let extract_exponent = extract_modulus && !ebs_is_zero;
                (
                    OobOutcome::ModexpExtract {
                        extract_base,
                        extract_exponent,
                        extract_modulus,
                    },
                    [
                        zero,
                        word(cds),
                        word(bbs),
                        word(ebs),
                        word(mbs),
                        flag(extract_base),
                        flag(extract_exponent),
                        flag(extract_modulus),
                        zero,
                    ],
                )
            }
            OobCall::BlakeCds {
                cds,
                return_at_capacity,
            } => {
                let hub_success = ExoCalls::eq(&mut exo, 0, word(cds), word(213u64));
                let return_at_capacity_nonzero = !exo.is_zero(1, word(return_at_capacity));
                (
                    OobOutcome::BlakeCds {
                        hub_success,
                        return_at_capacity_nonzero,
                    },
                    [
                        zero,
                        word(cds),
                        word(return_at_capacity),
                        flag(hub_success),
                        zero,
                        zero,
                        zero,
                        flag(return_at_capacity_nonzero),
                        zero,
                    ],
                )
            }
            OobCall::BlakeParams {
                callee_gas,
                blake_r,
                blake_f,
            } => {
                let sufficient_gas = !exo.lt(0, word(callee_gas), word(blake_r));
                let f = u64::from(blake_f);
                let f_is_a_bit = ExoCalls::eq(&mut exo, 1, word(f), word(f * f));
                let ram_success = sufficient_gas && f_is_a_bit;
                let return_gas = return_gas(ram_success, callee_gas, word(blake_r));
                (
                    OobOutcome::BlakeParams {
                        ram_success,
                        return_gas,
                    },
                    [
                        word(callee_gas),
                        zero,
                        zero,
                        flag(ram_success),
                        word(return_gas),
                        word(blake_r),
                        word(f),
                        zero,
                        zero,
                    ],
                )
            }
        };
        Self {
            call,
            outcome,
            data,
            exo_calls: exo,
        }
    }

    pub fn row_count(&self) -> usize {
        self.call.ct_max() + 1
    }
}
