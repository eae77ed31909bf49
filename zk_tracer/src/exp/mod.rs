//! Exponent logarithms: the dynamic cost of EXP and the leading-word
//! logarithm of MODEXP pricing.

pub(crate) mod columns;

use ethereum_types::U256;
use zk_tracer_common::byte_len;
use zk_tracer_common::gas::G_EXP_BYTE;

use crate::imc::exo::ExoCalls;
use crate::imc::{unsupported, ImcModule};
use crate::opcode::OpCode;
use crate::witness::errors::TracerResult;
use crate::witness::state::OperandSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpCall {
    ExpLog {
        exponent: U256,
    },
    ModexpLog {
        /// The 32 bytes of call data starting at the exponent.
        raw_lead: U256,
        cds_cutoff: u64,
        ebs_cutoff: u64,
    },
}

impl ExpCall {
    pub fn for_opcode(snapshot: &OperandSnapshot) -> TracerResult<Self> {
        match snapshot.opcode {
            OpCode::Exp => Ok(Self::ExpLog {
                exponent: snapshot.stack(1)?,
            }),
            opcode => Err(unsupported(ImcModule::Exp, opcode).into()),
        }
    }

    pub const fn instruction(&self) -> u16 {
        match self {
            Self::ExpLog { .. } => 0xee0a,
            Self::ModexpLog { .. } => 0xee05,
        }
    }

    /// Number of preprocessing rows.
    pub const fn preprocessing_rows(&self) -> usize {
        match self {
            Self::ExpLog { .. } => 0,
            Self::ModexpLog { .. } => 3,
        }
    }
}

/// An EXP computation and its result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpOperation {
    pub call: ExpCall,
    /// The word before trimming.
    pub raw: U256,
    /// The word whose limbs the computation rows decompose: the exponent,
    /// or the leading word of a modexp exponent once trimmed.
    pub trimmed: U256,
    /// `dyn_cost` for EXP, `lead_log` for MODEXP.
    pub result: u64,
    pub preprocessing: ExoCalls,
}

/// The first `ebs_cutoff` bytes of `raw_lead`, of which only the first
/// `cds_cutoff` are backed by call data.
pub fn trim_lead(raw_lead: U256, cds_cutoff: u64, ebs_cutoff: u64) -> U256 {
    let kept = cds_cutoff.min(ebs_cutoff).min(32) as usize;
    let mut bytes = [0u8; 32];
    raw_lead.to_big_endian(&mut bytes);
    bytes[kept..].fill(0);
    let word = U256::from_big_endian(&bytes);
    let ebs = ebs_cutoff.min(32) as usize;
    if ebs == 0 {
        U256::zero()
    } else {
        word >> (8 * (32 - ebs))
    }
}

/// Bit length minus one, or zero for zero.
pub fn lead_log(lead: U256) -> u64 {
    (lead.bits() as u64).saturating_sub(1)
}

impl ExpOperation {
    pub fn new(call: ExpCall) -> Self {
        match call {
            ExpCall::ExpLog { exponent } => Self {
                call,
                raw: exponent,
                trimmed: exponent,
                result: G_EXP_BYTE * byte_len(exponent),
                preprocessing: ExoCalls::new(0),
            },
            ExpCall::ModexpLog {
                raw_lead,
                cds_cutoff,
                ebs_cutoff,
            } => {
                let mut preprocessing = ExoCalls::new(3);
                let min_cutoff = if preprocessing.lt(0, cds_cutoff.into(), ebs_cutoff.into()) {
                    cds_cutoff
                } else {
                    ebs_cutoff
                };
                preprocessing.lt(1, min_cutoff.into(), U256::from(16));
                let trimmed = trim_lead(raw_lead, cds_cutoff, ebs_cutoff);
                preprocessing.is_zero(2, trimmed >> 128);
                Self {
                    call,
                    raw: trim_lead(raw_lead, 32, ebs_cutoff),
                    trimmed,
                    result: lead_log(trimmed),
                    preprocessing,
                }
            }
        }
    }

    /// Whether the computation rows decompose the high limbs.
    pub fn uses_high_limb(&self) -> bool {
        !(self.trimmed >> 128).is_zero()
    }

    /// The most significant nonzero limb of the trimmed word.
    pub fn limb(&self) -> u128 {
        limb_of(self.trimmed, self.uses_high_limb())
    }

    /// The limb of the raw word matching [`Self::limb`].
    pub fn raw_limb(&self) -> u128 {
        limb_of(self.raw, self.uses_high_limb())
    }
}

fn limb_of(word: U256, high: bool) -> u128 {
    if high {
        (word >> 128).low_u128()
    } else {
        word.low_u128()
    }
}
