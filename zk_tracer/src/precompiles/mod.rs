//! Precompiled contracts, and the metadata the tracer extracts from their
//! call data.

pub mod blake;
pub mod modexp;

use ethereum_types::Address;

use crate::mmu::ExoModule;
use crate::oob::CommonPrecompile;

/// MMU phases of the MODEXP operands.
pub const PHASE_MODEXP_BASE: u16 = 0x1;
pub const PHASE_MODEXP_EXPONENT: u16 = 0x2;
pub const PHASE_MODEXP_MODULUS: u16 = 0x3;
/// MMU phase of the rounds and flag of a BLAKE2f call.
pub const PHASE_BLAKE_PARAMS: u16 = 0x6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Precompile {
    EcRecover,
    Sha2,
    Ripemd,
    Identity,
    Modexp,
    EcAdd,
    EcMul,
    EcPairing,
    Blake2f,
    PointEvaluation,
}

impl Precompile {
    /// The precompile at `address`, if any.
    pub fn from_address(address: &Address) -> Option<Self> {
        let bytes = address.as_bytes();
        if bytes[..19].iter().any(|byte| *byte != 0) {
            return None;
        }
        Some(match bytes[19] {
            0x01 => Self::EcRecover,
            0x02 => Self::Sha2,
            0x03 => Self::Ripemd,
            0x04 => Self::Identity,
            0x05 => Self::Modexp,
            0x06 => Self::EcAdd,
            0x07 => Self::EcMul,
            0x08 => Self::EcPairing,
            0x09 => Self::Blake2f,
            0x0a => Self::PointEvaluation,
            _ => return None,
        })
    }

    /// MMU phase of the call data handed to the precompile.
    pub const fn data_phase(self) -> u16 {
        match self {
            Self::EcRecover => 0x10a,
            Self::Sha2 => 0x1,
            Self::Ripemd => 0x3,
            Self::EcAdd => 0x60a,
            Self::EcMul => 0x70a,
            Self::EcPairing => 0x80a,
            Self::Blake2f => 0x5,
            Self::Identity | Self::Modexp | Self::PointEvaluation => 0,
        }
    }

    /// MMU phase of the output of the precompile.
    pub const fn result_phase(self) -> u16 {
        match self {
            Self::EcRecover => 0x10b,
            Self::Sha2 => 0x2,
            Self::Ripemd => 0x4,
            Self::Modexp => 0x4,
            Self::EcAdd => 0x60b,
            Self::EcMul => 0x70b,
            Self::EcPairing => 0x80b,
            Self::Blake2f => 0x7,
            Self::Identity | Self::PointEvaluation => 0,
        }
    }

    /// The module computing the precompile, if the tracer hands it bytes.
    pub const fn exo_module(self) -> Option<ExoModule> {
        match self {
            Self::EcRecover | Self::EcAdd | Self::EcMul | Self::EcPairing => {
                Some(ExoModule::EcData)
            }
            Self::Sha2 | Self::Ripemd => Some(ExoModule::RipSha),
            Self::Modexp | Self::Blake2f => Some(ExoModule::BlakeModexp),
            Self::Identity | Self::PointEvaluation => None,
        }
    }

    /// Precompiles priced by the common OOB checks.
    pub const fn common(self) -> Option<CommonPrecompile> {
        match self {
            Self::EcRecover => Some(CommonPrecompile::EcRecover),
            Self::Sha2 => Some(CommonPrecompile::Sha2),
            Self::Ripemd => Some(CommonPrecompile::Ripemd),
            Self::Identity => Some(CommonPrecompile::Identity),
            Self::EcAdd => Some(CommonPrecompile::EcAdd),
            Self::EcMul => Some(CommonPrecompile::EcMul),
            Self::EcPairing => Some(CommonPrecompile::EcPairing),
            Self::Modexp | Self::Blake2f | Self::PointEvaluation => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precompile_addresses() {
        assert_eq!(
            Precompile::from_address(&Address::from_low_u64_be(5)),
            Some(Precompile::Modexp)
        );
        assert_eq!(
            Precompile::from_address(&Address::from_low_u64_be(0x0a)),
            Some(Precompile::PointEvaluation)
        );
        assert_eq!(Precompile::from_address(&Address::zero()), None);
        assert_eq!(Precompile::from_address(&Address::from_low_u64_be(0x0b)), None);
        assert_eq!(Precompile::from_address(&Address::from_low_u64_be(0x102)), None);
        assert_eq!(Precompile::Sha2.common(), Some(CommonPrecompile::Sha2));
    }
}
