//! Inputs and digests of the SHA-256, RIPEMD-160 and KECCAK-256 hashes, cut
//! into 16-byte limbs.

pub(crate) mod columns;

use ethereum_types::U256;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::trace::TraceResult;
use crate::wcp::{WcpInstruction, WcpOperation};
use crate::witness::errors::ProtocolViolation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashFunction {
    Sha2,
    Ripemd,
    Keccak,
}

impl HashFunction {
    pub const fn data_phase(self) -> u8 {
        match self {
            Self::Sha2 => 1,
            Self::Ripemd => 3,
            Self::Keccak => 5,
        }
    }

    pub const fn result_phase(self) -> u8 {
        self.data_phase() + 1
    }

    /// The digest of `input`, left-padded to 32 bytes.
    pub fn digest(self, input: &[u8]) -> [u8; 32] {
        let mut digest = [0; 32];
        match self {
            Self::Sha2 => digest.copy_from_slice(&Sha256::digest(input)),
            Self::Ripemd => digest[12..].copy_from_slice(&Ripemd160::digest(input)),
            Self::Keccak => digest = keccak_hash::keccak(input).0,
        }
        digest
    }
}

/// One hash computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashDataOperation {
    /// Hub stamp of the triggering opcode, plus one.
    pub id: u64,
    pub function: HashFunction,
    pub input: Vec<u8>,
    pub digest: [u8; 32],
}

impl HashDataOperation {
    pub fn new(id: u64, function: HashFunction, input: Vec<u8>) -> Self {
        let digest = function.digest(&input);
        Self {
            id,
            function,
            input,
            digest,
        }
    }

    /// Number of data rows: one per limb, and one for an empty input.
    pub fn data_rows(&self) -> usize {
        self.input.len().div_ceil(16).max(1)
    }
}

/// Checks that `id` follows `previous`, and returns the comparison proving it
/// to the WCP module.
pub(crate) fn check_id(
    previous: Option<u64>,
    id: u64,
    wcp_stamp: u64,
) -> TraceResult<Option<WcpOperation>> {
    let Some(previous) = previous else {
        return Ok(None);
    };
    if id <= previous {
        return Err(ProtocolViolation::NonIncreasingId { id, previous });
    }
    Ok(Some(WcpOperation::new(
        wcp_stamp,
        WcpInstruction::Gt,
        U256::from(id),
        U256::from(previous),
    )))
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn digests_of_the_empty_input() {
        assert_eq!(
            HashFunction::Sha2.digest(&[]),
            hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
        assert_eq!(
            HashFunction::Ripemd.digest(&[]),
            hex!("0000000000000000000000009c1185a5c5e9fc54612808977ee8f548b2258d31")
        );
        assert_eq!(
            HashFunction::Keccak.digest(&[]),
            hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }

    #[test]
    fn ids_strictly_increase() {
        assert_eq!(check_id(None, 5, 1), Ok(None));
        let comparison = check_id(Some(5), 9, 1).unwrap().unwrap();
        assert!(comparison.result);
        assert_eq!(
            check_id(Some(9), 9, 2),
            Err(ProtocolViolation::NonIncreasingId { id: 9, previous: 9 })
        );
    }
}
