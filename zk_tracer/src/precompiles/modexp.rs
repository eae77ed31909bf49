//! Call data of the MODEXP precompile (EIP-198), priced per EIP-2565.
//!
//! The call data starts with three 32-byte sizes, `bbs`, `ebs` and `mbs`,
//! followed by the base, the exponent and the modulus. Missing bytes read as
//! zero.

use ethereum_types::U256;
use zk_tracer_common::{MODEXP_MAX_BYTE_SIZE, WORD_SIZE};

use crate::exp::{lead_log, trim_lead};
use crate::oob::OobCall;
use crate::witness::state::saturating_u64;

/// Offset of the base in the call data.
const BASE_OFFSET: u64 = 96;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModexpMetadata {
    call_data: Vec<u8>,
    pub bbs: U256,
    pub ebs: U256,
    pub mbs: U256,
}

/// `size` bytes of `data` at `offset`, right-padded with zeros.
fn padded_slice(data: &[u8], offset: u64, size: usize) -> Vec<u8> {
    let mut bytes = vec![0; size];
    if let Ok(start) = usize::try_from(offset) {
        if start < data.len() {
            let available = (data.len() - start).min(size);
            bytes[..available].copy_from_slice(&data[start..start + available]);
        }
    }
    bytes
}

impl ModexpMetadata {
    pub fn new(call_data: &[u8]) -> Self {
        let size = |index: u64| {
            U256::from_big_endian(&padded_slice(call_data, index * WORD_SIZE as u64, WORD_SIZE))
        };
        Self {
            call_data: call_data.to_vec(),
            bbs: size(0),
            ebs: size(1),
            mbs: size(2),
        }
    }

    pub fn call_data_size(&self) -> u64 {
        self.call_data.len() as u64
    }

    /// Whether one of the sizes exceeds what the tracer supports.
    pub fn unsupported(&self) -> bool {
        let max = U256::from(MODEXP_MAX_BYTE_SIZE);
        self.bbs > max || self.ebs > max || self.mbs > max
    }

    pub fn bbs(&self) -> u64 {
        saturating_u64(self.bbs)
    }

    pub fn ebs(&self) -> u64 {
        saturating_u64(self.ebs)
    }

    pub fn mbs(&self) -> u64 {
        saturating_u64(self.mbs)
    }

    pub fn extract_bbs(&self) -> bool {
        self.call_data_size() > 0
    }

    pub fn extract_ebs(&self) -> bool {
        self.call_data_size() > 32
    }

    pub fn extract_mbs(&self) -> bool {
        self.call_data_size() > 64
    }

    fn exponent_offset(&self) -> u64 {
        BASE_OFFSET.saturating_add(self.bbs())
    }

    /// Whether the leading word of the exponent has to be loaded.
    pub fn load_lead(&self) -> bool {
        self.call_data_size() > self.exponent_offset() && self.ebs() != 0
    }

    /// Number of bytes of the leading word backed by call data.
    pub fn cds_cutoff(&self) -> u64 {
        self.call_data_size()
            .saturating_sub(self.exponent_offset())
            .min(WORD_SIZE as u64)
    }

    /// Number of bytes of the leading word belonging to the exponent.
    pub fn ebs_cutoff(&self) -> u64 {
        self.ebs().min(WORD_SIZE as u64)
    }

    /// The 32 bytes of call data starting at the exponent.
    pub fn raw_lead(&self) -> U256 {
        U256::from_big_endian(&padded_slice(
            &self.call_data,
            self.exponent_offset(),
            WORD_SIZE,
        ))
    }

    pub fn lead_log(&self) -> u64 {
        if !self.load_lead() {
            return 0;
        }
        lead_log(trim_lead(self.raw_lead(), self.cds_cutoff(), self.ebs_cutoff()))
    }

    /// Number of exponent bytes past the leading word.
    pub fn sub_ebs_32(&self) -> u64 {
        self.ebs().saturating_sub(WORD_SIZE as u64)
    }

    pub fn exponent_log(&self) -> u64 {
        self.sub_ebs_32()
            .saturating_mul(8)
            .saturating_add(self.lead_log())
    }

    pub fn max_mbs_bbs(&self) -> u64 {
        self.bbs().max(self.mbs())
    }

    pub fn extract_modulus(&self) -> bool {
        let exponent_end = self.exponent_offset().saturating_add(self.ebs());
        self.call_data_size() > exponent_end && self.mbs() != 0
    }

    pub fn extract_base(&self) -> bool {
        self.extract_modulus() && self.bbs() != 0
    }

    pub fn extract_exponent(&self) -> bool {
        self.extract_modulus() && self.ebs() != 0
    }

    pub fn base(&self) -> Vec<u8> {
        padded_slice(&self.call_data, BASE_OFFSET, self.bbs() as usize)
    }

    pub fn exponent(&self) -> Vec<u8> {
        padded_slice(&self.call_data, self.exponent_offset(), self.ebs() as usize)
    }

    pub fn modulus(&self) -> Vec<u8> {
        padded_slice(
            &self.call_data,
            self.exponent_offset().saturating_add(self.ebs()),
            self.mbs() as usize,
        )
    }

    /// The OOB check pricing the call. The price itself is only computed
    /// there, along with its lookups.
    pub fn pricing_call(&self, call_gas: u64, return_at_capacity: u64) -> OobCall {
        OobCall::ModexpPricing {
            call_gas,
            return_at_capacity,
            exponent_log: self.exponent_log(),
            max_mbs_bbs: self.max_mbs_bbs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;
    use crate::oob::{OobOperation, OobOutcome};

    const CALL_GAS: u64 = 1_000_000;

    fn price(metadata: &ModexpMetadata) -> u64 {
        let call = metadata.pricing_call(CALL_GAS, 32);
        match OobOperation::new(call).outcome {
            OobOutcome::ModexpPricing {
                ram_success: true,
                return_gas,
                ..
            } => CALL_GAS - return_gas,
            other => panic!("unexpected {other:?}"),
        }
    }

    fn sizes(bbs: u64, ebs: u64, mbs: u64) -> Vec<u8> {
        let mut data = vec![];
        for size in [bbs, ebs, mbs] {
            let mut word = [0; 32];
            U256::from(size).to_big_endian(&mut word);
            data.extend_from_slice(&word);
        }
        data
    }

    #[test]
    fn eip_2565_pricing() {
        let mut call_data = sizes(2, 6, 128);
        call_data.extend_from_slice(&hex!("0303"));
        call_data.extend_from_slice(&hex!("010000000001"));
        call_data.extend_from_slice(&[0xff; 128]);
        let metadata = ModexpMetadata::new(&call_data);

        assert!(!metadata.unsupported());
        assert!(metadata.load_lead());
        assert_eq!(metadata.cds_cutoff(), 32);
        assert_eq!(metadata.ebs_cutoff(), 6);
        assert_eq!(metadata.lead_log(), 40);
        assert_eq!(metadata.exponent_log(), 40);
        // ceil(128 / 8)^2 * 40 / 3
        assert_eq!(price(&metadata), 3413);
        assert!(
            metadata.extract_base() && metadata.extract_exponent() && metadata.extract_modulus()
        );
        assert_eq!(metadata.base(), hex!("0303"));
        assert_eq!(metadata.exponent(), hex!("010000000001"));
        assert_eq!(metadata.modulus(), vec![0xff; 128]);
    }

    #[test]
    fn short_call_data_is_right_padded() {
        let metadata = ModexpMetadata::new(&hex!("01"));
        assert_eq!(metadata.bbs, U256::one() << 248);
        assert!(metadata.unsupported());
        assert!(metadata.extract_bbs() && !metadata.extract_ebs());

        let metadata = ModexpMetadata::new(&sizes(1, 1, 1)[..64]);
        assert_eq!(metadata.mbs(), 0);
        assert!(!metadata.extract_modulus());
        assert!(!metadata.load_lead());
        assert_eq!(price(&metadata), 200);
    }

    #[test]
    fn long_exponents_add_eight_per_extra_byte() {
        let mut call_data = sizes(1, 34, 1);
        call_data.push(2);
        call_data.extend_from_slice(&[0; 33]);
        call_data.push(1);
        call_data.push(5);
        let metadata = ModexpMetadata::new(&call_data);
        assert_eq!(metadata.lead_log(), 0);
        assert_eq!(metadata.sub_ebs_32(), 2);
        assert_eq!(metadata.exponent_log(), 16);
        assert_eq!(price(&metadata), 200);
        assert_eq!(metadata.modulus(), vec![5]);
    }

    #[test]
    fn long_exponents_are_priced_on_their_leading_word() {
        let mut call_data = sizes(64, 40, 64);
        call_data.extend_from_slice(&[0x11; 64]);
        call_data.push(1);
        call_data.extend_from_slice(&[0; 39]);
        call_data.extend_from_slice(&[0x22; 64]);
        let metadata = ModexpMetadata::new(&call_data);
        assert!(!metadata.unsupported());
        assert_eq!(metadata.lead_log(), 248);
        assert_eq!(metadata.exponent_log(), 8 * 8 + 248);
        // ceil(64 / 8)^2 * 312 / 3
        assert_eq!(price(&metadata), 6656);

        let call = metadata.pricing_call(6655, 0);
        assert!(matches!(
            OobOperation::new(call).outcome,
            OobOutcome::ModexpPricing {
                ram_success: false,
                return_gas: 0,
                ..
            }
        ));
    }
}
