//! Call data of the BLAKE2f precompile (EIP-152).

/// Size of well-formed call data: rounds, state, message, offsets and flag.
pub const BLAKE2F_CALL_DATA_SIZE: usize = 213;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Blake2fMetadata {
    /// Number of rounds, which is also the gas cost.
    pub rounds: u64,
    /// Final block indicator, which must be 0 or 1.
    pub f: u8,
}

impl Blake2fMetadata {
    /// Parses well-formed call data.
    pub fn new(call_data: &[u8]) -> Option<Self> {
        if call_data.len() != BLAKE2F_CALL_DATA_SIZE {
            return None;
        }
        let mut rounds = [0; 4];
        rounds.copy_from_slice(&call_data[..4]);
        Some(Self {
            rounds: u64::from(u32::from_be_bytes(rounds)),
            f: call_data[BLAKE2F_CALL_DATA_SIZE - 1],
        })
    }
}
