use ethereum_types::{H256, U256};

/// The hash value of an account empty EVM code.
/// 0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470
pub const EMPTY_CODE_HASH: H256 = H256([
    197, 210, 70, 1, 134, 247, 35, 60, 146, 126, 125, 178, 220, 199, 3, 192, 229, 0, 182, 83, 202,
    130, 39, 59, 123, 250, 216, 4, 93, 133, 164, 112,
]);

/// Size in bytes of an EVM word.
pub const WORD_SIZE: usize = 32;

/// Size in bytes of a column limb holding half of an EVM word.
pub const LLARGE: usize = 16;

/// Maximum depth of the call stack.
pub const MAX_CALL_STACK_DEPTH: usize = 1024;

/// Maximum size of deployed bytecode (EIP-170).
pub const MAX_CODE_SIZE: u64 = 24576;

/// Maximum account nonce (EIP-2681).
pub const EIP2681_MAX_NONCE: u64 = u64::MAX;

/// Largest byte size accepted for each of the modexp operands.
pub const MODEXP_MAX_BYTE_SIZE: usize = 512;

/// Gas schedule constants, as of Cancun.
pub mod gas {
    pub const G_ZERO: u64 = 0;
    pub const G_JUMPDEST: u64 = 1;
    pub const G_BASE: u64 = 2;
    pub const G_VERY_LOW: u64 = 3;
    pub const G_LOW: u64 = 5;
    pub const G_MID: u64 = 8;
    pub const G_HIGH: u64 = 10;
    pub const G_BLOCKHASH: u64 = 20;

    pub const G_WARM_ACCESS: u64 = 100;
    pub const G_COLD_ACCOUNT_ACCESS: u64 = 2600;
    pub const G_COLD_SLOAD: u64 = 2100;

    pub const G_SSET: u64 = 20000;
    /// `G_SRESET` as amended by EIP-2929: 5000 minus the cold sload surcharge.
    pub const G_SRESET: u64 = 2900;
    /// Refund granted when a storage slot is cleared (EIP-3529).
    pub const R_SCLEAR: u64 = 4800;

    pub const G_CALL_VALUE: u64 = 9000;
    pub const G_CALL_STIPEND: u64 = 2300;
    pub const G_NEW_ACCOUNT: u64 = 25000;
    pub const G_SELFDESTRUCT: u64 = 5000;

    pub const G_CREATE: u64 = 32000;
    pub const G_CODE_DEPOSIT: u64 = 200;
    /// Per-word cost of init code (EIP-3860).
    pub const G_INIT_CODE_WORD: u64 = 2;

    pub const G_EXP: u64 = 10;
    pub const G_EXP_BYTE: u64 = 50;

    pub const G_MEMORY: u64 = 3;
    pub const G_QUAD_COEFFICIENT_DIV: u64 = 512;
    pub const G_COPY: u64 = 3;

    pub const G_KECCAK256: u64 = 30;
    pub const G_KECCAK256_WORD: u64 = 6;

    pub const G_LOG: u64 = 375;
    pub const G_LOG_TOPIC: u64 = 375;
    pub const G_LOG_DATA: u64 = 8;

    /// Divisor of the modexp pricing formula (EIP-2565).
    pub const G_QUAD_DIVISOR: u64 = 3;
    pub const MODEXP_MIN_COST: u64 = 200;
}

/// Splits a word into its high and low 16-byte limbs.
pub fn hi_lo(word: U256) -> (u128, u128) {
    ((word >> 128).low_u128(), word.low_u128())
}

/// Rebuilds a word from its high and low 16-byte limbs.
pub fn from_hi_lo(hi: u128, lo: u128) -> U256 {
    (U256::from(hi) << 128) | U256::from(lo)
}

/// Number of significant bytes of a word.
pub fn byte_len(word: U256) -> u64 {
    (word.bits() as u64 + 7) / 8
}

/// Number of words needed to hold `bytes` bytes.
pub fn words_for(bytes: u64) -> u64 {
    bytes.div_ceil(WORD_SIZE as u64)
}

#[test]
fn test_empty_code_hash() {
    assert_eq!(EMPTY_CODE_HASH, keccak_hash::keccak([]));
}

#[test]
fn test_hi_lo_round_trip() {
    let word = U256::from_dec_str(
        "115792089237316195423570985008687907853269984665640564039457584007913129639935",
    )
    .unwrap();
    let (hi, lo) = hi_lo(word);
    assert_eq!(hi, u128::MAX);
    assert_eq!(lo, u128::MAX);
    assert_eq!(from_hi_lo(hi, lo), word);
}

#[test]
fn test_byte_len() {
    assert_eq!(byte_len(U256::zero()), 0);
    assert_eq!(byte_len(U256::from(0xff)), 1);
    assert_eq!(byte_len(U256::from(0x100)), 2);
    assert_eq!(byte_len(U256::MAX), 32);
}
