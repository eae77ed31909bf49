//! SSTORE pricing, following EIP-2200 as amended by EIP-2929 and EIP-3529.

use ethereum_types::U256;
use zk_tracer_common::gas::{G_COLD_SLOAD, G_SRESET, G_SSET, G_WARM_ACCESS, R_SCLEAR};

use crate::structlog::StorageFacts;

/// Which branch of the pricing applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SStoreBucket {
    /// The value does not change.
    Noop,
    /// A clean zero slot becomes nonzero.
    Set,
    /// A clean nonzero slot changes.
    Reset,
    /// The slot was already written in this transaction.
    Dirty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SStoreCost {
    pub bucket: SStoreBucket,
    /// Cost of the write itself.
    pub storage: u64,
    /// Surcharge for a slot accessed for the first time in the transaction.
    pub access: u64,
    pub refund: i64,
}

const R_SCLEAR_SIGNED: i64 = R_SCLEAR as i64;

pub fn sstore_cost(facts: StorageFacts, new: U256) -> SStoreCost {
    let StorageFacts {
        original,
        current,
        warm,
    } = facts;
    let access = if warm { 0 } else { G_COLD_SLOAD };

    if new == current {
        return SStoreCost {
            bucket: SStoreBucket::Noop,
            storage: G_WARM_ACCESS,
            access,
            refund: 0,
        };
    }

    if original == current {
        let (bucket, storage) = if original.is_zero() {
            (SStoreBucket::Set, G_SSET)
        } else {
            (SStoreBucket::Reset, G_SRESET)
        };
        let refund = if !original.is_zero() && new.is_zero() {
            R_SCLEAR_SIGNED
        } else {
            0
        };
        return SStoreCost {
            bucket,
            storage,
            access,
            refund,
        };
    }

    let mut refund = 0;
    if !original.is_zero() {
        if current.is_zero() {
            refund -= R_SCLEAR_SIGNED;
        }
        if new.is_zero() {
            refund += R_SCLEAR_SIGNED;
        }
    }
    if original == new {
        refund += if original.is_zero() {
            (G_SSET - G_WARM_ACCESS) as i64
        } else {
            (G_SRESET - G_WARM_ACCESS) as i64
        };
    }
    SStoreCost {
        bucket: SStoreBucket::Dirty,
        storage: G_WARM_ACCESS,
        access,
        refund,
    }
}
