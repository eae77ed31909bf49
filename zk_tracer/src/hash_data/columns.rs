use static_assertions::const_assert_eq;
use zk_tracer_common::{LLARGE, WORD_SIZE};
use zk_tracer_proc_macro::TraceRow;

use super::{HashDataOperation, HashFunction};
use crate::trace::{Trace, TraceResult, TraceTable};

#[derive(TraceRow)]
#[trace(module = "shakiradata")]
pub(crate) struct HashDataRow {
    #[column(width = 4)]
    shakira_stamp: u64,
    #[column(width = 4)]
    id: u64,
    #[column(width = 1)]
    phase: u8,
    #[column(width = 4)]
    index: usize,
    #[column(width = 4)]
    index_max: usize,
    #[column(width = 16)]
    limb: u128,
    #[column(width = 1, name = "nBYTES")]
    n_bytes: usize,
    #[column(width = 4, name = "nBYTES_ACC")]
    n_bytes_acc: usize,
    #[column(width = 4)]
    total_size: usize,
    #[column(width = 1)]
    is_sha2_data: bool,
    #[column(width = 1)]
    is_sha2_result: bool,
    #[column(width = 1)]
    is_ripemd_data: bool,
    #[column(width = 1)]
    is_ripemd_result: bool,
    #[column(width = 1)]
    is_keccak_data: bool,
    #[column(width = 1)]
    is_keccak_result: bool,
    #[column(width = 1)]
    selector_keccak_res_hi: bool,
    #[column(width = 1)]
    selector_sha2_res_hi: bool,
    #[column(width = 1)]
    selector_ripemd_res_hi: bool,
}

// A digest fills one hi and one lo result row.
const_assert_eq!(2 * LLARGE, WORD_SIZE);

/// A limb holding `bytes` left-aligned.
fn limb(bytes: &[u8]) -> u128 {
    let mut limb = [0; LLARGE];
    limb[..bytes.len()].copy_from_slice(bytes);
    u128::from_be_bytes(limb)
}

impl HashDataOperation {
    fn write_rows(&self, stamp: u64, trace: &mut Trace) -> TraceResult<()> {
        let function = self.function;
        let total_size = self.input.len();
        let index_max = self.data_rows() - 1;
        let is = |f: HashFunction| function == f;

        let mut chunks = self.input.chunks(LLARGE).collect::<Vec<_>>();
        if chunks.is_empty() {
            chunks.push(&[]);
        }
        let mut n_bytes_acc = 0;
        for (index, chunk) in chunks.into_iter().enumerate() {
            n_bytes_acc += chunk.len();
            trace.push(&HashDataRow {
                shakira_stamp: stamp,
                id: self.id,
                phase: function.data_phase(),
                index,
                index_max,
                limb: limb(chunk),
                n_bytes: chunk.len(),
                n_bytes_acc,
                total_size,
                is_sha2_data: is(HashFunction::Sha2),
                is_sha2_result: false,
                is_ripemd_data: is(HashFunction::Ripemd),
                is_ripemd_result: false,
                is_keccak_data: is(HashFunction::Keccak),
                is_keccak_result: false,
                selector_keccak_res_hi: false,
                selector_sha2_res_hi: false,
                selector_ripemd_res_hi: false,
            })?;
        }

        for (index, half) in self.digest.chunks(LLARGE).enumerate() {
            let hi = index == 0;
            trace.push(&HashDataRow {
                shakira_stamp: stamp,
                id: self.id,
                phase: function.result_phase(),
                index,
                index_max: 1,
                limb: limb(half),
                n_bytes: 0,
                n_bytes_acc: 0,
                total_size,
                is_sha2_data: false,
                is_sha2_result: is(HashFunction::Sha2),
                is_ripemd_data: false,
                is_ripemd_result: is(HashFunction::Ripemd),
                is_keccak_data: false,
                is_keccak_result: is(HashFunction::Keccak),
                selector_keccak_res_hi: hi && is(HashFunction::Keccak),
                selector_sha2_res_hi: hi && is(HashFunction::Sha2),
                selector_ripemd_res_hi: hi && is(HashFunction::Ripemd),
            })?;
        }
        Ok(())
    }
}

/// Operations are stamped in order.
pub(crate) fn generate_trace(
    ops: &[HashDataOperation],
    padding_rows: usize,
) -> TraceResult<TraceTable> {
    let mut trace = Trace::for_row::<HashDataRow>();
    for (stamp, op) in (1..).zip(ops) {
        op.write_rows(stamp, &mut trace)?;
    }
    trace.pad(padding_rows)?;
    trace.build()
}

#[cfg(test)]
mod tests {
    use ethereum_types::U256;

    use super::*;

    #[test]
    fn limbs_of_0_16_and_33_bytes() {
        let ops = [
            HashDataOperation::new(1, HashFunction::Keccak, vec![]),
            HashDataOperation::new(2, HashFunction::Sha2, vec![0xaa; 16]),
            HashDataOperation::new(3, HashFunction::Ripemd, (0..33).collect()),
        ];
        let table = generate_trace(&ops, 2).unwrap();
        assert_eq!(table.row_count(), (1 + 2) + (1 + 2) + (3 + 2) + 2);

        let w = |v: u64| U256::from(v);
        // The empty input has one empty data row.
        assert_eq!(table.value("shakiradata.nBYTES", 0), Some(w(0)));
        assert_eq!(table.value("shakiradata.INDEX_MAX", 0), Some(w(0)));
        assert_eq!(table.value("shakiradata.SELECTOR_KECCAK_RES_HI", 1), Some(w(1)));
        assert_eq!(table.value("shakiradata.PHASE", 2), Some(w(6)));

        assert_eq!(table.value("shakiradata.nBYTES", 3), Some(w(16)));
        let limb = U256::from(u128::from_be_bytes([0xaa; 16]));
        assert_eq!(table.value("shakiradata.LIMB", 3), Some(limb));

        let phases = table.values("shakiradata.PHASE");
        assert_eq!(&phases[6..11], &[w(3), w(3), w(3), w(4), w(4)]);
        assert_eq!(table.value("shakiradata.nBYTES", 8), Some(w(1)));
        assert_eq!(table.value("shakiradata.nBYTES_ACC", 8), Some(w(33)));
        // The last limb is left-aligned.
        assert_eq!(table.value("shakiradata.LIMB", 8), Some(U256::from(32u128 << 120)));
        // RIPEMD digests are left-padded.
        assert_eq!(
            table.value("shakiradata.LIMB", 9).map(|limb| limb >> 32),
            Some(U256::zero())
        );
        assert_eq!(table.value("shakiradata.SHAKIRA_STAMP", 10), Some(w(3)));
    }
}
