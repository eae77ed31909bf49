#[cfg(test)]
use ethereum_types::U256;
use zk_tracer_common::{hi_lo, LLARGE};
use zk_tracer_proc_macro::TraceRow;

use super::{ExpCall, ExpOperation};
use crate::trace::{Trace, TraceResult, TraceTable};

/// An EXP computation, stamped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ExpEntry {
    pub(crate) stamp: u64,
    pub(crate) operation: ExpOperation,
}

/// Rows are laid out in three phases: one macro row with the inputs and the
/// result, the preprocessing rows, then one computation row per byte of the
/// decomposed limb.
#[derive(TraceRow, Default)]
#[trace(module = "exp")]
pub(crate) struct ExpRow {
    #[column(width = 4)]
    stamp: u64,
    #[column(width = 1)]
    r#macro: bool,
    #[column(width = 1)]
    prprc: bool,
    #[column(width = 1)]
    cmptn: bool,
    #[column(width = 1)]
    ct: usize,
    #[column(width = 1)]
    ct_max: usize,
    #[column(width = 1)]
    is_exp_log: bool,
    #[column(width = 1)]
    is_modexp_log: bool,
    #[column(width = 2)]
    exp_inst: u16,
    #[column(width = 16)]
    data_1: u128,
    #[column(width = 16)]
    data_2: u128,
    #[column(width = 16)]
    data_3: u64,
    #[column(width = 16)]
    data_4: u64,
    #[column(width = 16)]
    data_5: u64,
    #[column(width = 1)]
    raw_byte: u8,
    #[column(width = 16)]
    raw_acc: u128,
    #[column(width = 1)]
    trim_byte: u8,
    #[column(width = 16)]
    trim_acc: u128,
    #[column(width = 1, name = "NZB_ACC")]
    nonzero_bytes_acc: usize,
    #[column(width = 1)]
    msb: u8,
    #[column(width = 1)]
    wcp_flag: bool,
    #[column(width = 1)]
    wcp_inst: u8,
    #[column(width = 16)]
    wcp_arg_1_hi: u128,
    #[column(width = 16)]
    wcp_arg_1_lo: u128,
    #[column(width = 16)]
    wcp_arg_2_lo: u128,
    #[column(width = 1)]
    wcp_res: bool,
}

fn accumulate(bytes: &[u8], ct: usize) -> u128 {
    bytes[..=ct]
        .iter()
        .fold(0, |acc, byte| (acc << 8) | u128::from(*byte))
}

impl ExpEntry {
    fn write_rows(&self, trace: &mut Trace) -> TraceResult<()> {
        let op = &self.operation;
        let is_exp_log = matches!(op.call, ExpCall::ExpLog { .. });
        let base = ExpRow {
            stamp: self.stamp,
            is_exp_log,
            is_modexp_log: !is_exp_log,
            exp_inst: op.call.instruction(),
            ..Default::default()
        };

        let (data_1, data_2, data_3, data_4) = match op.call {
            ExpCall::ExpLog { exponent } => {
                let (hi, lo) = hi_lo(exponent);
                (hi, lo, 0, 0)
            }
            ExpCall::ModexpLog {
                raw_lead,
                cds_cutoff,
                ebs_cutoff,
            } => {
                let (hi, lo) = hi_lo(raw_lead);
                (hi, lo, cds_cutoff, ebs_cutoff)
            }
        };
        trace.push(&ExpRow {
            r#macro: true,
            data_1,
            data_2,
            data_3,
            data_4,
            data_5: op.result,
            ..base
        })?;

        let preprocessing_rows = op.call.preprocessing_rows();
        for ct in 0..preprocessing_rows {
            let exo = op.preprocessing.get(ct);
            let (wcp_arg_1_hi, wcp_arg_1_lo) = exo.map_or((0, 0), |exo| hi_lo(exo.arg_1));
            trace.push(&ExpRow {
                prprc: true,
                ct,
                ct_max: preprocessing_rows - 1,
                wcp_flag: exo.is_some(),
                wcp_inst: exo.map_or(0, |exo| exo.instruction.byte()),
                wcp_arg_1_hi,
                wcp_arg_1_lo,
                wcp_arg_2_lo: exo.map_or(0, |exo| exo.arg_2.low_u128()),
                wcp_res: exo.is_some_and(|exo| !exo.result.is_zero()),
                ..base
            })?;
        }

        let raw = op.raw_limb().to_be_bytes();
        let trim = op.limb().to_be_bytes();
        let first_nonzero = trim.iter().position(|byte| *byte != 0);
        let msb = first_nonzero.map_or(0, |i| trim[i]);
        for ct in 0..LLARGE {
            trace.push(&ExpRow {
                cmptn: true,
                ct,
                ct_max: LLARGE - 1,
                raw_byte: raw[ct],
                raw_acc: accumulate(&raw, ct),
                trim_byte: trim[ct],
                trim_acc: accumulate(&trim, ct),
                nonzero_bytes_acc: first_nonzero.map_or(0, |i| (ct + 1).saturating_sub(i)),
                msb,
                ..base
            })?;
        }
        Ok(())
    }
}

pub(crate) fn generate_trace(ops: &[ExpEntry], padding_rows: usize) -> TraceResult<TraceTable> {
    let mut trace = Trace::for_row::<ExpRow>();
    for op in ops {
        op.write_rows(&mut trace)?;
    }
    trace.pad(padding_rows)?;
    trace.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_preprocessing_and_computation_rows() {
        let ops = [
            ExpEntry {
                stamp: 1,
                operation: ExpOperation::new(ExpCall::ExpLog {
                    exponent: U256::from(0x01ff),
                }),
            },
            ExpEntry {
                stamp: 2,
                operation: ExpOperation::new(ExpCall::ModexpLog {
                    raw_lead: U256::MAX,
                    cds_cutoff: 32,
                    ebs_cutoff: 32,
                }),
            },
        ];
        let table = generate_trace(&ops, 2).unwrap();
        assert_eq!(table.row_count(), (1 + 16) + (1 + 3 + 16) + 2);

        let w = |v: u64| U256::from(v);
        assert_eq!(table.value("exp.DATA_5", 0), Some(w(100)));
        assert_eq!(table.value("exp.MACRO", 0), Some(w(1)));
        // The last two computation rows hold the exponent bytes.
        assert_eq!(table.value("exp.TRIM_ACC", 16), Some(w(0x01ff)));
        assert_eq!(table.value("exp.NZB_ACC", 16), Some(w(2)));
        assert_eq!(table.value("exp.MSB", 1), Some(w(1)));

        assert_eq!(table.value("exp.DATA_5", 17), Some(w(255)));
        assert_eq!(table.value("exp.PRPRC", 18), Some(w(1)));
        assert_eq!(table.value("exp.WCP_INST", 20), Some(w(0x15)));
        assert_eq!(table.value("exp.NZB_ACC", 21), Some(w(1)));
        assert_eq!(table.value("exp.STAMP", 37), Some(w(0)));
    }
}
