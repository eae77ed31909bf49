use ethereum_types::U256;
use zk_tracer_common::hi_lo;
use zk_tracer_proc_macro::TraceRow;

use super::{CommonPrecompile, OobCall, OobOperation};
use crate::trace::{Trace, TraceResult, TraceTable};

/// An OOB call, stamped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct OobEntry {
    pub(crate) stamp: u64,
    pub(crate) operation: OobOperation,
}

#[derive(TraceRow)]
#[trace(module = "oob")]
pub(crate) struct OobRow {
    #[column(width = 4)]
    stamp: u64,
    #[column(width = 1)]
    ct: usize,
    #[column(width = 1)]
    ct_max: usize,
    #[column(width = 2)]
    oob_inst: u16,
    #[column(width = 1)]
    is_jump: bool,
    #[column(width = 1)]
    is_jumpi: bool,
    #[column(width = 1)]
    is_rdc: bool,
    #[column(width = 1)]
    is_cdl: bool,
    #[column(width = 1)]
    is_xcall: bool,
    #[column(width = 1)]
    is_call: bool,
    #[column(width = 1)]
    is_create: bool,
    #[column(width = 1)]
    is_sstore: bool,
    #[column(width = 1)]
    is_deployment: bool,
    #[column(width = 1)]
    is_ecrecover: bool,
    #[column(width = 1)]
    is_sha2: bool,
    #[column(width = 1)]
    is_ripemd: bool,
    #[column(width = 1)]
    is_identity: bool,
    #[column(width = 1)]
    is_ecadd: bool,
    #[column(width = 1)]
    is_ecmul: bool,
    #[column(width = 1)]
    is_ecpairing: bool,
    #[column(width = 1)]
    is_modexp_cds: bool,
    #[column(width = 1)]
    is_modexp_xbs: bool,
    #[column(width = 1)]
    is_modexp_lead: bool,
    #[column(width = 1)]
    is_modexp_pricing: bool,
    #[column(width = 1)]
    is_modexp_extract: bool,
    #[column(width = 1)]
    is_blake2f_cds: bool,
    #[column(width = 1)]
    is_blake2f_params: bool,
    #[column(width = 16)]
    data_1: U256,
    #[column(width = 16)]
    data_2: U256,
    #[column(width = 16)]
    data_3: U256,
    #[column(width = 16)]
    data_4: U256,
    #[column(width = 16)]
    data_5: U256,
    #[column(width = 16)]
    data_6: U256,
    #[column(width = 16)]
    data_7: U256,
    #[column(width = 16)]
    data_8: U256,
    #[column(width = 16)]
    data_9: U256,
    #[column(width = 1)]
    add_flag: bool,
    #[column(width = 1)]
    mod_flag: bool,
    #[column(width = 1)]
    wcp_flag: bool,
    #[column(width = 1)]
    outgoing_inst: u8,
    #[column(width = 16)]
    outgoing_data_1: u128,
    #[column(width = 16)]
    outgoing_data_2: u128,
    #[column(width = 16)]
    outgoing_data_3: u128,
    #[column(width = 16)]
    outgoing_data_4: u128,
    #[column(width = 16)]
    outgoing_res_lo: u128,
}

impl OobEntry {
    fn write_rows(&self, trace: &mut Trace) -> TraceResult<()> {
        let call = &self.operation.call;
        let common = match call {
            OobCall::Precompile { precompile, .. } => Some(*precompile),
            _ => None,
        };
        let [data_1, data_2, data_3, data_4, data_5, data_6, data_7, data_8, data_9] =
            self.operation.data;

        for ct in 0..self.operation.row_count() {
            let outgoing = self.operation.exo_calls.get(ct);
            let (outgoing_data_1, outgoing_data_2) =
                outgoing.map_or((0, 0), |exo| hi_lo(exo.arg_1));
            let (outgoing_data_3, outgoing_data_4) =
                outgoing.map_or((0, 0), |exo| hi_lo(exo.arg_2));
            trace.push(&OobRow {
                stamp: self.stamp,
                ct,
                ct_max: call.ct_max(),
                oob_inst: call.instruction(),
                is_jump: matches!(call, OobCall::Jump { .. }),
                is_jumpi: matches!(call, OobCall::JumpI { .. }),
                is_rdc: matches!(call, OobCall::ReturnDataCopy { .. }),
                is_cdl: matches!(call, OobCall::CallDataLoad { .. }),
                is_xcall: matches!(call, OobCall::XCall { .. }),
                is_call: matches!(call, OobCall::Call { .. }),
                is_create: matches!(call, OobCall::Create { .. }),
                is_sstore: matches!(call, OobCall::SStore { .. }),
                is_deployment: matches!(call, OobCall::Deployment { .. }),
                is_ecrecover: common == Some(CommonPrecompile::EcRecover),
                is_sha2: common == Some(CommonPrecompile::Sha2),
                is_ripemd: common == Some(CommonPrecompile::Ripemd),
                is_identity: common == Some(CommonPrecompile::Identity),
                is_ecadd: common == Some(CommonPrecompile::EcAdd),
                is_ecmul: common == Some(CommonPrecompile::EcMul),
                is_ecpairing: common == Some(CommonPrecompile::EcPairing),
                is_modexp_cds: matches!(call, OobCall::ModexpCds { .. }),
                is_modexp_xbs: matches!(call, OobCall::ModexpXbs { .. }),
                is_modexp_lead: matches!(call, OobCall::ModexpLead { .. }),
                is_modexp_pricing: matches!(call, OobCall::ModexpPricing { .. }),
                is_modexp_extract: matches!(call, OobCall::ModexpExtract { .. }),
                is_blake2f_cds: matches!(call, OobCall::BlakeCds { .. }),
                is_blake2f_params: matches!(call, OobCall::BlakeParams { .. }),
                data_1,
                data_2,
                data_3,
                data_4,
                data_5,
                data_6,
                data_7,
                data_8,
                data_9,
                add_flag: outgoing.is_some_and(|exo| exo.is_add()),
                mod_flag: outgoing.is_some_and(|exo| exo.is_mod()),
                wcp_flag: outgoing.is_some_and(|exo| exo.wcp().is_some()),
                outgoing_inst: outgoing.map_or(0, |exo| exo.instruction.byte()),
                outgoing_data_1,
                outgoing_data_2,
                outgoing_data_3,
                outgoing_data_4,
                outgoing_res_lo: outgoing.map_or(0, |exo| exo.result.low_u128()),
            })?;
        }
        Ok(())
    }
}

pub(crate) fn generate_trace(ops: &[OobEntry], padding_rows: usize) -> TraceResult<TraceTable> {
    let mut trace = Trace::for_row::<OobRow>();
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
    fn one_row_per_counter() {
        let ops = [
            OobEntry {
                stamp: 1,
                operation: OobOperation::new(OobCall::SStore { gas: 5000 }),
            },
            OobEntry {
                stamp: 2,
                operation: OobOperation::new(OobCall::Call {
                    value: 7.into(),
                    balance: 10.into(),
                    depth: 1,
                }),
            },
        ];
        let table = generate_trace(&ops, 1).unwrap();
        assert_eq!(table.row_count(), 1 + 3 + 1);

        let w = |v: u64| U256::from(v);
        assert_eq!(table.values("oob.CT"), vec![w(0), w(0), w(1), w(2), w(0)]);
        assert_eq!(table.value("oob.OOB_INST", 1), Some(w(0xca)));
        assert_eq!(table.value("oob.DATA_5", 0), Some(w(5000)));
        // Row 1 of the CALL compares the depth with 1024.
        assert_eq!(table.value("oob.OUTGOING_DATA_2", 2), Some(w(1)));
        assert_eq!(table.value("oob.OUTGOING_DATA_4", 2), Some(w(1024)));
        assert_eq!(table.value("oob.OUTGOING_RES_LO", 2), Some(w(1)));
        assert_eq!(table.value("oob.WCP_FLAG", 3), Some(w(1)));
        assert_eq!(table.value("oob.OUTGOING_INST", 3), Some(w(0x15)));
    }
}
