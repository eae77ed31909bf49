//! Calls to precompiled contracts. A precompile runs no opcode, so its checks
//! are recorded as a sequence of fragments attributed to the calling context,
//! and its output lives in a dedicated return data frame.

use crate::callstack::{CallFrameType, FrameDescriptor};
use crate::exp::ExpCall;
use crate::generation::state::ConflationContext;
use crate::hash_data::{HashDataOperation, HashFunction};
use crate::imc::ImcFragment;
use crate::mmu::{ExoModule, MmuCall};
use crate::oob::{OobCall, OobOutcome, XbsOperand};
use crate::precompiles::blake::Blake2fMetadata;
use crate::precompiles::modexp::ModexpMetadata;
use crate::precompiles::{
    Precompile, PHASE_BLAKE_PARAMS, PHASE_MODEXP_BASE, PHASE_MODEXP_EXPONENT,
    PHASE_MODEXP_MODULUS,
};
use crate::structlog::{ContextEnter, ContextExit};
use crate::witness::errors::{EventContext, HostError, TracerResult};

/// What a precompile call contributes to the traces.
#[derive(Debug, Default)]
pub(crate) struct PrecompileSteps {
    pub(crate) fragments: Vec<ImcFragment>,
    pub(crate) hash: Option<HashDataOperation>,
}

impl PrecompileSteps {
    fn oob(&mut self, call: OobCall) -> TracerResult<OobOutcome> {
        let mut fragment = ImcFragment::new();
        let outcome = fragment.call_oob(call)?.outcome;
        self.fragments.push(fragment);
        Ok(outcome)
    }

    fn mmu(&mut self, call: MmuCall) -> TracerResult<()> {
        let mut fragment = ImcFragment::new();
        fragment.call_mmu(call)?;
        self.fragments.push(fragment);
        Ok(())
    }

    /// Builds the steps of a call to `precompile` from the context numbered
    /// `caller`. Operations handed to other modules are identified by
    /// `exo_id`.
    pub(crate) fn new(
        precompile: Precompile,
        enter: &ContextEnter,
        caller: u64,
        exo_id: u64,
    ) -> TracerResult<Self> {
        let mut steps = Self::default();
        match precompile {
            Precompile::Modexp => steps.modexp(enter, caller, exo_id)?,
            Precompile::Blake2f => steps.blake(enter, caller, exo_id)?,
            Precompile::PointEvaluation => {}
            _ => steps.common(precompile, enter, caller, exo_id)?,
        }
        Ok(steps)
    }

    fn common(
        &mut self,
        precompile: Precompile,
        enter: &ContextEnter,
        caller: u64,
        exo_id: u64,
    ) -> TracerResult<()> {
        let Some(common) = precompile.common() else {
            return Ok(());
        };
        let cds = enter.call_data.len() as u64;
        let mut fragment = ImcFragment::new();
        let outcome = fragment
            .call_oob(OobCall::Precompile {
                precompile: common,
                callee_gas: enter.gas,
                cds,
                return_at_capacity: enter.return_at_range.length,
            })?
            .outcome;
        let hub_success = matches!(outcome, OobOutcome::Precompile { hub_success: true, .. });

        if hub_success && cds > 0 {
            if let Some(module) = precompile.exo_module() {
                fragment.call_mmu(MmuCall::precompile_call_data(
                    caller,
                    exo_id,
                    enter.call_data_range,
                    module,
                    precompile.data_phase(),
                ))?;
            }
        }
        self.fragments.push(fragment);

        let function = match precompile {
            Precompile::Sha2 => Some(HashFunction::Sha2),
            Precompile::Ripemd => Some(HashFunction::Ripemd),
            _ => None,
        };
        if let (true, Some(function)) = (hub_success, function) {
            self.hash = Some(HashDataOperation::new(exo_id, function, enter.call_data.clone()));
        }
        Ok(())
    }

    fn modexp(&mut self, enter: &ContextEnter, caller: u64, exo_id: u64) -> TracerResult<()> {
        let metadata = ModexpMetadata::new(&enter.call_data);
        let cds = metadata.call_data_size();

        self.oob(OobCall::ModexpCds { cds })?;
        self.oob(OobCall::ModexpXbs {
            which: XbsOperand::Bbs,
            xbs: metadata.bbs,
            ybs: 0,
            compute_max: false,
        })?;
        self.oob(OobCall::ModexpXbs {
            which: XbsOperand::Ebs,
            xbs: metadata.ebs,
            ybs: 0,
            compute_max: false,
        })?;
        self.oob(OobCall::ModexpXbs {
            which: XbsOperand::Mbs,
            xbs: metadata.mbs,
            ybs: metadata.bbs(),
            compute_max: true,
        })?;
        if metadata.unsupported() {
            log::warn!(
                "Unsupported MODEXP sizes: bbs {}, ebs {}, mbs {}",
                metadata.bbs,
                metadata.ebs,
                metadata.mbs
            );
            return Ok(());
        }

        let mut lead = ImcFragment::new();
        lead.call_oob(OobCall::ModexpLead {
            bbs: metadata.bbs(),
            cds,
            ebs: metadata.ebs(),
        })?;
        if metadata.load_lead() {
            lead.call_exp(ExpCall::ModexpLog {
                raw_lead: metadata.raw_lead(),
                cds_cutoff: metadata.cds_cutoff(),
                ebs_cutoff: metadata.ebs_cutoff(),
            })?;
        }
        self.fragments.push(lead);

        let return_at_capacity = enter.return_at_range.length;
        let pricing = self.oob(metadata.pricing_call(enter.gas, return_at_capacity))?;
        if !matches!(pricing, OobOutcome::ModexpPricing { ram_success: true, .. }) {
            return Ok(());
        }

        self.oob(OobCall::ModexpExtract {
            cds,
            bbs: metadata.bbs(),
            ebs: metadata.ebs(),
            mbs: metadata.mbs(),
        })?;
        let base = enter.call_data_range.offset.saturating_add(96);
        let exponent = base.saturating_add(metadata.bbs());
        let modulus = exponent.saturating_add(metadata.ebs());
        let operands = [
            (base, metadata.bbs(), metadata.extract_base(), PHASE_MODEXP_BASE),
            (exponent, metadata.ebs(), metadata.extract_exponent(), PHASE_MODEXP_EXPONENT),
            (modulus, metadata.mbs(), metadata.extract_modulus(), PHASE_MODEXP_MODULUS),
        ];
        for (offset, size, present, phase) in operands {
            self.mmu(MmuCall::modexp_operand(caller, exo_id, offset, size, present, phase))?;
        }
        Ok(())
    }

    fn blake(&mut self, enter: &ContextEnter, caller: u64, exo_id: u64) -> TracerResult<()> {
        let cds = enter.call_data.len() as u64;
        let outcome = self.oob(OobCall::BlakeCds {
            cds,
            return_at_capacity: enter.return_at_range.length,
        })?;
        let Some(metadata) = Blake2fMetadata::new(&enter.call_data) else {
            return Ok(());
        };
        if !matches!(outcome, OobOutcome::BlakeCds { hub_success: true, .. }) {
            return Ok(());
        }

        let mut params = ImcFragment::new();
        let mut extraction = MmuCall::blake(
            caller,
            exo_id,
            enter.call_data_range,
            metadata.rounds,
            metadata.f,
        );
        extraction.phase = PHASE_BLAKE_PARAMS;
        params.call_mmu(extraction)?;
        let outcome = params
            .call_oob(OobCall::BlakeParams {
                callee_gas: enter.gas,
                blake_r: metadata.rounds,
                blake_f: metadata.f,
            })?
            .outcome;
        self.fragments.push(params);

        if matches!(outcome, OobOutcome::BlakeParams { ram_success: true, .. }) {
            self.mmu(MmuCall::precompile_call_data(
                caller,
                exo_id,
                enter.call_data_range,
                ExoModule::BlakeModexp,
                Precompile::Blake2f.data_phase(),
            ))?;
        }
        Ok(())
    }
}

fn event_context(ctx: &ConflationContext) -> EventContext {
    EventContext {
        hub_stamp: ctx.stamps.hub,
        context_number: ctx.call_stack.current().context_number(),
        ..Default::default()
    }
}

/// Records the checks of a call to `precompile` and opens its return data
/// frame.
pub(crate) fn enter(
    ctx: &mut ConflationContext,
    precompile: Precompile,
    enter: &ContextEnter,
) -> TracerResult<()> {
    let caller = ctx.call_stack.current().context_number();
    let hub_stamp = ctx.stamps.hub;
    let steps = PrecompileSteps::new(precompile, enter, caller, hub_stamp + 1)?;

    let ConflationContext {
        traces,
        stamps,
        previous_hash_id,
        ..
    } = &mut *ctx;
    if let Some(hash) = steps.hash {
        traces.push_hash(stamps, previous_hash_id, hash)?;
    }
    for fragment in steps.fragments {
        traces.push_fragment(stamps, caller, fragment);
    }

    let context_number = ctx.context_number + 1;
    let descriptor = FrameDescriptor {
        context_number,
        hub_stamp,
        account_address: enter.address,
        byte_code_address: enter.code_address,
        caller_address: enter.caller,
        value: enter.value,
        gas_at_entry: enter.gas,
        call_data: enter.call_data.clone(),
        call_data_range: enter.call_data_range,
        return_at_range: enter.return_at_range,
        ..Default::default()
    };
    ctx.call_stack
        .enter_precompile(descriptor)
        .map_err(|err| HostError::malformed(event_context(ctx), err.to_string()))?;
    ctx.context_number = context_number;
    log::debug!("Entered {:?} as context {}", precompile, context_number);
    Ok(())
}

/// Hands the output of the current precompile frame back to its caller.
pub(crate) fn exit(ctx: &mut ConflationContext, exit: &ContextExit) -> TracerResult<()> {
    let frame = ctx.call_stack.current();
    let Some(precompile) = Precompile::from_address(&frame.byte_code_address()) else {
        let reason = "precompile frame at a non-precompile address";
        return Err(HostError::malformed(event_context(ctx), reason).into());
    };
    let exo_id = frame.hub_stamp_at_entry() + 1;
    let own = frame.context_number();
    let caller = ctx.call_stack.parent().context_number();
    let return_at = frame.return_at_range();
    let size = exit.output.len() as u64;

    let mut calls = Vec::new();
    if exit.success && size > 0 {
        if let Some(module) = precompile.exo_module() {
            calls.push(MmuCall::precompile_result(
                own,
                exo_id,
                size,
                module,
                precompile.result_phase(),
            ));
        }
        if !return_at.is_empty() {
            calls.push(MmuCall::precompile_return_data_copy(own, caller, size, return_at));
        }
    }
    for call in calls {
        let mut fragment = ImcFragment::new();
        fragment.call_mmu(call)?;
        let ConflationContext { traces, stamps, .. } = &mut *ctx;
        traces.push_fragment(stamps, caller, fragment);
    }

    let output = if exit.success { exit.output.clone() } else { vec![] };
    ctx.call_stack.exit_precompile(ctx.stamps.hub, output)?;
    log::debug!("Exited {:?} (context {})", precompile, own);
    Ok(())
}

/// Whether the current frame holds the output of a precompile.
pub(crate) fn in_precompile(ctx: &ConflationContext) -> bool {
    ctx.call_stack.current().frame_type() == CallFrameType::PrecompileReturnData
}
