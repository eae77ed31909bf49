//! Lowering of one opcode event into a hub row and its module operations.

use crate::callstack::CallFrameType;
use crate::gas;
use crate::generation::state::ConflationContext;
use crate::generation::TracerConfig;
use crate::hash_data::{HashDataOperation, HashFunction};
use crate::hub::HubEntry;
use crate::imc::{ImcFragment, ImcSignals};
use crate::oob::OobOutcome;
use crate::opcode::OpCode;
use crate::structlog::OpcodeEvent;
use crate::witness::errors::{EventContext, HostError, MissingInput, TracerResult};
use crate::witness::state::OperandSnapshot;

/// Enriches the event with the facts of the executing frame.
pub(crate) fn snapshot(
    ctx: &ConflationContext,
    event: &OpcodeEvent,
) -> Result<OperandSnapshot, HostError> {
    let opcode = OpCode::decode(event.op);
    let frame = ctx.call_stack.current();
    let context = EventContext {
        hub_stamp: ctx.stamps.hub + 1,
        pc: event.pc,
        opcode: event.op,
        context_number: frame.context_number(),
    };
    if frame.is_empty() || frame.frame_type() == CallFrameType::PhantomCallDataHolder {
        return Err(HostError::malformed(context, "opcode outside of any execution context"));
    }
    if event.depth != frame.depth() {
        return Err(HostError::DepthMismatch {
            context,
            reported: event.depth,
            expected: frame.depth(),
        });
    }

    let mut snapshot = OperandSnapshot::from_event(event, opcode, context);
    snapshot.is_static = frame.is_static();
    snapshot.deploying = ctx
        .deployments
        .is_under_deployment(&frame.account_address());
    snapshot.call_data_size = frame.call_data().len() as u64;
    snapshot.return_data_size = frame.return_data().len() as u64;
    snapshot.return_at_capacity = frame.return_at_range().length;
    snapshot.code_size = frame.code_size();
    Ok(snapshot)
}

fn check_gas(snapshot: &OperandSnapshot) -> Result<gas::GasProjection, HostError> {
    let projection = gas::project(snapshot)?;
    let projected = projection.total();
    if projected != snapshot.gas_cost {
        return Err(HostError::GasMismatch {
            context: snapshot.context,
            projected,
            charged: snapshot.gas_cost,
        });
    }
    Ok(projection)
}

/// Traces one opcode. Nothing is mutated before every fallible step has
/// passed, except the rows, which the caller rolls back on error.
pub(crate) fn transition(
    ctx: &mut ConflationContext,
    config: &TracerConfig,
    event: &OpcodeEvent,
) -> TracerResult<()> {
    let snapshot = snapshot(ctx, event)?;
    let hub_stamp = snapshot.context.hub_stamp;
    let exo_id = hub_stamp + 1;

    let signals = ImcSignals::compute(&snapshot)?;
    let fragment = ImcFragment::for_opcode(&snapshot, signals, &ctx.call_stack, exo_id)?;
    fragment.check_exceptions(&snapshot)?;

    if !snapshot.has_exception() {
        let refund = if config.check_gas {
            check_gas(&snapshot)?.refund()
        } else {
            gas::project(&snapshot)?.refund()
        };
        ctx.refund_counter = ctx.refund_counter.saturating_add_signed(refund);
    }

    if snapshot.opcode == OpCode::Keccak256 && !snapshot.has_exception() {
        let input = snapshot.memory_slice(snapshot.stack_u64(0)?, snapshot.stack_u64(1)?)?;
        let ConflationContext {
            traces,
            stamps,
            previous_hash_id,
            ..
        } = &mut *ctx;
        traces.push_hash(
            stamps,
            previous_hash_id,
            HashDataOperation::new(exo_id, HashFunction::Keccak, input),
        )?;
    }

    let create_failure = match fragment.oob.as_ref().map(|oob| oob.outcome) {
        Some(OobOutcome::Create { failure: true, .. }) => Some(
            snapshot
                .created_address
                .ok_or(HostError::missing(snapshot.context, MissingInput::CreatedAddress))?,
        ),
        _ => None,
    };

    let frame = ctx.call_stack.current();
    let frame_id = frame.id();
    let caller_context_number = ctx.call_stack.parent().context_number();
    let module_stamps = ctx
        .traces
        .push_fragment(&mut ctx.stamps, snapshot.context.context_number, fragment);
    let gas_next = if snapshot.has_exception() {
        0
    } else {
        snapshot.gas.saturating_sub(snapshot.gas_cost)
    };
    ctx.traces.hub.push(HubEntry {
        stamp: hub_stamp,
        frame_id,
        context_number: snapshot.context.context_number,
        caller_context_number,
        depth: snapshot.depth,
        pc: snapshot.context.pc,
        opcode: snapshot.opcode,
        gas_actual: snapshot.gas,
        gas_cost: snapshot.gas_cost,
        gas_next,
        refund_counter: ctx.refund_counter,
        exception: snapshot.exception,
        signals,
        module_stamps,
    });
    ctx.stamps.hub = hub_stamp;

    if let Some(address) = create_failure {
        let number = ctx.deployments.failed_deployment(address);
        log::debug!("Failed deployment {} at {:?}", number, address);
    }
    if snapshot.has_exception() || snapshot.opcode == OpCode::Revert {
        ctx.call_stack.revert_current(hub_stamp)?;
    }
    Ok(())
}
