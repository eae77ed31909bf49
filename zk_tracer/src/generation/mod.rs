use ethereum_types::Address;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use zk_tracer_common::MAX_CALL_STACK_DEPTH;

use crate::callstack::{CallFrameType, FrameDescriptor, MemoryRange};
use crate::precompiles::Precompile;
use crate::structlog::{ContextEnter, ContextExit, TraceEvent, TransactionStart};
use crate::trace::TraceTable;
use crate::witness::errors::{EventContext, HostError, TracerError, TracerResult};
use crate::witness::{precompile, transition};

pub mod state;

use self::state::ConflationContext;

/// Knobs of a tracing run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Whether the gas the host charged for each opcode is checked against
    /// the projection.
    pub check_gas: bool,
    /// Number of padding rows appended to every table.
    pub padding_rows: usize,
    pub max_call_stack_depth: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            check_gas: true,
            padding_rows: 2,
            max_call_stack_depth: MAX_CALL_STACK_DEPTH,
        }
    }
}

/// Lowers the events of a conflation into traces.
///
/// Events are applied atomically: when one fails, the rows it produced are
/// dropped. Host errors leave the tracer usable, protocol violations do not.
#[derive(Debug)]
pub struct Tracer {
    config: TracerConfig,
    ctx: ConflationContext,
}

impl Tracer {
    pub fn new(config: TracerConfig) -> Self {
        Self {
            ctx: ConflationContext::new(config.max_call_stack_depth),
            config,
        }
    }

    pub const fn config(&self) -> &TracerConfig {
        &self.config
    }

    pub const fn context(&self) -> &ConflationContext {
        &self.ctx
    }

    pub fn handle_event(&mut self, event: &TraceEvent) -> TracerResult<()> {
        let checkpoint = self.ctx.checkpoint();
        let result = match event {
            TraceEvent::TransactionStart(start) => self.start_transaction(start),
            TraceEvent::Opcode(opcode) => {
                transition::transition(&mut self.ctx, &self.config, opcode)
            }
            TraceEvent::ContextEnter(enter) => self.enter_context(enter),
            TraceEvent::ContextExit(exit) => self.exit_context(exit),
            TraceEvent::TransactionEnd => self.end_transaction(),
            TraceEvent::BlockEnd => {
                log::debug!("End of block at hub stamp {}", self.ctx.stamps.hub);
                Ok(())
            }
        };
        if let Err(err) = &result {
            self.ctx.rollback(checkpoint);
            if let TracerError::Host(_) = err {
                self.ctx.aborted_events += 1;
            }
        }
        result
    }

    /// Applies `events` in order. Events failing with a host error are
    /// skipped; any other error stops the run.
    pub fn handle_events<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a TraceEvent>,
    ) -> TracerResult<()> {
        for event in events {
            match self.handle_event(event) {
                Err(TracerError::Host(err)) => log::warn!("Skipping event: {err}"),
                result => result?,
            }
        }
        Ok(())
    }

    /// Builds the tables of the conflation.
    pub fn finalize(self) -> TracerResult<Vec<TraceTable>> {
        let ConflationContext {
            traces,
            call_stack,
            aborted_events,
            ..
        } = self.ctx;
        if aborted_events > 0 {
            log::warn!("{aborted_events} events were rejected");
        }
        let tables = traces.into_tables(&call_stack, self.config.padding_rows)?;
        log::info!(
            "Built tables: {}",
            tables
                .iter()
                .map(|table| format!("{} ({} rows)", table.module(), table.row_count()))
                .join(", ")
        );
        Ok(tables)
    }

    fn event_context(&self) -> EventContext {
        EventContext {
            hub_stamp: self.ctx.stamps.hub,
            context_number: self.ctx.call_stack.current().context_number(),
            ..Default::default()
        }
    }

    fn start_transaction(&mut self, start: &TransactionStart) -> TracerResult<()> {
        let ctx = &mut self.ctx;
        let phantom = FrameDescriptor {
            context_number: ctx.next_context_number(),
            hub_stamp: ctx.stamps.hub,
            caller_address: start.sender,
            value: start.value,
            gas_at_entry: start.gas,
            call_data: start.call_data.clone(),
            call_data_range: MemoryRange::new(0, start.call_data.len() as u64),
            ..Default::default()
        };
        let root = FrameDescriptor {
            frame_type: CallFrameType::Root,
            context_number: ctx.next_context_number(),
            hub_stamp: ctx.stamps.hub,
            caller_address: start.sender,
            value: start.value,
            gas_at_entry: start.gas,
            ..Default::default()
        };

        let (root, deployed) = match (start.recipient, start.created_address) {
            (Some(recipient), _) => (
                FrameDescriptor {
                    account_address: recipient,
                    byte_code_address: recipient,
                    call_data: start.call_data.clone(),
                    call_data_range: phantom.call_data_range,
                    code_size: start.code_size,
                    deployment_number: ctx.deployments.deployment_number(&recipient),
                    ..root
                },
                None,
            ),
            (None, Some(created)) => (
                FrameDescriptor {
                    account_address: created,
                    byte_code_address: created,
                    code_size: start.call_data.len() as u64,
                    deployment_number: ctx.deployments.deployment_number(&created) + 1,
                    ..root
                },
                Some(created),
            ),
            (None, None) => {
                return Err(HostError::malformed(
                    self.event_context(),
                    "deployment transaction without a created address",
                )
                .into())
            }
        };

        let ctx = &mut self.ctx;
        ctx.call_stack.new_transaction(phantom, root)?;
        if let Some(address) = deployed {
            ctx.deployments
                .new_deployment(address, start.call_data.clone());
        }
        ctx.refund_counter = 0;
        log::debug!(
            "Transaction from {:?} opens context {}",
            start.sender,
            ctx.context_number
        );
        Ok(())
    }

    fn enter_context(&mut self, enter: &ContextEnter) -> TracerResult<()> {
        if let Some(precompile) = Precompile::from_address(&enter.code_address) {
            return precompile::enter(&mut self.ctx, precompile, enter);
        }

        let deploying = enter.frame_type == CallFrameType::InitCode;
        let ctx = &mut self.ctx;
        let context_number = ctx.context_number + 1;
        let descriptor = FrameDescriptor {
            frame_type: enter.frame_type,
            context_number,
            hub_stamp: ctx.stamps.hub,
            account_address: enter.address,
            byte_code_address: enter.code_address,
            caller_address: enter.caller,
            value: enter.value,
            gas_at_entry: enter.gas,
            is_static: enter.is_static,
            call_data: if deploying {
                vec![]
            } else {
                enter.call_data.clone()
            },
            call_data_range: enter.call_data_range,
            return_at_range: enter.return_at_range,
            code_size: if deploying {
                enter.call_data.len() as u64
            } else {
                enter.code_size
            },
            deployment_number: if deploying {
                ctx.deployments.deployment_number(&enter.address) + 1
            } else {
                ctx.deployments.deployment_number(&enter.code_address)
            },
            ..Default::default()
        };
        if let Err(err) = ctx.call_stack.enter(descriptor) {
            return Err(HostError::malformed(self.event_context(), err.to_string()).into());
        }

        let ctx = &mut self.ctx;
        ctx.context_number = context_number;
        if deploying {
            ctx.deployments
                .new_deployment(enter.address, enter.call_data.clone());
        }
        log::debug!(
            "Entered {:?} context {} at depth {}",
            enter.frame_type,
            context_number,
            ctx.call_stack.depth()
        );
        Ok(())
    }

    fn exit_context(&mut self, exit: &ContextExit) -> TracerResult<()> {
        if precompile::in_precompile(&self.ctx) {
            return precompile::exit(&mut self.ctx, exit);
        }

        let frame = self.ctx.call_stack.current();
        if frame.is_empty() || frame.frame_type().is_phantom() {
            let reason = "exit outside of any context";
            return Err(HostError::malformed(self.event_context(), reason).into());
        }
        let frame_type = frame.frame_type();
        let address: Address = frame.account_address();
        let self_reverts = frame.self_reverts();
        let context_number = frame.context_number();

        let ctx = &mut self.ctx;
        let hub_stamp = ctx.stamps.hub;
        if !exit.success && !self_reverts {
            ctx.call_stack.revert_current(hub_stamp)?;
        }
        let deployment = frame_type == CallFrameType::InitCode
            || (frame_type == CallFrameType::Root && ctx.deployments.is_under_deployment(&address));
        if deployment {
            ctx.deployments.finish_deployment(address)?;
        }

        let returner = ctx.call_stack.exit(hub_stamp, exit.output.clone())?;
        if let Some(parent) = ctx.call_stack.current_id() {
            // A successful deployment returns code, not data.
            let (range, bytes) = if deployment && exit.success {
                (MemoryRange::EMPTY, vec![])
            } else {
                (exit.output_range, exit.output.clone())
            };
            ctx.call_stack
                .set_return_data(parent, returner, range, bytes)?;
        }
        log::debug!(
            "Exited context {} ({})",
            context_number,
            if exit.success { "success" } else { "failure" }
        );
        Ok(())
    }

    fn end_transaction(&mut self) -> TracerResult<()> {
        self.ctx.call_stack.end_transaction()?;
        log::debug!(
            "End of transaction at hub stamp {}, refund counter {}",
            self.ctx.stamps.hub,
            self.ctx.refund_counter
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ethereum_types::U256;

    use super::*;
    use crate::structlog::OpcodeEvent;
    use crate::witness::errors::ProtocolViolation;

    fn start(recipient: Option<Address>) -> TraceEvent {
        TraceEvent::TransactionStart(TransactionStart {
            sender: Address::repeat_byte(0xaa),
            recipient,
            created_address: recipient.is_none().then(|| Address::repeat_byte(0xcc)),
            gas: 100_000,
            call_data: vec![0x60, 0x00],
            code_size: 10,
            ..Default::default()
        })
    }

    fn opcode(op: u8, depth: usize, stack_top_first: &[u64], gas_cost: u64) -> TraceEvent {
        TraceEvent::Opcode(OpcodeEvent {
            op,
            depth,
            gas: 50_000,
            gas_cost,
            stack: stack_top_first.iter().rev().map(|&v| U256::from(v)).collect(),
            ..Default::default()
        })
    }

    fn exit(success: bool) -> TraceEvent {
        TraceEvent::ContextExit(ContextExit {
            success,
            ..Default::default()
        })
    }

    #[test]
    fn config_defaults() {
        let config: TracerConfig = serde_json::from_str(r#"{"check_gas": false}"#).unwrap();
        assert_eq!(
            config,
            TracerConfig {
                check_gas: false,
                ..Default::default()
            }
        );
        assert_eq!(config.padding_rows, 2);
        assert_eq!(config.max_call_stack_depth, 1024);
    }

    #[test]
    fn transactions_open_a_phantom_and_a_root_frame() {
        let mut tracer = Tracer::new(TracerConfig::default());
        tracer.handle_event(&start(Some(Address::repeat_byte(0xbb)))).unwrap();
        let root = tracer.context().call_stack().current();
        assert_eq!(root.frame_type(), CallFrameType::Root);
        assert_eq!(root.context_number(), 2);
        assert_eq!(root.call_data(), &[0x60, 0x00][..]);

        tracer.handle_event(&opcode(0x01, 0, &[1, 2], 3)).unwrap();
        tracer.handle_event(&exit(true)).unwrap();
        tracer.handle_event(&TraceEvent::TransactionEnd).unwrap();
        assert!(tracer.context().call_stack().current().is_empty());
        assert_eq!(tracer.context().stamps().hub, 1);
    }

    #[test]
    fn deployment_transactions_deploy_the_created_address() {
        let mut tracer = Tracer::new(TracerConfig::default());
        tracer.handle_event(&start(None)).unwrap();
        let created = Address::repeat_byte(0xcc);
        assert!(tracer.context().deployments().is_under_deployment(&created));
        assert_eq!(tracer.context().call_stack().current().code_size(), 2);
        assert!(tracer.context().call_stack().current().call_data().is_empty());

        tracer.handle_event(&exit(true)).unwrap();
        assert!(!tracer.context().deployments().is_under_deployment(&created));
        assert_eq!(tracer.context().deployments().deployment_number(&created), 1);
    }

    #[test]
    fn failed_contexts_revert() {
        let mut tracer = Tracer::new(TracerConfig::default());
        tracer.handle_event(&start(Some(Address::repeat_byte(0xbb)))).unwrap();
        tracer
            .handle_event(&TraceEvent::ContextEnter(ContextEnter {
                frame_type: CallFrameType::StandardCall,
                address: Address::repeat_byte(0xdd),
                code_address: Address::repeat_byte(0xdd),
                gas: 1000,
                ..Default::default()
            }))
            .unwrap();
        let child = tracer.context().call_stack().current_id().unwrap();
        tracer.handle_event(&exit(false)).unwrap();

        let child = tracer.context().call_stack().get_by_id(child);
        assert!(child.self_reverts());
        assert_eq!(tracer.context().call_stack().depth(), 0);
    }

    #[test]
    fn host_errors_leave_the_tracer_usable() {
        let mut tracer = Tracer::new(TracerConfig::default());
        let events = [
            start(Some(Address::repeat_byte(0xbb))),
            opcode(0x01, 0, &[1, 2], 3),
            // Charged 4 instead of 3.
            opcode(0x01, 0, &[1, 2], 4),
            opcode(0x01, 0, &[1, 2], 3),
        ];
        tracer.handle_events(&events).unwrap();
        assert_eq!(tracer.context().aborted_events(), 1);
        assert_eq!(tracer.context().stamps().hub, 2);

        assert!(matches!(
            tracer.handle_event(&TraceEvent::TransactionEnd),
            Err(TracerError::Protocol(ProtocolViolation::TransactionInProgress))
        ));
        assert_eq!(tracer.context().aborted_events(), 1);

        let tables = tracer.finalize().unwrap();
        assert_eq!(tables[0].module(), "hub");
        assert_eq!(tables[0].row_count(), 4);
    }

    #[test]
    fn calls_to_precompiles_open_a_return_data_frame() {
        let mut tracer = Tracer::new(TracerConfig::default());
        tracer.handle_event(&start(Some(Address::repeat_byte(0xbb)))).unwrap();
        tracer
            .handle_event(&TraceEvent::ContextEnter(ContextEnter {
                frame_type: CallFrameType::StaticCall,
                address: Address::from_low_u64_be(2),
                code_address: Address::from_low_u64_be(2),
                gas: 1000,
                call_data: vec![1, 2, 3],
                call_data_range: MemoryRange::new(0, 3),
                return_at_range: MemoryRange::new(0, 32),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(
            tracer.context().call_stack().current().frame_type(),
            CallFrameType::PrecompileReturnData
        );
        tracer
            .handle_event(&TraceEvent::ContextExit(ContextExit {
                output: vec![0xee; 32],
                output_range: MemoryRange::new(0, 32),
                success: true,
            }))
            .unwrap();

        let root = tracer.context().call_stack().current();
        assert_eq!(root.frame_type(), CallFrameType::Root);
        assert_eq!(root.return_data(), &[0xee; 32][..]);
        // Call data extraction, result transplant, copy into the caller.
        assert_eq!(tracer.context().stamps().mmu, 3);
        assert_eq!(tracer.context().stamps().hash, 1);
    }
}
