//! The tree of execution contexts of a conflation.

mod frame;

pub use frame::{CallFrame, CallFrameType, FrameDescriptor, MemoryRange};
use zk_tracer_common::MAX_CALL_STACK_DEPTH;

use crate::trace::TraceResult;
use crate::witness::errors::ProtocolViolation;

/// Append-only tree of call frames, with a pointer to the frame currently
/// executing.
///
/// Each transaction contributes a phantom frame holding its call data, and
/// the root frame as its only child. Both sit at depth 0.
#[derive(Debug)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    current: Option<usize>,
    max_depth: usize,
    empty: CallFrame,
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new(MAX_CALL_STACK_DEPTH)
    }
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: vec![],
            current: None,
            max_depth,
            empty: CallFrame::default(),
        }
    }

    fn push(
        &mut self,
        depth: usize,
        parent_id: Option<usize>,
        descriptor: FrameDescriptor,
    ) -> usize {
        let id = self.frames.len();
        self.frames
            .push(CallFrame::new(id, depth, parent_id, descriptor));
        if let Some(parent) = parent_id {
            self.frames[parent].children.push(id);
        }
        id
    }

    /// Opens the frames of a new transaction: a phantom frame holding the call
    /// data, and the root frame described by `root`, which becomes current.
    pub fn new_transaction(
        &mut self,
        phantom: FrameDescriptor,
        root: FrameDescriptor,
    ) -> TraceResult<usize> {
        if self.current.is_some() {
            return Err(ProtocolViolation::TransactionInProgress);
        }
        let phantom_id = self.push(
            0,
            None,
            FrameDescriptor {
                frame_type: CallFrameType::PhantomCallDataHolder,
                ..phantom
            },
        );
        let root_id = self.push(0, Some(phantom_id), root);
        self.current = Some(root_id);
        Ok(root_id)
    }

    /// Closes the frames of the current transaction, whose root frame must have
    /// been exited.
    pub fn end_transaction(&mut self) -> TraceResult<()> {
        match self.current.map(|id| self.frames[id].frame_type) {
            Some(CallFrameType::PhantomCallDataHolder) => {
                self.current = None;
                Ok(())
            }
            Some(_) => Err(ProtocolViolation::TransactionInProgress),
            None => Err(ProtocolViolation::NoActiveTransaction),
        }
    }

    /// Opens a child of the current frame and makes it current.
    pub fn enter(&mut self, descriptor: FrameDescriptor) -> TraceResult<usize> {
        let parent = self.current.ok_or(ProtocolViolation::NoActiveTransaction)?;
        let depth = self.frames[parent].depth + 1;
        if depth > self.max_depth {
            return Err(ProtocolViolation::CallStackOverflow {
                depth,
                max: self.max_depth,
            });
        }
        let id = self.push(depth, Some(parent), descriptor);
        self.current = Some(id);
        Ok(id)
    }

    /// Closes the current frame, which handed back `output`, and makes its
    /// parent current. Returns the id of the closed frame.
    pub fn exit(&mut self, hub_stamp: u64, output: Vec<u8>) -> TraceResult<usize> {
        let id = self.current.ok_or(ProtocolViolation::CallStackUnderflow)?;
        let frame = &mut self.frames[id];
        let parent = match (frame.frame_type, frame.parent_id) {
            (CallFrameType::PhantomCallDataHolder, _) | (_, None) => {
                return Err(ProtocolViolation::CallStackUnderflow)
            }
            (_, Some(parent)) => parent,
        };
        frame.hub_stamp_at_exit = Some(hub_stamp);
        frame.output = output;
        self.current = Some(parent);
        Ok(id)
    }

    /// Opens the frame holding the output of a precompile called by the current
    /// frame.
    pub fn enter_precompile(&mut self, descriptor: FrameDescriptor) -> TraceResult<usize> {
        self.enter(FrameDescriptor {
            frame_type: CallFrameType::PrecompileReturnData,
            ..descriptor
        })
    }

    /// Closes the current precompile frame, storing its `output` and handing it
    /// back to the caller as return data.
    pub fn exit_precompile(&mut self, hub_stamp: u64, output: Vec<u8>) -> TraceResult<usize> {
        let range = MemoryRange::new(0, output.len() as u64);
        let id = self.exit(hub_stamp, output.clone())?;
        let caller = self.current.ok_or(ProtocolViolation::CallStackUnderflow)?;
        self.set_return_data(caller, id, range, output)?;
        Ok(id)
    }

    /// Records the data handed back to `frame_id` by its child `returner`.
    ///
    /// This is the only place where a frame's return data is mutated.
    pub fn set_return_data(
        &mut self,
        frame_id: usize,
        returner: usize,
        range: MemoryRange,
        bytes: Vec<u8>,
    ) -> TraceResult<()> {
        if returner >= self.frames.len() {
            return Err(ProtocolViolation::UnknownFrame(returner));
        }
        let frame = self
            .frames
            .get_mut(frame_id)
            .ok_or(ProtocolViolation::UnknownFrame(frame_id))?;
        frame.return_data_range = range;
        frame.return_data = bytes;
        frame.return_data_source = Some(returner);
        Ok(())
    }

    /// Marks the current frame as reverting at `stamp`, and propagates the
    /// revert to its descendants.
    pub fn revert_current(&mut self, stamp: u64) -> TraceResult<()> {
        let id = self.current.ok_or(ProtocolViolation::NoActiveTransaction)?;
        let frame = &mut self.frames[id];
        if frame.self_reverts {
            return Err(ProtocolViolation::SelfRevertTwice {
                context_number: frame.context_number,
            });
        }
        frame.self_reverts = true;
        frame.lower_revert_stamp(stamp);

        let mut pending = frame.children.clone();
        while let Some(child) = pending.pop() {
            let descendant = &mut self.frames[child];
            descendant.gets_reverted = true;
            descendant.lower_revert_stamp(stamp);
            pending.extend_from_slice(&descendant.children);
        }
        Ok(())
    }

    /// Returns the frame with the given id, or the empty sentinel.
    pub fn get_by_id(&self, id: usize) -> &CallFrame {
        self.frames.get(id).unwrap_or(&self.empty)
    }

    /// Returns the frame with the given context number, or the empty sentinel.
    pub fn get_by_context_number(&self, context_number: u64) -> &CallFrame {
        self.frames
            .iter()
            .find(|frame| frame.context_number == context_number)
            .unwrap_or(&self.empty)
    }

    pub fn current(&self) -> &CallFrame {
        self.current.map_or(&self.empty, |id| &self.frames[id])
    }

    pub const fn current_id(&self) -> Option<usize> {
        self.current
    }

    pub fn parent(&self) -> &CallFrame {
        self.current()
            .parent_id
            .map_or(&self.empty, |id| self.get_by_id(id))
    }

    /// Depth of the current frame.
    pub fn depth(&self) -> usize {
        self.current().depth
    }

    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn frames(&self) -> impl Iterator<Item = &CallFrame> {
        self.frames.iter()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(frame_type: CallFrameType, context_number: u64) -> FrameDescriptor {
        FrameDescriptor {
            frame_type,
            context_number,
            hub_stamp: context_number.saturating_sub(1),
            ..Default::default()
        }
    }

    fn with_transaction(max_depth: usize) -> CallStack {
        let mut stack = CallStack::new(max_depth);
        stack
            .new_transaction(
                descriptor(CallFrameType::PhantomCallDataHolder, 1),
                descriptor(CallFrameType::Root, 2),
            )
            .unwrap();
        stack
    }

    #[test]
    fn depth_follows_enter_and_exit() {
        let mut stack = with_transaction(1024);
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.parent().frame_type(), CallFrameType::PhantomCallDataHolder);

        let child = stack
            .enter(descriptor(CallFrameType::StandardCall, 10))
            .unwrap();
        let grandchild = stack.enter(descriptor(CallFrameType::StaticCall, 20)).unwrap();
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.get_by_id(child).children(), &[grandchild]);

        assert_eq!(stack.exit(25, vec![]), Ok(grandchild));
        assert_eq!(stack.exit(30, vec![]), Ok(child));
        assert_eq!(stack.depth(), 0);
        assert_eq!(stack.get_by_id(child).hub_stamp_at_exit(), Some(30));
    }

    #[test]
    fn overflow_and_underflow() {
        let mut stack = with_transaction(2);
        stack.enter(descriptor(CallFrameType::StandardCall, 3)).unwrap();
        stack.enter(descriptor(CallFrameType::StandardCall, 4)).unwrap();
        assert_eq!(
            stack.enter(descriptor(CallFrameType::StandardCall, 5)),
            Err(ProtocolViolation::CallStackOverflow { depth: 3, max: 2 })
        );
        assert_eq!(stack.depth(), 2);

        stack.exit(6, vec![]).unwrap();
        stack.exit(7, vec![]).unwrap();
        stack.exit(8, vec![]).unwrap();
        assert_eq!(
            stack.exit(9, vec![]),
            Err(ProtocolViolation::CallStackUnderflow)
        );
        stack.end_transaction().unwrap();
        assert!(stack.current().is_empty());
        assert_eq!(
            stack.exit(9, vec![]),
            Err(ProtocolViolation::CallStackUnderflow)
        );
    }

    #[test]
    fn revert_propagates_to_descendants_only() {
        let mut stack = with_transaction(1024);
        let a = stack.enter(descriptor(CallFrameType::StandardCall, 3)).unwrap();
        let b = stack.enter(descriptor(CallFrameType::StandardCall, 4)).unwrap();
        stack.revert_current(5).unwrap();
        stack.exit(5, vec![]).unwrap();
        let c = stack.enter(descriptor(CallFrameType::StandardCall, 7)).unwrap();
        stack.exit(8, vec![]).unwrap();
        stack.revert_current(9).unwrap();

        let root = stack.get_by_context_number(2);
        assert!(!root.will_revert());

        let a = stack.get_by_id(a);
        assert!(a.self_reverts() && !a.gets_reverted());
        assert_eq!(a.revert_stamp(), Some(9));

        // b reverted first, so its own stamp is kept.
        let b = stack.get_by_id(b);
        assert!(b.self_reverts() && b.gets_reverted());
        assert_eq!(b.revert_stamp(), Some(5));

        let c = stack.get_by_id(c);
        assert!(!c.self_reverts() && c.gets_reverted());
        assert_eq!(c.revert_stamp(), Some(9));
    }

    #[test]
    fn frame_cannot_self_revert_twice() {
        let mut stack = with_transaction(1024);
        stack.revert_current(3).unwrap();
        assert_eq!(
            stack.revert_current(4),
            Err(ProtocolViolation::SelfRevertTwice { context_number: 2 })
        );
    }

    #[test]
    fn precompile_output_becomes_return_data() {
        let mut stack = with_transaction(1024);
        let root = stack.current_id().unwrap();
        let precompile = stack
            .enter_precompile(descriptor(CallFrameType::StandardCall, 3))
            .unwrap();
        assert_eq!(stack.current().frame_type(), CallFrameType::PrecompileReturnData);
        stack.exit_precompile(3, vec![0xaa; 32]).unwrap();

        let caller = stack.get_by_id(root);
        assert_eq!(caller.return_data_source(), Some(precompile));
        assert_eq!(caller.return_data_range(), MemoryRange::new(0, 32));
        assert_eq!(caller.return_data(), &[0xaa; 32][..]);
    }

    #[test]
    fn unknown_frames_are_the_sentinel() {
        let stack = with_transaction(1024);
        assert!(stack.get_by_id(42).is_empty());
        assert!(stack.get_by_context_number(42).is_empty());
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn return_data_needs_known_frames() {
        let mut stack = with_transaction(1024);
        let root = stack.current_id().unwrap();
        let data = |stack: &mut CallStack, frame_id, returner| {
            stack.set_return_data(frame_id, returner, MemoryRange::new(0, 1), vec![1])
        };
        assert_eq!(data(&mut stack, 7, root), Err(ProtocolViolation::UnknownFrame(7)));
        assert_eq!(data(&mut stack, root, 9), Err(ProtocolViolation::UnknownFrame(9)));
        assert!(stack.get_by_id(root).return_data().is_empty());

        data(&mut stack, root, 0).unwrap();
        assert_eq!(stack.get_by_id(root).return_data(), &[1][..]);
    }
}
