//! A thread of execution: an identity and a call stack of frames.

use crate::error::ExecutionError;
use crate::vm::frame::Frame;
use crate::vm::heap::ObjectId;
use crate::vm::value::Value;

pub type ThreadId = u64;

#[derive(Debug)]
pub struct Thread {
    id: ThreadId,
    /// Innermost frame last.
    frames: Vec<Frame>,
    /// What the outermost frame returned, once it has.
    result: Option<Option<Value>>,
}

impl Thread {
    pub fn new(id: ThreadId) -> Self {
        Thread { id, frames: vec![], result: None }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn push_frame(&mut self, frame: Frame) {
        debug!("thread {}: enter {} (depth {})",
               self.id, frame.method().qualified_name(), self.frames.len() + 1);
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Result<Frame, ExecutionError> {
        let frame = self.frames.pop().ok_or(ExecutionError::EmptyCallStack)?;
        debug!("thread {}: leave {} (depth {})",
               self.id, frame.method().qualified_name(), self.frames.len());
        Ok(frame)
    }

    pub fn current_frame(&self) -> Result<&Frame, ExecutionError> {
        self.frames.last().ok_or(ExecutionError::EmptyCallStack)
    }

    pub fn current_frame_mut(&mut self) -> Result<&mut Frame, ExecutionError> {
        self.frames.last_mut().ok_or(ExecutionError::EmptyCallStack)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// True once the outermost frame has returned.
    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<Option<Value>> {
        self.result
    }

    pub(crate) fn finish(&mut self, value: Option<Value>) {
        debug!("thread {} finished with {:?}", self.id, value);
        self.result = Some(value);
    }

    /// Heap identities held anywhere on the call stack, and the returned reference of a finished
    /// thread.
    pub fn references<'a>(&'a self) -> impl Iterator<Item = ObjectId> + 'a {
        let returned = self.result.and_then(|value| value).and_then(|value| value.as_reference());
        self.frames.iter().flat_map(Frame::references).chain(returned)
    }
}
