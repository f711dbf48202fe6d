//! The execution context stack.
//!
//! Tracks which resource is executing right now. `before` pushes, `after`
//! pops, and a resource created while another one executes takes the top of
//! the stack as its trigger. The same uid may appear several times when a
//! callback re-enters its own resource.

use lineage_core::error::TrackerError;
use lineage_core::id::AsyncId;
use serde::Serialize;

/// Stack of currently executing resources, innermost last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecutionStack {
    frames: Vec<AsyncId>,
}

impl ExecutionStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `uid` on `before`.
    pub fn enter(&mut self, uid: AsyncId) {
        self.frames.push(uid);
    }

    /// Checks that `uid` is on top without popping it.
    ///
    /// # Errors
    ///
    /// [`TrackerError::StackMismatch`] if the top is a different resource or
    /// the stack is empty.
    pub fn ensure_top(&self, uid: AsyncId) -> Result<(), TrackerError> {
        let found = self.current();
        if self.frames.last() == Some(&uid) {
            Ok(())
        } else {
            Err(TrackerError::StackMismatch {
                expected: uid,
                found,
            })
        }
    }

    /// Pops `uid` on `after`. Nothing is popped on error.
    ///
    /// # Errors
    ///
    /// [`TrackerError::StackMismatch`] if `uid` is not on top.
    pub fn exit(&mut self, uid: AsyncId) -> Result<(), TrackerError> {
        self.ensure_top(uid)?;
        self.frames.pop();
        Ok(())
    }

    /// Returns the innermost executing resource, or [`AsyncId::ROOT`] when
    /// nothing is executing.
    #[must_use]
    pub fn current(&self) -> AsyncId {
        self.frames.last().copied().unwrap_or(AsyncId::ROOT)
    }

    /// Returns the number of open frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns how many open frames belong to `uid`.
    #[must_use]
    pub fn depth_of(&self, uid: AsyncId) -> usize {
        self.frames.iter().filter(|frame| **frame == uid).count()
    }

    /// Returns `true` when nothing is executing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the open frames, outermost first.
    #[must_use]
    pub fn frames(&self) -> &[AsyncId] {
        &self.frames
    }
}
