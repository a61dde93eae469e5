//! Two-target scratch rotation for chaining stages within one frame.

use super::target::TargetId;

/// A pair of same-sized scratch targets that stages write in alternation.
///
/// Each [`acquire_next`](Self::acquire_next) flips the write index, so stage
/// N+1 always writes the target stage N did not. The pool is driven from the
/// single frame-recording thread; it takes `&mut self` and does no locking.
#[derive(Debug, Clone)]
pub struct PingPongPool {
    targets: [TargetId; 2],
    index: usize,
}

impl PingPongPool {
    /// Wrap two already-allocated targets. Index starts at 0.
    #[must_use]
    pub const fn new(first: TargetId, second: TargetId) -> Self {
        Self {
            targets: [first, second],
            index: 0,
        }
    }

    /// Flip the write index and return the target now designated for writing.
    pub fn acquire_next(&mut self) -> TargetId {
        self.index ^= 1;
        self.targets[self.index]
    }

    /// The target most recently handed out for writing.
    #[must_use]
    pub const fn last_written(&self) -> TargetId {
        self.targets[self.index]
    }

    /// Restart the rotation (called at the start of each frame).
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Both targets, for release.
    #[must_use]
    pub const fn targets(&self) -> [TargetId; 2] {
        self.targets
    }
}
