//! # Task Control Record
//!
//! Per-task bookkeeping owned by the kernel: where the task's registers
//! were saved and how many ticks it still has to sleep. Tasks have no
//! priority and no state machine — whether a task may run is tracked
//! solely by the scheduler's ready set.

use crate::context::{SavedContext, StackRegion};

/// Task entry point. Tasks take no arguments and never return.
pub type TaskEntry = extern "C" fn() -> !;

/// Index of a task in the registry. Stable for the lifetime of the system.
pub type TaskId = usize;

/// Task Control Record.
///
/// `stack_pointer` must stay the first field: the context switch writes
/// through it while the owning task is suspended.
#[repr(C)]
pub struct Task {
    /// Saved context. Stale while the task is running.
    pub stack_pointer: SavedContext,

    /// Remaining ticks of a `delay()`. Zero means not waiting.
    pub timeout: u32,

    /// Painted stack area, for usage diagnosis.
    pub stack: StackRegion,
}

// Safety: the raw pointers inside only ever point into the task's own
// stack region, and the scheduler holding them is only touched inside
// critical sections or from PendSV.
unsafe impl Send for Task {}

impl Task {
    /// An unregistered slot. Used to initialize the registry array.
    pub const EMPTY: Self = Self {
        stack_pointer: SavedContext::NONE,
        timeout: 0,
        stack: StackRegion::EMPTY,
    };

    /// Start a countdown of `ticks` tick periods.
    #[inline]
    pub fn arm(&mut self, ticks: u32) {
        self.timeout = ticks;
    }

    /// Advance the countdown by one tick.
    ///
    /// Returns `true` exactly on the tick where the countdown reaches zero.
    /// A task that is not waiting is left untouched.
    pub fn countdown(&mut self) -> bool {
        if self.timeout == 0 {
            return false;
        }
        self.timeout -= 1;
        self.timeout == 0
    }

    #[inline]
    pub fn is_waiting(&self) -> bool {
        self.timeout != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_task() {
        let task = Task::EMPTY;
        assert!(task.stack_pointer.is_none());
        assert!(!task.is_waiting());
    }

    #[test]
    fn test_countdown_expires_once() {
        let mut task = Task::EMPTY;
        task.arm(3);
        assert!(task.is_waiting());

        assert!(!task.countdown());
        assert!(!task.countdown());
        assert!(task.countdown());
        assert!(!task.is_waiting());

        // No underflow, no second expiry
        assert!(!task.countdown());
        assert_eq!(task.timeout, 0);
    }

    #[test]
    fn test_countdown_idle_is_noop() {
        let mut task = Task::EMPTY;
        for _ in 0..10 {
            assert!(!task.countdown());
        }
        assert_eq!(task.timeout, 0);
    }
}
