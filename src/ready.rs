//! Ready-set tracker.
//!
//! One bit per application task: bit `id - 1` set means the task with
//! registry index `id` may run. The idle task has no bit; it is implicitly
//! ready whenever the set is empty.

use crate::config::IDLE_TASK;
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadySet(u32);

impl ReadySet {
    pub const fn new() -> Self {
        Self(0)
    }

    #[inline]
    fn mask(id: TaskId) -> u32 {
        debug_assert!(id != IDLE_TASK, "idle task is never in the ready set");
        1 << (id - 1)
    }

    #[inline]
    pub fn insert(&mut self, id: TaskId) {
        self.0 |= Self::mask(id);
    }

    #[inline]
    pub fn remove(&mut self, id: TaskId) {
        self.0 &= !Self::mask(id);
    }

    #[inline]
    pub fn contains(&self, id: TaskId) -> bool {
        self.0 & Self::mask(id) != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Raw bitmask, bit `i` for task `i + 1`.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_mapping() {
        let mut set = ReadySet::new();
        assert!(set.is_empty());

        set.insert(1);
        set.insert(32);
        assert_eq!(set.bits(), 0x8000_0001);
        assert!(set.contains(1));
        assert!(set.contains(32));
        assert!(!set.contains(2));

        set.remove(1);
        assert_eq!(set.bits(), 0x8000_0000);
        set.remove(32);
        assert!(set.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_idle_has_no_bit() {
        let mut set = ReadySet::new();
        set.insert(IDLE_TASK);
    }
}
