//! # Scheduler
//!
//! Core scheduling logic for rrtos: the task registry, the ready set, the
//! tick-driven timeouts and the round-robin selection. Nothing in here
//! touches hardware — deciding to switch and actually switching are
//! separate steps. [`Scheduler::schedule`] only reports that a switch is
//! needed; the caller raises PendSV, and the PendSV handler later calls
//! [`Scheduler::save_current`] / [`Scheduler::switch_to_next`].
//!
//! ## Scheduling Algorithm
//!
//! 1. **Ready set empty**: run the idle task (index 0)
//! 2. **Otherwise**: scan forward from the index after the last selection,
//!    wrapping from the last registered task back to index 1, and pick the
//!    first task whose ready bit is set
//! 3. **Switch request**: only if the pick differs from the running task
//!
//! All application tasks are equal; the scan order alone makes the
//! scheduler fair — every ready task runs once before any runs twice.

use crate::config::{IDLE_TASK, MAX_TASKS};
use crate::context::SavedContext;
use crate::error::KernelError;
use crate::fmt::{debug, trace};
use crate::ready::ReadySet;
use crate::task::{Task, TaskEntry, TaskId};

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The central kernel state. Stored as a single global in `kernel.rs`.
///
/// ## Design Notes
///
/// - Task Control Records live inline in a fixed-size arena (no heap)
/// - Index 0 is the idle task and must be registered first
/// - `current` is `None` until the first context switch has happened
pub struct Scheduler {
    /// Task registry. Only `tasks[..count]` are registered.
    tasks: [Task; MAX_TASKS],

    /// Number of registered tasks, including the idle task.
    count: usize,

    /// Application tasks that may run now.
    ready: ReadySet,

    /// Task whose context is live on the CPU.
    current: Option<TaskId>,

    /// Task chosen by the last switch request.
    next: TaskId,

    /// Index of the last selection; the round-robin scan resumes after it.
    cursor: TaskId,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            tasks: [Task::EMPTY; MAX_TASKS],
            count: 0,
            ready: ReadySet::new(),
            current: None,
            next: IDLE_TASK,
            cursor: IDLE_TASK,
        }
    }

    // -----------------------------------------------------------------------
    // Task registry
    // -----------------------------------------------------------------------

    /// Register the idle task. Must be the very first registration.
    pub fn register_idle(
        &mut self,
        entry: TaskEntry,
        stack: &'static mut [u8],
    ) -> Result<TaskId, KernelError> {
        if self.count != 0 {
            return Err(KernelError::IdleAlreadyRegistered);
        }
        self.register(entry, stack)
    }

    /// Register an application task. It starts out ready to run.
    ///
    /// Does not reschedule; the task first runs at the next scheduling
    /// point.
    pub fn start_task(
        &mut self,
        entry: TaskEntry,
        stack: &'static mut [u8],
    ) -> Result<TaskId, KernelError> {
        if self.count == 0 {
            return Err(KernelError::IdleNotRegistered);
        }
        self.register(entry, stack)
    }

    fn register(
        &mut self,
        entry: TaskEntry,
        stack: &'static mut [u8],
    ) -> Result<TaskId, KernelError> {
        if self.count >= MAX_TASKS {
            return Err(KernelError::RegistryFull);
        }

        let (context, region) = SavedContext::build(stack, entry)?;

        let id = self.count;
        let task = &mut self.tasks[id];
        task.stack_pointer = context;
        task.timeout = 0;
        task.stack = region;

        if id != IDLE_TASK {
            self.ready.insert(id);
        }
        self.count += 1;

        debug!("task {} registered, {} stack words free", id, region.unused_words());
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Tick service
    // -----------------------------------------------------------------------

    /// Advance every pending timeout by one tick.
    ///
    /// Tasks whose countdown expires on this tick become ready. Never
    /// reschedules by itself.
    pub fn tick(&mut self) {
        for id in 1..self.count {
            if self.tasks[id].countdown() {
                self.ready.insert(id);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Pick the task to run next.
    ///
    /// Returns `Some(next)` when the pick differs from the running task and
    /// a context switch must be requested; `None` when nothing changes.
    /// Must be called with interrupts disabled.
    pub fn schedule(&mut self) -> Option<TaskId> {
        let selected = if self.ready.is_empty() {
            IDLE_TASK
        } else {
            let mut id = self.cursor;
            loop {
                id += 1;
                if id >= self.count {
                    id = 1;
                }
                if self.ready.contains(id) {
                    break id;
                }
            }
        };
        self.cursor = selected;

        if self.current == Some(selected) {
            return None;
        }

        trace!("switch requested to task {}", selected);
        self.next = selected;
        Some(selected)
    }

    // -----------------------------------------------------------------------
    // Delay facility
    // -----------------------------------------------------------------------

    /// Put the running task to sleep for `ticks` tick periods and pick
    /// another task.
    ///
    /// A zero delay sleeps until the next tick. Returns the switch request
    /// exactly like [`Scheduler::schedule`]. Must be called with interrupts
    /// disabled.
    pub fn delay(&mut self, ticks: u32) -> Result<Option<TaskId>, KernelError> {
        let current = self.current.ok_or(KernelError::NoCurrentTask)?;
        if current == IDLE_TASK {
            return Err(KernelError::DelayFromIdle);
        }

        trace!("task {} sleeping for {} ticks", current, ticks);
        self.tasks[current].arm(ticks.max(1));
        self.ready.remove(current);
        Ok(self.schedule())
    }

    // -----------------------------------------------------------------------
    // Context switch bookkeeping (PendSV)
    // -----------------------------------------------------------------------

    /// Whether a task's registers are live on the CPU and must be saved.
    #[inline]
    pub fn has_current(&self) -> bool {
        self.current.is_some()
    }

    /// Record where the outgoing task's registers were pushed.
    pub fn save_current(&mut self, context: SavedContext) {
        if let Some(id) = self.current {
            self.tasks[id].stack_pointer = context;
        }
    }

    /// Make the pending pick the running task and hand back its context.
    pub fn switch_to_next(&mut self) -> SavedContext {
        self.current = Some(self.next);
        self.tasks[self.next].stack_pointer
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[inline]
    pub fn current(&self) -> Option<TaskId> {
        self.current
    }

    #[inline]
    pub fn next(&self) -> TaskId {
        self.next
    }

    #[inline]
    pub fn task_count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn ready(&self) -> ReadySet {
        self.ready
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks[..self.count].get(id)
    }

    /// Never-touched stack words of a task, or `None` for an unknown id.
    pub fn stack_unused(&self, id: TaskId) -> Option<usize> {
        self.task(id).map(|task| task.stack.unused_words())
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::boxed::Box;
    use std::vec::Vec;

    extern "C" fn idle() -> ! {
        loop {}
    }

    extern "C" fn task_a() -> ! {
        loop {}
    }

    extern "C" fn task_b() -> ! {
        loop {}
    }

    fn stack() -> &'static mut [u8] {
        Box::leak(Box::new([0u8; 256]))
    }

    /// Idle plus `n` application tasks, nothing run yet.
    fn scheduler_with(n: usize) -> Scheduler {
        let mut s = Scheduler::new();
        s.register_idle(idle, stack()).unwrap();
        for _ in 0..n {
            s.start_task(task_a, stack()).unwrap();
        }
        s
    }

    /// Play the part of PendSV: save the outgoing context untouched and
    /// resume the pending pick.
    fn switch(s: &mut Scheduler) {
        if let Some(id) = s.current() {
            let ctx = s.task(id).unwrap().stack_pointer;
            s.save_current(ctx);
        }
        s.switch_to_next();
    }

    /// Schedule and complete any requested switch. Returns the running task.
    fn schedule_and_switch(s: &mut Scheduler) -> TaskId {
        if s.schedule().is_some() {
            switch(s);
        }
        s.current().unwrap()
    }

    #[test]
    fn test_registration_order_and_ready_bits() {
        let s = scheduler_with(2);
        assert_eq!(s.task_count(), 3);
        assert_eq!(s.ready().bits(), 0b11);
        assert!(!s.ready().is_empty());
        assert_eq!(s.current(), None);
    }

    #[test]
    fn test_idle_must_be_first() {
        let mut s = Scheduler::new();
        assert_eq!(
            s.start_task(task_a, stack()),
            Err(KernelError::IdleNotRegistered)
        );
        assert_eq!(s.task_count(), 0);

        s.register_idle(idle, stack()).unwrap();
        assert_eq!(
            s.register_idle(idle, stack()),
            Err(KernelError::IdleAlreadyRegistered)
        );
        assert_eq!(s.task_count(), 1);
    }

    #[test]
    fn test_registry_capacity() {
        let mut s = scheduler_with(MAX_TASKS - 1);
        assert_eq!(s.task_count(), MAX_TASKS);
        assert_eq!(s.ready().bits(), u32::MAX);

        assert_eq!(s.start_task(task_b, stack()), Err(KernelError::RegistryFull));
        assert_eq!(s.task_count(), MAX_TASKS);
    }

    #[test]
    fn test_start_task_does_not_reschedule() {
        let mut s = scheduler_with(1);
        assert_eq!(schedule_and_switch(&mut s), 1);

        s.start_task(task_b, stack()).unwrap();
        assert_eq!(s.current(), Some(1));
        assert_eq!(s.next(), 1);
    }

    #[test]
    fn test_idle_selected_when_nothing_ready() {
        let mut s = scheduler_with(0);
        assert_eq!(s.schedule(), Some(IDLE_TASK));
        switch(&mut s);
        assert_eq!(s.schedule(), None);

        // Regardless of where the round-robin left off
        let mut s = scheduler_with(3);
        schedule_and_switch(&mut s);
        schedule_and_switch(&mut s);
        for id in 1..=3 {
            s.ready.remove(id);
        }
        assert_eq!(s.schedule(), Some(IDLE_TASK));
    }

    #[test]
    fn test_round_robin_fairness() {
        let n = 5;
        let mut s = scheduler_with(n);

        let picks: Vec<TaskId> = (0..3 * n).map(|_| schedule_and_switch(&mut s)).collect();
        for round in picks.chunks(n) {
            let mut sorted = round.to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, (1..=n).collect::<Vec<_>>());
        }
        // Each round continues from where the previous one ended
        assert_eq!(&picks[..n + 1], &[1, 2, 3, 4, 5, 1]);
    }

    #[test]
    fn test_round_robin_skips_blocked_tasks() {
        let mut s = scheduler_with(4);
        s.ready.remove(2);
        s.ready.remove(3);

        assert_eq!(schedule_and_switch(&mut s), 1);
        assert_eq!(schedule_and_switch(&mut s), 4);
        assert_eq!(schedule_and_switch(&mut s), 1);
    }

    #[test]
    fn test_schedule_noop_when_selection_unchanged() {
        let mut s = scheduler_with(1);
        assert_eq!(s.schedule(), Some(1));
        switch(&mut s);

        assert_eq!(s.schedule(), None);
        assert_eq!(s.schedule(), None);
        assert_eq!(s.current(), Some(1));
    }

    #[test]
    fn test_repeated_schedule_before_switch_overwrites_next() {
        let mut s = scheduler_with(2);
        assert_eq!(s.schedule(), Some(1));
        assert_eq!(s.schedule(), Some(2));
        assert_eq!(s.next(), 2);

        switch(&mut s);
        assert_eq!(s.current(), Some(2));
    }

    #[test]
    fn test_tick_sets_ready_once_per_arming() {
        let mut s = scheduler_with(2);
        s.tasks[1].arm(3);
        s.ready.remove(1);

        s.tick();
        s.tick();
        assert!(!s.ready().contains(1));
        s.tick();
        assert!(s.ready().contains(1));
        assert_eq!(s.task(1).unwrap().timeout, 0);

        // Cleared again without re-arming: further ticks leave it alone
        s.ready.remove(1);
        for _ in 0..10 {
            s.tick();
        }
        assert!(!s.ready().contains(1));
        assert_eq!(s.task(1).unwrap().timeout, 0);
    }

    #[test]
    fn test_tick_ignores_idle_task() {
        let mut s = scheduler_with(1);
        s.tasks[IDLE_TASK].arm(1);
        s.tick();
        assert_eq!(s.task(IDLE_TASK).unwrap().timeout, 1);
    }

    #[test]
    fn test_delay_zero_round_trip() {
        let mut s = scheduler_with(1);
        schedule_and_switch(&mut s);

        assert_eq!(s.delay(0), Ok(Some(IDLE_TASK)));
        assert!(!s.ready().contains(1));
        assert_eq!(s.task(1).unwrap().timeout, 1);

        s.tick();
        assert!(s.ready().contains(1));
    }

    #[test]
    fn test_delay_from_idle_is_rejected() {
        let mut s = scheduler_with(0);
        schedule_and_switch(&mut s);
        assert_eq!(s.current(), Some(IDLE_TASK));
        assert_eq!(s.delay(5), Err(KernelError::DelayFromIdle));
    }

    #[test]
    fn test_delay_before_first_switch_is_rejected() {
        let mut s = scheduler_with(1);
        assert_eq!(s.delay(5), Err(KernelError::NoCurrentTask));
    }

    #[test]
    fn test_delay_scenario_two_tasks() {
        let mut s = Scheduler::new();
        s.register_idle(idle, stack()).unwrap();
        let a = s.start_task(task_a, stack()).unwrap();
        let b = s.start_task(task_b, stack()).unwrap();

        assert_eq!(schedule_and_switch(&mut s), a);

        assert_eq!(s.delay(4), Ok(Some(b)));
        assert!(!s.ready().contains(a));
        switch(&mut s);
        assert_eq!(s.current(), Some(b));

        for _ in 0..3 {
            s.tick();
            assert!(!s.ready().contains(a));
        }
        s.tick();
        assert!(s.ready().contains(a));

        // Continues after B's position and wraps around to A
        assert_eq!(schedule_and_switch(&mut s), a);
    }

    #[test]
    fn test_all_tasks_sleeping_falls_back_to_idle() {
        let mut s = scheduler_with(2);
        schedule_and_switch(&mut s);
        assert_eq!(s.delay(2), Ok(Some(2)));
        switch(&mut s);
        assert_eq!(s.delay(2), Ok(Some(IDLE_TASK)));
        switch(&mut s);

        s.tick();
        assert_eq!(s.schedule(), None);
        s.tick();
        assert_eq!(s.ready().bits(), 0b11);
        assert_eq!(schedule_and_switch(&mut s), 1);
    }

    #[test]
    fn test_context_switch_bookkeeping() {
        let mut s = scheduler_with(2);
        assert!(!s.has_current());

        s.schedule();
        let first = s.switch_to_next();
        assert_eq!(first, s.task(1).unwrap().stack_pointer);
        assert!(s.has_current());

        // Task 1 pushed its registers 16 words lower than where it started
        let saved = unsafe { SavedContext::from_raw(first.into_raw().sub(16)) };
        s.schedule();
        s.save_current(saved);
        let second = s.switch_to_next();

        assert_eq!(s.task(1).unwrap().stack_pointer, saved);
        assert_eq!(second, s.task(2).unwrap().stack_pointer);
        assert_eq!(s.current(), Some(2));
    }

    #[test]
    fn test_first_resume_yields_initial_frame() {
        let mut s = scheduler_with(1);
        s.schedule();
        let frame = unsafe { s.switch_to_next().frame() };

        assert_eq!(frame.callee_saved, [4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!([frame.r0, frame.r1, frame.r2, frame.r3, frame.r12], [0, 1, 2, 3, 12]);
        assert_eq!(frame.lr, 0xE);
        assert_eq!(frame.pc, task_a as usize as u32 & !1);
        assert_eq!(frame.xpsr, 0x0100_0000);
    }

    #[test]
    fn test_stack_unused() {
        let s = scheduler_with(1);
        // 256-byte stack, 64-byte frame, at most 8 bytes lost to alignment
        let unused = s.stack_unused(1).unwrap();
        assert!(unused >= (256 - 64 - 8) / 4 && unused <= (256 - 64) / 4);
        assert_eq!(s.stack_unused(2), None);
    }
}
