//! # Kernel
//!
//! Top-level kernel initialization and public API for rrtos.
//!
//! The kernel owns the single global [`Scheduler`] and wraps every access
//! to it in a critical section. Switch decisions made here are turned into
//! PendSV requests; the switch itself happens once interrupts are enabled.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init::<B>()     ← PendSV priority, idle task
//!         ├─► kernel::start_task()    ← Register tasks (×N)
//!         └─► kernel::run::<B>()      ← No return
//!               ├─► B::on_startup()   ← SysTick, peripherals
//!               ├─► schedule()        ← Pick the first task
//!               └─► enable interrupts ← PendSV switches to it
//! ```
//!
//! Every violated invariant is fatal: the kernel logs it and panics, and
//! the firmware's panic handler halts the core.

use cortex_m::interrupt;

use crate::arch::cortex_m4;
use crate::config::TICKS_PER_SEC;
use crate::error::KernelError;
use crate::fmt::{error, info};
use crate::scheduler::Scheduler;
use crate::sync::KernelCell;
use crate::task::{TaskEntry, TaskId};

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// Global scheduler instance. Shared by task code, SysTick and PendSV.
static SCHEDULER: KernelCell<Scheduler> = KernelCell::new(Scheduler::new());

/// Run `f` on the global scheduler with interrupts disabled.
#[inline]
pub(crate) fn with_scheduler<F, R>(f: F) -> R
where
    F: FnOnce(&mut Scheduler) -> R,
{
    SCHEDULER.lock(f)
}

// ---------------------------------------------------------------------------
// Board support boundary
// ---------------------------------------------------------------------------

/// Hooks supplied by the board-support package.
pub trait Board {
    /// Called once from [`run`] before the first task starts. Must start
    /// the periodic timer driving [`tick`], e.g. with
    /// [`configure_systick`](crate::arch::cortex_m4::configure_systick).
    fn on_startup();

    /// Called in a tight loop by the idle task whenever no other task is
    /// ready. Must not block.
    fn on_idle() {
        cortex_m::asm::wfi();
    }
}

extern "C" fn idle_main<B: Board>() -> ! {
    loop {
        B::on_idle();
    }
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Halt on a violated kernel invariant.
pub fn fatal(err: KernelError) -> ! {
    error!("kernel fatal: {}", err);
    panic!("kernel fatal: {}", err);
}

/// Initialize the kernel.
///
/// Sets PendSV to the lowest priority and registers the idle task on
/// `idle_stack`. Must be called exactly once, from `main()`, before any
/// other kernel function.
pub fn init<B: Board>(idle_stack: &'static mut [u8]) {
    cortex_m4::set_pendsv_priority();

    let idle = idle_main::<B> as TaskEntry;
    if let Err(err) = with_scheduler(|s| s.register_idle(idle, idle_stack)) {
        fatal(err);
    }
}

/// Register a task. It becomes ready immediately and first runs at the
/// next scheduling point.
///
/// `stack` is dedicated to the task for the lifetime of the system.
/// Starting more tasks than the registry holds halts the system.
///
/// # Example
/// ```ignore
/// static mut STACK_A: [u8; 160] = [0; 160];
/// kernel::start_task(task_a, unsafe { &mut *core::ptr::addr_of_mut!(STACK_A) });
/// ```
pub fn start_task(entry: TaskEntry, stack: &'static mut [u8]) -> TaskId {
    match with_scheduler(|s| s.start_task(entry, stack)) {
        Ok(id) => id,
        Err(err) => fatal(err),
    }
}

/// Transfer control to the tasks. **Does not return.**
///
/// Runs the board's startup hook, then makes the first scheduling
/// decision with interrupts disabled. Re-enabling interrupts lets PendSV
/// switch to the chosen task, abandoning `main()`.
pub fn run<B: Board>() -> ! {
    B::on_startup();

    interrupt::disable();
    let first = with_scheduler(|s| {
        if s.task_count() == 0 {
            return Err(KernelError::IdleNotRegistered);
        }
        info!("starting {} tasks at {} Hz", s.task_count(), TICKS_PER_SEC);
        Ok(s.schedule())
    });
    match first {
        Ok(Some(_)) => cortex_m4::pend_switch(),
        Ok(None) => {}
        Err(err) => fatal(err),
    }
    unsafe { interrupt::enable() };

    // PendSV must have switched away before reaching this point.
    fatal(KernelError::RunReturned)
}

/// Block the calling task for `ticks` tick periods.
///
/// Returns once the timeout has expired and the task has been scheduled
/// again. A zero delay sleeps until the next tick. Must not be called from
/// the idle task or from an interrupt handler.
pub fn delay(ticks: u32) {
    // PendSV stays masked until the decision is complete; the switch
    // happens as soon as the critical section ends.
    let result = with_scheduler(|s| {
        let switch = s.delay(ticks)?;
        if switch.is_some() {
            cortex_m4::pend_switch();
        }
        Ok::<(), KernelError>(())
    });
    if let Err(err) = result {
        fatal(err);
    }
}

/// Tick entry point, called once per timer period from SysTick.
///
/// Counts down every pending delay, then makes a scheduling decision so
/// ready tasks share the CPU round-robin, one tick each.
pub fn tick() {
    with_scheduler(|s| {
        s.tick();
        if s.schedule().is_some() {
            cortex_m4::pend_switch();
        }
    });
}

/// The running task, or `None` before [`run`] has switched to one.
pub fn current_task() -> Option<TaskId> {
    with_scheduler(|s| s.current())
}

/// Never-touched words of a task's stack, for sizing stacks during
/// development.
pub fn stack_unused(id: TaskId) -> Option<usize> {
    with_scheduler(|s| s.stack_unused(id))
}
