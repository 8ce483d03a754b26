//! # rrtos Configuration
//!
//! Compile-time constants governing the kernel. All limits are fixed at
//! compile time — no dynamic allocation, no runtime configuration.

/// Capacity of the task registry: the idle task plus up to 32 application
/// tasks. Each application task owns one bit of the 32-bit ready set, so
/// this cannot grow past 33.
pub const MAX_TASKS: usize = 32 + 1;

const _: () = assert!(MAX_TASKS >= 1 && MAX_TASKS - 1 <= u32::BITS as usize);

/// Registry index of the idle task. Always the first task registered.
pub const IDLE_TASK: usize = 0;

/// Required alignment of a task's initial stack top, in bytes (AAPCS).
pub const STACK_ALIGN: usize = 8;

/// Pattern painted over the unused part of every task stack, so stack
/// usage can be measured and overflows spotted in a debugger.
pub const STACK_FILL: u32 = 0xBBBB_0000;

/// Number of 32-bit words in a saved context: R4–R11 pushed by the
/// kernel plus the 8-word hardware exception frame.
pub const CONTEXT_FRAME_WORDS: usize = 16;

/// Smallest stack region `start_task` accepts, in bytes. One full context
/// frame plus worst-case alignment loss at both ends.
pub const MIN_STACK_SIZE: usize = CONTEXT_FRAME_WORDS * 4 + 2 * STACK_ALIGN;

/// Tick frequency in Hz. `delay()` arguments are expressed in these units.
pub const TICKS_PER_SEC: u32 = 100;

/// System clock frequency in Hz (TM4C123 precision internal oscillator).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// PendSV priority. Must be the lowest in the system so a context switch
/// only runs once every other pending interrupt has been drained.
pub const PENDSV_PRIORITY: u8 = 0xFF;
