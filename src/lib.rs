//! # rrtos — Round-Robin RTOS
//!
//! A minimal preemptive multitasking kernel for single-core ARM Cortex-M4
//! microcontrollers.
//!
//! ## Overview
//!
//! A fixed set of tasks is registered at startup. All application tasks
//! are equal: whenever the kernel reaches a scheduling point it picks the
//! next ready task in round-robin order, falling back to the idle task
//! when none is ready. Tasks give up the CPU by sleeping with
//! [`kernel::delay`]; the periodic tick both counts sleeps down and
//! time-slices between ready tasks.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │       init() · start_task() · run() · delay() · tick() │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Ready Set        │  Sync Primitives  │
//! │  scheduler.rs│   ready.rs         │  sync.rs          │
//! │  ─ tick()    │   ─ insert()       │  ─ KernelCell     │
//! │  ─ schedule()│   ─ remove()       │                   │
//! │  ─ delay()   │                    │                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │        Task Model (task.rs) · Saved Context (context.rs)│
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │       PendSV · SysTick · PendSV priority               │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Execution Levels
//!
//! - **Task code** — application tasks and the idle task, on the PSP
//! - **SysTick** — tick service plus a scheduling decision
//! - **PendSV** — lowest priority; performs the register save/restore
//!   requested by a scheduling decision
//!
//! Task code and SysTick only touch scheduler state inside critical
//! sections. PendSV runs last of all pending exceptions, so a switch
//! always reflects the newest decision.
//!
//! ## Memory Model
//!
//! - **No heap**: All state is statically allocated
//! - **Fixed task arena**: `[Task; MAX_TASKS]` inside the scheduler
//! - **Caller-owned stacks**: each task gets a `&'static mut [u8]`
//! - **Critical sections**: `cortex_m::interrupt::free()` for shared state

#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod config;
pub mod error;
pub mod task;
pub mod context;
pub mod ready;
pub mod scheduler;
pub mod arch;
pub mod kernel;
pub mod sync;

pub use error::KernelError;
pub use kernel::Board;
