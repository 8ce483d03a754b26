//! # Synchronization Primitives
//!
//! Interrupt-safe access to the kernel's shared state on the single-core
//! Cortex-M4. Task code, the SysTick handler and the PendSV handler all
//! share one [`Scheduler`](crate::scheduler::Scheduler); every
//! read-modify-write of it happens with interrupts disabled.

use core::cell::RefCell;

use cortex_m::interrupt::{self, CriticalSection, Mutex};

/// Execute a closure within a critical section (interrupts disabled).
///
/// Interrupts are disabled on entry and restored to their previous state
/// on exit, so this nests safely inside handlers that already masked
/// them.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    interrupt::free(f)
}

/// A value that may only be touched inside a critical section.
pub struct KernelCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> KernelCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` on the value with interrupts disabled.
    ///
    /// Nested calls from within `f` are a kernel bug and panic.
    #[inline]
    pub fn lock<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section(|cs| f(&mut self.inner.borrow(cs).borrow_mut()))
    }
}
