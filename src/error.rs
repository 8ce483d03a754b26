//! # Kernel errors
//!
//! Every error in this kernel is a configuration or logic error. None is
//! recoverable: the kernel facade halts the system on the first one.

use core::fmt;

/// A violated kernel invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KernelError {
    /// More tasks were started than the registry can hold.
    RegistryFull,
    /// An application task was started before the idle task.
    IdleNotRegistered,
    /// The idle task was registered twice.
    IdleAlreadyRegistered,
    /// The stack region cannot hold an initial context frame.
    StackTooSmall,
    /// `delay()` was called from the idle task.
    DelayFromIdle,
    /// A task-level operation ran before the first context switch.
    NoCurrentTask,
    /// `run()` fell through: the first context switch never happened.
    RunReturned,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            KernelError::RegistryFull => "task registry is full",
            KernelError::IdleNotRegistered => "idle task must be registered first",
            KernelError::IdleAlreadyRegistered => "idle task already registered",
            KernelError::StackTooSmall => "stack region too small for a context frame",
            KernelError::DelayFromIdle => "delay() called from the idle task",
            KernelError::NoCurrentTask => "no task is running yet",
            KernelError::RunReturned => "run() returned without switching to a task",
        };
        f.write_str(msg)
    }
}
