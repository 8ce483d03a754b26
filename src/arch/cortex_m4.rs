//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) processor:
//! the PendSV context switch, SysTick configuration and the interrupt
//! priority the switch depends on.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model:
//! - **MSP** (Main Stack Pointer): `main()` before the first switch, and
//!   every interrupt handler
//! - **PSP** (Process Stack Pointer): every task, including idle
//!
//! On exception entry, the hardware automatically stacks R0–R3, R12, LR,
//! PC and xPSR onto the process stack. The PendSV handler saves and
//! restores R4–R11 itself, which completes the full context.
//!
//! The very first switch comes from `main()` on the MSP. No task is
//! current then, so nothing is saved; the handler just loads the first
//! task's PSP and exception-returns into thread mode on the PSP. The main
//! stack is never returned to and is from then on used by handlers only.
//!
//! ## Interrupt Priorities
//!
//! - PendSV: 0xFF (lowest) — runs only once every other ISR, including
//!   SysTick, has finished, so the switch always reflects the latest
//!   ready set
//! - SysTick: left at its reset priority, above PendSV

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};

use crate::config::{PENDSV_PRIORITY, SYSTEM_CLOCK_HZ};

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure the SysTick timer to fire `ticks_per_sec` times a second
/// from the processor clock. Each tick enters `SysTick` below.
pub fn configure_systick(syst: &mut SYST, ticks_per_sec: u32) {
    let reload = SYSTEM_CLOCK_HZ / ticks_per_sec - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

// ---------------------------------------------------------------------------
// Switch request
// ---------------------------------------------------------------------------

/// Request a context switch by pending PendSV.
///
/// Idempotent: pending an already pending PendSV has no further effect,
/// and the handler runs once.
#[inline]
pub fn pend_switch() {
    SCB::set_pendsv();
}

// ---------------------------------------------------------------------------
// Interrupt priority configuration
// ---------------------------------------------------------------------------

/// Set PendSV to the lowest interrupt priority.
///
/// This ensures context switches never preempt application ISRs or the
/// tick, and always run after them.
pub fn set_pendsv_priority() {
    unsafe {
        // System Handler Priority Register 3 (SHPR3): 0xE000_ED20
        // Bits [23:16] = PendSV priority
        let shpr3: *mut u32 = 0xE000_ED20 as *mut u32;
        let val = core::ptr::read_volatile(shpr3);
        let val = val | ((PENDSV_PRIORITY as u32) << 16);
        core::ptr::write_volatile(shpr3, val);
    }
}

// ---------------------------------------------------------------------------
// PendSV handler (context switch)
// ---------------------------------------------------------------------------

/// PendSV exception handler — performs the actual context switch.
///
/// ## Sequence
/// 1. If a task is current: push R4–R11 onto its PSP and record the
///    resulting stack pointer in its Task Control Record
/// 2. Make the scheduler's pending pick current and fetch its saved PSP
/// 3. Pop R4–R11 from the new task's stack and install its PSP
/// 4. Return from exception to thread mode on the PSP (EXC_RETURN =
///    0xFFFFFFFD); the hardware restores R0–R3, R12, LR, PC, xPSR
///
/// The Rust helpers it calls follow the AAPCS and so preserve R4–R11.
///
/// # Safety
/// This is a naked function entered directly by the NVIC. It must follow
/// the exact Cortex-M4 exception entry/exit convention.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[unsafe(no_mangle)]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    core::arch::naked_asm!(
        "cpsid i",

        // --- Save current context, if any ---
        "bl {has_current}",
        "cbz r0, 1f",
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {save_context}",

        // --- Restore next context ---
        "1:",
        "bl {switch_context}",
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",

        // Return to thread mode on the process stack
        "mov lr, #0xFFFFFFFD",
        "cpsie i",
        "bx lr",

        has_current = sym pendsv_has_current,
        save_context = sym pendsv_save_context,
        switch_context = sym pendsv_switch_context,
    );
}

/// Whether the outgoing task's registers must be saved. Called from PendSV.
#[cfg(all(target_arch = "arm", target_os = "none"))]
extern "C" fn pendsv_has_current() -> u32 {
    crate::kernel::with_scheduler(|s| s.has_current() as u32)
}

/// Store the outgoing task's stack pointer. Called from PendSV.
///
/// # Safety
/// `psp` must point at the R4–R11 block just pushed on the task's stack.
#[cfg(all(target_arch = "arm", target_os = "none"))]
unsafe extern "C" fn pendsv_save_context(psp: *mut u32) {
    let context = crate::context::SavedContext::from_raw(psp);
    crate::kernel::with_scheduler(|s| s.save_current(context));
}

/// Switch to the pending pick and return its stack pointer. Called from
/// PendSV.
#[cfg(all(target_arch = "arm", target_os = "none"))]
extern "C" fn pendsv_switch_context() -> *mut u32 {
    crate::kernel::with_scheduler(|s| s.switch_to_next()).into_raw()
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler — the kernel's periodic scheduling point.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[unsafe(no_mangle)]
pub extern "C" fn SysTick() {
    crate::kernel::tick();
}
