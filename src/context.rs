//! # Saved task context
//!
//! The only module (besides the PendSV handler itself) that knows how a
//! suspended task's registers are laid out on its stack. Everything else
//! in the kernel passes [`SavedContext`] around as an opaque handle.
//!
//! ## Frame Layout (top = high address, growing down)
//!
//! ```text
//! [Hardware stacked frame]   <- restored by exception return
//!   xPSR  0x0100_0000 (Thumb bit)
//!   PC    task entry point
//!   LR    0x0000_000E
//!   R12   12
//!   R3..R0  3..0
//! [Kernel saved context]     <- pushed/popped by PendSV
//!   R11..R4  11..4           <- SavedContext points here
//! [Painted with STACK_FILL down to the aligned stack bottom]
//! ```

use core::ptr;

use crate::config::{CONTEXT_FRAME_WORDS, MIN_STACK_SIZE, STACK_ALIGN, STACK_FILL};
use crate::error::KernelError;
use crate::task::TaskEntry;

/// xPSR value for a fresh task: only the Thumb state bit set.
const INITIAL_XPSR: u32 = 1 << 24;

/// LR value for a fresh task. Task bodies never return, so this is only a
/// recognizable marker.
const INITIAL_LR: u32 = 0x0000_000E;

/// Register image of a suspended task, lowest address first.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextFrame {
    /// R4–R11, saved by the kernel.
    pub callee_saved: [u32; 8],
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

const _: () = assert!(core::mem::size_of::<ContextFrame>() == CONTEXT_FRAME_WORDS * 4);

impl ContextFrame {
    /// The frame a never-run task resumes from.
    fn initial(entry: TaskEntry) -> Self {
        Self {
            callee_saved: [4, 5, 6, 7, 8, 9, 10, 11],
            r0: 0,
            r1: 1,
            r2: 2,
            r3: 3,
            r12: 12,
            lr: INITIAL_LR,
            // The Thumb bit lives in xPSR, not in the stacked PC.
            pc: entry as usize as u32 & !1,
            xpsr: INITIAL_XPSR,
        }
    }
}

/// Opaque handle to a task's saved register context: the value of the
/// task's stack pointer at the moment it was switched out.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedContext(*mut u32);

impl SavedContext {
    /// Handle for a task that has no context yet.
    pub const NONE: Self = Self(ptr::null_mut());

    /// Wrap a stack pointer taken from the CPU.
    ///
    /// # Safety
    /// `sp` must point at a full [`ContextFrame`] on a live task stack.
    pub unsafe fn from_raw(sp: *mut u32) -> Self {
        Self(sp)
    }

    /// The raw stack pointer, for loading back into the CPU.
    pub fn into_raw(self) -> *mut u32 {
        self.0
    }

    pub fn is_none(&self) -> bool {
        self.0.is_null()
    }

    /// Lay out the initial context for a task that has never run.
    ///
    /// Aligns the top of `stack` down to [`STACK_ALIGN`], writes a
    /// [`ContextFrame`] just below it and paints the remainder of the
    /// region with [`STACK_FILL`].
    pub fn build(
        stack: &'static mut [u8],
        entry: TaskEntry,
    ) -> Result<(Self, StackRegion), KernelError> {
        if stack.len() < MIN_STACK_SIZE {
            return Err(KernelError::StackTooSmall);
        }

        let base = stack.as_mut_ptr() as usize;
        let top = (base + stack.len()) & !(STACK_ALIGN - 1);
        let bottom = (base + STACK_ALIGN - 1) & !(STACK_ALIGN - 1);

        let frame = (top - CONTEXT_FRAME_WORDS * 4) as *mut ContextFrame;
        let painted = (frame as usize - bottom) / 4;
        let limit = bottom as *mut u32;

        // SAFETY: `bottom..top` lies inside `stack`, both ends are 8-byte
        // aligned and the length check guarantees a frame fits.
        unsafe {
            frame.write(ContextFrame::initial(entry));
            for i in 0..painted {
                limit.add(i).write(STACK_FILL);
            }
        }

        Ok((
            Self(frame as *mut u32),
            StackRegion {
                limit,
                words: painted,
            },
        ))
    }

    /// Read back the frame this handle points at.
    ///
    /// # Safety
    /// The owning task must not be running.
    pub unsafe fn frame(&self) -> ContextFrame {
        (self.0 as *const ContextFrame).read()
    }
}

/// The painted part of a task stack, kept for usage diagnosis.
#[derive(Debug, Clone, Copy)]
pub struct StackRegion {
    limit: *mut u32,
    words: usize,
}

impl StackRegion {
    pub const EMPTY: Self = Self {
        limit: ptr::null_mut(),
        words: 0,
    };

    /// Number of sentinel words at the bottom of the stack that have never
    /// been overwritten. Zero means the task has used (or overflowed) its
    /// whole stack.
    pub fn unused_words(&self) -> usize {
        // SAFETY: `limit..limit + words` is the painted region recorded by
        // `SavedContext::build` and stays owned by the task.
        (0..self.words)
            .take_while(|&i| unsafe { self.limit.add(i).read_volatile() } == STACK_FILL)
            .count()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::boxed::Box;

    extern "C" fn entry() -> ! {
        loop {}
    }

    fn leak_stack(bytes: usize) -> &'static mut [u8] {
        Box::leak(std::vec![0u8; bytes].into_boxed_slice())
    }

    #[test]
    fn test_initial_frame_layout() {
        let (ctx, _) = SavedContext::build(leak_stack(160), entry).unwrap();
        let frame = unsafe { ctx.frame() };

        assert_eq!(frame.callee_saved, [4, 5, 6, 7, 8, 9, 10, 11]);
        assert_eq!([frame.r0, frame.r1, frame.r2, frame.r3], [0, 1, 2, 3]);
        assert_eq!(frame.r12, 12);
        assert_eq!(frame.lr, 0xE);
        assert_eq!(frame.pc, entry as usize as u32 & !1);
        assert_eq!(frame.xpsr, 0x0100_0000);
    }

    #[test]
    fn test_frame_sits_below_aligned_top() {
        let stack = leak_stack(165);
        let end = stack.as_ptr() as usize + stack.len();
        let (ctx, _) = SavedContext::build(stack, entry).unwrap();

        let sp = ctx.into_raw() as usize;
        let top = sp + CONTEXT_FRAME_WORDS * 4;
        assert_eq!(top % STACK_ALIGN, 0);
        assert!(top <= end && end - top < STACK_ALIGN);
    }

    #[test]
    fn test_remaining_stack_is_painted() {
        let stack = leak_stack(256);
        let base = stack.as_ptr() as usize;
        let (ctx, region) = SavedContext::build(stack, entry).unwrap();

        let bottom = (base + STACK_ALIGN - 1) & !(STACK_ALIGN - 1);
        let expected = (ctx.into_raw() as usize - bottom) / 4;
        assert_eq!(region.unused_words(), expected);

        let words = unsafe { core::slice::from_raw_parts(bottom as *const u32, expected) };
        assert!(words.iter().all(|&w| w == STACK_FILL));
    }

    #[test]
    fn test_unused_words_stops_at_first_dirty_word() {
        let (_, region) = SavedContext::build(leak_stack(256), entry).unwrap();
        let total = region.unused_words();

        unsafe { region.limit.add(5).write(0x1234_5678) };
        assert_eq!(region.unused_words(), 5);
        assert!(total > 5);
    }

    #[test]
    fn test_stack_too_small() {
        let result = SavedContext::build(leak_stack(MIN_STACK_SIZE - 1), entry);
        assert_eq!(result.err(), Some(KernelError::StackTooSmall));
    }
}
