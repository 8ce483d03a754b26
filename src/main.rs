//! # rrtos Example Firmware
//!
//! Two blinking tasks on a TM4C123 LaunchPad-style board:
//!
//! | Task | LED | On | Off |
//! |------|-----|----|-----|
//! | `green_led_task` | Green | 1/4 s | 3/4 s |
//! | `blue_led_task` | Blue | 1/2 s | 1/3 s |
//!
//! The LEDs are modeled as bits in `LEDS` (watch it in a debugger) and,
//! with the `defmt` feature, logged over RTT. Whenever both tasks sleep,
//! the idle task puts the core to sleep with `wfi`.

#![no_std]
#![no_main]

use core::ptr::addr_of_mut;
use core::sync::atomic::{AtomicU8, Ordering};

use cortex_m_rt::entry;
use panic_halt as _;

#[cfg(feature = "defmt")]
use defmt_rtt as _;

use rrtos::arch::cortex_m4;
use rrtos::config::TICKS_PER_SEC;
use rrtos::{kernel, Board};

// ---------------------------------------------------------------------------
// Board support
// ---------------------------------------------------------------------------

const LED_GREEN: u8 = 1 << 3;
const LED_BLUE: u8 = 1 << 2;

/// Current LED state, one bit per LED (PF3 green, PF2 blue).
static LEDS: AtomicU8 = AtomicU8::new(0);

fn set_led(led: u8, on: bool) {
    if on {
        LEDS.fetch_or(led, Ordering::Relaxed);
    } else {
        LEDS.fetch_and(!led, Ordering::Relaxed);
    }
    #[cfg(feature = "defmt")]
    defmt::info!("leds = {=u8:#x}", LEDS.load(Ordering::Relaxed));
}

struct LaunchPad;

impl Board for LaunchPad {
    fn on_startup() {
        if let Some(mut cp) = cortex_m::Peripherals::take() {
            cortex_m4::configure_systick(&mut cp.SYST, TICKS_PER_SEC);
        }
    }
}

// ---------------------------------------------------------------------------
// Task entry points
// ---------------------------------------------------------------------------

static mut STACK_IDLE: [u8; 256] = [0; 256];
static mut STACK_GREEN: [u8; 512] = [0; 512];
static mut STACK_BLUE: [u8; 512] = [0; 512];

extern "C" fn green_led_task() -> ! {
    loop {
        set_led(LED_GREEN, true);
        kernel::delay(TICKS_PER_SEC / 4);
        set_led(LED_GREEN, false);
        kernel::delay(TICKS_PER_SEC * 3 / 4);
    }
}

extern "C" fn blue_led_task() -> ! {
    loop {
        set_led(LED_BLUE, true);
        kernel::delay(TICKS_PER_SEC / 2);
        set_led(LED_BLUE, false);
        kernel::delay(TICKS_PER_SEC / 3);
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

#[entry]
fn main() -> ! {
    // Safety: each stack is handed to the kernel exactly once, here,
    // before any task runs.
    let (idle, green, blue) = unsafe {
        (
            &mut *addr_of_mut!(STACK_IDLE),
            &mut *addr_of_mut!(STACK_GREEN),
            &mut *addr_of_mut!(STACK_BLUE),
        )
    };

    kernel::init::<LaunchPad>(idle);
    kernel::start_task(green_led_task, green);
    kernel::start_task(blue_led_task, blue);

    // Does not return
    kernel::run::<LaunchPad>()
}
