#![no_std]
#![no_main]

mod button;
mod led;

use cortex_m_rt::entry;

use button::{arm_button_wakeup, init_user_button};
use led::{init_leds, led1_toggle, led2_toggle, led3_toggle, led4_write};

use defmt_rtt as _;
use panic_probe as _;

extern "C" fn blinker_100ms(_arg: *mut core::ffi::c_void) {
    loop {
        led1_toggle();
        kernel::delay_ms(100);
    }
}

extern "C" fn blinker_500ms(_arg: *mut core::ffi::c_void) {
    loop {
        led2_toggle();
        kernel::delay_ms(500);
    }
}

extern "C" fn blinker_1000ms(_arg: *mut core::ffi::c_void) {
    loop {
        led3_toggle();
        kernel::delay_ms(1000);
    }
}

/// Parks itself until `EXTI0_Handler` resumes it on a button press, then
/// toggles the fourth LED and goes back to sleep — a demonstration of
/// interrupt-driven preemption rather than time-driven blinking.
extern "C" fn button_task(_arg: *mut core::ffi::c_void) {
    let me = kernel::current();
    let mut lit = false;
    loop {
        arm_button_wakeup(me);
        kernel::suspend(me);
        lit = !lit;
        led4_write(lit);
    }
}

#[entry]
fn main() -> ! {
    init_leds();
    init_user_button();

    kernel::init();
    kernel::time_init();

    kernel::create(blinker_100ms, core::ptr::null_mut(), 10).expect("blinker_100ms slot");
    kernel::create(blinker_500ms, core::ptr::null_mut(), 20).expect("blinker_500ms slot");
    kernel::create(blinker_1000ms, core::ptr::null_mut(), 30).expect("blinker_1000ms slot");
    kernel::create(button_task, core::ptr::null_mut(), 1).expect("button_task slot");

    kernel::start()
}
