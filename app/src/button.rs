#![allow(dead_code)]
use core::cell::RefCell;
use critical_section::Mutex;
use drivers::exti::*;
use drivers::gpio::*;
use kernel::TaskHandle;

pub const PORTA: u32 = 0;
pub const GPIO_MODE_INPUT: u32 = 0;
pub const BUTTON_PORT: u32 = PORTA;
pub const BUTTON_PIN: u32 = 0;

/// Rising-edge trigger, matching `configure_gpio_interrupt`'s expected
/// `trigger_type` encoding.
const TRIGGER_RISING: u32 = 0;

/// Task woken on each button press; `None` until `arm_button_wakeup` is
/// called from `main`.
static WAITER: Mutex<RefCell<Option<TaskHandle>>> = Mutex::new(RefCell::new(None));

pub fn init_user_button() {
    gpio_configure_mode(BUTTON_PORT, BUTTON_PIN, GPIO_MODE_INPUT);
    configure_gpio_interrupt(BUTTON_PORT, BUTTON_PIN, TRIGGER_RISING);
}

/// Registers `task` to be resumed the next time the button fires. The task
/// is expected to have already suspended itself.
pub fn arm_button_wakeup(task: TaskHandle) {
    critical_section::with(|cs| *WAITER.borrow_ref_mut(cs) = Some(task));
}

#[unsafe(no_mangle)]
#[allow(non_snake_case)]
pub extern "C" fn EXTI0_Handler() {
    clear_exti_pending(BUTTON_PIN);
    let waiter = critical_section::with(|cs| WAITER.borrow_ref_mut(cs).take());
    if let Some(task) = waiter {
        kernel::resume(task);
    }
}
