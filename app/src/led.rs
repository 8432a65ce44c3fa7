#![allow(dead_code)]
use drivers::gpio::*;

pub const PORTD: u32 = 3;

pub const GPIO_MODE_GP_OUTPUT: u32 = 1;
pub const GPIO_OUTPUT_PUSH_PULL: u32 = 0;

pub const LED_ON: bool = true;
pub const LED_OFF: bool = false;

pub const LED_PORT: u32 = PORTD;
pub const LED_1_PIN: u32 = 12;
pub const LED_2_PIN: u32 = 13;
pub const LED_3_PIN: u32 = 14;
pub const LED_4_PIN: u32 = 15;

/// Configures all four on-board LEDs as push-pull outputs.
pub fn init_leds() {
    for pin in [LED_1_PIN, LED_2_PIN, LED_3_PIN, LED_4_PIN] {
        gpio_configure_mode(LED_PORT, pin, GPIO_MODE_GP_OUTPUT);
        gpio_output_type_configure(LED_PORT, pin, GPIO_OUTPUT_PUSH_PULL);
    }
}

pub fn led1_toggle() {
    toggle_gpio(LED_PORT, LED_1_PIN);
}

pub fn led2_toggle() {
    toggle_gpio(LED_PORT, LED_2_PIN);
}

pub fn led3_toggle() {
    toggle_gpio(LED_PORT, LED_3_PIN);
}

pub fn led4_write(state: bool) {
    gpio_write(LED_PORT, LED_4_PIN, state);
}
