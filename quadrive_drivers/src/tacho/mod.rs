// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use hal::gpio::{self, Edge, Pull};

use crate::pinout;

/// Configures the hall sensor inputs to fire EXTI0..EXTI3 on rising edges.
pub fn init() {
    for tacho in pinout::tacho::TACHO.iter() {
        let mut pin = tacho.init();
        pin.pull(Pull::Up);
        pin.enable_interrupt(Edge::Rising);
    }
}

/// Acknowledges the edge of `motor` so its EXTI line can fire again.
#[inline(always)]
pub fn clear(motor: usize) {
    if let Some(tacho) = pinout::tacho::TACHO.get(motor) {
        gpio::clear_exti_interrupt(tacho.number());
    }
}
