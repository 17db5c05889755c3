// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use hal::gpio::Pin;

use quadrive_algo::{MotorState, MotorsDriver, MOTORS_NUMBER};

use crate::pinout;
use crate::pwm::MotorPwm;

/// Direction lines of one bridge channel.
struct Direction {
    forward: Pin,
    backward: Pin,
}

impl Direction {
    fn apply(&mut self, state: MotorState) {
        let (forward, backward) = state.pins();
        if forward {
            self.forward.set_high();
        } else {
            self.forward.set_low();
        }
        if backward {
            self.backward.set_high();
        } else {
            self.backward.set_low();
        }
    }
}

/// The four bridge channels behind [`MotorsDriver`].
///
/// Duty and direction are shadowed so reads never touch the timer or the GPIO registers.
pub struct MotorBank {
    pwm: MotorPwm,
    direction: [Direction; MOTORS_NUMBER],
    duty: [u8; MOTORS_NUMBER],
    state: [MotorState; MOTORS_NUMBER],
}

impl MotorBank {
    /// Configures the direction lines and parks every motor (idle, zero duty).
    pub fn new(mut pwm: MotorPwm) -> Self {
        pwm.begin();
        let direction = core::array::from_fn(|motor| {
            let pins = &pinout::driver::MOTORS[motor];
            Direction {
                forward: pins.forward.init(),
                backward: pins.backward.init(),
            }
        });
        let mut bank = Self {
            pwm,
            direction,
            duty: [0; MOTORS_NUMBER],
            state: [MotorState::Idle; MOTORS_NUMBER],
        };
        for motor in 0..MOTORS_NUMBER {
            bank.configure(motor);
        }
        bank
    }

    /// Pushes the shadowed duty and direction of `motor` to the hardware.
    fn configure(&mut self, motor: usize) {
        if let Some(direction) = self.direction.get_mut(motor) {
            direction.apply(self.state[motor]);
            self.pwm.set_duty(motor, self.duty[motor]);
        }
    }
}

impl MotorsDriver for MotorBank {
    fn set_pwm(&mut self, motor: usize, value: u8) {
        if let Some(duty) = self.duty.get_mut(motor) {
            *duty = value;
            self.pwm.set_duty(motor, value);
        }
    }

    fn pwm(&self, motor: usize) -> u8 {
        self.duty.get(motor).copied().unwrap_or(0)
    }

    fn set_state(&mut self, motor: usize, state: MotorState) {
        if let Some(shadow) = self.state.get_mut(motor) {
            *shadow = state;
            self.configure(motor);
        }
    }

    fn state(&self, motor: usize) -> MotorState {
        self.state.get(motor).copied().unwrap_or_default()
    }
}
