// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::{MotorState, MotorsDriver, MOTORS_NUMBER};

/// Motor bank stand-in recording the last applied duty and direction.
pub(crate) struct MockDriver {
    pub pwm: [u8; MOTORS_NUMBER],
    pub state: [MotorState; MOTORS_NUMBER],
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            pwm: [0; MOTORS_NUMBER],
            state: [MotorState::Idle; MOTORS_NUMBER],
        }
    }
}

impl MotorsDriver for MockDriver {
    fn set_pwm(&mut self, motor: usize, value: u8) {
        self.pwm[motor] = value;
    }

    fn pwm(&self, motor: usize) -> u8 {
        self.pwm[motor]
    }

    fn set_state(&mut self, motor: usize, state: MotorState) {
        self.state[motor] = state;
    }

    fn state(&self, motor: usize) -> MotorState {
        self.state[motor]
    }
}
