// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::drive::MotorsController;
use crate::motors::{MotorState, MotorsDriver, TachoMotors};

/// Everything the bus, the tachometer inputs and the control loop share.
///
/// The firmware keeps a single instance behind a critical section and hands it to the
/// bus engine as device context and to the control loop.
pub struct Chassis<D> {
    pub driver: D,
    pub tachos: TachoMotors,
    pub controller: MotorsController,
}

impl<D: MotorsDriver> Chassis<D> {
    /// Takes over the motor bank and parks every motor.
    pub fn new(mut driver: D) -> Self {
        driver.set_pwm_all(0);
        driver.set_state_all(MotorState::Idle);
        Self {
            driver,
            tachos: TachoMotors::new(),
            controller: MotorsController::new(),
        }
    }

    /// Records a tachometer edge of `motor` at `timestamp` ticks.
    #[inline(always)]
    pub fn tacho_edge(&mut self, motor: usize, timestamp: u32) {
        self.tachos.update(motor, timestamp);
    }

    /// One pass of the control loop; returns the delay until the next pass (ms).
    pub fn control(&mut self, now: u32) -> u32 {
        self.controller.control(&mut self.driver, &mut self.tachos, now)
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_active()
    }
}
