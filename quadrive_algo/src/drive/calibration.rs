// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::config::{
    ms_to_ticks, DELTA_PWM_DYNAMIC_MIN_RAMP_DOWN, DELTA_PWM_MIN_PERIOD_RAMP_UP,
    DELTA_PWM_STATIC_MIN_RAMP_UP, TACHO_QUIET_THRESHOLD_MS, WAIT_PWM_SPEED_STABILIZE_MS,
    WAIT_RAMP_UP_MIN_PERIOD_MS, WAIT_RAMP_UP_STATIC_MIN_PWM_MS,
};
use crate::motors::tacho::{pack_period, period_magnitude, TACHO_AVG_WINDOW};
use crate::motors::{MotorState, MotorsDriver, TachoMotors, MOTORS_NUMBER, PWM_MAX};

use super::DriveStep;

/// Calibration phases following [`DriveStep::Init`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrateStep {
    /// Raise the duty of every motor until it starts turning.
    StaticMinPwmRampUp,
    StaticMinPwmMeasure,
    /// Drive every motor to full duty.
    MinPeriodRampUp,
    MinPeriodMeasure,
    /// Lower the duty of every motor until it stops.
    DynamicMinPwmRampDown,
    DynamicMinPwmMeasure,
}

/// Outcome of one calibration step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// Call again after this many milliseconds.
    Wait(u32),
    /// Sequence finished, the handler can be removed.
    Done,
}

/// Measured response of one motor.
///
/// Periods are packed tachometer periods (MSB = direction) and are stored as magnitudes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotorCalibration {
    /// Period at full duty.
    pub min_period: u16,
    /// Period right after the motor started from standstill.
    pub static_max_period: u16,
    /// Period at the lowest duty that still keeps the motor turning.
    pub dynamic_max_period: u16,
    pub static_min_pwm: u8,
    pub dynamic_min_pwm: u8,
    /// pwm ~ m * period + q
    pub m: f32,
    pub q: f32,
    pub target_period: u16,
    pub real_target_period: u16,
}

impl MotorCalibration {
    pub const fn new() -> Self {
        Self {
            min_period: 0,
            static_max_period: 0,
            dynamic_max_period: 0,
            static_min_pwm: 0,
            dynamic_min_pwm: 0,
            m: 0.0,
            q: 0.0,
            target_period: 0,
            real_target_period: 0,
        }
    }

    /// Forgets the previous run; host set targets are kept.
    fn clear_measurements(&mut self) {
        *self = Self {
            target_period: self.target_period,
            real_target_period: self.real_target_period,
            ..Self::new()
        };
    }

    /// Fits the line through (dynamic_max_period, dynamic_min_pwm) and
    /// (min_period, PWM_MAX).
    pub fn compute_model(&mut self) {
        let min_pwm = self.dynamic_min_pwm as f32;
        let span = self.min_period as f32 - self.dynamic_max_period as f32;
        if span == 0.0 {
            // Degenerate run, the motor never changed speed
            self.m = 0.0;
            self.q = min_pwm;
            return;
        }
        self.m = (PWM_MAX as f32 - min_pwm) / span;
        self.q = min_pwm - self.m * self.dynamic_max_period as f32;
    }

    /// Duty expected to turn the wheel with the given packed period, clamped to the PWM range.
    pub fn pwm_for_period(&self, period: u16) -> u8 {
        let pwm = self.m * period_magnitude(period) as f32 + self.q;
        if !(pwm > 0.0) {
            0
        } else if pwm >= PWM_MAX as f32 {
            PWM_MAX
        } else {
            (pwm + 0.5) as u8
        }
    }
}

impl Default for MotorCalibration {
    fn default() -> Self {
        Self::new()
    }
}

/// Calibration drive mode.
///
/// The sequence is strictly forward. A step that did not reach its exit condition asks to
/// be called again after a settle delay; there is no timeout, a jammed motor keeps the
/// sequence in its ramp until the host disables the mode.
pub struct CalibrationController {
    motors: [MotorCalibration; MOTORS_NUMBER],
}

impl CalibrationController {
    pub const fn new() -> Self {
        Self {
            motors: [MotorCalibration::new(); MOTORS_NUMBER],
        }
    }

    pub fn motor(&self, motor: usize) -> Option<&MotorCalibration> {
        self.motors.get(motor)
    }

    pub fn motor_mut(&mut self, motor: usize) -> Option<&mut MotorCalibration> {
        self.motors.get_mut(motor)
    }

    pub fn motors(&self) -> &[MotorCalibration; MOTORS_NUMBER] {
        &self.motors
    }

    /// Stores the host requested period; false for an unknown motor.
    pub fn set_motor_period(&mut self, motor: usize, period: u16) -> bool {
        match self.motors.get_mut(motor) {
            Some(cal) => {
                cal.target_period = period;
                cal.real_target_period = period;
                true
            }
            None => false,
        }
    }

    pub fn pwm_for_period(&self, motor: usize, period: u16) -> Option<u8> {
        self.motors.get(motor).map(|cal| cal.pwm_for_period(period))
    }

    /// Executes the current step and advances `step` when its exit condition holds.
    ///
    /// # Arguments
    /// * `step` - drive step shared with the controller
    /// * `driver` - motor bank
    /// * `tachos` - tachometer state, already guarded by the caller
    /// * `now` - current monotonic time in ticks
    pub fn step<D: MotorsDriver>(
        &mut self,
        step: &mut DriveStep,
        driver: &mut D,
        tachos: &mut TachoMotors,
        now: u32,
    ) -> StepResult {
        match *step {
            DriveStep::Nop => StepResult::Done,
            DriveStep::Init => {
                info!("CALIBRATION: Start");
                for cal in self.motors.iter_mut() {
                    cal.clear_measurements();
                }
                tachos.reset_periods(now);
                for motor in 0..MOTORS_NUMBER {
                    driver.set_raw(motor, 0, MotorState::Forward);
                }
                *step = DriveStep::Calibrate(CalibrateStep::StaticMinPwmRampUp);
                StepResult::Wait(0)
            }
            DriveStep::Calibrate(phase) => self.run(phase, step, driver, tachos, now),
        }
    }

    fn run<D: MotorsDriver>(
        &mut self,
        phase: CalibrateStep,
        step: &mut DriveStep,
        driver: &mut D,
        tachos: &mut TachoMotors,
        now: u32,
    ) -> StepResult {
        let avg = |tachos: &TachoMotors, motor: usize| {
            tachos
                .get(motor)
                .map_or(0, |tacho| tacho.avg_period(TACHO_AVG_WINDOW))
        };

        let (next, wait) = match phase {
            CalibrateStep::StaticMinPwmRampUp => {
                let mut done = true;
                for motor in 0..MOTORS_NUMBER {
                    if avg(tachos, motor) == 0 {
                        done = false;
                        driver.increase_pwm(motor, DELTA_PWM_STATIC_MIN_RAMP_UP);
                    }
                }
                if !done {
                    return StepResult::Wait(WAIT_RAMP_UP_STATIC_MIN_PWM_MS);
                }
                (CalibrateStep::StaticMinPwmMeasure, 0)
            }

            CalibrateStep::StaticMinPwmMeasure => {
                for (motor, cal) in self.motors.iter_mut().enumerate() {
                    cal.static_max_period = pack_period(avg(tachos, motor), false);
                    cal.static_min_pwm = driver.pwm(motor);
                    debug!(
                        "CALIBRATION: motor {} starts at pwm {} period {}",
                        motor, cal.static_min_pwm, cal.static_max_period
                    );
                }
                (CalibrateStep::MinPeriodRampUp, 0)
            }

            CalibrateStep::MinPeriodRampUp => {
                let mut done = true;
                for motor in 0..MOTORS_NUMBER {
                    if driver.pwm(motor) < PWM_MAX {
                        done = false;
                        driver.increase_pwm(motor, DELTA_PWM_MIN_PERIOD_RAMP_UP);
                    }
                }
                if !done {
                    return StepResult::Wait(WAIT_RAMP_UP_MIN_PERIOD_MS);
                }
                (CalibrateStep::MinPeriodMeasure, 0)
            }

            CalibrateStep::MinPeriodMeasure => {
                for (motor, cal) in self.motors.iter_mut().enumerate() {
                    cal.min_period = pack_period(avg(tachos, motor), false);
                    debug!("CALIBRATION: motor {} min period {}", motor, cal.min_period);
                }
                (CalibrateStep::DynamicMinPwmRampDown, 0)
            }

            CalibrateStep::DynamicMinPwmRampDown => {
                let quiet = ms_to_ticks(TACHO_QUIET_THRESHOLD_MS);
                let mut done = true;
                for (motor, cal) in self.motors.iter_mut().enumerate() {
                    let spinning = tachos
                        .get(motor)
                        .is_some_and(|tacho| tacho.elapsed(now) < quiet);
                    if spinning {
                        done = false;
                        cal.dynamic_max_period = pack_period(avg(tachos, motor), false);
                        driver.decrease_pwm(motor, DELTA_PWM_DYNAMIC_MIN_RAMP_DOWN);
                    }
                }
                if !done {
                    return StepResult::Wait(WAIT_PWM_SPEED_STABILIZE_MS);
                }
                (CalibrateStep::DynamicMinPwmMeasure, 0)
            }

            CalibrateStep::DynamicMinPwmMeasure => {
                for (motor, cal) in self.motors.iter_mut().enumerate() {
                    cal.dynamic_min_pwm = driver
                        .pwm(motor)
                        .saturating_add(DELTA_PWM_DYNAMIC_MIN_RAMP_DOWN);
                    driver.set_raw(motor, 0, MotorState::Idle);
                    cal.compute_model();
                    info!(
                        "CALIBRATION: motor {} min pwm {} m {} q {}",
                        motor, cal.dynamic_min_pwm, cal.m, cal.q
                    );
                }
                info!("CALIBRATION: Done");
                *step = DriveStep::Nop;
                return StepResult::Done;
            }
        };

        info!("CALIBRATION: {}", next);
        *step = DriveStep::Calibrate(next);
        StepResult::Wait(wait)
    }
}

impl Default for CalibrationController {
    fn default() -> Self {
        Self::new()
    }
}
