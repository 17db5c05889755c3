// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

//! Drive modes and the control loop policy.
//!
//! At most one drive-mode handler is active. The control loop calls
//! [`MotorsController::control`] and sleeps for the returned number of milliseconds;
//! handlers only ever run there, never from the bus interrupt.

pub mod calibration;

pub use calibration::{CalibrateStep, CalibrationController, MotorCalibration, StepResult};

use crate::config::CONTROL_IDLE_PERIOD_MS;
use crate::error::ProtocolError;
use crate::motors::{MotorsDriver, TachoMotors};

/// High level behaviour selected with SET_ACTION.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DriveMode {
    #[default]
    Disabled = 0,
    Calibrate = 1,
    /// Closed loop speed control, reserved.
    Cruise = 2,
}

impl TryFrom<u8> for DriveMode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DriveMode::Disabled),
            1 => Ok(DriveMode::Calibrate),
            2 => Ok(DriveMode::Cruise),
            other => Err(ProtocolError::UnknownDriveMode(other)),
        }
    }
}

/// Phase of the active drive mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveStep {
    /// Nothing left to do.
    Nop,
    /// First invocation after a mode change.
    Init,
    Calibrate(CalibrateStep),
}

/// Owner of the drive-mode handler and its step.
pub struct MotorsController {
    mode: DriveMode,
    step: DriveStep,
    calibration: CalibrationController,
}

impl MotorsController {
    pub const fn new() -> Self {
        Self {
            mode: DriveMode::Disabled,
            step: DriveStep::Nop,
            calibration: CalibrationController::new(),
        }
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn step(&self) -> DriveStep {
        self.step
    }

    /// True while a handler is installed.
    pub fn is_active(&self) -> bool {
        self.mode != DriveMode::Disabled
    }

    pub fn calibration(&self) -> &CalibrationController {
        &self.calibration
    }

    pub fn calibration_mut(&mut self) -> &mut CalibrationController {
        &mut self.calibration
    }

    /// Switches the drive mode. Any accepted switch restarts the step sequence, even when
    /// the mode does not change.
    pub fn set_action(&mut self, mode: DriveMode) {
        match mode {
            DriveMode::Disabled | DriveMode::Calibrate => {
                info!("DRIVE: mode {}", mode);
                self.mode = mode;
                self.step = DriveStep::Init;
            }
            DriveMode::Cruise => warn!("DRIVE: cruise mode is not available"),
        }
    }

    /// Runs one step of the active handler.
    ///
    /// # Returns
    /// Milliseconds to wait before the next call.
    pub fn control<D: MotorsDriver>(&mut self, driver: &mut D, tachos: &mut TachoMotors, now: u32) -> u32 {
        match self.mode {
            DriveMode::Calibrate => match self.calibration.step(&mut self.step, driver, tachos, now) {
                StepResult::Wait(ms) => ms,
                StepResult::Done => {
                    self.mode = DriveMode::Disabled;
                    self.step = DriveStep::Nop;
                    0
                }
            },
            DriveMode::Disabled | DriveMode::Cruise => CONTROL_IDLE_PERIOD_MS,
        }
    }
}

impl Default for MotorsController {
    fn default() -> Self {
        Self::new()
    }
}
