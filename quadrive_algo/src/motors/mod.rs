// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

//! Motor indexing, direction states and the PWM/direction driver interface.

pub mod tacho;

#[cfg(test)]
pub(crate) mod mock;

pub use tacho::{TachoMotor, TachoMotors};

/// Number of driven wheels.
pub const MOTORS_NUMBER: usize = 4;
/// Item value addressing every motor at once (broadcast writes only).
pub const ALL_MOTORS: u8 = MOTORS_NUMBER as u8;
/// Full scale PWM duty.
pub const PWM_MAX: u8 = u8::MAX;

/// Wheel positions, matching the item nibble of register accesses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MotorId {
    LeftRear = 0,
    RightRear = 1,
    RightFront = 2,
    LeftFront = 3,
}

impl MotorId {
    pub const ALL: [MotorId; MOTORS_NUMBER] = [
        MotorId::LeftRear,
        MotorId::RightRear,
        MotorId::RightFront,
        MotorId::LeftFront,
    ];

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// H-bridge direction state of one motor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MotorState {
    #[default]
    Idle = 0, // both direction inputs low, motor coasts
    Backward = 1,
    Forward = 2,
    Lock = 3, // both inputs high, short brake
}

impl MotorState {
    /// Direction pin levels as (forward, backward).
    pub fn pins(self) -> (bool, bool) {
        match self {
            MotorState::Idle => (false, false),
            MotorState::Forward => (true, false),
            MotorState::Backward => (false, true),
            MotorState::Lock => (true, true),
        }
    }
}

impl TryFrom<u8> for MotorState {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MotorState::Idle),
            1 => Ok(MotorState::Backward),
            2 => Ok(MotorState::Forward),
            3 => Ok(MotorState::Lock),
            other => Err(other),
        }
    }
}

/// Low level PWM/direction driver for the motor bank.
///
/// Indices are `0..MOTORS_NUMBER`; callers validate them before calling in.
pub trait MotorsDriver {
    fn set_pwm(&mut self, motor: usize, value: u8);
    fn pwm(&self, motor: usize) -> u8;
    fn set_state(&mut self, motor: usize, state: MotorState);
    fn state(&self, motor: usize) -> MotorState;

    fn set_pwm_all(&mut self, value: u8) {
        for motor in 0..MOTORS_NUMBER {
            self.set_pwm(motor, value);
        }
    }

    fn set_state_all(&mut self, state: MotorState) {
        for motor in 0..MOTORS_NUMBER {
            self.set_state(motor, state);
        }
    }

    /// Raises the duty by `delta`, saturating at [`PWM_MAX`].
    fn increase_pwm(&mut self, motor: usize, delta: u8) {
        let value = self.pwm(motor).saturating_add(delta);
        self.set_pwm(motor, value);
    }

    /// Lowers the duty by `delta`, saturating at zero.
    fn decrease_pwm(&mut self, motor: usize, delta: u8) {
        let value = self.pwm(motor).saturating_sub(delta);
        self.set_pwm(motor, value);
    }

    /// Applies duty and direction in one go.
    fn set_raw(&mut self, motor: usize, pwm: u8, state: MotorState) {
        self.set_pwm(motor, pwm);
        self.set_state(motor, state);
    }
}
