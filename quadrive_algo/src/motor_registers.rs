// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

//! Register map of the motor device.
//!
//! | class | register           | write               | read                     | bytes |
//! |-------|--------------------|---------------------|--------------------------|-------|
//! | 1     | PWM                | duty                | duty                     | 1     |
//! | 2     | STATE              | direction state     | direction state          | 1     |
//! | 3     | SET_ACTION         | drive mode          | active drive mode        | 1     |
//! | 4     | TACHO_CALIB_PERIOD | -                   | calibrated min period    | 2     |
//! | 5     | TACHO_AVG_PERIOD   | target period       | live average period      | 2     |
//! | 6     | TACHO_COUNT        | reset (dummy byte)  | edge counter             | 2     |
//! | 7     | PWM_M              | -                   | model slope (f32)        | 4     |
//! | 8     | PWM_Q              | -                   | model offset (f32)       | 4     |
//!
//! The item nibble is the motor index; PWM and STATE writes also accept [`ALL_MOTORS`].
//! Multi-byte values are little endian.

use crate::bus::{class_of, item_of, register_byte, BufferRegistry, RegisterBuffer, RegisterDevice};
use crate::chassis::Chassis;
use crate::drive::DriveMode;
use crate::error::{ProtocolError, RegistryError};
use crate::motors::tacho::{pack_period, TACHO_AVG_WINDOW};
use crate::motors::{MotorState, MotorsDriver, ALL_MOTORS, MOTORS_NUMBER};

/// Widest motor register value (f32 coefficients).
pub const MOTOR_VALUE_LEN: usize = 4;

/// Command classes of the motor device. The numbering is part of the wire protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MotorRegister {
    Pwm = 1,
    State = 2,
    SetAction = 3,
    TachoCalibPeriod = 4,
    TachoAvgPeriod = 5,
    TachoCount = 6,
    PwmM = 7,
    PwmQ = 8,
}

impl MotorRegister {
    pub const FIRST: MotorRegister = MotorRegister::Pwm;
    pub const LAST: MotorRegister = MotorRegister::PwmQ;

    /// Register byte addressing `item` in this class.
    pub const fn reg(self, item: u8) -> u8 {
        register_byte(self as u8, item)
    }

    /// Value bytes a write has to carry, zero for read-only registers.
    pub const fn write_len(self) -> usize {
        match self {
            MotorRegister::Pwm
            | MotorRegister::State
            | MotorRegister::SetAction
            | MotorRegister::TachoCount => 1,
            MotorRegister::TachoAvgPeriod => 2,
            MotorRegister::TachoCalibPeriod | MotorRegister::PwmM | MotorRegister::PwmQ => 0,
        }
    }
}

impl TryFrom<u8> for MotorRegister {
    type Error = ProtocolError;

    fn try_from(class: u8) -> Result<Self, Self::Error> {
        match class {
            1 => Ok(MotorRegister::Pwm),
            2 => Ok(MotorRegister::State),
            3 => Ok(MotorRegister::SetAction),
            4 => Ok(MotorRegister::TachoCalibPeriod),
            5 => Ok(MotorRegister::TachoAvgPeriod),
            6 => Ok(MotorRegister::TachoCount),
            7 => Ok(MotorRegister::PwmM),
            8 => Ok(MotorRegister::PwmQ),
            other => Err(ProtocolError::UnknownRegister(other)),
        }
    }
}

/// Motors addressed by the item nibble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    One(usize),
    All,
}

impl Target {
    fn decode(item: u8, broadcast: bool) -> Result<Self, ProtocolError> {
        match item {
            motor if (motor as usize) < MOTORS_NUMBER => Ok(Target::One(motor as usize)),
            ALL_MOTORS if broadcast => Ok(Target::All),
            other => Err(ProtocolError::ItemOutOfRange(other)),
        }
    }

    fn single(item: u8) -> Result<usize, ProtocolError> {
        match Self::decode(item, false)? {
            Target::One(motor) => Ok(motor),
            Target::All => Err(ProtocolError::ItemOutOfRange(item)),
        }
    }
}

/// Bus device exposing the motor bank, tachometers and calibration results.
pub struct MotorRegisters;

impl MotorRegisters {
    pub const fn new() -> Self {
        Self
    }

    /// Registers the device for the whole motor class range.
    pub fn attach<'a, D: MotorsDriver, const N: usize>(
        &'a mut self,
        registry: &mut BufferRegistry<'a, Chassis<D>, N>,
    ) -> Result<(), RegistryError> {
        registry.register(RegisterBuffer::<Chassis<D>>::new(
            MotorRegister::FIRST as u8,
            MotorRegister::LAST as u8,
            self,
        ))
    }

    fn write<D: MotorsDriver>(payload: &[u8], chassis: &mut Chassis<D>) -> Result<(), ProtocolError> {
        let Some((&reg, value)) = payload.split_first() else {
            return Ok(());
        };
        let register = MotorRegister::try_from(class_of(reg))?;
        let expected = register.write_len();
        if expected == 0 {
            return Err(ProtocolError::ReadOnly(reg));
        }
        if value.len() < expected {
            return Err(ProtocolError::ShortWrite {
                expected,
                received: value.len(),
            });
        }

        let item = item_of(reg);
        match register {
            MotorRegister::Pwm => match Target::decode(item, true)? {
                Target::One(motor) => chassis.driver.set_pwm(motor, value[0]),
                Target::All => chassis.driver.set_pwm_all(value[0]),
            },
            MotorRegister::State => {
                let state = MotorState::try_from(value[0]).map_err(ProtocolError::UnknownState)?;
                match Target::decode(item, true)? {
                    Target::One(motor) => chassis.driver.set_state(motor, state),
                    Target::All => chassis.driver.set_state_all(state),
                }
            }
            MotorRegister::SetAction => {
                let mode = DriveMode::try_from(value[0])?;
                chassis.controller.set_action(mode);
            }
            MotorRegister::TachoCount => {
                let motor = Target::single(item)?;
                if let Some(tacho) = chassis.tachos.get_mut(motor) {
                    tacho.reset_counter();
                }
            }
            MotorRegister::TachoAvgPeriod => {
                let motor = Target::single(item)?;
                let period = u16::from_le_bytes([value[0], value[1]]);
                chassis.controller.calibration_mut().set_motor_period(motor, period);
            }
            MotorRegister::TachoCalibPeriod | MotorRegister::PwmM | MotorRegister::PwmQ => {
                return Err(ProtocolError::ReadOnly(reg));
            }
        }
        Ok(())
    }

    fn read<D: MotorsDriver>(payload: &mut [u8], chassis: &mut Chassis<D>) -> Result<usize, ProtocolError> {
        let Some((&mut reg, out)) = payload.split_first_mut() else {
            return Ok(0);
        };
        let register = MotorRegister::try_from(class_of(reg))?;
        if register == MotorRegister::SetAction {
            return Ok(put(out, &[chassis.controller.mode() as u8]));
        }

        let motor = Target::single(item_of(reg))?;
        let produced = match register {
            MotorRegister::Pwm => put(out, &[chassis.driver.pwm(motor)]),
            MotorRegister::State => put(out, &[chassis.driver.state(motor) as u8]),
            MotorRegister::TachoCount => {
                let count = chassis.tachos.get(motor).map_or(0, |tacho| tacho.counter());
                put(out, &count.to_le_bytes())
            }
            MotorRegister::TachoAvgPeriod => {
                let avg = chassis
                    .tachos
                    .get(motor)
                    .map_or(0, |tacho| tacho.avg_period(TACHO_AVG_WINDOW));
                let backward = chassis.driver.state(motor) == MotorState::Backward;
                put(out, &pack_period(avg, backward).to_le_bytes())
            }
            register => {
                let Some(cal) = chassis.controller.calibration().motor(motor) else {
                    return Err(ProtocolError::ItemOutOfRange(item_of(reg)));
                };
                match register {
                    MotorRegister::TachoCalibPeriod => put(out, &cal.min_period.to_le_bytes()),
                    MotorRegister::PwmM => put(out, &cal.m.to_le_bytes()),
                    _ => put(out, &cal.q.to_le_bytes()),
                }
            }
        };
        Ok(produced)
    }
}

impl Default for MotorRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: MotorsDriver> RegisterDevice<Chassis<D>> for MotorRegisters {
    fn value_len(&self) -> usize {
        MOTOR_VALUE_LEN
    }

    fn on_write(&mut self, payload: &[u8], chassis: &mut Chassis<D>) {
        if let Err(err) = Self::write(payload, chassis) {
            warn!("TWI: write ignored: {}", err);
        }
    }

    fn on_read(&mut self, payload: &mut [u8], chassis: &mut Chassis<D>) -> usize {
        Self::read(payload, chassis).unwrap_or_else(|err| {
            warn!("TWI: read ignored: {}", err);
            0
        })
    }
}

/// Copies `value` into the answer area, returns the bytes copied.
fn put(out: &mut [u8], value: &[u8]) -> usize {
    let len = value.len().min(out.len());
    out[..len].copy_from_slice(&value[..len]);
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::DriveStep;
    use crate::motors::mock::MockDriver;

    fn chassis() -> Chassis<MockDriver> {
        Chassis::new(MockDriver::new())
    }

    fn write(chassis: &mut Chassis<MockDriver>, payload: &[u8]) {
        MotorRegisters::new().on_write(payload, chassis);
    }

    fn read(chassis: &mut Chassis<MockDriver>, reg: u8) -> Vec<u8> {
        let mut payload = [0u8; 1 + MOTOR_VALUE_LEN];
        payload[0] = reg;
        let len = MotorRegisters::new().on_read(&mut payload, chassis);
        payload[1..1 + len].to_vec()
    }

    #[test]
    fn pwm_write_and_broadcast() {
        let mut chassis = chassis();
        write(&mut chassis, &[MotorRegister::Pwm.reg(2), 77]);
        assert_eq!(chassis.driver.pwm, [0, 0, 77, 0]);

        write(&mut chassis, &[MotorRegister::Pwm.reg(ALL_MOTORS), 12]);
        assert_eq!(chassis.driver.pwm, [12; MOTORS_NUMBER]);
        assert_eq!(read(&mut chassis, MotorRegister::Pwm.reg(3)), vec![12]);
    }

    #[test]
    fn state_write_validates_value() {
        let mut chassis = chassis();
        write(&mut chassis, &[MotorRegister::State.reg(1), MotorState::Backward as u8]);
        assert_eq!(chassis.driver.state[1], MotorState::Backward);

        write(&mut chassis, &[MotorRegister::State.reg(1), 9]);
        assert_eq!(chassis.driver.state[1], MotorState::Backward);
        assert_eq!(read(&mut chassis, MotorRegister::State.reg(1)), vec![1]);
    }

    #[test]
    fn out_of_range_items_fail_closed() {
        let mut chassis = chassis();
        write(&mut chassis, &[MotorRegister::Pwm.reg(5), 200]);
        write(&mut chassis, &[MotorRegister::TachoCount.reg(ALL_MOTORS), 0]);
        write(&mut chassis, &[MotorRegister::TachoAvgPeriod.reg(ALL_MOTORS), 1, 2]);
        assert_eq!(chassis.driver.pwm, [0; MOTORS_NUMBER]);
        assert!(read(&mut chassis, MotorRegister::Pwm.reg(ALL_MOTORS)).is_empty());
        assert!(read(&mut chassis, MotorRegister::TachoCount.reg(0xF)).is_empty());
    }

    #[test]
    fn short_and_read_only_writes_have_no_effect() {
        let mut chassis = chassis();
        write(&mut chassis, &[MotorRegister::TachoAvgPeriod.reg(0), 0x34]);
        write(&mut chassis, &[MotorRegister::Pwm.reg(0)]);
        write(&mut chassis, &[MotorRegister::PwmM.reg(0), 1, 2, 3, 4]);
        let cal = chassis.controller.calibration().motor(0).unwrap();
        assert_eq!(cal.target_period, 0);
        assert_eq!(cal.m, 0.0);
        assert_eq!(chassis.driver.pwm[0], 0);
    }

    #[test]
    fn target_period_is_stored_little_endian() {
        let mut chassis = chassis();
        write(&mut chassis, &[MotorRegister::TachoAvgPeriod.reg(3), 0x34, 0x12]);
        let cal = chassis.controller.calibration().motor(3).unwrap();
        assert_eq!(cal.target_period, 0x1234);
        assert_eq!(cal.real_target_period, 0x1234);
    }

    #[test]
    fn tacho_registers() {
        let mut chassis = chassis();
        chassis.tachos.reset_periods(0);
        for t in 1..=40u32 {
            chassis.tacho_edge(1, t * 300);
        }
        assert_eq!(read(&mut chassis, MotorRegister::TachoCount.reg(1)), vec![40, 0]);
        assert_eq!(
            read(&mut chassis, MotorRegister::TachoAvgPeriod.reg(1)),
            300u16.to_le_bytes().to_vec()
        );

        chassis.driver.set_state(1, MotorState::Backward);
        assert_eq!(
            read(&mut chassis, MotorRegister::TachoAvgPeriod.reg(1)),
            (0x8000u16 | 300).to_le_bytes().to_vec()
        );

        write(&mut chassis, &[MotorRegister::TachoCount.reg(1), 0]);
        assert_eq!(read(&mut chassis, MotorRegister::TachoCount.reg(1)), vec![0, 0]);
    }

    #[test]
    fn calibration_results_are_readable() {
        let mut chassis = chassis();
        if let Some(cal) = chassis.controller.calibration_mut().motor_mut(2) {
            cal.min_period = 0x0141;
            cal.m = -0.25;
            cal.q = 270.5;
        }
        assert_eq!(read(&mut chassis, MotorRegister::TachoCalibPeriod.reg(2)), vec![0x41, 0x01]);
        assert_eq!(
            read(&mut chassis, MotorRegister::PwmM.reg(2)),
            (-0.25f32).to_le_bytes().to_vec()
        );
        assert_eq!(
            read(&mut chassis, MotorRegister::PwmQ.reg(2)),
            270.5f32.to_le_bytes().to_vec()
        );
    }

    #[test]
    fn set_action_selects_drive_mode() {
        let mut chassis = chassis();
        write(&mut chassis, &[MotorRegister::SetAction.reg(0), DriveMode::Calibrate as u8]);
        assert_eq!(chassis.controller.mode(), DriveMode::Calibrate);
        assert_eq!(chassis.controller.step(), DriveStep::Init);
        assert_eq!(read(&mut chassis, MotorRegister::SetAction.reg(0)), vec![1]);

        write(&mut chassis, &[MotorRegister::SetAction.reg(0), 42]);
        assert_eq!(chassis.controller.mode(), DriveMode::Calibrate);

        write(&mut chassis, &[MotorRegister::SetAction.reg(0), DriveMode::Disabled as u8]);
        assert!(!chassis.is_busy());
        assert_eq!(chassis.controller.step(), DriveStep::Init);
    }

    #[test]
    fn register_codes_are_stable() {
        for class in 1..=8u8 {
            assert_eq!(MotorRegister::try_from(class).unwrap() as u8, class);
        }
        assert_eq!(
            MotorRegister::try_from(9),
            Err(ProtocolError::UnknownRegister(9))
        );
    }
}
