// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

//! Hardware independent part of the chassis firmware.
//!
//! The crate holds the two-wire slave protocol engine with its register dispatch,
//! the motor register map, the calibration state machine and the control loop policy.
//! Everything that touches the MCU goes through [`motors::MotorsDriver`] and plain
//! timestamps, so the whole crate runs and is tested on the host.
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod bus;
pub mod chassis;
pub mod config;
pub mod drive;
pub mod error;
pub mod motor_registers;
pub mod motors;

pub use bus::{BufferRegistry, BusEvent, BusReply, BusState, RegisterBuffer, RegisterDevice, TwiSlave};
pub use chassis::Chassis;
pub use drive::{DriveMode, DriveStep};
pub use error::{ProtocolError, RegistryError};
pub use motor_registers::{MotorRegister, MotorRegisters};
pub use motors::{MotorState, MotorsDriver, ALL_MOTORS, MOTORS_NUMBER};
