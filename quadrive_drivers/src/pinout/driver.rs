// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

//! Pins of the dual H-bridge pair driving the four wheels.
use super::PinDef;
use super::{PinMode, Port};

use quadrive_algo::MOTORS_NUMBER;

/// Everything one motor channel needs: a TIM2 output (channel n+1 for motor n) and two direction lines.
pub struct MotorPinout {
    pub pwm: PinDef,
    pub forward: PinDef,
    pub backward: PinDef,
}

/// Standby line shared by both bridges, high enables the outputs
pub const STANDBY: PinDef = PinDef {
    port: Port::A,
    pin: 4,
    mode: PinMode::Output,
};

/// Motor channels in bus item order: left rear, right rear, right front, left front.
pub const MOTORS: [MotorPinout; MOTORS_NUMBER] = [
    MotorPinout {
        pwm: PinDef::new(Port::A, 0, PinMode::Alt(1)),
        forward: PinDef::new(Port::A, 5, PinMode::Output),
        backward: PinDef::new(Port::A, 6, PinMode::Output),
    },
    MotorPinout {
        pwm: PinDef::new(Port::A, 1, PinMode::Alt(1)),
        forward: PinDef::new(Port::A, 7, PinMode::Output),
        backward: PinDef::new(Port::B, 0, PinMode::Output),
    },
    MotorPinout {
        pwm: PinDef::new(Port::B, 10, PinMode::Alt(1)),
        forward: PinDef::new(Port::B, 1, PinMode::Output),
        backward: PinDef::new(Port::B, 2, PinMode::Output),
    },
    MotorPinout {
        pwm: PinDef::new(Port::B, 11, PinMode::Alt(1)),
        forward: PinDef::new(Port::B, 4, PinMode::Output),
        backward: PinDef::new(Port::B, 5, PinMode::Output),
    },
];
