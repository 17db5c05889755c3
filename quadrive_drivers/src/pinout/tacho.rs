// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::PinDef;
use super::{PinMode, Port};

use quadrive_algo::MOTORS_NUMBER;

/// Hall sensor outputs, one per motor in bus item order. Pin n sits on EXTI line n.
pub const TACHO: [PinDef; MOTORS_NUMBER] = [
    PinDef::new(Port::C, 0, PinMode::Input),
    PinDef::new(Port::C, 1, PinMode::Input),
    PinDef::new(Port::C, 2, PinMode::Input),
    PinDef::new(Port::C, 3, PinMode::Input),
];
