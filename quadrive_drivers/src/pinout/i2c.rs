// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::PinDef;
use super::{PinMode, Port};

/// I2C1 clock line
pub const SCL: PinDef = PinDef {
    port: Port::A,
    pin: 15,
    mode: PinMode::Alt(4),
};

/// I2C1 data line
pub const SDA: PinDef = PinDef {
    port: Port::B,
    pin: 7,
    mode: PinMode::Alt(4),
};
