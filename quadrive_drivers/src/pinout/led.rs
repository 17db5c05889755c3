// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::PinDef;
use super::{PinMode, Port};

pub const GRN: PinDef = PinDef {
    port: Port::B,
    pin: 14,
    mode: PinMode::Output,
};

pub const BLU: PinDef = PinDef {
    port: Port::B,
    pin: 13,
    mode: PinMode::Output,
};
