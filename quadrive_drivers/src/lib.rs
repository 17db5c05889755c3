// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

#![no_std]

pub mod i2c_slave;
pub mod motors;
pub mod pinout;
pub mod pwm;
pub mod tacho;
