// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

//! Firmware wide constants: time base, bus address and calibration tuning.

/// Rate of the monotonic timer used to timestamp tachometer edges (ticks per second).
pub const TICK_HZ: u32 = 10_000;

/// Converts a duration in milliseconds to monotonic ticks.
pub const fn ms_to_ticks(ms: u32) -> u32 {
    ms * (TICK_HZ / 1000)
}

/// Two-wire slave setup, applied once at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveConfig {
    /// 7-bit own address.
    pub address: u8,
    /// Answer to the general call address (0x00) as well.
    pub general_call: bool,
}

pub const SLAVE: SlaveConfig = SlaveConfig {
    address: 0x10,
    general_call: true,
};

/// Control loop period when no drive mode is active (ms).
pub const CONTROL_IDLE_PERIOD_MS: u32 = 250;

// Calibration settle delays (ms)
pub const WAIT_RAMP_UP_STATIC_MIN_PWM_MS: u32 = 50;
pub const WAIT_RAMP_UP_MIN_PERIOD_MS: u32 = 125;
pub const WAIT_PWM_SPEED_STABILIZE_MS: u32 = 200;

// Calibration PWM steps
pub const DELTA_PWM_STATIC_MIN_RAMP_UP: u8 = 15;
pub const DELTA_PWM_MIN_PERIOD_RAMP_UP: u8 = 63;
pub const DELTA_PWM_DYNAMIC_MIN_RAMP_DOWN: u8 = 10;

/// A motor with no tachometer edge for this long is considered stopped (ms).
pub const TACHO_QUIET_THRESHOLD_MS: u32 = 250;
