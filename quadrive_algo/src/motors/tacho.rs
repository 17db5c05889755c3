// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

//! Tachometer edge capture.
//!
//! Every wheel has a slotted disc; each rising edge is timestamped from the edge
//! interrupt with [`TachoMotor::update`]. The ring keeps the last
//! [`TACHO_BUFFER_LEN`] timestamps, which makes the average period over `w` edges a
//! single subtraction: the sum of consecutive deltas telescopes to
//! `newest - oldest`.
//!
//! The ring is written from interrupt context and read from the control loop, so
//! the owner has to wrap it in a critical section (an RTIC shared resource in the
//! firmware).

use super::MOTORS_NUMBER;

/// Timestamps kept per motor.
pub const TACHO_BUFFER_LEN: usize = 32;
/// Widest averaging window (deltas) the ring can answer.
pub const TACHO_AVG_WINDOW: usize = TACHO_BUFFER_LEN - 1;

/// Direction flag of a packed period (set = backward).
pub const PERIOD_DIRECTION_FLAG: u16 = 0x8000;
/// Magnitude bits of a packed period.
pub const PERIOD_MAGNITUDE_MASK: u16 = 0x7FFF;

/// Packs a period in ticks into the 16-bit wire format, saturating the magnitude.
pub fn pack_period(ticks: u32, backward: bool) -> u16 {
    let magnitude = ticks.min(PERIOD_MAGNITUDE_MASK as u32) as u16;
    if backward {
        magnitude | PERIOD_DIRECTION_FLAG
    } else {
        magnitude
    }
}

/// Strips the direction flag from a packed period.
#[inline(always)]
pub fn period_magnitude(packed: u16) -> u16 {
    packed & PERIOD_MAGNITUDE_MASK
}

/// Edge history of one motor.
#[derive(Clone, Copy)]
pub struct TachoMotor {
    timestamps: [u32; TACHO_BUFFER_LEN],
    current: usize, // slot of the newest timestamp
    counter: u16,   // edges since the last counter reset, wrapping
}

impl TachoMotor {
    pub const fn new() -> Self {
        Self {
            timestamps: [0; TACHO_BUFFER_LEN],
            current: 0,
            counter: 0,
        }
    }

    /// Records an edge. Called from the edge interrupt.
    pub fn update(&mut self, timestamp: u32) {
        self.current = (self.current + 1) % TACHO_BUFFER_LEN;
        self.timestamps[self.current] = timestamp;
        self.counter = self.counter.wrapping_add(1);
    }

    /// Fills the history with `timestamp`, so the average period reads zero until
    /// enough new edges arrive.
    pub fn reset_period(&mut self, timestamp: u32) {
        self.timestamps = [timestamp; TACHO_BUFFER_LEN];
    }

    /// Timestamp of the newest edge.
    pub fn last_event(&self) -> u32 {
        self.timestamps[self.current]
    }

    /// Ticks elapsed since the newest edge.
    pub fn elapsed(&self, now: u32) -> u32 {
        now.wrapping_sub(self.last_event())
    }

    /// Average period (ticks) over the last `window` edge deltas.
    ///
    /// `window` is clamped to `1..=TACHO_AVG_WINDOW`.
    pub fn avg_period(&self, window: usize) -> u32 {
        let window = window.clamp(1, TACHO_AVG_WINDOW);
        let oldest = self.timestamps[(self.current + TACHO_BUFFER_LEN - window) % TACHO_BUFFER_LEN];
        self.last_event().wrapping_sub(oldest) / window as u32
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    pub fn reset_counter(&mut self) {
        self.counter = 0;
    }
}

impl Default for TachoMotor {
    fn default() -> Self {
        Self::new()
    }
}

/// Tachometers of the whole chassis, indexed like the motors.
pub struct TachoMotors {
    motors: [TachoMotor; MOTORS_NUMBER],
}

impl TachoMotors {
    pub const fn new() -> Self {
        Self {
            motors: [TachoMotor::new(); MOTORS_NUMBER],
        }
    }

    /// Records an edge of `motor`; out of range indices are dropped.
    pub fn update(&mut self, motor: usize, timestamp: u32) {
        if let Some(tacho) = self.motors.get_mut(motor) {
            tacho.update(timestamp);
        }
    }

    /// Restarts the period history of every motor; edge counters keep running.
    pub fn reset_periods(&mut self, timestamp: u32) {
        for tacho in self.motors.iter_mut() {
            tacho.reset_period(timestamp);
        }
    }

    pub fn get(&self, motor: usize) -> Option<&TachoMotor> {
        self.motors.get(motor)
    }

    pub fn get_mut(&mut self, motor: usize) -> Option<&mut TachoMotor> {
        self.motors.get_mut(motor)
    }
}

impl Default for TachoMotors {
    fn default() -> Self {
        Self::new()
    }
}
