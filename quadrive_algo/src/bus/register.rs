// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

/// Capacity of a buffer payload (register byte included).
pub const MAX_PAYLOAD: usize = 8;

/// Builds a register byte from class and item nibbles.
#[inline(always)]
pub const fn register_byte(class: u8, item: u8) -> u8 {
    (class << 4) | (item & 0x0F)
}

/// High nibble of a register byte.
#[inline(always)]
pub const fn class_of(reg: u8) -> u8 {
    reg >> 4
}

/// Low nibble of a register byte.
#[inline(always)]
pub const fn item_of(reg: u8) -> u8 {
    reg & 0x0F
}

/// A device reachable over the bus.
///
/// `C` is the context handed down by whoever drives the engine; devices use it to reach
/// the state they expose.
pub trait RegisterDevice<C> {
    /// Widest value (bytes, register byte excluded) the device exchanges.
    fn value_len(&self) -> usize;

    /// Applies a completed write.
    ///
    /// `payload` holds the bytes actually received, register byte first. It may be
    /// shorter than `1 + value_len()` when the master stopped early.
    fn on_write(&mut self, payload: &[u8], ctx: &mut C);

    /// Prepares the answer of a read.
    ///
    /// `payload[0]` is the register byte; the value goes to `payload[1..]`. Returns the
    /// number of value bytes written.
    fn on_read(&mut self, payload: &mut [u8], ctx: &mut C) -> usize;
}

/// One addressable unit on the bus: a class range, its scratch payload and the device
/// behind it.
pub struct RegisterBuffer<'a, C> {
    low: u8,
    high: u8,
    payload: [u8; MAX_PAYLOAD],
    payload_len: usize, // bytes of a complete transaction
    cursor: usize,      // bytes transferred in the current transaction
    device: &'a mut (dyn RegisterDevice<C> + Send),
}

impl<'a, C> RegisterBuffer<'a, C> {
    /// Creates a buffer answering to classes `low..=high`.
    ///
    /// # Arguments
    /// * `low`, `high` - inclusive class range
    /// * `device` - handler of completed transactions, `Send` so the engine can live in an interrupt
    pub fn new(low: u8, high: u8, device: &'a mut (dyn RegisterDevice<C> + Send)) -> Self {
        let payload_len = (1 + device.value_len()).min(MAX_PAYLOAD);
        Self {
            low,
            high,
            payload: [0; MAX_PAYLOAD],
            payload_len,
            cursor: 0,
            device,
        }
    }

    pub fn contains(&self, class: u8) -> bool {
        (self.low..=self.high).contains(&class)
    }

    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Received or prepared bytes of the current transaction.
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.cursor]
    }

    /// Starts a transaction with its register byte.
    pub(crate) fn begin(&mut self, reg: u8) {
        self.payload = [0; MAX_PAYLOAD];
        self.payload[0] = reg;
        self.cursor = 1;
    }

    /// Stores a received byte, returns false when the payload is already complete.
    pub(crate) fn push(&mut self, byte: u8) -> bool {
        if self.is_complete() {
            return false;
        }
        self.payload[self.cursor] = byte;
        self.cursor += 1;
        true
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.cursor >= self.payload_len
    }

    /// Hands the received bytes to the device.
    pub(crate) fn complete_write(&mut self, ctx: &mut C) {
        self.device.on_write(&self.payload[..self.cursor], ctx);
    }

    /// Lets the device fill the answer and rewinds the cursor to the first value byte.
    /// Returns the answer length, register byte included.
    pub(crate) fn prepare_read(&mut self, ctx: &mut C) -> usize {
        let produced = self.device.on_read(&mut self.payload[..self.payload_len], ctx);
        self.cursor = 1;
        (1 + produced).min(self.payload_len)
    }

    /// Next byte of a prepared answer.
    pub(crate) fn next_byte(&mut self, answer_len: usize) -> Option<u8> {
        if self.cursor >= answer_len {
            return None;
        }
        let byte = self.payload[self.cursor];
        self.cursor += 1;
        Some(byte)
    }
}
