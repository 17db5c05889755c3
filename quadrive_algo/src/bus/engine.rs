// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

//! Slave side transaction engine.
//!
//! The engine is fed one [`BusEvent`] per peripheral interrupt and answers with the
//! [`BusReply`] the peripheral has to apply before it releases the clock. Every
//! transition is a handful of assignments plus at most one device call, there is no
//! waiting anywhere.
//!
//! Write: `S addr+W | reg | value.. | P`, the device sees the bytes at `P`.
//! Read:  `S addr+W | reg | Sr addr+R | value.. | P`, the device prepares the answer at
//! `addr+R` and the bytes are then streamed out of the buffer.

use super::{class_of, BufferRegistry};

/// Byte clocked out when there is nothing left to answer.
pub const PAD_BYTE: u8 = 0xFF;

/// Protocol state of the slave.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusState {
    WaitAddress,
    WaitCommand,
    WaitRestartOrWrite,
    WaitWrite,
    WaitRead,
    WaitStop,
}

/// Conditions reported by the bus peripheral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusEvent {
    /// Own address (or the general call address) with the write bit.
    AddressWrite { general_call: bool },
    /// A byte was received in slave receiver mode.
    DataReceived(u8),
    /// Own address with the read bit.
    AddressRead,
    /// The master acknowledged the last byte and clocks the next one.
    DataRequested,
    /// The master did not acknowledge a transmitted byte.
    ReadNacked,
    /// The master acknowledged a byte that was announced as the last one.
    LastByteAcked,
    /// A byte arrived after the slave had stopped acknowledging.
    DataAfterNack,
    /// Stop or repeated start.
    StopOrRestart,
    /// Misplaced start/stop, arbitration loss or overrun.
    BusError,
}

/// What the peripheral has to do with the event it just reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusReply {
    /// Acknowledge and keep listening.
    Ack,
    /// Do not acknowledge.
    Nack,
    /// Load this byte for transmission.
    Send(u8),
    /// Force a stop condition and let go of the lines.
    Release,
}

/// Two-wire slave protocol state machine over a [`BufferRegistry`].
pub struct TwiSlave<'a, C, const N: usize> {
    registry: BufferRegistry<'a, C, N>,
    state: BusState,
    active: Option<usize>, // buffer engaged by the current transaction
    answer_len: usize,     // bytes of the read answer, register byte included
}

impl<'a, C, const N: usize> TwiSlave<'a, C, N> {
    pub fn new(registry: BufferRegistry<'a, C, N>) -> Self {
        Self {
            registry,
            state: BusState::WaitAddress,
            active: None,
            answer_len: 0,
        }
    }

    pub fn state(&self) -> BusState {
        self.state
    }

    /// Index of the buffer engaged by the current transaction.
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Advances the protocol by one event.
    ///
    /// # Arguments
    /// * `event` - condition reported by the peripheral
    /// * `ctx` - context forwarded to the device when a transaction completes
    pub fn handle(&mut self, event: BusEvent, ctx: &mut C) -> BusReply {
        match event {
            BusEvent::AddressWrite { .. } => self.on_address_write(),
            BusEvent::DataReceived(byte) => self.on_data_received(byte),
            BusEvent::StopOrRestart => self.on_stop(ctx),
            BusEvent::AddressRead => self.on_address_read(ctx),
            BusEvent::DataRequested => self.on_data_requested(),
            BusEvent::ReadNacked
            | BusEvent::LastByteAcked
            | BusEvent::DataAfterNack
            | BusEvent::BusError => {
                trace!("TWI: release after {} in {}", event, self.state);
                self.resync();
                BusReply::Release
            }
        }
    }

    fn on_address_write(&mut self) -> BusReply {
        if self.state == BusState::WaitAddress {
            self.active = None;
            self.state = BusState::WaitCommand;
        } else {
            self.resync();
        }
        BusReply::Ack
    }

    fn on_data_received(&mut self, byte: u8) -> BusReply {
        match self.state {
            BusState::WaitCommand => match self.registry.find(class_of(byte)) {
                Some(index) => {
                    if let Some(buffer) = self.registry.get_mut(index) {
                        buffer.begin(byte);
                    }
                    self.active = Some(index);
                    self.state = BusState::WaitRestartOrWrite;
                    BusReply::Ack
                }
                None => {
                    debug!("TWI: no device for register {=u8:#x}", byte);
                    BusReply::Nack
                }
            },
            BusState::WaitRestartOrWrite | BusState::WaitWrite => {
                let Some(buffer) = self.active.and_then(|index| self.registry.get_mut(index)) else {
                    self.resync();
                    return BusReply::Ack;
                };
                if !buffer.push(byte) {
                    self.state = BusState::WaitStop;
                    return BusReply::Nack;
                }
                // The completing byte is still accepted, only further ones are refused
                self.state = if buffer.is_complete() {
                    BusState::WaitStop
                } else {
                    BusState::WaitWrite
                };
                BusReply::Ack
            }
            BusState::WaitStop => BusReply::Nack,
            _ => {
                self.resync();
                BusReply::Ack
            }
        }
    }

    fn on_stop(&mut self, ctx: &mut C) -> BusReply {
        match self.state {
            BusState::WaitWrite | BusState::WaitStop => {
                if let Some(buffer) = self.active.and_then(|index| self.registry.get_mut(index)) {
                    buffer.complete_write(ctx);
                }
                self.resync();
            }
            // Register byte only: keep the buffer for the read that follows
            BusState::WaitRestartOrWrite => self.state = BusState::WaitAddress,
            _ => self.resync(),
        }
        BusReply::Ack
    }

    fn on_address_read(&mut self, ctx: &mut C) -> BusReply {
        if self.state != BusState::WaitAddress {
            self.resync();
            return BusReply::Send(PAD_BYTE);
        }
        let Some(buffer) = self.active.and_then(|index| self.registry.get_mut(index)) else {
            return BusReply::Send(PAD_BYTE);
        };

        self.answer_len = buffer.prepare_read(ctx);
        let byte = buffer.next_byte(self.answer_len).unwrap_or(PAD_BYTE);
        self.state = if buffer.cursor() >= self.answer_len {
            BusState::WaitStop
        } else {
            BusState::WaitRead
        };
        BusReply::Send(byte)
    }

    fn on_data_requested(&mut self) -> BusReply {
        let buffer = match self.state {
            BusState::WaitRead => self.active.and_then(|index| self.registry.get_mut(index)),
            _ => None,
        };
        let Some(buffer) = buffer else {
            self.resync();
            return BusReply::Send(PAD_BYTE);
        };

        let byte = buffer.next_byte(self.answer_len).unwrap_or(PAD_BYTE);
        if buffer.cursor() >= self.answer_len {
            self.state = BusState::WaitStop;
        }
        BusReply::Send(byte)
    }

    /// Drops the current transaction and waits for the next address.
    fn resync(&mut self) {
        self.state = BusState::WaitAddress;
        self.active = None;
        self.answer_len = 0;
    }
}
