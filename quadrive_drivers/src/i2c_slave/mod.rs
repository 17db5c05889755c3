// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

//! I2C1 in slave mode with byte level acknowledge.
//!
//! The peripheral runs with `SBC` and `RELOAD` set and a one byte count, so every byte
//! stretches the clock until the protocol engine has decided how to answer it. This
//! driver only turns status flags into [`BusEvent`]s and applies the returned
//! [`BusReply`]; all protocol decisions live in the engine.
use hal::{
    gpio::{OutputType, Pull},
    pac::{self, I2C1},
};

use quadrive_algo::{bus::PAD_BYTE, config::SlaveConfig, BusEvent, BusReply};

use crate::pinout;

/// 100 kHz standard mode timing at 170 MHz kernel clock.
const TIMING: u32 = 0x30A0_A7FB;

pub struct I2cSlave {
    regs: I2C1,
    addressed: bool,
}

impl I2cSlave {
    pub fn new(regs: I2C1, cfg: SlaveConfig) -> Self {
        let rcc = unsafe { &(*pac::RCC::ptr()) };
        rcc.apb1enr1.modify(|_, w| w.i2c1en().set_bit());
        rcc.apb1rstr1.modify(|_, w| w.i2c1rst().set_bit());
        rcc.apb1rstr1.modify(|_, w| w.i2c1rst().clear_bit());
        cortex_m::asm::dsb();

        for line in [&pinout::i2c::SCL, &pinout::i2c::SDA] {
            let mut pin = line.init();
            pin.output_type(OutputType::OpenDrain);
            pin.pull(Pull::Up);
        }

        regs.cr1.modify(|_, w| w.pe().clear_bit());
        regs.timingr.write(|w| unsafe { w.bits(TIMING) });
        regs.oar1.write(|w| {
            unsafe { w.oa1().bits(u16::from(cfg.address) << 1) };
            w.oa1en().set_bit();
            w
        });
        regs.cr1.write(|w| {
            // Byte-level acking
            w.sbc().set_bit();
            w.gcen().bit(cfg.general_call);
            w.addrie().set_bit();
            w.rxie().set_bit();
            w.txie().set_bit();
            w.tcie().set_bit();
            w.stopie().set_bit();
            w.nackie().set_bit();
            w.errie().set_bit();
            w.pe().set_bit();
            w
        });

        defmt::info!(
            "I2C: slave at {=u8:#x}, general call {}",
            cfg.address,
            cfg.general_call
        );

        Self {
            regs,
            addressed: false,
        }
    }

    /// Serves every pending flag once, feeding events to `handle`.
    ///
    /// Call it from both the event and the error interrupt. `LastByteAcked` and
    /// `DataAfterNack` are never produced: the peripheral reports a NACK on the last byte
    /// and receives nothing after the slave stops acknowledging.
    pub fn service(&mut self, mut handle: impl FnMut(BusEvent) -> BusReply) {
        let isr = self.regs.isr.read();

        if isr.berr().bit_is_set() || isr.arlo().bit_is_set() || isr.ovr().bit_is_set() {
            defmt::warn!("I2C: bus error, ISR {=u32:#x}", isr.bits());
            self.regs.icr.write(|w| {
                w.berrcf().set_bit();
                w.arlocf().set_bit();
                w.ovrcf().set_bit();
                w
            });
            self.addressed = false;
            if handle(BusEvent::BusError) == BusReply::Release {
                self.release();
            }
            return;
        }

        if isr.addr().bit_is_set() {
            // A second address match without a stop is a repeated start
            if self.addressed {
                handle(BusEvent::StopOrRestart);
            }
            self.addressed = true;

            let reading = isr.dir().bit_is_set();
            let event = if reading {
                BusEvent::AddressRead
            } else {
                BusEvent::AddressWrite {
                    general_call: isr.addcode().bits() == 0,
                }
            };
            let reply = handle(event);
            if reading {
                // Drop whatever is left from the previous read
                self.regs.isr.write(|w| w.txe().set_bit());
                self.send(reply);
            }
            self.rearm(reply == BusReply::Nack);
            self.regs.icr.write(|w| w.addrcf().set_bit());
            return;
        }

        if isr.nackf().bit_is_set() {
            self.regs.icr.write(|w| w.nackcf().set_bit());
            // Lines are already free after a NACK, the engine only resyncs
            handle(BusEvent::ReadNacked);
        }

        if isr.rxne().bit_is_set() {
            let byte = self.regs.rxdr.read().rxdata().bits();
            let reply = handle(BusEvent::DataReceived(byte));
            self.rearm(reply == BusReply::Nack);
        } else if isr.tcr().bit_is_set() {
            self.rearm(false);
        }

        if isr.txis().bit_is_set() && self.addressed {
            let reply = handle(BusEvent::DataRequested);
            self.send(reply);
        }

        if isr.stopf().bit_is_set() {
            self.regs.icr.write(|w| w.stopcf().set_bit());
            self.regs.isr.write(|w| w.txe().set_bit());
            self.addressed = false;
            handle(BusEvent::StopOrRestart);
        }
    }

    /// Loads the byte to transmit; anything but `Send` clocks out the pad byte.
    fn send(&mut self, reply: BusReply) {
        let byte = match reply {
            BusReply::Send(byte) => byte,
            _ => PAD_BYTE,
        };
        self.regs.txdr.write(|w| unsafe { w.txdata().bits(byte) });
    }

    /// Allows one more byte and sets the acknowledge for the byte just received.
    fn rearm(&mut self, nack: bool) {
        self.regs.cr2.modify(|_, w| {
            w.nack().bit(nack);
            unsafe { w.nbytes().bits(1) };
            w.reload().set_bit();
            w
        });
    }

    /// Software reset: releases SCL and SDA and drops the current transfer.
    fn release(&mut self) {
        self.regs.cr1.modify(|_, w| w.pe().clear_bit());
        // PE must stay low for at least three APB clocks
        cortex_m::asm::delay(8);
        self.regs.cr1.modify(|_, w| w.pe().set_bit());
        self.addressed = false;
    }
}
