#![allow(dead_code)]

use quadrive_algo::bus::{BusEvent, BusReply, TwiSlave};
use quadrive_algo::motors::{MotorState, MotorsDriver, MOTORS_NUMBER};
use quadrive_algo::Chassis;

/// Motor bank double keeping duty and direction in memory.
pub struct Bank {
    pub pwm: [u8; MOTORS_NUMBER],
    pub state: [MotorState; MOTORS_NUMBER],
}

impl Bank {
    pub fn new() -> Self {
        Self {
            pwm: [0; MOTORS_NUMBER],
            state: [MotorState::Idle; MOTORS_NUMBER],
        }
    }
}

impl MotorsDriver for Bank {
    fn set_pwm(&mut self, motor: usize, value: u8) {
        self.pwm[motor] = value;
    }

    fn pwm(&self, motor: usize) -> u8 {
        self.pwm[motor]
    }

    fn set_state(&mut self, motor: usize, state: MotorState) {
        self.state[motor] = state;
    }

    fn state(&self, motor: usize) -> MotorState {
        self.state[motor]
    }
}

pub type Engine<'a> = TwiSlave<'a, Chassis<Bank>, 2>;

/// Plays the bus master side of a register write.
pub fn write(engine: &mut Engine, chassis: &mut Chassis<Bank>, reg: u8, value: &[u8]) -> Vec<BusReply> {
    let mut replies = vec![
        engine.handle(BusEvent::AddressWrite { general_call: false }, chassis),
        engine.handle(BusEvent::DataReceived(reg), chassis),
    ];
    for byte in value {
        replies.push(engine.handle(BusEvent::DataReceived(*byte), chassis));
    }
    replies.push(engine.handle(BusEvent::StopOrRestart, chassis));
    replies
}

/// Plays the bus master side of a register read with a repeated start.
pub fn read(engine: &mut Engine, chassis: &mut Chassis<Bank>, reg: u8, len: usize) -> Vec<u8> {
    engine.handle(BusEvent::AddressWrite { general_call: false }, chassis);
    engine.handle(BusEvent::DataReceived(reg), chassis);
    engine.handle(BusEvent::StopOrRestart, chassis);

    let mut bytes = Vec::new();
    let mut reply = engine.handle(BusEvent::AddressRead, chassis);
    for i in 0..len {
        match reply {
            BusReply::Send(byte) => bytes.push(byte),
            other => panic!("expected a byte, got {:?}", other),
        }
        if i + 1 < len {
            reply = engine.handle(BusEvent::DataRequested, chassis);
        }
    }
    engine.handle(BusEvent::ReadNacked, chassis);
    engine.handle(BusEvent::StopOrRestart, chassis);
    bytes
}
