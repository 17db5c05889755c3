// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

//! Two-wire slave protocol: register buffers, their registry and the transaction engine.
//!
//! A transaction starts with a register byte whose high nibble (the class) selects a
//! [`RegisterBuffer`] and whose low nibble (the item) is left to the device. Writes are
//! collected in the buffer and handed to the device once, at the stop condition; reads
//! ask the device for its answer once, when the master turns the bus around.

pub mod engine;
pub mod register;
pub mod registry;

pub use engine::{BusEvent, BusReply, BusState, TwiSlave, PAD_BYTE};
pub use register::{class_of, item_of, register_byte, RegisterBuffer, RegisterDevice, MAX_PAYLOAD};
pub use registry::BufferRegistry;
