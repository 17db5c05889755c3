// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

/// Rejections raised while decoding a register access.
///
/// None of these ever reach the bus: the transaction is simply dropped and the
/// reason is logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// The class nibble does not name a motor register.
    UnknownRegister(u8),
    /// The item nibble is not a motor index (or "all" where it is not accepted).
    ItemOutOfRange(u8),
    /// The register can only be read.
    ReadOnly(u8),
    /// A STATE write carried something other than IDLE/BACKWARD/FORWARD/LOCK.
    UnknownState(u8),
    /// A SET_ACTION write selected a drive mode that is not implemented.
    UnknownDriveMode(u8),
    /// The write stopped before the full value was received.
    ShortWrite { expected: usize, received: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// No room left for another buffer.
    Full,
}
