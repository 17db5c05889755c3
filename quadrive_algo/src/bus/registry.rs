// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use heapless::Vec;

use super::RegisterBuffer;
use crate::error::RegistryError;

/// Ordered set of register buffers, built once at startup.
///
/// Lookup is a linear scan and the first buffer whose range contains the class wins.
/// Ranges are expected not to overlap; this is not checked.
pub struct BufferRegistry<'a, C, const N: usize> {
    buffers: Vec<RegisterBuffer<'a, C>, N>,
}

impl<'a, C, const N: usize> BufferRegistry<'a, C, N> {
    pub const fn new() -> Self {
        Self {
            buffers: Vec::new(),
        }
    }

    /// Appends a buffer.
    pub fn register(&mut self, buffer: RegisterBuffer<'a, C>) -> Result<(), RegistryError> {
        self.buffers.push(buffer).map_err(|_| RegistryError::Full)
    }

    /// Index of the first buffer answering to `class`.
    pub fn find(&self, class: u8) -> Option<usize> {
        self.buffers.iter().position(|buffer| buffer.contains(class))
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut RegisterBuffer<'a, C>> {
        self.buffers.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl<'a, C, const N: usize> Default for BufferRegistry<'a, C, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::RegisterDevice;

    struct Null;

    impl RegisterDevice<()> for Null {
        fn value_len(&self) -> usize {
            1
        }
        fn on_write(&mut self, _payload: &[u8], _ctx: &mut ()) {}
        fn on_read(&mut self, _payload: &mut [u8], _ctx: &mut ()) -> usize {
            0
        }
    }

    #[test]
    fn first_match_wins() {
        let (mut a, mut b) = (Null, Null);
        let mut registry: BufferRegistry<(), 4> = BufferRegistry::new();
        registry.register(RegisterBuffer::<()>::new(1, 4, &mut a)).unwrap();
        registry.register(RegisterBuffer::<()>::new(3, 8, &mut b)).unwrap();

        assert_eq!(registry.find(0), None);
        assert_eq!(registry.find(1), Some(0));
        assert_eq!(registry.find(3), Some(0));
        assert_eq!(registry.find(5), Some(1));
        assert_eq!(registry.find(9), None);
    }

    #[test]
    fn register_fails_when_full() {
        let (mut a, mut b) = (Null, Null);
        let mut registry: BufferRegistry<(), 1> = BufferRegistry::new();
        assert!(registry.is_empty());
        registry.register(RegisterBuffer::<()>::new(1, 1, &mut a)).unwrap();
        assert_eq!(
            registry.register(RegisterBuffer::<()>::new(2, 2, &mut b)),
            Err(RegistryError::Full)
        );
        assert_eq!(registry.len(), 1);
    }
}
