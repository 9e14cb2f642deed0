// Licensed under the Apache-2.0 license

//! Reassembly of slave-driven bytes.

use crate::i2c::bus_driver::BusDriver;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Samples the eight bit windows of a slave-driven byte.
///
/// Each window is sampled exactly once, at the middle of SCL high, and the
/// bits are shifted in MSB first. A released line counts as 1.
#[derive(Copy, Clone, Debug, Default)]
pub struct SlaveByteCapture {
    shift: u8,
    bits: u8,
}

impl SlaveByteCapture {
    #[must_use]
    pub const fn new() -> Self {
        Self { shift: 0, bits: 0 }
    }

    /// Shift one sampled bit in below the previous ones.
    pub fn push(&mut self, bit: bool) {
        self.shift = (self.shift << 1) | u8::from(bit);
        self.bits = self.bits.saturating_add(1);
    }

    /// Byte assembled so far.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.shift
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.bits >= 8
    }

    /// Run eight read windows on `driver` and return the byte.
    ///
    /// # Errors
    ///
    /// Propagates pin errors.
    pub fn capture<SCL, SDA, D, E>(driver: &mut BusDriver<SCL, SDA, D>) -> Result<u8, E>
    where
        SCL: OutputPin<Error = E>,
        SDA: OutputPin<Error = E> + InputPin<Error = E>,
        D: DelayNs,
    {
        let mut capture = Self::new();
        while !capture.is_complete() {
            capture.push(driver.read_bit_window()?);
        }
        Ok(capture.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::bus_driver::tests::{driver, Event, Recorder};

    #[test]
    fn test_capture_msb_first() {
        // 0x7E = 0111_1110
        let rec = Recorder::with_input(&[false, true, true, true, true, true, true, false]);
        let mut drv = driver(&rec);
        assert_eq!(SlaveByteCapture::capture(&mut drv).unwrap(), 0x7E);

        let samples = rec
            .take()
            .into_iter()
            .filter(|e| matches!(e, Event::Sample(_)))
            .count();
        assert_eq!(samples, 8);
    }

    #[test]
    fn test_released_line_reads_as_ones() {
        let rec = Recorder::default();
        let mut drv = driver(&rec);
        assert_eq!(SlaveByteCapture::capture(&mut drv).unwrap(), 0xFF);
    }

    #[test]
    fn test_push_tracks_completion() {
        let mut capture = SlaveByteCapture::new();
        for bit in [true, false, true] {
            capture.push(bit);
        }
        assert_eq!(capture.value(), 0b101);
        assert!(!capture.is_complete());
    }
}
