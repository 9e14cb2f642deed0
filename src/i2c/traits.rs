// Licensed under the Apache-2.0 license

//! # Device-side seams of the bench
//!
//! The bench never looks inside the device it verifies. It sees two things:
//!
//! ```text
//! DeviceUnderTest (simulation side)
//!     └── clocked by the simulation kernel, reads SCL/SDA, drives SDA
//! DeviceProbe (checker side)
//!     └── decoded outputs, recorded valid strobes, source-byte side channel
//! ```
//!
//! A behavioral model, a co-simulated netlist or a hardware fixture can all
//! sit behind these traits without the protocol engine changing.

use crate::i2c::common::Direction;
use heapless::Vec;

/// Observation points exposed by the device under test.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceOutputs {
    /// Decoded 7-bit slave address
    pub address: u8,
    /// Decoded R/W bit
    pub direction: Direction,
    /// Decoded register address
    pub register: u8,
    /// Decoded data byte
    pub data: u8,
    /// Data-valid strobe level
    pub valid: bool,
    /// Channel-connected / address-match indicator
    pub selected: bool,
}

/// One rising edge of the data-valid strobe, with the outputs seen on that cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Strobe {
    pub register: u8,
    pub data: u8,
    pub direction: Direction,
}

/// Strobe entries kept per drain; later strobes are only counted.
pub const STROBE_LOG_DEPTH: usize = 4;

/// Strobes seen since the last drain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrobeLog {
    entries: Vec<Strobe, STROBE_LOG_DEPTH>,
    total: u32,
}

impl StrobeLog {
    pub fn record(&mut self, strobe: Strobe) {
        self.total = self.total.saturating_add(1);
        // Overflowing entries are dropped; `total` still counts them.
        let _ = self.entries.push(strobe);
    }

    /// Number of strobes, including the ones not kept.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn entries(&self) -> &[Strobe] {
        &self.entries
    }

    #[must_use]
    pub fn first(&self) -> Option<&Strobe> {
        self.entries.first()
    }
}

/// Device model clocked by the simulation kernel.
///
/// `clock` is called once per system clock cycle with the resolved bus
/// levels (`true` = high). It returns the level the device drives onto SDA
/// for the following cycle; `true` means released.
pub trait DeviceUnderTest {
    /// Put every output and internal state back to its reset value.
    fn reset(&mut self);

    /// Advance one system clock cycle.
    fn clock(&mut self, scl: bool, sda: bool) -> bool;

    /// Current decoded outputs.
    fn outputs(&self) -> DeviceOutputs;

    /// Side channel: the byte to source on the next read byte.
    fn load_source_byte(&mut self, byte: u8);
}

/// Checker-side view of the device under test.
pub trait DeviceProbe {
    /// Sample the decoded outputs now.
    fn outputs(&mut self) -> DeviceOutputs;

    /// Drain the strobes recorded since the previous call.
    fn take_strobes(&mut self) -> StrobeLog;

    /// Side channel: the byte to source on the next read byte.
    fn load_source_byte(&mut self, byte: u8);
}

impl<P: DeviceProbe + ?Sized> DeviceProbe for &mut P {
    fn outputs(&mut self) -> DeviceOutputs {
        (**self).outputs()
    }

    fn take_strobes(&mut self) -> StrobeLog {
        (**self).take_strobes()
    }

    fn load_source_byte(&mut self, byte: u8) {
        (**self).load_source_byte(byte);
    }
}
