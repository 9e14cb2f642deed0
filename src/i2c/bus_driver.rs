// Licensed under the Apache-2.0 license

//! Master-side bit-level bus driver.
//!
//! The driver owns the SCL and SDA lines and a delay source. It only encodes
//! timing: it never decides whether the device behaved, that is the
//! checker's job. Lines are open-drain, so "high" means released.
//!
//! Every bit cell has the same shape, whichever side supplies the bit:
//!
//! ```text
//!        |<- q ->|<----- h ----->|<- q ->|
//! SDA  ==X=======================================   (set while SCL is low)
//! SCL  __________/^^^^^^^^^^^^^^^\_______
//!                        ^ sample (device-driven bits)
//! ```

use crate::i2c::bitfield::BitField;
use crate::i2c::common::Ack;
use crate::i2c::timing::BusTiming;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Order in which a field's bits go on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

pub struct BusDriver<SCL, SDA, D> {
    scl: SCL,
    sda: SDA,
    delay: D,
    timing: BusTiming,
}

impl<SCL, SDA, D, E> BusDriver<SCL, SDA, D>
where
    SCL: OutputPin<Error = E>,
    SDA: OutputPin<Error = E> + InputPin<Error = E>,
    D: DelayNs,
{
    pub fn new(scl: SCL, sda: SDA, delay: D, timing: BusTiming) -> Self {
        Self {
            scl,
            sda,
            delay,
            timing,
        }
    }

    #[must_use]
    pub fn timing(&self) -> &BusTiming {
        &self.timing
    }

    /// Give back the lines and the delay source.
    pub fn release(self) -> (SCL, SDA, D) {
        (self.scl, self.sda, self.delay)
    }

    fn wait_quarter(&mut self) {
        self.delay.delay_ns(self.timing.quarter_period().ticks());
    }

    fn wait_half(&mut self) {
        self.delay.delay_ns(self.timing.half_period().ticks());
    }

    fn set_sda(&mut self, high: bool) -> Result<(), E> {
        if high {
            self.sda.set_high()
        } else {
            self.sda.set_low()
        }
    }

    /// Release both lines and let the bus settle for a quarter period.
    ///
    /// # Errors
    ///
    /// Propagates pin errors.
    pub fn idle(&mut self) -> Result<(), E> {
        self.sda.set_high()?;
        self.scl.set_high()?;
        self.wait_quarter();
        Ok(())
    }

    /// START (or repeated START): SDA falls while SCL is high.
    ///
    /// SDA is released and SCL raised first, so the same sequence works
    /// from an idle bus and from the low phase of a bit cell.
    ///
    /// # Errors
    ///
    /// Propagates pin errors.
    pub fn start(&mut self) -> Result<(), E> {
        self.sda.set_high()?;
        self.wait_quarter();
        self.scl.set_high()?;
        self.wait_quarter();
        self.sda.set_low()?;
        self.wait_quarter();
        self.scl.set_low()?;
        self.wait_quarter();
        Ok(())
    }

    /// Transmit one bit: setup, clock high for the sampling window, clock low.
    ///
    /// # Errors
    ///
    /// Propagates pin errors.
    pub fn send_bit(&mut self, bit: bool) -> Result<(), E> {
        self.set_sda(bit)?;
        self.wait_quarter();
        self.scl.set_high()?;
        self.wait_half();
        self.scl.set_low()?;
        self.wait_quarter();
        Ok(())
    }

    /// Transmit every bit of `field` in `order`.
    ///
    /// # Errors
    ///
    /// Propagates pin errors.
    pub fn send_bits<const W: u32>(
        &mut self,
        field: BitField<W>,
        order: BitOrder,
    ) -> Result<(), E> {
        match order {
            BitOrder::MsbFirst => {
                for bit in field.msb_first() {
                    self.send_bit(bit)?;
                }
            }
            BitOrder::LsbFirst => {
                for index in 0..W {
                    self.send_bit(field.bit(index))?;
                }
            }
        }
        Ok(())
    }

    /// Transmit a byte MSB first, as I2C requires.
    ///
    /// # Errors
    ///
    /// Propagates pin errors.
    pub fn send_byte(&mut self, byte: u8) -> Result<(), E> {
        self.send_bits(BitField::<8>::truncate(byte), BitOrder::MsbFirst)
    }

    /// Clock one device-driven bit and sample SDA mid-way through SCL high.
    ///
    /// SDA is released before the clock rises, so the master never drives
    /// the line inside a device-owned window. A released line reads as 1.
    ///
    /// # Errors
    ///
    /// Propagates pin errors.
    pub fn read_bit_window(&mut self) -> Result<bool, E> {
        self.sda.set_high()?;
        self.wait_quarter();
        self.scl.set_high()?;
        self.wait_quarter();
        let bit = self.sda.is_high()?;
        self.wait_quarter();
        self.scl.set_low()?;
        self.wait_quarter();
        Ok(bit)
    }

    /// Master-driven acknowledge slot: low = ACK, high = NACK.
    ///
    /// # Errors
    ///
    /// Propagates pin errors.
    pub fn drive_ack(&mut self, ack: Ack) -> Result<(), E> {
        self.send_bit(ack.level())
    }

    /// Device-driven acknowledge slot.
    ///
    /// # Errors
    ///
    /// Propagates pin errors.
    pub fn sample_ack(&mut self) -> Result<Ack, E> {
        self.read_bit_window().map(Ack::from_level)
    }

    /// STOP: SDA rises while SCL is high.
    ///
    /// # Errors
    ///
    /// Propagates pin errors.
    pub fn stop(&mut self) -> Result<(), E> {
        self.sda.set_low()?;
        self.wait_quarter();
        self.scl.set_high()?;
        self.wait_quarter();
        self.sda.set_high()?;
        self.wait_quarter();
        Ok(())
    }
}
