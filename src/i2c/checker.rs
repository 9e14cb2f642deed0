// Licensed under the Apache-2.0 license

//! Cross-checks between bus activity and the device's decoded outputs.
//!
//! The sequencer computes an [`ExpectedSnapshot`] for every framed byte and
//! hands it here together with what the probe observed. The first field
//! that disagrees becomes a [`Mismatch`]; it is logged at error level and
//! ends the scenario.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{Ack, Direction};
use crate::i2c::error::{Field, Mismatch};
use crate::i2c::traits::{DeviceOutputs, StrobeLog};

/// What the device is expected to expose after a given step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExpectedSnapshot {
    pub address: u8,
    pub direction: Direction,
    /// Register address set by the register byte (or kept from a previous write)
    pub base_register: u8,
    /// Data bytes already completed in the current burst
    pub offset: usize,
    /// Expected data byte; `None` before any data byte of the transaction
    pub data: Option<u8>,
    /// Whether the data-valid strobe must have fired exactly once since the previous check
    pub valid: bool,
}

impl ExpectedSnapshot {
    /// Snapshot right after an address byte.
    #[must_use]
    pub const fn address_phase(address: u8, direction: Direction, base_register: u8) -> Self {
        Self {
            address,
            direction,
            base_register,
            offset: 0,
            data: None,
            valid: false,
        }
    }

    /// Same snapshot moved to data byte `offset` of the burst.
    #[must_use]
    pub const fn at_byte(self, offset: usize, data: u8, valid: bool) -> Self {
        Self {
            offset,
            data: Some(data),
            valid,
            ..self
        }
    }

    /// Register address with the running offset; the 8-bit pointer wraps.
    #[must_use]
    pub const fn register(&self) -> u8 {
        self.base_register.wrapping_add((self.offset % 256) as u8)
    }
}

pub struct ExpectationChecker<L: Logger = NoOpLogger> {
    logger: L,
    checks: u32,
}

impl Default for ExpectationChecker<NoOpLogger> {
    fn default() -> Self {
        Self::new(NoOpLogger)
    }
}

impl<L: Logger> ExpectationChecker<L> {
    pub fn new(logger: L) -> Self {
        Self { logger, checks: 0 }
    }

    /// Number of field comparisons performed so far.
    #[must_use]
    pub fn checks(&self) -> u32 {
        self.checks
    }

    pub fn logger_mut(&mut self) -> &mut L {
        &mut self.logger
    }

    fn compare(
        &mut self,
        field: Field,
        expected: u16,
        actual: u16,
        burst_index: usize,
    ) -> Result<(), Mismatch> {
        self.checks = self.checks.saturating_add(1);
        if expected == actual {
            return Ok(());
        }
        let mismatch = Mismatch {
            field,
            expected,
            actual,
            burst_index,
        };
        self.logger.error(format_args!("{mismatch}"));
        Err(mismatch)
    }

    /// Compare what the address byte decodes to: match indicator, address, direction.
    ///
    /// # Errors
    ///
    /// Returns the first field that differs.
    pub fn check_address(
        &mut self,
        expected: &ExpectedSnapshot,
        observed: &DeviceOutputs,
    ) -> Result<(), Mismatch> {
        let index = expected.offset;
        self.compare(Field::Selected, 1, u16::from(observed.selected), index)?;
        self.compare(
            Field::Address,
            u16::from(expected.address),
            u16::from(observed.address),
            index,
        )?;
        self.compare(
            Field::Direction,
            u16::from(expected.direction.bit()),
            u16::from(observed.direction.bit()),
            index,
        )
    }

    /// Compare the level outputs: address decode plus register and data.
    ///
    /// # Errors
    ///
    /// Returns the first field that differs.
    pub fn check_outputs(
        &mut self,
        expected: &ExpectedSnapshot,
        observed: &DeviceOutputs,
    ) -> Result<(), Mismatch> {
        let index = expected.offset;
        self.check_address(expected, observed)?;
        self.compare(
            Field::Register,
            u16::from(expected.register()),
            u16::from(observed.register),
            index,
        )?;
        if let Some(data) = expected.data {
            self.compare(Field::Data, u16::from(data), u16::from(observed.data), index)?;
        }
        Ok(())
    }

    /// Compare the strobes recorded since the previous check.
    ///
    /// A valid byte must produce exactly one strobe carrying its register
    /// and data; any other step must produce none.
    ///
    /// # Errors
    ///
    /// Returns the first field that differs.
    pub fn check_strobes(
        &mut self,
        expected: &ExpectedSnapshot,
        strobes: &StrobeLog,
    ) -> Result<(), Mismatch> {
        let index = expected.offset;
        let count = u16::try_from(strobes.count()).unwrap_or(u16::MAX);
        self.compare(Field::ValidCount, u16::from(expected.valid), count, index)?;
        if let (true, Some(strobe)) = (expected.valid, strobes.first()) {
            self.compare(
                Field::StrobeRegister,
                u16::from(expected.register()),
                u16::from(strobe.register),
                index,
            )?;
            if let Some(data) = expected.data {
                self.compare(Field::StrobeData, u16::from(data), u16::from(strobe.data), index)?;
            }
        }
        Ok(())
    }

    /// The device must acknowledge every byte the master sends.
    ///
    /// # Errors
    ///
    /// Returns an `Ack` mismatch on NACK.
    pub fn check_device_ack(&mut self, ack: Ack, burst_index: usize) -> Result<(), Mismatch> {
        self.compare(
            Field::Ack,
            u16::from(Ack::Ack.level()),
            u16::from(ack.level()),
            burst_index,
        )
    }

    /// A captured read byte must equal the byte programmed into the device.
    ///
    /// # Errors
    ///
    /// Returns a `Captured` mismatch.
    pub fn check_captured(
        &mut self,
        programmed: u8,
        captured: u8,
        burst_index: usize,
    ) -> Result<(), Mismatch> {
        self.compare(
            Field::Captured,
            u16::from(programmed),
            u16::from(captured),
            burst_index,
        )
    }

    /// Outputs after a transaction that must not have touched the device.
    ///
    /// # Errors
    ///
    /// Returns the first field that changed.
    pub fn check_unchanged(
        &mut self,
        before: &DeviceOutputs,
        after: &DeviceOutputs,
        strobes: &StrobeLog,
    ) -> Result<(), Mismatch> {
        self.compare(Field::Address, before.address.into(), after.address.into(), 0)?;
        self.compare(
            Field::Direction,
            before.direction.bit().into(),
            after.direction.bit().into(),
            0,
        )?;
        self.compare(Field::Register, before.register.into(), after.register.into(), 0)?;
        self.compare(Field::Data, before.data.into(), after.data.into(), 0)?;
        self.compare(Field::Selected, before.selected.into(), after.selected.into(), 0)?;
        let count = u16::try_from(strobes.count()).unwrap_or(u16::MAX);
        self.compare(Field::ValidCount, 0, count, 0)
    }

    /// After STOP the device must have dropped its address match.
    ///
    /// # Errors
    ///
    /// Returns a `Selected` mismatch.
    pub fn check_released(
        &mut self,
        observed: &DeviceOutputs,
        burst_index: usize,
    ) -> Result<(), Mismatch> {
        self.compare(Field::Selected, 0, u16::from(observed.selected), burst_index)
    }
}
