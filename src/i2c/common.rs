// Licensed under the Apache-2.0 license

//! Common types for the I2C bench modules.
//!
//! This module provides the shared protocol enums (direction, acknowledge
//! polarity, speed presets) and the bench configuration with its builder.

use core::fmt;
use fugit::HertzU32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
    FastPlus = 1_000_000,
}

impl I2cSpeed {
    pub const ALL: [I2cSpeed; 3] = [I2cSpeed::Standard, I2cSpeed::Fast, I2cSpeed::FastPlus];

    #[must_use]
    pub const fn frequency(self) -> HertzU32 {
        HertzU32::from_raw(self as u32)
    }
}

/// Transfer direction carried in the least significant bit of the address byte.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    #[default]
    Write = 0,
    Read = 1,
}

impl Direction {
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Direction::Read
        } else {
            Direction::Write
        }
    }
}

/// Acknowledge slot value. Low means ACK (continue), high means NACK (final).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Ack {
    Ack,
    Nack,
}

impl Ack {
    /// Decode the sampled SDA level of an acknowledge slot.
    #[must_use]
    pub const fn from_level(high: bool) -> Self {
        if high {
            Ack::Nack
        } else {
            Ack::Ack
        }
    }

    /// SDA level that encodes this acknowledge.
    #[must_use]
    pub const fn level(self) -> bool {
        matches!(self, Ack::Nack)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Bus frequency of zero Hz
    ZeroFrequency,
    /// Quarter bit period shorter than two system clock cycles
    BusTooFast,
    /// Reset must be held for at least one system clock cycle
    ZeroResetCycles,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::ZeroFrequency => write!(f, "bus frequency must be non-zero"),
            ConfigurationError::BusTooFast => {
                write!(f, "quarter bit period must span two system clock cycles")
            }
            ConfigurationError::ZeroResetCycles => write!(f, "reset must last at least one cycle"),
        }
    }
}

/// Default PRNG seed for stimulus generation.
pub const DEFAULT_SEED: u64 = 0x1_2C5E_ED00;

/// Validated bench configuration.
#[derive(Copy, Clone, Debug)]
pub struct BenchConfig {
    pub bus_frequency: HertzU32,
    pub system_clock: HertzU32,
    pub reset_cycles: u32,
    pub seed: u64,
    /// Address the device answers to; `None` means it decodes any address
    pub device_address: Option<u8>,
}

impl BenchConfig {
    /// System clock period in nanoseconds, never below one.
    #[must_use]
    pub fn system_clock_period_ns(&self) -> u32 {
        (1_000_000_000 / self.system_clock.raw().max(1)).max(1)
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            bus_frequency: I2cSpeed::Standard.frequency(),
            system_clock: HertzU32::from_raw(50_000_000),
            reset_cycles: 2,
            seed: DEFAULT_SEED,
            device_address: None,
        }
    }
}

pub struct BenchConfigBuilder {
    bus_frequency: HertzU32,
    system_clock: HertzU32,
    reset_cycles: u32,
    seed: u64,
    device_address: Option<u8>,
}

impl Default for BenchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        let defaults = BenchConfig::default();
        Self {
            bus_frequency: defaults.bus_frequency,
            system_clock: defaults.system_clock,
            reset_cycles: defaults.reset_cycles,
            seed: defaults.seed,
            device_address: defaults.device_address,
        }
    }
    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.bus_frequency = speed.frequency();
        self
    }
    #[must_use]
    pub fn bus_frequency(mut self, frequency: HertzU32) -> Self {
        self.bus_frequency = frequency;
        self
    }
    #[must_use]
    pub fn system_clock(mut self, frequency: HertzU32) -> Self {
        self.system_clock = frequency;
        self
    }
    #[must_use]
    pub fn reset_cycles(mut self, cycles: u32) -> Self {
        self.reset_cycles = cycles;
        self
    }
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
    #[must_use]
    pub fn device_address(mut self, address: u8) -> Self {
        self.device_address = Some(address & 0x7f);
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` when the bus frequency is zero, when
    /// the system clock cannot sample each quarter bit phase at least twice,
    /// or when no reset cycles are requested.
    pub fn build(self) -> Result<BenchConfig, ConfigurationError> {
        if self.bus_frequency.raw() == 0 || self.system_clock.raw() == 0 {
            return Err(ConfigurationError::ZeroFrequency);
        }
        if self.reset_cycles == 0 {
            return Err(ConfigurationError::ZeroResetCycles);
        }
        let config = BenchConfig {
            bus_frequency: self.bus_frequency,
            system_clock: self.system_clock,
            reset_cycles: self.reset_cycles,
            seed: self.seed,
            device_address: self.device_address,
        };
        let quarter = crate::i2c::timing::BusTiming::new(self.bus_frequency)?
            .quarter_period()
            .ticks();
        if quarter < 2 * config.system_clock_period_ns() {
            return Err(ConfigurationError::BusTooFast);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = BenchConfigBuilder::new().build().unwrap();
        assert_eq!(config.bus_frequency.raw(), 100_000);
        assert_eq!(config.system_clock_period_ns(), 20);
        assert_eq!(config.reset_cycles, 2);
        assert_eq!(config.device_address, None);
    }

    #[test]
    fn test_builder_rejects_invalid_settings() {
        let zero = BenchConfigBuilder::new().bus_frequency(HertzU32::from_raw(0));
        assert_eq!(zero.build().unwrap_err(), ConfigurationError::ZeroFrequency);

        let no_reset = BenchConfigBuilder::new().reset_cycles(0);
        assert_eq!(no_reset.build().unwrap_err(), ConfigurationError::ZeroResetCycles);

        // 1 MHz bus has a 250 ns quarter period; a 5 MHz system clock ticks every 200 ns.
        let slow_clock = BenchConfigBuilder::new()
            .speed(I2cSpeed::FastPlus)
            .system_clock(HertzU32::from_raw(5_000_000));
        assert_eq!(slow_clock.build().unwrap_err(), ConfigurationError::BusTooFast);
    }

    #[test]
    fn test_device_address_is_masked_to_seven_bits() {
        let config = BenchConfigBuilder::new().device_address(0xD5).build().unwrap();
        assert_eq!(config.device_address, Some(0x55));
    }

    #[test]
    fn test_ack_polarity() {
        assert_eq!(Ack::from_level(false), Ack::Ack);
        assert_eq!(Ack::from_level(true), Ack::Nack);
        assert!(!Ack::Ack.level());
        assert!(Ack::Nack.level());
    }
}
