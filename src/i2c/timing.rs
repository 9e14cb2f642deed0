// Licensed under the Apache-2.0 license

//! Bit-cell timing derived from the nominal bus frequency.
//!
//! Every bus phase waits for one of three durations: a quarter period
//! (setup before a clock edge, low time after it), a half period (clock high
//! time) or a full period. The half and full periods are computed as exact
//! multiples of the quarter period so a bit cell always adds up to one full
//! period.

use crate::i2c::common::{ConfigurationError, I2cSpeed};
use fugit::{HertzU32, NanosDurationU32};

const NANOS_PER_SECOND: u32 = 1_000_000_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BusTiming {
    frequency: HertzU32,
    quarter: NanosDurationU32,
}

impl BusTiming {
    /// Derive the bit-cell durations for `frequency`.
    ///
    /// The quarter period is `floor(1e9 / 4F)` nanoseconds.
    ///
    /// # Errors
    ///
    /// Returns `ZeroFrequency` for 0 Hz and `BusTooFast` when the quarter
    /// period would round down to zero nanoseconds.
    pub fn new(frequency: HertzU32) -> Result<Self, ConfigurationError> {
        let hz = frequency.raw();
        if hz == 0 {
            return Err(ConfigurationError::ZeroFrequency);
        }
        let quarter_ns = NANOS_PER_SECOND / hz.saturating_mul(4);
        if quarter_ns == 0 {
            return Err(ConfigurationError::BusTooFast);
        }
        Ok(Self {
            frequency,
            quarter: NanosDurationU32::from_ticks(quarter_ns),
        })
    }

    #[must_use]
    pub fn from_speed(speed: I2cSpeed) -> Self {
        // Presets are at most 1 MHz, which always yields a 250 ns quarter period.
        let hz = speed as u32;
        Self {
            frequency: speed.frequency(),
            quarter: NanosDurationU32::from_ticks(NANOS_PER_SECOND / (hz * 4)),
        }
    }

    #[must_use]
    pub const fn frequency(&self) -> HertzU32 {
        self.frequency
    }

    #[must_use]
    pub const fn quarter_period(&self) -> NanosDurationU32 {
        self.quarter
    }

    #[must_use]
    pub const fn half_period(&self) -> NanosDurationU32 {
        NanosDurationU32::from_ticks(self.quarter.ticks() * 2)
    }

    #[must_use]
    pub const fn full_period(&self) -> NanosDurationU32 {
        NanosDurationU32::from_ticks(self.quarter.ticks() * 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_mode_periods() {
        let timing = BusTiming::from_speed(I2cSpeed::Standard);
        assert_eq!(timing.quarter_period().ticks(), 2_500);
        assert_eq!(timing.half_period().ticks(), 5_000);
        assert_eq!(timing.full_period().ticks(), 10_000);
    }

    #[test]
    fn test_presets_match_generic_constructor() {
        for speed in I2cSpeed::ALL {
            let generic = BusTiming::new(speed.frequency()).unwrap();
            assert_eq!(generic, BusTiming::from_speed(speed));
        }
        assert_eq!(BusTiming::from_speed(I2cSpeed::Fast).quarter_period().ticks(), 625);
        assert_eq!(BusTiming::from_speed(I2cSpeed::FastPlus).full_period().ticks(), 1_000);
    }

    #[test]
    fn test_bit_cell_is_one_full_period() {
        let timing = BusTiming::new(HertzU32::from_raw(333_333)).unwrap();
        let q = timing.quarter_period().ticks();
        assert_eq!(q + timing.half_period().ticks() + q, timing.full_period().ticks());
    }

    #[test]
    fn test_rejects_degenerate_frequencies() {
        assert_eq!(
            BusTiming::new(HertzU32::from_raw(0)),
            Err(ConfigurationError::ZeroFrequency)
        );
        assert_eq!(
            BusTiming::new(HertzU32::from_raw(400_000_000)),
            Err(ConfigurationError::BusTooFast)
        );
    }
}
