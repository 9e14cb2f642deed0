// Licensed under the Apache-2.0 license

//! Error types for the bench.
//!
//! Verification knows one failure: an observed field that differs from the
//! expected one. It is fatal to the running scenario.

use core::fmt;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Observed field that a check compares.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    /// Decoded slave address
    Address,
    /// Decoded R/W bit
    Direction,
    /// Decoded register address
    Register,
    /// Decoded data byte
    Data,
    /// Address-match indicator
    Selected,
    /// Device acknowledge bit (0 = ACK)
    Ack,
    /// Number of valid strobes since the previous check
    ValidCount,
    /// Register address captured with the strobe
    StrobeRegister,
    /// Data byte captured with the strobe
    StrobeData,
    /// Byte reassembled from the bus during a read
    Captured,
}

impl Field {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Field::Address => "address",
            Field::Direction => "direction",
            Field::Register => "register",
            Field::Data => "data",
            Field::Selected => "selected",
            Field::Ack => "ack",
            Field::ValidCount => "valid_count",
            Field::StrobeRegister => "strobe_register",
            Field::StrobeData => "strobe_data",
            Field::Captured => "captured",
        }
    }
}

/// Expected/actual disagreement on one field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub field: Field,
    pub expected: u16,
    pub actual: u16,
    /// Data byte index within the burst (0 for address and register phases)
    pub burst_index: usize,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} mismatch at burst index {}: expected 0x{:02x}, got 0x{:02x}",
            self.field.name(),
            self.burst_index,
            self.expected,
            self.actual
        )
    }
}

/// Bench error, generic over the pin error of the underlying lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// A checked field diverged from its expectation
    Mismatch(Mismatch),
    /// The device did not acknowledge (plain controller transfers only)
    NoAcknowledge(NoAcknowledgeSource),
    /// A read burst needs at least one byte to NACK before STOP
    EmptyRead,
    /// A line could not be driven or sampled
    Pin(E),
}

impl<E> From<Mismatch> for Error<E> {
    fn from(mismatch: Mismatch) -> Self {
        Error::Mismatch(mismatch)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Mismatch(m) => write!(f, "{m}"),
            Error::NoAcknowledge(source) => write!(f, "no acknowledge: {source}"),
            Error::EmptyRead => write!(f, "read burst of zero bytes"),
            Error::Pin(e) => write!(f, "pin error: {e:?}"),
        }
    }
}

impl<E: fmt::Debug> embedded_hal::i2c::Error for Error<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Mismatch(_) | Error::EmptyRead => ErrorKind::Other,
            Error::NoAcknowledge(source) => ErrorKind::NoAcknowledge(*source),
            Error::Pin(_) => ErrorKind::Bus,
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for Error<E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::i2c::Error as _;

    #[test]
    fn test_mismatch_display() {
        let m = Mismatch {
            field: Field::Register,
            expected: 0xAA,
            actual: 0xA9,
            burst_index: 1,
        };
        assert_eq!(
            m.to_string(),
            "register mismatch at burst index 1: expected 0xaa, got 0xa9"
        );
    }

    #[test]
    fn test_error_kind_mapping() {
        let nack: Error<Infallible> = Error::NoAcknowledge(NoAcknowledgeSource::Address);
        assert_eq!(nack.kind(), ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));

        let mismatch: Error<Infallible> = Mismatch {
            field: Field::Data,
            expected: 1,
            actual: 2,
            burst_index: 0,
        }
        .into();
        assert_eq!(mismatch.kind(), ErrorKind::Other);

        let empty: Error<Infallible> = Error::EmptyRead;
        assert_eq!(empty.kind(), ErrorKind::Other);
        assert_eq!(empty.to_string(), "read burst of zero bytes");
    }
}
