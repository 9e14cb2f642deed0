// Licensed under the Apache-2.0 license

//! Fixed-width binary values.
//!
//! A `BitField<W>` carries its width in the type, so the zero-padded bit
//! string always has exactly `W` characters and a value can never silently
//! grow past its field.

use core::fmt;
use heapless::String;
use rand::RngCore;

/// Longest supported field, in bits.
pub const MAX_WIDTH: u32 = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BitFieldError {
    /// Value needs more bits than the field width
    Overflow,
    /// Bit string length differs from the field width
    Length,
    /// Bit string contains something other than '0' or '1'
    Digit,
}

/// A `W`-bit unsigned value, `1 <= W <= 8`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct BitField<const W: u32> {
    value: u8,
}

/// 7-bit slave address.
pub type Address7 = BitField<7>;
/// Register address or data byte.
pub type Byte = BitField<8>;

impl<const W: u32> BitField<W> {
    pub const WIDTH: u32 = W;
    const MASK: u8 = {
        assert!(W >= 1 && W <= MAX_WIDTH, "bit field width must be 1..=8");
        (0xffu16 >> (8 - W)) as u8
    };

    /// Wrap `value` if it fits in `W` bits.
    ///
    /// # Errors
    ///
    /// Returns `BitFieldError::Overflow` if any bit above `W` is set.
    pub const fn new(value: u8) -> Result<Self, BitFieldError> {
        if value & !Self::MASK != 0 {
            Err(BitFieldError::Overflow)
        } else {
            Ok(Self { value })
        }
    }

    /// Keep only the low `W` bits of `value`.
    #[must_use]
    pub const fn truncate(value: u8) -> Self {
        Self {
            value: value & Self::MASK,
        }
    }

    /// Draw a uniformly random value of width `W`.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        Self::truncate(rng.next_u32() as u8)
    }

    /// Parse a bit string of exactly `W` characters, MSB first.
    ///
    /// # Errors
    ///
    /// Returns `Length` when the string is not exactly `W` characters long
    /// and `Digit` for any character other than `0` or `1`.
    pub fn from_bit_str(bits: &str) -> Result<Self, BitFieldError> {
        if bits.len() != W as usize {
            return Err(BitFieldError::Length);
        }
        let mut value = 0u8;
        for c in bits.bytes() {
            let bit = match c {
                b'0' => 0,
                b'1' => 1,
                _ => return Err(BitFieldError::Digit),
            };
            value = (value << 1) | bit;
        }
        Ok(Self { value })
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.value
    }

    /// Bit `index` counted from the least significant bit.
    #[must_use]
    pub const fn bit(self, index: u32) -> bool {
        index < W && (self.value >> index) & 1 == 1
    }

    /// Bits from most to least significant, the order they go on the wire.
    pub fn msb_first(self) -> impl Iterator<Item = bool> {
        (0..W).rev().map(move |i| self.bit(i))
    }

    /// Zero-padded bit string, always `W` characters.
    #[must_use]
    pub fn to_bit_string(self) -> String<8> {
        let mut s = String::new();
        for bit in self.msb_first() {
            // W <= 8 fits the capacity
            let _ = s.push(if bit { '1' } else { '0' });
        }
        s
    }

    /// Append a single bit below this field, giving a field one bit wider.
    ///
    /// Used to build the combined address byte: `address‖rw`.
    #[must_use]
    pub const fn append_bit<const N: u32>(self, bit: bool) -> BitField<N> {
        assert!(N == W + 1, "append_bit widens by exactly one bit");
        BitField::<N>::truncate((self.value << 1) | bit as u8)
    }
}

impl<const W: u32> fmt::Display for BitField<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$b}", self.value, width = W as usize)
    }
}

impl<const W: u32> From<BitField<W>> for u8 {
    fn from(field: BitField<W>) -> u8 {
        field.value
    }
}
