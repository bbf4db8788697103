//! Fixed-width bit containers for the 4-bit data path.
//!
//! Bit indices are most-significant-first throughout: bit 0 of a [`Nibble`]
//! is its `8` weight, bit 3 its `1` weight.

use std::fmt;

macro_rules! fixed_width {
    ($(#[$meta:meta])* $name:ident, $repr:ty, $width:expr, $digits:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
        pub struct $name($repr);

        impl $name {
            /// Number of bits held by this container.
            pub const WIDTH: u8 = $width;
            /// Mask of the valid bits in the backing integer.
            pub const MASK: $repr = ((1u32 << $width) - 1) as $repr;
            /// All bits clear.
            pub const ZERO: Self = Self(0);
            /// All bits set.
            pub const MAX: Self = Self(Self::MASK);

            /// Creates a value, discarding bits above the container width.
            #[must_use]
            pub const fn new(value: $repr) -> Self {
                Self(value & Self::MASK)
            }

            /// Creates a value only when it fits the container width.
            #[must_use]
            pub const fn try_new(value: $repr) -> Option<Self> {
                if value & !Self::MASK == 0 {
                    Some(Self(value))
                } else {
                    None
                }
            }

            /// Returns the raw value.
            #[must_use]
            pub const fn value(self) -> $repr {
                self.0
            }

            /// Reads the bit at `index`, where index 0 is the most significant bit.
            ///
            /// # Panics
            ///
            /// Panics when `index` is not below [`Self::WIDTH`].
            #[must_use]
            pub const fn bit(self, index: u8) -> bool {
                assert!(index < Self::WIDTH, "bit index out of range");
                (self.0 >> (Self::WIDTH - 1 - index)) & 1 == 1
            }

            /// Returns a copy with the bit at `index` (most-significant-first) set to `value`.
            ///
            /// # Panics
            ///
            /// Panics when `index` is not below [`Self::WIDTH`].
            #[must_use]
            pub const fn with_bit(self, index: u8, value: bool) -> Self {
                assert!(index < Self::WIDTH, "bit index out of range");
                let mask = 1 << (Self::WIDTH - 1 - index);
                if value {
                    Self(self.0 | mask)
                } else {
                    Self(self.0 & !mask)
                }
            }

            /// Adds `rhs`, wrapping at the container width.
            #[must_use]
            pub const fn wrapping_add(self, rhs: $repr) -> Self {
                Self::new(self.0.wrapping_add(rhs))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:0width$X}", self.0, width = $digits)
            }
        }

        impl From<$name> for $repr {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

fixed_width!(
    /// A 4-bit unit: accumulator, index registers, RAM characters, opcode halves.
    Nibble,
    u8,
    4,
    1
);

fixed_width!(
    /// An 8-bit unit: one ROM cell, one register pair, one instruction word.
    Byte,
    u8,
    8,
    2
);

fixed_width!(
    /// A 12-bit program address: ROM bank in the top nibble, offset in the low byte.
    Address,
    u16,
    12,
    3
);

impl Nibble {
    /// Complements all four bits.
    #[must_use]
    pub const fn complement(self) -> Self {
        Self::new(!self.0)
    }
}

impl Byte {
    /// Joins a high and low nibble.
    #[must_use]
    pub const fn from_nibbles(high: Nibble, low: Nibble) -> Self {
        Self((high.value() << 4) | low.value())
    }

    /// Upper nibble (OPR for an instruction word).
    #[must_use]
    pub const fn high(self) -> Nibble {
        Nibble::new(self.0 >> 4)
    }

    /// Lower nibble (OPA for an instruction word).
    #[must_use]
    pub const fn low(self) -> Nibble {
        Nibble::new(self.0)
    }
}

impl Address {
    /// Builds an address from a ROM bank (page) and an offset within it.
    #[must_use]
    pub const fn from_parts(bank: Nibble, offset: Byte) -> Self {
        Self(((bank.value() as u16) << 8) | offset.value() as u16)
    }

    /// ROM bank (page) holding this address.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn bank(self) -> Nibble {
        Nibble::new((self.0 >> 8) as u8)
    }

    /// Offset within the ROM bank.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn offset(self) -> Byte {
        Byte::new(self.0 as u8)
    }

    /// Replaces the offset, keeping the bank of `self`.
    #[must_use]
    pub const fn with_offset(self, offset: Byte) -> Self {
        Self::from_parts(self.bank(), offset)
    }
}
