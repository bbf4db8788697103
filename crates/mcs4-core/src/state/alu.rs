//! Accumulator arithmetic on the 5-bit working value (4 data bits + carry).
//!
//! Every operation returns the complete pair so callers write accumulator and
//! carry back together.

use crate::word::Nibble;

/// `KBP` result for each accumulator value: one-hot codes map to their bit
/// position plus one, zero stays zero, everything else reads as `15`.
const KEYBOARD_TABLE: [u8; 16] = [0, 1, 2, 15, 3, 15, 15, 15, 4, 15, 15, 15, 15, 15, 15, 15];

/// Accumulator paired with the carry/link flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CarryWord {
    /// Accumulator bits.
    pub accumulator: Nibble,
    /// Carry/link bit.
    pub carry: bool,
}

impl CarryWord {
    /// Creates a working value.
    #[must_use]
    pub const fn new(accumulator: Nibble, carry: bool) -> Self {
        Self { accumulator, carry }
    }

    const fn from_sum(sum: u8) -> Self {
        Self {
            accumulator: Nibble::new(sum),
            carry: sum > Nibble::MASK,
        }
    }

    /// `ADD`/`ADM`: accumulator + operand + carry.
    #[must_use]
    pub const fn add(self, operand: Nibble) -> Self {
        Self::from_sum(self.accumulator.value() + operand.value() + self.carry as u8)
    }

    /// `SUB`/`SBM`: accumulator + !operand + !carry. Carry out set means no borrow.
    #[must_use]
    pub const fn subtract(self, operand: Nibble) -> Self {
        Self::from_sum(
            self.accumulator.value() + operand.complement().value() + (!self.carry) as u8,
        )
    }

    /// `IAC`: carry reports overflow out of bit 3.
    #[must_use]
    pub const fn increment(self) -> Self {
        Self::from_sum(self.accumulator.value() + 1)
    }

    /// `DAC`: carry clear reports a borrow.
    #[must_use]
    pub const fn decrement(self) -> Self {
        Self::from_sum(self.accumulator.value() + Nibble::MASK)
    }

    /// `RAL`: carry enters bit 0, bit 3 leaves into carry.
    #[must_use]
    pub const fn rotate_left(self) -> Self {
        let value = self.accumulator.value();
        Self {
            accumulator: Nibble::new((value << 1) | self.carry as u8),
            carry: value & 0b1000 != 0,
        }
    }

    /// `RAR`: carry enters bit 3, bit 0 leaves into carry.
    #[must_use]
    pub const fn rotate_right(self) -> Self {
        let value = self.accumulator.value();
        Self {
            accumulator: Nibble::new((value >> 1) | ((self.carry as u8) << 3)),
            carry: value & 1 != 0,
        }
    }

    /// `CMA`: carry unaffected.
    #[must_use]
    pub const fn complement_accumulator(self) -> Self {
        Self {
            accumulator: self.accumulator.complement(),
            carry: self.carry,
        }
    }

    /// `TCC`: accumulator becomes the carry as 0 or 1, carry cleared.
    #[must_use]
    pub const fn transfer_carry(self) -> Self {
        Self {
            accumulator: Nibble::new(self.carry as u8),
            carry: false,
        }
    }

    /// `TCS`: accumulator becomes 10 with carry set, 9 otherwise; carry cleared.
    #[must_use]
    pub const fn transfer_carry_subtract(self) -> Self {
        Self {
            accumulator: Nibble::new(if self.carry { 10 } else { 9 }),
            carry: false,
        }
    }

    /// `DAA`: adds 6 when carry is set or the accumulator exceeds 9.
    ///
    /// Carry is set on overflow and otherwise left as it was.
    #[must_use]
    pub const fn decimal_adjust(self) -> Self {
        if !self.carry && self.accumulator.value() <= 9 {
            return self;
        }
        let sum = self.accumulator.value() + 6;
        Self {
            accumulator: Nibble::new(sum),
            carry: self.carry || sum > Nibble::MASK,
        }
    }

    /// `KBP`: one-of-four to binary; carry unaffected.
    #[must_use]
    pub const fn keyboard_process(self) -> Self {
        Self {
            accumulator: Nibble::new(KEYBOARD_TABLE[self.accumulator.value() as usize]),
            carry: self.carry,
        }
    }
}
