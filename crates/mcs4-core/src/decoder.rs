//! Instruction decoder for the 4004 ISA.
//!
//! Turns one or two instruction bytes into a [`DecodedInstruction`] that the
//! execution engine consumes exactly once.

use crate::encoding::{
    lookup, AliasDiscriminator, InstructionDescriptor, Lookup, Mnemonic, WordLength,
};
use crate::fault::EmulatorError;
use crate::state::{IndexRegister, RegisterPair};
use crate::word::{Address, Byte, Nibble};

/// `JCN` condition nibble `C1 C2 C3 C4`, most significant bit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JumpCondition(Nibble);

impl JumpCondition {
    /// Wraps the OPA condition field.
    #[must_use]
    pub const fn new(bits: Nibble) -> Self {
        Self(bits)
    }

    /// Raw condition nibble.
    #[must_use]
    pub const fn bits(self) -> Nibble {
        self.0
    }

    /// `C1`: invert the combined test.
    #[must_use]
    pub const fn invert(self) -> bool {
        self.0.bit(0)
    }

    /// `C2`: accumulator is zero.
    #[must_use]
    pub const fn on_accumulator_zero(self) -> bool {
        self.0.bit(1)
    }

    /// `C3`: carry is set.
    #[must_use]
    pub const fn on_carry(self) -> bool {
        self.0.bit(2)
    }

    /// `C4`: TEST input is low.
    #[must_use]
    pub const fn on_test_low(self) -> bool {
        self.0.bit(3)
    }

    /// Whether the jump is taken for the given processor flags.
    #[must_use]
    pub const fn is_met(self, accumulator: Nibble, carry: bool, test: bool) -> bool {
        let any = (self.on_accumulator_zero() && accumulator.value() == 0)
            || (self.on_carry() && carry)
            || (self.on_test_low() && !test);
        any != self.invert()
    }
}

/// Fully assembled instruction ready for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    descriptor: &'static InstructionDescriptor,
    alias: Option<AliasDiscriminator>,
    opr: Nibble,
    opa: Nibble,
    second: Option<Byte>,
}

impl DecodedInstruction {
    pub(crate) const fn from_parts(
        found: Lookup,
        opr: Nibble,
        opa: Nibble,
        second: Option<Byte>,
    ) -> Self {
        Self {
            descriptor: found.descriptor,
            alias: found.alias,
            opr,
            opa,
            second,
        }
    }

    /// Table record this instruction resolved to.
    #[must_use]
    pub const fn descriptor(&self) -> &'static InstructionDescriptor {
        self.descriptor
    }

    /// Mnemonic shortcut.
    #[must_use]
    pub const fn mnemonic(&self) -> Mnemonic {
        self.descriptor.mnemonic
    }

    /// One-word or two-word.
    #[must_use]
    pub const fn length(&self) -> WordLength {
        self.descriptor.length
    }

    /// How the shared `FIM`/`SRC` or `FIN`/`JIN` pattern was resolved, if it applied.
    #[must_use]
    pub const fn alias(&self) -> Option<AliasDiscriminator> {
        self.alias
    }

    /// OPA nibble.
    #[must_use]
    pub const fn opa(&self) -> Nibble {
        self.opa
    }

    /// First instruction byte (OPR + OPA).
    #[must_use]
    pub const fn first_word(&self) -> Byte {
        Byte::from_nibbles(self.opr, self.opa)
    }

    /// Second instruction byte of two-word forms.
    #[must_use]
    pub const fn second_word(&self) -> Option<Byte> {
        self.second
    }

    /// Raw encoding, first byte in the high half for two-word forms.
    #[must_use]
    pub const fn raw(&self) -> u16 {
        let first = self.first_word().value() as u16;
        match self.second {
            Some(second) => (first << 8) | second.value() as u16,
            None => first,
        }
    }

    /// `RRRR` operand.
    #[must_use]
    pub const fn register(&self) -> IndexRegister {
        IndexRegister::from_nibble(self.opa)
    }

    /// `RRRx` operand.
    #[must_use]
    pub const fn pair(&self) -> RegisterPair {
        RegisterPair::from_opa(self.opa)
    }

    /// `DDDD` operand.
    #[must_use]
    pub const fn immediate(&self) -> Nibble {
        self.opa
    }

    /// `CCCC` operand of `JCN`.
    #[must_use]
    pub const fn condition(&self) -> JumpCondition {
        JumpCondition::new(self.opa)
    }

    /// Second-word byte (page-local target or 8-bit data); zero for one-word forms.
    #[must_use]
    pub const fn data_byte(&self) -> Byte {
        match self.second {
            Some(second) => second,
            None => Byte::ZERO,
        }
    }

    /// 12-bit `JUN`/`JMS` target built from OPA and the second word.
    #[must_use]
    pub const fn full_address(&self) -> Address {
        Address::from_parts(self.opa, self.data_byte())
    }
}

/// Decodes the instruction whose first byte is `first`.
///
/// `following` is the next ROM byte and is consumed only by two-word forms.
///
/// # Errors
///
/// Returns [`EmulatorError::UnknownOpcode`] when `first` matches no table row.
pub fn decode(first: Byte, following: Byte) -> Result<DecodedInstruction, EmulatorError> {
    let found = lookup(first.high(), first.low())?;
    let second = match found.descriptor.length {
        WordLength::One => None,
        WordLength::Two => Some(following),
    };
    Ok(DecodedInstruction::from_parts(
        found,
        first.high(),
        first.low(),
        second,
    ))
}

#[cfg(test)]
mod tests {
    use super::{decode, JumpCondition};
    use crate::encoding::{AliasDiscriminator, Mnemonic, WordLength};
    use crate::fault::FaultCode;
    use crate::state::{IndexRegister, RegisterPair};
    use crate::word::{Address, Byte, Nibble};

    fn decoded(first: u8, following: u8) -> super::DecodedInstruction {
        decode(Byte::new(first), Byte::new(following)).expect("should decode")
    }

    #[test]
    fn one_word_forms_ignore_following_byte() {
        let instr = decoded(0x6B, 0xFF);
        assert_eq!(instr.mnemonic(), Mnemonic::Inc);
        assert_eq!(instr.register(), IndexRegister::R11);
        assert_eq!(instr.second_word(), None);
        assert_eq!(instr.raw(), 0x6B);
    }

    #[test]
    fn two_word_forms_capture_second_byte() {
        let instr = decoded(0x53, 0x45);
        assert_eq!(instr.mnemonic(), Mnemonic::Jms);
        assert_eq!(instr.length(), WordLength::Two);
        assert_eq!(instr.full_address(), Address::new(0x345));
        assert_eq!(instr.raw(), 0x5345);
    }

    #[test]
    fn aliased_patterns_carry_discriminator() {
        let fim = decoded(0x24, 0x99);
        assert_eq!(fim.mnemonic(), Mnemonic::Fim);
        assert_eq!(fim.alias(), Some(AliasDiscriminator::RegisterPair));
        assert_eq!(fim.pair(), RegisterPair::P2);
        assert_eq!(fim.data_byte(), Byte::new(0x99));

        let src = decoded(0x25, 0x99);
        assert_eq!(src.mnemonic(), Mnemonic::Src);
        assert_eq!(src.alias(), Some(AliasDiscriminator::Control));
        assert_eq!(src.pair(), RegisterPair::P2);
        assert_eq!(src.second_word(), None);
    }

    #[test]
    fn unknown_first_byte_is_rejected() {
        let error = decode(Byte::new(0xFE), Byte::ZERO).expect_err("undefined");
        assert_eq!(error.code(), FaultCode::UnknownOpcode);
    }

    #[test]
    fn jump_condition_bits() {
        let zero = Nibble::ZERO;
        let one = Nibble::new(1);

        let acc_zero = JumpCondition::new(Nibble::new(0b0100));
        assert!(acc_zero.is_met(zero, false, true));
        assert!(!acc_zero.is_met(one, false, true));

        let acc_nonzero = JumpCondition::new(Nibble::new(0b1100));
        assert!(acc_nonzero.is_met(one, false, true));

        let carry = JumpCondition::new(Nibble::new(0b0010));
        assert!(carry.is_met(one, true, true));
        assert!(!carry.is_met(one, false, true));

        let test_low = JumpCondition::new(Nibble::new(0b0001));
        assert!(test_low.is_met(one, false, false));
        assert!(!test_low.is_met(one, false, true));

        assert!(!JumpCondition::new(Nibble::ZERO).is_met(zero, true, false));
        assert!(JumpCondition::new(Nibble::new(0b1000)).is_met(zero, true, false));
    }
}
