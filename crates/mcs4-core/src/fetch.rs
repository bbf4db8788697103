//! Nibble-at-a-time instruction assembly over the 4-bit data bus.
//!
//! A fetch starts with [`FetchMachine::begin`], consumes one nibble per bus
//! cycle through [`FetchMachine::feed`], and hands the instruction over with
//! [`FetchMachine::take`], which returns the machine to [`FetchPhase::Idle`].

use crate::decoder::DecodedInstruction;
use crate::encoding::{classify_length, lookup, LengthClass, Lookup, WordLength};
use crate::fault::EmulatorError;
use crate::word::{Byte, Nibble};

/// Position in the fetch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FetchPhase {
    /// No fetch in progress.
    #[default]
    Idle,
    /// Waiting for OPR.
    ReadingFirstNibble,
    /// Waiting for OPA.
    ReadingSecondNibble,
    /// Waiting for the high nibble of the second word.
    ReadingWord2Nibble1,
    /// Waiting for the low nibble of the second word.
    ReadingWord2Nibble2,
    /// Instruction assembled; call [`FetchMachine::take`].
    Complete,
}

/// Reply to one fed nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    /// Another bus read is required.
    NeedMore,
    /// The instruction is complete.
    Complete,
}

/// Fetch state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchMachine {
    phase: FetchPhase,
    opr: Nibble,
    opa: Nibble,
    found: Option<Lookup>,
    word2_high: Nibble,
    second: Option<Byte>,
}

impl FetchMachine {
    /// Creates an idle machine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> FetchPhase {
        self.phase
    }

    /// Starts a new fetch.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::ProtocolViolation`] unless the machine is idle.
    pub fn begin(&mut self) -> Result<(), EmulatorError> {
        if self.phase != FetchPhase::Idle {
            return Err(self.violation("begin"));
        }
        *self = Self {
            phase: FetchPhase::ReadingFirstNibble,
            ..Self::default()
        };
        Ok(())
    }

    /// Consumes one nibble from the bus.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::ProtocolViolation`] when idle or already complete,
    /// and [`EmulatorError::UnknownOpcode`] when OPR/OPA match no instruction;
    /// the machine is idle again after an unknown opcode.
    pub fn feed(&mut self, nibble: Nibble) -> Result<FetchStatus, EmulatorError> {
        match self.phase {
            FetchPhase::Idle | FetchPhase::Complete => Err(self.violation("feed")),
            FetchPhase::ReadingFirstNibble => {
                self.opr = nibble;
                self.phase = FetchPhase::ReadingSecondNibble;
                Ok(FetchStatus::NeedMore)
            }
            FetchPhase::ReadingSecondNibble => {
                self.opa = nibble;
                let found = match lookup(self.opr, nibble) {
                    Ok(found) => found,
                    Err(error) => {
                        self.abort();
                        return Err(error);
                    }
                };
                self.found = Some(found);
                match found.descriptor.length {
                    WordLength::One => Ok(self.finish()),
                    WordLength::Two => {
                        self.phase = FetchPhase::ReadingWord2Nibble1;
                        Ok(FetchStatus::NeedMore)
                    }
                }
            }
            FetchPhase::ReadingWord2Nibble1 => {
                self.word2_high = nibble;
                self.phase = FetchPhase::ReadingWord2Nibble2;
                Ok(FetchStatus::NeedMore)
            }
            FetchPhase::ReadingWord2Nibble2 => {
                self.second = Some(Byte::from_nibbles(self.word2_high, nibble));
                Ok(self.finish())
            }
        }
    }

    /// Hands over the assembled instruction and returns to idle.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::ProtocolViolation`] unless the fetch is complete.
    pub fn take(&mut self) -> Result<DecodedInstruction, EmulatorError> {
        let found = match (self.phase, self.found) {
            (FetchPhase::Complete, Some(found)) => found,
            _ => return Err(self.violation("take")),
        };
        let instruction = DecodedInstruction::from_parts(found, self.opr, self.opa, self.second);
        self.abort();
        Ok(instruction)
    }

    /// Nibbles still required before completion, when already known.
    ///
    /// After OPR this comes from [`classify_length`]; it is `None` for the
    /// `FIM`/`SRC` row until OPA arrives.
    #[must_use]
    pub fn remaining_nibbles(&self) -> Option<u8> {
        match self.phase {
            FetchPhase::Idle | FetchPhase::Complete => Some(0),
            FetchPhase::ReadingFirstNibble => None,
            FetchPhase::ReadingSecondNibble => match classify_length(self.opr) {
                LengthClass::Known(length) => Some(length.nibbles() - 1),
                LengthClass::ByOperand => None,
            },
            FetchPhase::ReadingWord2Nibble1 => Some(2),
            FetchPhase::ReadingWord2Nibble2 => Some(1),
        }
    }

    /// Drops any partial fetch.
    pub fn abort(&mut self) {
        *self = Self::default();
    }

    fn finish(&mut self) -> FetchStatus {
        self.phase = FetchPhase::Complete;
        FetchStatus::Complete
    }

    const fn violation(&self, operation: &'static str) -> EmulatorError {
        EmulatorError::ProtocolViolation {
            phase: self.phase,
            operation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FetchMachine, FetchPhase, FetchStatus};
    use crate::encoding::Mnemonic;
    use crate::fault::FaultCode;
    use crate::word::{Byte, Nibble};

    fn feed_all(machine: &mut FetchMachine, nibbles: &[u8]) -> Vec<FetchStatus> {
        nibbles
            .iter()
            .map(|nibble| machine.feed(Nibble::new(*nibble)).expect("feed accepted"))
            .collect()
    }

    #[test]
    fn one_word_fetch_completes_after_two_nibbles() {
        let mut machine = FetchMachine::new();
        machine.begin().expect("idle");
        let statuses = feed_all(&mut machine, &[0xD, 0x3]);
        assert_eq!(statuses, vec![FetchStatus::NeedMore, FetchStatus::Complete]);
        let instr = machine.take().expect("complete");
        assert_eq!(instr.mnemonic(), Mnemonic::Ldm);
        assert_eq!(machine.phase(), FetchPhase::Idle);
    }

    #[test]
    fn two_word_fetch_walks_every_phase() {
        let mut machine = FetchMachine::new();
        machine.begin().expect("idle");
        assert_eq!(machine.phase(), FetchPhase::ReadingFirstNibble);
        machine.feed(Nibble::new(0x4)).expect("opr");
        assert_eq!(machine.phase(), FetchPhase::ReadingSecondNibble);
        assert_eq!(machine.remaining_nibbles(), Some(3));
        machine.feed(Nibble::new(0x1)).expect("opa");
        assert_eq!(machine.phase(), FetchPhase::ReadingWord2Nibble1);
        machine.feed(Nibble::new(0x2)).expect("word 2 high");
        assert_eq!(machine.phase(), FetchPhase::ReadingWord2Nibble2);
        assert_eq!(
            machine.feed(Nibble::new(0x3)).expect("word 2 low"),
            FetchStatus::Complete
        );
        let instr = machine.take().expect("complete");
        assert_eq!(instr.mnemonic(), Mnemonic::Jun);
        assert_eq!(instr.second_word(), Some(Byte::new(0x23)));
    }

    #[test]
    fn src_length_depends_on_operand() {
        let mut machine = FetchMachine::new();
        machine.begin().expect("idle");
        machine.feed(Nibble::new(0x2)).expect("opr");
        assert_eq!(machine.remaining_nibbles(), None);
        assert_eq!(
            machine.feed(Nibble::new(0x1)).expect("opa"),
            FetchStatus::Complete
        );
        assert_eq!(machine.take().expect("complete").mnemonic(), Mnemonic::Src);
    }

    #[test]
    fn out_of_sequence_calls_are_protocol_violations() {
        let mut machine = FetchMachine::new();
        let error = machine.feed(Nibble::ZERO).expect_err("idle feed");
        assert_eq!(error.code(), FaultCode::ProtocolViolation);
        assert_eq!(
            machine.take().expect_err("idle take").code(),
            FaultCode::ProtocolViolation
        );

        machine.begin().expect("idle");
        assert_eq!(
            machine.begin().expect_err("double begin").code(),
            FaultCode::ProtocolViolation
        );
        assert_eq!(
            machine.take().expect_err("incomplete take").code(),
            FaultCode::ProtocolViolation
        );

        feed_all(&mut machine, &[0x0, 0x0]);
        let error = machine.feed(Nibble::ZERO).expect_err("feed after complete");
        assert_eq!(error.code(), FaultCode::ProtocolViolation);
        assert!(machine.take().is_ok());
    }

    #[test]
    fn unknown_opcode_returns_machine_to_idle() {
        let mut machine = FetchMachine::new();
        machine.begin().expect("idle");
        machine.feed(Nibble::new(0xF)).expect("opr");
        let error = machine.feed(Nibble::new(0xF)).expect_err("0xFF undefined");
        assert_eq!(error.code(), FaultCode::UnknownOpcode);
        assert_eq!(machine.phase(), FetchPhase::Idle);
        assert!(machine.begin().is_ok());
    }
}
