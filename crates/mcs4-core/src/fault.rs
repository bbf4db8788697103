use std::fmt;

use thiserror::Error;

use crate::encoding::Mnemonic;
use crate::fetch::FetchPhase;
use crate::word::Nibble;

/// Fault classes used for diagnostics aggregation and host reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Instruction bits matched no table entry.
    Decode,
    /// Fetch state machine driven out of sequence.
    Fetch,
    /// Decoded instruction could not be executed.
    Execute,
    /// Bank, register, or character index outside its bounds.
    Memory,
    /// Return-address stack misuse.
    Stack,
}

/// Stable fault taxonomy surfaced to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// Fetched bits matched no instruction table entry.
    #[error("unknown opcode")]
    UnknownOpcode = 0x01,
    /// Fetch state machine used out of sequence.
    #[error("fetch protocol violation")]
    ProtocolViolation = 0x02,
    /// Instruction decoded but has no execution handler.
    #[error("unsupported instruction")]
    UnsupportedInstruction = 0x03,
    /// Bank or register index outside valid bounds.
    #[error("address out of range")]
    AddressOutOfRange = 0x04,
    /// Call pushed onto a full return stack under the faulting policy.
    #[error("return stack overflow")]
    StackOverflow = 0x05,
    /// Return popped from an empty return stack.
    #[error("return stack underflow")]
    StackUnderflow = 0x06,
}

impl FaultCode {
    /// Converts a fault code to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable byte value back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::UnknownOpcode),
            0x02 => Some(Self::ProtocolViolation),
            0x03 => Some(Self::UnsupportedInstruction),
            0x04 => Some(Self::AddressOutOfRange),
            0x05 => Some(Self::StackOverflow),
            0x06 => Some(Self::StackUnderflow),
            _ => None,
        }
    }

    /// Returns the diagnostics fault class for this fault code.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::UnknownOpcode => FaultClass::Decode,
            Self::ProtocolViolation => FaultClass::Fetch,
            Self::UnsupportedInstruction => FaultClass::Execute,
            Self::AddressOutOfRange => FaultClass::Memory,
            Self::StackOverflow | Self::StackUnderflow => FaultClass::Stack,
        }
    }

    /// Faults that point at a defect in the emulator or its host rather than
    /// at the program loaded into ROM.
    #[must_use]
    pub const fn is_defect(self) -> bool {
        matches!(self, Self::ProtocolViolation | Self::UnsupportedInstruction)
    }
}

/// Addressable resources that bounds-checked accessors guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AddressSpace {
    /// 12-bit ROM program address.
    RomAddress,
    /// One of the 16 ROM banks.
    RomBank,
    /// One of the 16 RAM banks.
    RamBank,
    /// One of the 4 registers of a RAM bank.
    RamRegister,
    /// One of the 16 data characters of a RAM register.
    RamCharacter,
    /// One of the 4 status characters of a RAM register.
    StatusCharacter,
    /// One of the 16 index registers.
    IndexRegister,
    /// One of the 8 register pairs.
    RegisterPair,
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RomAddress => "rom address",
            Self::RomBank => "rom bank",
            Self::RamBank => "ram bank",
            Self::RamRegister => "ram register",
            Self::RamCharacter => "ram character",
            Self::StatusCharacter => "status character",
            Self::IndexRegister => "index register",
            Self::RegisterPair => "register pair",
        };
        f.write_str(name)
    }
}

/// Structured error surfaced by every fallible core operation.
///
/// Each variant maps onto one [`FaultCode`] through [`EmulatorError::code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmulatorError {
    /// No table entry matched the fetched OPR/OPA pair.
    #[error("unknown opcode {opr}{opa}")]
    UnknownOpcode {
        /// Opcode nibble.
        opr: Nibble,
        /// Operand nibble.
        opa: Nibble,
    },
    /// Fetch state machine operation invalid in the current phase.
    #[error("fetch protocol violation: {operation} while {phase:?}")]
    ProtocolViolation {
        /// Phase the machine was in.
        phase: FetchPhase,
        /// Operation the caller attempted.
        operation: &'static str,
    },
    /// Decoded instruction has no execution handler.
    #[error("no execution handler for {mnemonic}")]
    UnsupportedInstruction {
        /// Mnemonic of the rejected instruction.
        mnemonic: Mnemonic,
    },
    /// Index outside the bounds of an addressable resource.
    #[error("{space} index {index} out of range (limit {limit})")]
    AddressOutOfRange {
        /// Resource being addressed.
        space: AddressSpace,
        /// Offending index.
        index: usize,
        /// Exclusive upper bound.
        limit: usize,
    },
    /// Push onto a full return stack with [`crate::StackOverflowPolicy::Fault`].
    #[error("return stack overflow at depth {depth}")]
    StackOverflow {
        /// Saved-address capacity that was exceeded.
        depth: usize,
    },
    /// Pop from an empty return stack.
    #[error("return stack underflow")]
    StackUnderflow,
}

impl EmulatorError {
    /// Builds an [`EmulatorError::AddressOutOfRange`].
    #[must_use]
    pub const fn out_of_range(space: AddressSpace, index: usize, limit: usize) -> Self {
        Self::AddressOutOfRange {
            space,
            index,
            limit,
        }
    }

    /// Stable fault code for this error.
    #[must_use]
    pub const fn code(&self) -> FaultCode {
        match self {
            Self::UnknownOpcode { .. } => FaultCode::UnknownOpcode,
            Self::ProtocolViolation { .. } => FaultCode::ProtocolViolation,
            Self::UnsupportedInstruction { .. } => FaultCode::UnsupportedInstruction,
            Self::AddressOutOfRange { .. } => FaultCode::AddressOutOfRange,
            Self::StackOverflow { .. } => FaultCode::StackOverflow,
            Self::StackUnderflow => FaultCode::StackUnderflow,
        }
    }
}

/// Checks `index < limit`, returning an [`EmulatorError::AddressOutOfRange`] otherwise.
pub(crate) const fn check_index(
    space: AddressSpace,
    index: usize,
    limit: usize,
) -> Result<usize, EmulatorError> {
    if index < limit {
        Ok(index)
    } else {
        Err(EmulatorError::out_of_range(space, index, limit))
    }
}
