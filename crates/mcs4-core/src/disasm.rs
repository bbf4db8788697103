//! Instruction disassembly for the 4004 ISA.
//!
//! Decoded instructions render as assembly text through [`fmt::Display`]
//! (`FIM P0, 0x05`, `JUN 0x123`); [`disassemble_range`] lists a stretch of
//! ROM for hosts and trace output.

use std::fmt;

use crate::decoder::{decode, DecodedInstruction};
use crate::encoding::OperandLayout;
use crate::memory::RomSpace;
use crate::word::{Address, Byte};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.mnemonic();
        match self.descriptor().operands {
            OperandLayout::None => write!(f, "{mnemonic}"),
            OperandLayout::Register => write!(f, "{mnemonic} R{}", self.register().index()),
            OperandLayout::RegisterPair => write!(f, "{mnemonic} P{}", self.pair().index()),
            OperandLayout::PairAndData => write!(
                f,
                "{mnemonic} P{}, 0x{}",
                self.pair().index(),
                self.data_byte()
            ),
            OperandLayout::Data => write!(f, "{mnemonic} {}", self.immediate().value()),
            OperandLayout::ConditionAndAddress => write!(
                f,
                "{mnemonic} 0x{}, 0x{}",
                self.condition().bits(),
                self.data_byte()
            ),
            OperandLayout::Address => write!(f, "{mnemonic} 0x{}", self.full_address()),
            OperandLayout::RegisterAndAddress => write!(
                f,
                "{mnemonic} R{}, 0x{}",
                self.register().index(),
                self.data_byte()
            ),
        }
    }
}

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// The starting address of this instruction.
    pub address: Address,
    /// Length in ROM words (bytes).
    pub len_words: u16,
    /// Raw encoding, first byte high for two-word forms.
    pub raw: u16,
    /// Assembly text, or `.byte 0xNN` for undefined encodings.
    pub text: String,
    /// Whether the first byte matches no instruction.
    pub is_unknown: bool,
}

/// Disassembles the instruction at `address`.
///
/// A two-word instruction at the end of ROM takes its second word from
/// address 0, matching program-counter wraparound.
#[must_use]
pub fn disassemble_one(rom: &RomSpace, address: Address) -> DisassemblyRow {
    let first: Byte = rom.read(address);
    let following = rom.read(address.wrapping_add(1));
    match decode(first, following) {
        Ok(instr) => DisassemblyRow {
            address,
            len_words: instr.length().words(),
            raw: instr.raw(),
            text: instr.to_string(),
            is_unknown: false,
        },
        Err(_) => DisassemblyRow {
            address,
            len_words: 1,
            raw: u16::from(first.value()),
            text: format!(".byte 0x{first}"),
            is_unknown: true,
        },
    }
}

/// Disassembles `count` consecutive instructions starting at `start`.
#[must_use]
pub fn disassemble_range(rom: &RomSpace, start: Address, count: usize) -> Vec<DisassemblyRow> {
    let mut rows = Vec::with_capacity(count);
    let mut address = start;
    for _ in 0..count {
        let row = disassemble_one(rom, address);
        address = address.wrapping_add(row.len_words);
        rows.push(row);
    }
    rows
}
