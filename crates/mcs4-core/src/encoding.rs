use std::fmt;

use crate::fault::EmulatorError;
use crate::word::{Byte, Nibble};

/// The 46 documented 4004 instruction mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Mnemonic {
    Nop,
    Jcn,
    Fim,
    Src,
    Fin,
    Jin,
    Jun,
    Jms,
    Inc,
    Isz,
    Add,
    Sub,
    Ld,
    Xch,
    Bbl,
    Ldm,
    Wrm,
    Wmp,
    Wrr,
    Wpm,
    Wr0,
    Wr1,
    Wr2,
    Wr3,
    Sbm,
    Rdm,
    Rdr,
    Adm,
    Rd0,
    Rd1,
    Rd2,
    Rd3,
    Clb,
    Clc,
    Iac,
    Cmc,
    Cma,
    Ral,
    Rar,
    Tcc,
    Dac,
    Tcs,
    Stc,
    Daa,
    Kbp,
    Dcl,
}

impl Mnemonic {
    /// Assembly spelling of the mnemonic.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Jcn => "JCN",
            Self::Fim => "FIM",
            Self::Src => "SRC",
            Self::Fin => "FIN",
            Self::Jin => "JIN",
            Self::Jun => "JUN",
            Self::Jms => "JMS",
            Self::Inc => "INC",
            Self::Isz => "ISZ",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Ld => "LD",
            Self::Xch => "XCH",
            Self::Bbl => "BBL",
            Self::Ldm => "LDM",
            Self::Wrm => "WRM",
            Self::Wmp => "WMP",
            Self::Wrr => "WRR",
            Self::Wpm => "WPM",
            Self::Wr0 => "WR0",
            Self::Wr1 => "WR1",
            Self::Wr2 => "WR2",
            Self::Wr3 => "WR3",
            Self::Sbm => "SBM",
            Self::Rdm => "RDM",
            Self::Rdr => "RDR",
            Self::Adm => "ADM",
            Self::Rd0 => "RD0",
            Self::Rd1 => "RD1",
            Self::Rd2 => "RD2",
            Self::Rd3 => "RD3",
            Self::Clb => "CLB",
            Self::Clc => "CLC",
            Self::Iac => "IAC",
            Self::Cmc => "CMC",
            Self::Cma => "CMA",
            Self::Ral => "RAL",
            Self::Rar => "RAR",
            Self::Tcc => "TCC",
            Self::Dac => "DAC",
            Self::Tcs => "TCS",
            Self::Stc => "STC",
            Self::Daa => "DAA",
            Self::Kbp => "KBP",
            Self::Dcl => "DCL",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opcode bit pattern over the first instruction byte; bits outside `care` are "don't care".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpcodePattern {
    /// Required values of the cared-for bits.
    pub bits: u8,
    /// Mask of bits that participate in matching.
    pub care: u8,
}

impl OpcodePattern {
    /// Pattern matching on the OPR nibble alone.
    #[must_use]
    pub const fn opr(opr: u8) -> Self {
        Self {
            bits: opr << 4,
            care: 0xF0,
        }
    }

    /// Pattern fixing the OPR nibble and the OPA low bit.
    #[must_use]
    pub const fn opr_with_low_bit(opr: u8, low: u8) -> Self {
        Self {
            bits: (opr << 4) | (low & 1),
            care: 0xF1,
        }
    }

    /// Pattern fixing the whole byte.
    #[must_use]
    pub const fn full(byte: u8) -> Self {
        Self {
            bits: byte,
            care: 0xFF,
        }
    }

    /// Returns whether the byte satisfies every cared-for bit.
    #[must_use]
    pub const fn matches(self, byte: Byte) -> bool {
        byte.value() & self.care == self.bits
    }

    /// Number of significant opcode bits: 4 for OPR-only patterns, 8 otherwise.
    #[must_use]
    pub const fn width(self) -> u8 {
        if self.care == 0xF0 {
            4
        } else {
            8
        }
    }
}

impl fmt::Display for OpcodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in 0..8u8 {
            if index == 4 {
                f.write_str(" ")?;
            }
            let mask = 0x80 >> index;
            let symbol = if self.care & mask == 0 {
                'X'
            } else if self.bits & mask == 0 {
                '0'
            } else {
                '1'
            };
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}

/// Instruction length in 8-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum WordLength {
    /// OPR + OPA.
    One,
    /// OPR + OPA followed by a second full byte.
    Two,
}

impl WordLength {
    /// Number of 8-bit words.
    #[must_use]
    pub const fn words(self) -> u16 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Number of 4-bit bus reads needed to assemble the instruction.
    #[must_use]
    pub const fn nibbles(self) -> u8 {
        match self {
            Self::One => 2,
            Self::Two => 4,
        }
    }
}

/// How the OPA nibble and optional second word are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandLayout {
    /// No operands; the full byte is the opcode.
    None,
    /// `RRRR`: index register.
    Register,
    /// `RRRx`: register pair.
    RegisterPair,
    /// `RRR0` + `DDDDDDDD`: register pair and 8-bit immediate.
    PairAndData,
    /// `DDDD`: 4-bit immediate.
    Data,
    /// `CCCC` + `AAAAAAAA`: condition and page-local address.
    ConditionAndAddress,
    /// `AAAA` + `AAAAAAAA`: full 12-bit address.
    Address,
    /// `RRRR` + `AAAAAAAA`: index register and page-local address.
    RegisterAndAddress,
}

/// Immutable instruction table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstructionDescriptor {
    /// Assembly mnemonic.
    pub mnemonic: Mnemonic,
    /// Human-readable instruction name.
    pub description: &'static str,
    /// Opcode bits that select this instruction.
    pub pattern: OpcodePattern,
    /// One-word or two-word encoding.
    pub length: WordLength,
    /// Operand field layout.
    pub operands: OperandLayout,
}

/// Resolves the two instructions sharing the `0010` and `0011` OPR patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AliasDiscriminator {
    /// OPA low bit 0: register-pair form (`FIM`, `FIN`).
    RegisterPair,
    /// OPA low bit 1: control form (`SRC`, `JIN`).
    Control,
}

impl AliasDiscriminator {
    /// Picks the alias from the OPA low bit.
    #[must_use]
    pub const fn from_opa(opa: Nibble) -> Self {
        if opa.bit(3) {
            Self::Control
        } else {
            Self::RegisterPair
        }
    }
}

/// Shape of one table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryForm {
    /// Exactly one instruction owns the pattern.
    Single(InstructionDescriptor),
    /// Two instructions share the OPR pattern and split on the OPA low bit.
    Aliased {
        /// Instruction for an even OPA.
        register_pair: InstructionDescriptor,
        /// Instruction for an odd OPA.
        control: InstructionDescriptor,
    },
}

/// One row of the instruction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableEntry {
    /// Bits the first instruction byte must match.
    pub pattern: OpcodePattern,
    /// Instruction(s) behind the pattern.
    pub form: EntryForm,
}

/// Result of an instruction table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    /// Descriptor of the matched instruction.
    pub descriptor: &'static InstructionDescriptor,
    /// Set when the match came from an aliased row.
    pub alias: Option<AliasDiscriminator>,
}

/// Word length as far as the OPR nibble alone can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthClass {
    /// Length is fixed by the OPR nibble.
    Known(WordLength),
    /// Length depends on the OPA nibble (the `FIM`/`SRC` row).
    ByOperand,
}

const fn describe(
    mnemonic: Mnemonic,
    description: &'static str,
    pattern: OpcodePattern,
    length: WordLength,
    operands: OperandLayout,
) -> InstructionDescriptor {
    InstructionDescriptor {
        mnemonic,
        description,
        pattern,
        length,
        operands,
    }
}

const fn machine(
    opr: u8,
    mnemonic: Mnemonic,
    description: &'static str,
    words: WordLength,
    operands: OperandLayout,
) -> TableEntry {
    TableEntry {
        pattern: OpcodePattern::opr(opr),
        form: EntryForm::Single(describe(
            mnemonic,
            description,
            OpcodePattern::opr(opr),
            words,
            operands,
        )),
    }
}

const fn full(byte: u8, mnemonic: Mnemonic, description: &'static str) -> TableEntry {
    TableEntry {
        pattern: OpcodePattern::full(byte),
        form: EntryForm::Single(describe(
            mnemonic,
            description,
            OpcodePattern::full(byte),
            WordLength::One,
            OperandLayout::None,
        )),
    }
}

const fn aliased(
    opr: u8,
    register_pair: InstructionDescriptor,
    control: InstructionDescriptor,
) -> TableEntry {
    TableEntry {
        pattern: OpcodePattern::opr(opr),
        form: EntryForm::Aliased {
            register_pair,
            control,
        },
    }
}

/// Single source-of-truth instruction table.
///
/// Any first byte that no row matches is an unknown opcode by definition.
#[rustfmt::skip]
pub const INSTRUCTION_TABLE: &[TableEntry] = &[
    machine(0x0, Mnemonic::Nop, "No Operation", WordLength::One, OperandLayout::None),
    machine(0x1, Mnemonic::Jcn, "Jump Conditional", WordLength::Two, OperandLayout::ConditionAndAddress),
    aliased(
        0x2,
        describe(Mnemonic::Fim, "Fetch Immediate", OpcodePattern::opr_with_low_bit(0x2, 0), WordLength::Two, OperandLayout::PairAndData),
        describe(Mnemonic::Src, "Send Register Control", OpcodePattern::opr_with_low_bit(0x2, 1), WordLength::One, OperandLayout::RegisterPair),
    ),
    aliased(
        0x3,
        describe(Mnemonic::Fin, "Fetch Indirect", OpcodePattern::opr_with_low_bit(0x3, 0), WordLength::One, OperandLayout::RegisterPair),
        describe(Mnemonic::Jin, "Jump Indirect", OpcodePattern::opr_with_low_bit(0x3, 1), WordLength::One, OperandLayout::RegisterPair),
    ),
    machine(0x4, Mnemonic::Jun, "Jump Unconditional", WordLength::Two, OperandLayout::Address),
    machine(0x5, Mnemonic::Jms, "Jump To Subroutine", WordLength::Two, OperandLayout::Address),
    machine(0x6, Mnemonic::Inc, "Increment", WordLength::One, OperandLayout::Register),
    machine(0x7, Mnemonic::Isz, "Increment And Skip", WordLength::Two, OperandLayout::RegisterAndAddress),
    machine(0x8, Mnemonic::Add, "Add", WordLength::One, OperandLayout::Register),
    machine(0x9, Mnemonic::Sub, "Subtract", WordLength::One, OperandLayout::Register),
    machine(0xA, Mnemonic::Ld, "Load", WordLength::One, OperandLayout::Register),
    machine(0xB, Mnemonic::Xch, "Exchange", WordLength::One, OperandLayout::Register),
    machine(0xC, Mnemonic::Bbl, "Branch Back And Load", WordLength::One, OperandLayout::Data),
    machine(0xD, Mnemonic::Ldm, "Load Immediate", WordLength::One, OperandLayout::Data),
    full(0xE0, Mnemonic::Wrm, "Write Main Memory"),
    full(0xE1, Mnemonic::Wmp, "Write RAM Port"),
    full(0xE2, Mnemonic::Wrr, "Write ROM Port"),
    full(0xE3, Mnemonic::Wpm, "Write Program Memory"),
    full(0xE4, Mnemonic::Wr0, "Write Status Char 0"),
    full(0xE5, Mnemonic::Wr1, "Write Status Char 1"),
    full(0xE6, Mnemonic::Wr2, "Write Status Char 2"),
    full(0xE7, Mnemonic::Wr3, "Write Status Char 3"),
    full(0xE8, Mnemonic::Sbm, "Subtract Main Memory"),
    full(0xE9, Mnemonic::Rdm, "Read Main Memory"),
    full(0xEA, Mnemonic::Rdr, "Read ROM Port"),
    full(0xEB, Mnemonic::Adm, "Add Main Memory"),
    full(0xEC, Mnemonic::Rd0, "Read Status Char 0"),
    full(0xED, Mnemonic::Rd1, "Read Status Char 1"),
    full(0xEE, Mnemonic::Rd2, "Read Status Char 2"),
    full(0xEF, Mnemonic::Rd3, "Read Status Char 3"),
    full(0xF0, Mnemonic::Clb, "Clear Both"),
    full(0xF1, Mnemonic::Clc, "Clear Carry"),
    full(0xF2, Mnemonic::Iac, "Increment Accumulator"),
    full(0xF3, Mnemonic::Cmc, "Complement Carry"),
    full(0xF4, Mnemonic::Cma, "Complement Accumulator"),
    full(0xF5, Mnemonic::Ral, "Rotate Left"),
    full(0xF6, Mnemonic::Rar, "Rotate Right"),
    full(0xF7, Mnemonic::Tcc, "Transfer Carry And Clear"),
    full(0xF8, Mnemonic::Dac, "Decrement Accumulator"),
    full(0xF9, Mnemonic::Tcs, "Transfer Carry Subtract"),
    full(0xFA, Mnemonic::Stc, "Set Carry"),
    full(0xFB, Mnemonic::Daa, "Decimal Adjust Accumulator"),
    full(0xFC, Mnemonic::Kbp, "Keyboard Process"),
    full(0xFD, Mnemonic::Dcl, "Designate Command Line"),
];

/// Returns whether the OPR nibble selects the full-byte memory/port (`1110`) or
/// accumulator (`1111`) group.
#[must_use]
pub const fn is_extended_class(opr: Nibble) -> bool {
    opr.value() >= 0xE
}

/// Resolves an OPR/OPA pair to its instruction descriptor.
///
/// # Errors
///
/// Returns [`EmulatorError::UnknownOpcode`] when no table row matches.
pub fn lookup(opr: Nibble, opa: Nibble) -> Result<Lookup, EmulatorError> {
    let byte = Byte::from_nibbles(opr, opa);
    INSTRUCTION_TABLE
        .iter()
        .find(|entry| entry.pattern.matches(byte))
        .map(|entry| match &entry.form {
            EntryForm::Single(descriptor) => Lookup {
                descriptor,
                alias: None,
            },
            EntryForm::Aliased {
                register_pair,
                control,
            } => {
                let alias = AliasDiscriminator::from_opa(opa);
                let descriptor = match alias {
                    AliasDiscriminator::RegisterPair => register_pair,
                    AliasDiscriminator::Control => control,
                };
                Lookup {
                    descriptor,
                    alias: Some(alias),
                }
            }
        })
        .ok_or(EmulatorError::UnknownOpcode { opr, opa })
}

/// Classifies instruction length from the OPR nibble alone.
#[must_use]
pub fn classify_length(opr: Nibble) -> LengthClass {
    let mut lengths = INSTRUCTION_TABLE
        .iter()
        .filter(|entry| entry.pattern.bits >> 4 == opr.value())
        .flat_map(|entry| match entry.form {
            EntryForm::Single(descriptor) => [Some(descriptor.length), None],
            EntryForm::Aliased {
                register_pair,
                control,
            } => [Some(register_pair.length), Some(control.length)],
        })
        .flatten();

    let Some(first) = lengths.next() else {
        return LengthClass::Known(WordLength::One);
    };
    if lengths.all(|length| length == first) {
        LengthClass::Known(first)
    } else {
        LengthClass::ByOperand
    }
}

/// Iterates every descriptor in the table, aliases included.
pub fn descriptors() -> impl Iterator<Item = &'static InstructionDescriptor> {
    INSTRUCTION_TABLE.iter().flat_map(|entry| match &entry.form {
        EntryForm::Single(descriptor) => [Some(descriptor), None],
        EntryForm::Aliased {
            register_pair,
            control,
        } => [Some(register_pair), Some(control)],
    })
    .flatten()
}
