//! Chip-select routing: CM-ROM, the four CM-RAM lines, and the `SRC` address latch.

use crate::memory::ram::RAM_REGISTER_COUNT;
use crate::word::{Byte, Nibble};

bitflags::bitflags! {
    /// Active CM-RAM bank-select lines.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
    pub struct RamLines: u8 {
        /// CM-RAM0.
        const CM_RAM0 = 1 << 0;
        /// CM-RAM1.
        const CM_RAM1 = 1 << 1;
        /// CM-RAM2.
        const CM_RAM2 = 1 << 2;
        /// CM-RAM3.
        const CM_RAM3 = 1 << 3;
    }
}

/// `DCL` truth table indexed by the low three accumulator bits.
pub const DCL_TABLE: [RamLines; 8] = [
    RamLines::CM_RAM0,
    RamLines::CM_RAM1,
    RamLines::CM_RAM2,
    RamLines::CM_RAM1.union(RamLines::CM_RAM2),
    RamLines::CM_RAM3,
    RamLines::CM_RAM1.union(RamLines::CM_RAM3),
    RamLines::CM_RAM2.union(RamLines::CM_RAM3),
    RamLines::CM_RAM1
        .union(RamLines::CM_RAM2)
        .union(RamLines::CM_RAM3),
];

/// Chips wired to each CM-RAM line.
pub const CHIPS_PER_LINE: usize = 4;

impl RamLines {
    /// Lines selected by a `DCL` code; bit 3 of the code is ignored.
    #[must_use]
    pub const fn from_dcl_code(code: Nibble) -> Self {
        DCL_TABLE[(code.value() & 0b111) as usize]
    }

    /// Active line numbers, lowest first.
    pub fn line_numbers(self) -> impl Iterator<Item = usize> {
        (0..4).filter(move |&line| self.bits() & (1u8 << line) != 0)
    }
}

/// Bank number for each `DCL` code; codes 3 and 4 swap relative to the line weights.
const DCL_BANK_NUMBERS: [u8; 8] = [0, 1, 2, 4, 3, 5, 6, 7];

/// Three-bit code latched by `DCL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DclCode(u8);

impl DclCode {
    /// Takes the low three bits of the accumulator.
    #[must_use]
    pub const fn from_accumulator(accumulator: Nibble) -> Self {
        Self(accumulator.value() & 0b111)
    }

    /// Raw code (low three accumulator bits).
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Bank number the code selects: `011` is bank 4 (CM-RAM1+2), `100` is bank 3 (CM-RAM3).
    #[must_use]
    pub const fn bank_number(self) -> u8 {
        DCL_BANK_NUMBERS[self.0 as usize]
    }

    /// Lines this bank drives.
    #[must_use]
    pub const fn lines(self) -> RamLines {
        DCL_TABLE[self.0 as usize]
    }
}

/// 8-bit address sent by `SRC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SrcAddress(Byte);

impl SrcAddress {
    /// Wraps a register-pair value.
    #[must_use]
    pub const fn new(value: Byte) -> Self {
        Self(value)
    }

    /// Raw latched byte.
    #[must_use]
    pub const fn value(self) -> Byte {
        self.0
    }

    /// RAM chip on each active line (bits 7-6).
    #[must_use]
    pub const fn ram_chip(self) -> usize {
        (self.0.value() >> 6) as usize
    }

    /// RAM register within the chip (bits 5-4).
    #[must_use]
    pub const fn ram_register(self) -> usize {
        ((self.0.value() >> 4) as usize) % RAM_REGISTER_COUNT
    }

    /// RAM data character within the register (bits 3-0).
    #[must_use]
    pub const fn ram_character(self) -> usize {
        self.0.low().value() as usize
    }

    /// ROM chip whose I/O port `WRR`/`RDR` use (bits 7-4).
    #[must_use]
    pub const fn rom_chip(self) -> usize {
        self.0.high().value() as usize
    }
}

/// Bank-select state shared by fetch and the memory/port instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ControlLines {
    rom_chip: Nibble,
    ram_bank: DclCode,
    src: SrcAddress,
}

impl ControlLines {
    /// ROM chip whose CM-ROM select is active.
    #[must_use]
    pub const fn rom_chip(&self) -> Nibble {
        self.rom_chip
    }

    /// Activates the CM-ROM select of one chip.
    pub const fn select_rom(&mut self, chip: Nibble) {
        self.rom_chip = chip;
    }

    /// Bank most recently designated by `DCL`.
    #[must_use]
    pub const fn ram_bank(&self) -> DclCode {
        self.ram_bank
    }

    /// Active CM-RAM lines.
    #[must_use]
    pub const fn ram_lines(&self) -> RamLines {
        self.ram_bank.lines()
    }

    /// Designates a RAM bank.
    pub const fn designate(&mut self, bank: DclCode) {
        self.ram_bank = bank;
    }

    /// Address latched by the last `SRC`.
    #[must_use]
    pub const fn src(&self) -> SrcAddress {
        self.src
    }

    /// Latches an `SRC` address.
    pub const fn latch_src(&mut self, address: SrcAddress) {
        self.src = address;
    }

    /// RAM bank indices (`line * 4 + chip`) that answer the latched address, lowest line first.
    pub fn ram_targets(&self) -> impl Iterator<Item = usize> {
        let chip = self.src.ram_chip();
        self.ram_lines()
            .line_numbers()
            .map(move |line| line * CHIPS_PER_LINE + chip)
    }

    /// RAM bank a read is served from: the chip on the lowest active line.
    #[must_use]
    pub fn ram_read_target(&self) -> usize {
        self.ram_targets().next().unwrap_or(self.src.ram_chip())
    }

    /// Restores bank 0, ROM chip 0, and a zero `SRC` latch.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::{ControlLines, DclCode, RamLines, SrcAddress, DCL_TABLE};
    use crate::word::{Byte, Nibble};

    #[test]
    fn dcl_truth_table_matches_line_unions() {
        assert_eq!(RamLines::from_dcl_code(Nibble::new(0b000)), RamLines::CM_RAM0);
        assert_eq!(
            RamLines::from_dcl_code(Nibble::new(0b011)),
            RamLines::CM_RAM1 | RamLines::CM_RAM2
        );
        assert_eq!(RamLines::from_dcl_code(Nibble::new(0b100)), RamLines::CM_RAM3);
        assert_eq!(
            RamLines::from_dcl_code(Nibble::new(0b111)),
            RamLines::CM_RAM1 | RamLines::CM_RAM2 | RamLines::CM_RAM3
        );
        assert_eq!(RamLines::from_dcl_code(Nibble::new(0b1001)), RamLines::CM_RAM1);
        assert!(DCL_TABLE.iter().skip(1).all(|lines| !lines.contains(RamLines::CM_RAM0)));
    }

    #[test]
    fn bank_numbers_swap_codes_three_and_four() {
        let bank = |code| DclCode::from_accumulator(Nibble::new(code));
        assert_eq!(bank(0b011).bank_number(), 4);
        assert_eq!(bank(0b011).lines(), RamLines::CM_RAM1 | RamLines::CM_RAM2);
        assert_eq!(bank(0b100).bank_number(), 3);
        assert_eq!(bank(0b100).lines(), RamLines::CM_RAM3);
        for code in [0, 1, 2, 5, 6, 7] {
            assert_eq!(bank(code).bank_number(), code);
        }
    }

    #[test]
    fn src_address_fields() {
        let src = SrcAddress::new(Byte::new(0b1101_0110));
        assert_eq!(src.ram_chip(), 3);
        assert_eq!(src.ram_register(), 1);
        assert_eq!(src.ram_character(), 6);
        assert_eq!(src.rom_chip(), 0xD);
    }

    #[test]
    fn targets_follow_active_lines() {
        let mut control = ControlLines::default();
        control.latch_src(SrcAddress::new(Byte::new(0x40)));
        assert_eq!(control.ram_targets().collect::<Vec<_>>(), vec![1]);

        control.designate(DclCode::from_accumulator(Nibble::new(0b110)));
        assert_eq!(control.ram_targets().collect::<Vec<_>>(), vec![9, 13]);
        assert_eq!(control.ram_read_target(), 9);
    }

    #[test]
    fn reset_forces_bank_zero() {
        let mut control = ControlLines::default();
        control.designate(DclCode::from_accumulator(Nibble::new(5)));
        control.select_rom(Nibble::new(3));
        control.reset();
        assert_eq!(control.ram_lines(), RamLines::CM_RAM0);
        assert_eq!(control.ram_bank().value(), 0);
        assert_eq!(control.rom_chip(), Nibble::ZERO);
    }
}
