//! 4002 data memory: 16 banks of 4 registers x (16 data + 4 status) characters.

use crate::fault::{check_index, AddressSpace, EmulatorError};
use crate::word::Nibble;

/// Number of RAM banks (4002 chips).
pub const RAM_BANK_COUNT: usize = 16;
/// Registers per RAM bank.
pub const RAM_REGISTER_COUNT: usize = 4;
/// Data characters per register.
pub const RAM_DATA_CHARACTERS: usize = 16;
/// Status characters per register.
pub const RAM_STATUS_CHARACTERS: usize = 4;
/// Data plus status characters per register.
pub const RAM_CHARACTERS_PER_REGISTER: usize = RAM_DATA_CHARACTERS + RAM_STATUS_CHARACTERS;

/// Bank contents for bulk load/inspection: `[register][character]`, status in 16..20.
pub type RamImage = [[Nibble; RAM_CHARACTERS_PER_REGISTER]; RAM_REGISTER_COUNT];

/// One 4002 chip.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RamBank {
    registers: RamImage,
    output_port: Nibble,
}

impl RamBank {
    /// Reads a data character.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for a bad register or character.
    pub fn character(&self, register: usize, character: usize) -> Result<Nibble, EmulatorError> {
        let register = check_index(AddressSpace::RamRegister, register, RAM_REGISTER_COUNT)?;
        let character = check_index(AddressSpace::RamCharacter, character, RAM_DATA_CHARACTERS)?;
        Ok(self.registers[register][character])
    }

    /// Writes a data character.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for a bad register or character.
    pub fn set_character(
        &mut self,
        register: usize,
        character: usize,
        value: Nibble,
    ) -> Result<(), EmulatorError> {
        let register = check_index(AddressSpace::RamRegister, register, RAM_REGISTER_COUNT)?;
        let character = check_index(AddressSpace::RamCharacter, character, RAM_DATA_CHARACTERS)?;
        self.registers[register][character] = value;
        Ok(())
    }

    /// Reads status character `index` (0..4) of a register.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for a bad register or index.
    pub fn status(&self, register: usize, index: usize) -> Result<Nibble, EmulatorError> {
        let register = check_index(AddressSpace::RamRegister, register, RAM_REGISTER_COUNT)?;
        let index = check_index(AddressSpace::StatusCharacter, index, RAM_STATUS_CHARACTERS)?;
        Ok(self.registers[register][RAM_DATA_CHARACTERS + index])
    }

    /// Writes status character `index` (0..4) of a register.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for a bad register or index.
    pub fn set_status(
        &mut self,
        register: usize,
        index: usize,
        value: Nibble,
    ) -> Result<(), EmulatorError> {
        let register = check_index(AddressSpace::RamRegister, register, RAM_REGISTER_COUNT)?;
        let index = check_index(AddressSpace::StatusCharacter, index, RAM_STATUS_CHARACTERS)?;
        self.registers[register][RAM_DATA_CHARACTERS + index] = value;
        Ok(())
    }

    /// The four status characters of a register.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for a bad register.
    pub fn status_characters(
        &self,
        register: usize,
    ) -> Result<[Nibble; RAM_STATUS_CHARACTERS], EmulatorError> {
        let register = check_index(AddressSpace::RamRegister, register, RAM_REGISTER_COUNT)?;
        let mut status = [Nibble::ZERO; RAM_STATUS_CHARACTERS];
        status.copy_from_slice(&self.registers[register][RAM_DATA_CHARACTERS..]);
        Ok(status)
    }

    /// Replaces the four status characters of a register.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for a bad register.
    pub fn load_status_characters(
        &mut self,
        register: usize,
        status: [Nibble; RAM_STATUS_CHARACTERS],
    ) -> Result<(), EmulatorError> {
        let register = check_index(AddressSpace::RamRegister, register, RAM_REGISTER_COUNT)?;
        self.registers[register][RAM_DATA_CHARACTERS..].copy_from_slice(&status);
        Ok(())
    }

    /// Zeroes the status characters of one register.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for a bad register.
    pub fn clear_register_status(&mut self, register: usize) -> Result<(), EmulatorError> {
        self.load_status_characters(register, [Nibble::ZERO; RAM_STATUS_CHARACTERS])
    }

    /// Zeroes the status characters of every register.
    pub fn clear_status(&mut self) {
        for register in &mut self.registers {
            register[RAM_DATA_CHARACTERS..].fill(Nibble::ZERO);
        }
    }

    /// Zeroes all characters and the output port.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Output port latch (`WMP`).
    #[must_use]
    pub const fn output_port(&self) -> Nibble {
        self.output_port
    }

    /// Latches the output port.
    pub const fn set_output_port(&mut self, value: Nibble) {
        self.output_port = value;
    }

    /// Copy of every register's characters.
    #[must_use]
    pub const fn image(&self) -> RamImage {
        self.registers
    }

    /// Replaces every register's characters; the output port is untouched.
    pub const fn load_image(&mut self, image: RamImage) {
        self.registers = image;
    }
}

/// All 16 RAM banks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RamSpace {
    banks: [RamBank; RAM_BANK_COUNT],
}

impl RamSpace {
    /// Bank by index.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for indices above 15.
    pub fn bank(&self, index: usize) -> Result<&RamBank, EmulatorError> {
        let slot = check_index(AddressSpace::RamBank, index, RAM_BANK_COUNT)?;
        Ok(&self.banks[slot])
    }

    /// Mutable bank by index.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for indices above 15.
    pub fn bank_mut(&mut self, index: usize) -> Result<&mut RamBank, EmulatorError> {
        let slot = check_index(AddressSpace::RamBank, index, RAM_BANK_COUNT)?;
        Ok(&mut self.banks[slot])
    }

    /// Zeroes every bank.
    pub fn clear(&mut self) {
        self.banks.iter_mut().for_each(RamBank::clear);
    }
}
