//! 4001 program memory: 16 banks of 256 bytes plus one I/O port per chip.

use log::info;

use crate::fault::{check_index, AddressSpace, EmulatorError};
use crate::word::{Address, Byte, Nibble};

/// Number of ROM banks (4001 chips).
pub const ROM_BANK_COUNT: usize = 16;
/// Bytes per ROM bank.
pub const ROM_BANK_SIZE: usize = 256;
/// Total program space in bytes.
pub const ROM_SIZE: usize = ROM_BANK_COUNT * ROM_BANK_SIZE;

/// One 4001 chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomBank {
    cells: [Byte; ROM_BANK_SIZE],
    io_port: Nibble,
}

impl Default for RomBank {
    fn default() -> Self {
        Self {
            cells: [Byte::ZERO; ROM_BANK_SIZE],
            io_port: Nibble::ZERO,
        }
    }
}

impl RomBank {
    /// Reads one cell.
    #[must_use]
    pub const fn read(&self, offset: Byte) -> Byte {
        self.cells[offset.value() as usize]
    }

    /// Programs one cell.
    pub const fn write(&mut self, offset: Byte, value: Byte) {
        self.cells[offset.value() as usize] = value;
    }

    /// Zeroes one cell.
    pub const fn clear_cell(&mut self, offset: Byte) {
        self.write(offset, Byte::ZERO);
    }

    /// Zeroes every cell and the I/O port.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Programs the bank from offset 0.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] when `bytes` exceeds the bank.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), EmulatorError> {
        if bytes.len() > ROM_BANK_SIZE {
            return Err(EmulatorError::out_of_range(
                AddressSpace::RomAddress,
                bytes.len() - 1,
                ROM_BANK_SIZE,
            ));
        }
        for (cell, byte) in self.cells.iter_mut().zip(bytes) {
            *cell = Byte::new(*byte);
        }
        Ok(())
    }

    /// Raw bank contents.
    #[must_use]
    pub fn bytes(&self) -> [u8; ROM_BANK_SIZE] {
        self.cells.map(Byte::value)
    }

    /// Reads the I/O port latch.
    #[must_use]
    pub const fn io_port(&self) -> Nibble {
        self.io_port
    }

    /// Latches a value on the I/O port (`WRR`, or a host driving input lines).
    pub const fn set_io_port(&mut self, value: Nibble) {
        self.io_port = value;
    }
}

/// The full 4 KiB program space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomSpace {
    banks: Box<[RomBank; ROM_BANK_COUNT]>,
}

impl Default for RomSpace {
    fn default() -> Self {
        Self {
            banks: Box::new(std::array::from_fn(|_| RomBank::default())),
        }
    }
}

impl RomSpace {
    /// Reads the byte at a 12-bit program address.
    #[must_use]
    pub fn read(&self, address: Address) -> Byte {
        self.banks[usize::from(address.bank().value())].read(address.offset())
    }

    /// Bank by index.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for indices above 15.
    pub fn bank(&self, index: usize) -> Result<&RomBank, EmulatorError> {
        let slot = check_index(AddressSpace::RomBank, index, ROM_BANK_COUNT)?;
        Ok(&self.banks[slot])
    }

    /// Mutable bank by index.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for indices above 15.
    pub fn bank_mut(&mut self, index: usize) -> Result<&mut RomBank, EmulatorError> {
        let slot = check_index(AddressSpace::RomBank, index, ROM_BANK_COUNT)?;
        Ok(&mut self.banks[slot])
    }

    /// Writes `bytes` starting at `base`, continuing across bank boundaries.
    ///
    /// Nothing is written unless the whole image fits below 4096.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] when `base` or the image end
    /// lies past the program space.
    pub fn load_image(&mut self, bytes: &[u8], base: usize) -> Result<(), EmulatorError> {
        check_index(AddressSpace::RomAddress, base, ROM_SIZE)?;
        if let Some(last) = bytes.len().checked_sub(1) {
            check_index(AddressSpace::RomAddress, base + last, ROM_SIZE)?;
        }
        for (offset, byte) in bytes.iter().enumerate() {
            let linear = base + offset;
            self.banks[linear / ROM_BANK_SIZE].cells[linear % ROM_BANK_SIZE] = Byte::new(*byte);
        }
        info!("loaded {} ROM bytes at {base:#05X}", bytes.len());
        Ok(())
    }

    /// Zeroes every bank and port.
    pub fn clear(&mut self) {
        self.banks.iter_mut().for_each(RomBank::clear);
    }

    /// Zeroes every I/O port, keeping the program image.
    pub fn clear_ports(&mut self) {
        for bank in self.banks.iter_mut() {
            bank.set_io_port(Nibble::ZERO);
        }
    }

    /// Iterates banks in index order.
    pub fn banks(&self) -> impl Iterator<Item = &RomBank> {
        self.banks.iter()
    }
}
