//! MCS-4 memory model: 4001 ROM banks, 4002 RAM banks, and the control lines
//! that route an address to them.

/// Bank-select lines and the `SRC` latch.
pub mod control;
/// 4002 RAM banks.
pub mod ram;
/// 4001 ROM banks.
pub mod rom;

pub use control::{ControlLines, DclCode, RamLines, SrcAddress, CHIPS_PER_LINE, DCL_TABLE};
pub use ram::{
    RamBank, RamImage, RamSpace, RAM_BANK_COUNT, RAM_CHARACTERS_PER_REGISTER, RAM_DATA_CHARACTERS,
    RAM_REGISTER_COUNT, RAM_STATUS_CHARACTERS,
};
pub use rom::{RomBank, RomSpace, ROM_BANK_COUNT, ROM_BANK_SIZE, ROM_SIZE};

/// Complete memory subsystem owned by one machine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemorySystem {
    /// Program memory.
    pub rom: RomSpace,
    /// Data memory.
    pub ram: RamSpace,
    /// Chip-select state.
    pub control: ControlLines,
}

impl MemorySystem {
    /// Clears RAM, ports, and selection state; the ROM program is kept.
    pub fn reset(&mut self) {
        self.ram.clear();
        self.rom.clear_ports();
        self.control.reset();
    }
}
