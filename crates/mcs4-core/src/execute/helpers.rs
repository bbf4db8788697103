//! Helper functions for instruction execution.

use crate::execute::RamCell;
use crate::fault::EmulatorError;
use crate::word::{Address, Byte, Nibble};
use crate::CoreState;

/// Target of a page-local jump: the page of `next_pc` with `offset` as the low byte.
///
/// An instruction in the last word(s) of a page therefore jumps within the next page.
#[must_use]
pub const fn page_local(next_pc: Address, offset: Byte) -> Address {
    next_pc.with_offset(offset)
}

/// Validates that every selected RAM bank accepts a write to `cell`.
pub(super) fn check_ram_write(state: &CoreState, cell: RamCell) -> Result<(), EmulatorError> {
    for target in state.memory.control.ram_targets() {
        let bank = state.memory.ram.bank(target)?;
        match cell {
            RamCell::Character {
                register,
                character,
            } => {
                bank.character(register, character)?;
            }
            RamCell::Status { register, index } => {
                bank.status(register, index)?;
            }
            RamCell::OutputPort => {}
        }
    }
    Ok(())
}

/// Data character at the `SRC` address on the lowest selected line.
pub(super) fn read_ram_character(state: &CoreState) -> Result<Nibble, EmulatorError> {
    let control = &state.memory.control;
    let src = control.src();
    state
        .memory
        .ram
        .bank(control.ram_read_target())?
        .character(src.ram_register(), src.ram_character())
}

/// Status character `index` of the `SRC` register on the lowest selected line.
pub(super) fn read_ram_status(state: &CoreState, index: usize) -> Result<Nibble, EmulatorError> {
    let control = &state.memory.control;
    state
        .memory
        .ram
        .bank(control.ram_read_target())?
        .status(control.src().ram_register(), index)
}

/// Data character cell addressed by the `SRC` latch.
pub(super) const fn src_character(state: &CoreState) -> RamCell {
    let src = state.memory.control.src();
    RamCell::Character {
        register: src.ram_register(),
        character: src.ram_character(),
    }
}
