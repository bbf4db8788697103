//! Handlers for `SRC`/`DCL` and the RAM/ROM I/O group.

use crate::decoder::DecodedInstruction;
use crate::execute::helpers::{check_ram_write, read_ram_character, read_ram_status, src_character};
use crate::execute::{ExecuteState, RamCell};
use crate::fault::EmulatorError;
use crate::memory::{DclCode, SrcAddress};
use crate::state::CarryWord;
use crate::word::Nibble;
use crate::{CoreConfig, CoreState};

type HandlerResult = Result<(), EmulatorError>;

fn stage_ram_write(state: &CoreState, exec: &mut ExecuteState, cell: RamCell) -> HandlerResult {
    check_ram_write(state, cell)?;
    exec.ram_write = Some((cell, state.registers.accumulator()));
    Ok(())
}

fn write_status(state: &CoreState, exec: &mut ExecuteState, index: usize) -> HandlerResult {
    let register = state.memory.control.src().ram_register();
    stage_ram_write(state, exec, RamCell::Status { register, index })
}

fn read_status(state: &CoreState, exec: &mut ExecuteState, index: usize) -> HandlerResult {
    exec.accumulator = Some(read_ram_status(state, index)?);
    Ok(())
}

fn rom_port_chip(state: &CoreState) -> usize {
    state.memory.control.src().rom_chip()
}

pub(super) fn src(
    instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    exec.src_latch = Some(SrcAddress::new(state.registers.pair(instr.pair())));
    Ok(())
}

pub(super) fn dcl(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    exec.designate = Some(DclCode::from_accumulator(state.registers.accumulator()));
    Ok(())
}

pub(super) fn wrm(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    stage_ram_write(state, exec, src_character(state))
}

pub(super) fn wmp(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    stage_ram_write(state, exec, RamCell::OutputPort)
}

pub(super) fn wrr(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    let chip = rom_port_chip(state);
    state.memory.rom.bank(chip)?;
    exec.rom_port_write = Some((chip, state.registers.accumulator()));
    Ok(())
}

/// `WPM` drives program RAM, which is not modeled; it retires with no effect.
pub(super) fn wpm(
    _instr: &DecodedInstruction,
    _state: &CoreState,
    _config: &CoreConfig,
    _exec: &mut ExecuteState,
) -> HandlerResult {
    Ok(())
}

pub(super) fn wr0(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    write_status(state, exec, 0)
}

pub(super) fn wr1(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    write_status(state, exec, 1)
}

pub(super) fn wr2(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    write_status(state, exec, 2)
}

pub(super) fn wr3(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    write_status(state, exec, 3)
}

pub(super) fn sbm(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    let operand = read_ram_character(state)?;
    let word = CarryWord::new(state.registers.accumulator(), state.registers.carry());
    exec.set_carry_word(word.subtract(operand));
    Ok(())
}

pub(super) fn adm(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    let operand = read_ram_character(state)?;
    let word = CarryWord::new(state.registers.accumulator(), state.registers.carry());
    exec.set_carry_word(word.add(operand));
    Ok(())
}

pub(super) fn rdm(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    exec.accumulator = Some(read_ram_character(state)?);
    Ok(())
}

pub(super) fn rdr(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    let port: Nibble = state.memory.rom.bank(rom_port_chip(state))?.io_port();
    exec.accumulator = Some(port);
    Ok(())
}

pub(super) fn rd0(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    read_status(state, exec, 0)
}

pub(super) fn rd1(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    read_status(state, exec, 1)
}

pub(super) fn rd2(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    read_status(state, exec, 2)
}

pub(super) fn rd3(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    read_status(state, exec, 3)
}
