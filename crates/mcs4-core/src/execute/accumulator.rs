//! Register, pair, and accumulator-group handlers.

use crate::decoder::DecodedInstruction;
use crate::execute::{page_local, ExecuteState};
use crate::fault::EmulatorError;
use crate::state::{CarryWord, RegisterPair};
use crate::{CoreConfig, CoreState};

type HandlerResult = Result<(), EmulatorError>;

fn carry_word(state: &CoreState) -> CarryWord {
    CarryWord::new(state.registers.accumulator(), state.registers.carry())
}

fn apply(state: &CoreState, exec: &mut ExecuteState, op: fn(CarryWord) -> CarryWord) -> HandlerResult {
    exec.set_carry_word(op(carry_word(state)));
    Ok(())
}

pub(super) fn fim(
    instr: &DecodedInstruction,
    _state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    exec.pair_write = Some((instr.pair(), instr.data_byte()));
    Ok(())
}

/// `FIN`: loads the ROM byte addressed by `P0` within the current page.
pub(super) fn fin(
    instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    let source = page_local(exec.next_pc, state.registers.pair(RegisterPair::P0));
    exec.pair_write = Some((instr.pair(), state.memory.rom.read(source)));
    Ok(())
}

pub(super) fn inc(
    instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    let reg = instr.register();
    exec.register_write = Some((reg, state.registers.index(reg).wrapping_add(1)));
    Ok(())
}

pub(super) fn add(
    instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    let operand = state.registers.index(instr.register());
    exec.set_carry_word(carry_word(state).add(operand));
    Ok(())
}

pub(super) fn sub(
    instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    let operand = state.registers.index(instr.register());
    exec.set_carry_word(carry_word(state).subtract(operand));
    Ok(())
}

pub(super) fn ld(
    instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    exec.accumulator = Some(state.registers.index(instr.register()));
    Ok(())
}

pub(super) fn xch(
    instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    let reg = instr.register();
    exec.accumulator = Some(state.registers.index(reg));
    exec.register_write = Some((reg, state.registers.accumulator()));
    Ok(())
}

pub(super) fn ldm(
    instr: &DecodedInstruction,
    _state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    exec.accumulator = Some(instr.immediate());
    Ok(())
}

pub(super) fn clb(
    _instr: &DecodedInstruction,
    _state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    exec.set_carry_word(CarryWord::default());
    Ok(())
}

pub(super) fn clc(
    _instr: &DecodedInstruction,
    _state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    exec.carry = Some(false);
    Ok(())
}

pub(super) fn stc(
    _instr: &DecodedInstruction,
    _state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    exec.carry = Some(true);
    Ok(())
}

pub(super) fn cmc(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    exec.carry = Some(!state.registers.carry());
    Ok(())
}

pub(super) fn iac(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    apply(state, exec, CarryWord::increment)
}

pub(super) fn dac(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    apply(state, exec, CarryWord::decrement)
}

pub(super) fn cma(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    apply(state, exec, CarryWord::complement_accumulator)
}

pub(super) fn ral(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    apply(state, exec, CarryWord::rotate_left)
}

pub(super) fn rar(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    apply(state, exec, CarryWord::rotate_right)
}

pub(super) fn tcc(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    apply(state, exec, CarryWord::transfer_carry)
}

pub(super) fn tcs(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    apply(state, exec, CarryWord::transfer_carry_subtract)
}

pub(super) fn daa(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    apply(state, exec, CarryWord::decimal_adjust)
}

pub(super) fn kbp(
    _instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    apply(state, exec, CarryWord::keyboard_process)
}
