//! Control-flow handlers: jumps, subroutine linkage, and `ISZ`.

use crate::decoder::DecodedInstruction;
use crate::execute::{page_local, ExecuteState, StackEffect};
use crate::fault::EmulatorError;
use crate::{CoreConfig, CoreState};

type HandlerResult = Result<(), EmulatorError>;

pub(super) fn nop(
    _instr: &DecodedInstruction,
    _state: &CoreState,
    _config: &CoreConfig,
    _exec: &mut ExecuteState,
) -> HandlerResult {
    Ok(())
}

pub(super) fn jcn(
    instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    let registers = &state.registers;
    if instr
        .condition()
        .is_met(registers.accumulator(), registers.carry(), registers.test())
    {
        exec.next_pc = page_local(exec.next_pc, instr.data_byte());
    }
    Ok(())
}

pub(super) fn jin(
    instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    exec.next_pc = page_local(exec.next_pc, state.registers.pair(instr.pair()));
    Ok(())
}

pub(super) fn jun(
    instr: &DecodedInstruction,
    _state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    exec.next_pc = instr.full_address();
    Ok(())
}

/// `JMS`: saves the address after the call and jumps.
pub(super) fn jms(
    instr: &DecodedInstruction,
    state: &CoreState,
    config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    state.registers.stack().check_push(config.stack_overflow)?;
    exec.stack = StackEffect::Push(exec.next_pc);
    exec.next_pc = instr.full_address();
    Ok(())
}

/// `ISZ`: increments the register and jumps unless it wrapped to zero.
pub(super) fn isz(
    instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    let reg = instr.register();
    let value = state.registers.index(reg).wrapping_add(1);
    exec.register_write = Some((reg, value));
    if value.value() != 0 {
        exec.next_pc = page_local(exec.next_pc, instr.data_byte());
    }
    Ok(())
}

pub(super) fn bbl(
    instr: &DecodedInstruction,
    state: &CoreState,
    _config: &CoreConfig,
    exec: &mut ExecuteState,
) -> HandlerResult {
    let target = state
        .registers
        .stack()
        .top()
        .ok_or(EmulatorError::StackUnderflow)?;
    exec.stack = StackEffect::Pop;
    exec.next_pc = target;
    exec.accumulator = Some(instr.immediate());
    Ok(())
}
