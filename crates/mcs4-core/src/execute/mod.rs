//! Instruction execution pipeline for the 4004 ISA.
//!
//! Each instruction runs in two phases:
//! 1. Stage: read operands and memory, validate every index, and record the
//!    complete set of effects in an [`ExecuteState`]. Faults are raised here.
//! 2. Commit: apply the staged effects. Commit cannot fail.
//!
//! A faulting instruction therefore leaves registers and memory exactly as the
//! previous instruction left them.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::unnecessary_wraps,
    unknown_lints,
    missing_docs
)]

mod accumulator;
mod flow;
mod helpers;
mod io;

pub use helpers::page_local;

use crate::decoder::DecodedInstruction;
use crate::encoding::{Mnemonic, WordLength};
use crate::fault::EmulatorError;
use crate::fetch::{FetchMachine, FetchStatus};
use crate::memory::{DclCode, SrcAddress};
use crate::state::{IndexRegister, RegisterPair};
use crate::timing::machine_cycles;
use crate::word::{Address, Byte, Nibble};
use crate::{CoreConfig, CoreState};

/// RAM location a staged write targets on every selected bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RamCell {
    /// Data character addressed by `SRC`.
    Character {
        /// Register within the bank.
        register: usize,
        /// Character within the register.
        character: usize,
    },
    /// Status character of the `SRC` register.
    Status {
        /// Register within the bank.
        register: usize,
        /// Status character index (0..4).
        index: usize,
    },
    /// The bank's output port.
    OutputPort,
}

/// Return-stack effect of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StackEffect {
    /// Stack untouched.
    #[default]
    None,
    /// Save a return address.
    Push(Address),
    /// Discard the top entry.
    Pop,
}

/// Effects accumulated while staging one instruction; nothing is applied until commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteState {
    /// New accumulator value.
    pub accumulator: Option<Nibble>,
    /// New carry value.
    pub carry: Option<bool>,
    /// Single index register write.
    pub register_write: Option<(IndexRegister, Nibble)>,
    /// Register pair write.
    pub pair_write: Option<(RegisterPair, Byte)>,
    /// RAM write broadcast to every selected bank.
    pub ram_write: Option<(RamCell, Nibble)>,
    /// ROM I/O port write: chip index and value.
    pub rom_port_write: Option<(usize, Nibble)>,
    /// New `SRC` latch.
    pub src_latch: Option<SrcAddress>,
    /// New `DCL` bank designation.
    pub designate: Option<DclCode>,
    /// Return-stack effect.
    pub stack: StackEffect,
    /// ROM chip selected while fetching this instruction.
    pub rom_chip: Nibble,
    /// Program counter after the instruction.
    pub next_pc: Address,
    /// Machine cycles consumed.
    pub cycles: u8,
}

impl ExecuteState {
    /// Creates an effect set that only advances the program counter.
    #[must_use]
    pub const fn new(rom_chip: Nibble, next_pc: Address, cycles: u8) -> Self {
        Self {
            accumulator: None,
            carry: None,
            register_write: None,
            pair_write: None,
            ram_write: None,
            rom_port_write: None,
            src_latch: None,
            designate: None,
            stack: StackEffect::None,
            rom_chip,
            next_pc,
            cycles,
        }
    }

    /// Stages accumulator and carry together.
    pub const fn set_carry_word(&mut self, word: crate::state::CarryWord) {
        self.accumulator = Some(word.accumulator);
        self.carry = Some(word.carry);
    }
}

/// Signature shared by every instruction handler.
type Handler =
    fn(&DecodedInstruction, &CoreState, &CoreConfig, &mut ExecuteState) -> Result<(), EmulatorError>;

/// Execution handler per mnemonic.
const HANDLERS: &[(Mnemonic, Handler)] = &[
    (Mnemonic::Nop, flow::nop),
    (Mnemonic::Jcn, flow::jcn),
    (Mnemonic::Fim, accumulator::fim),
    (Mnemonic::Src, io::src),
    (Mnemonic::Fin, accumulator::fin),
    (Mnemonic::Jin, flow::jin),
    (Mnemonic::Jun, flow::jun),
    (Mnemonic::Jms, flow::jms),
    (Mnemonic::Inc, accumulator::inc),
    (Mnemonic::Isz, flow::isz),
    (Mnemonic::Add, accumulator::add),
    (Mnemonic::Sub, accumulator::sub),
    (Mnemonic::Ld, accumulator::ld),
    (Mnemonic::Xch, accumulator::xch),
    (Mnemonic::Bbl, flow::bbl),
    (Mnemonic::Ldm, accumulator::ldm),
    (Mnemonic::Wrm, io::wrm),
    (Mnemonic::Wmp, io::wmp),
    (Mnemonic::Wrr, io::wrr),
    (Mnemonic::Wpm, io::wpm),
    (Mnemonic::Wr0, io::wr0),
    (Mnemonic::Wr1, io::wr1),
    (Mnemonic::Wr2, io::wr2),
    (Mnemonic::Wr3, io::wr3),
    (Mnemonic::Sbm, io::sbm),
    (Mnemonic::Rdm, io::rdm),
    (Mnemonic::Rdr, io::rdr),
    (Mnemonic::Adm, io::adm),
    (Mnemonic::Rd0, io::rd0),
    (Mnemonic::Rd1, io::rd1),
    (Mnemonic::Rd2, io::rd2),
    (Mnemonic::Rd3, io::rd3),
    (Mnemonic::Clb, accumulator::clb),
    (Mnemonic::Clc, accumulator::clc),
    (Mnemonic::Iac, accumulator::iac),
    (Mnemonic::Cmc, accumulator::cmc),
    (Mnemonic::Cma, accumulator::cma),
    (Mnemonic::Ral, accumulator::ral),
    (Mnemonic::Rar, accumulator::rar),
    (Mnemonic::Tcc, accumulator::tcc),
    (Mnemonic::Dac, accumulator::dac),
    (Mnemonic::Tcs, accumulator::tcs),
    (Mnemonic::Stc, accumulator::stc),
    (Mnemonic::Daa, accumulator::daa),
    (Mnemonic::Kbp, accumulator::kbp),
    (Mnemonic::Dcl, io::dcl),
];

fn handler_for(mnemonic: Mnemonic) -> Result<Handler, EmulatorError> {
    HANDLERS
        .iter()
        .find_map(|(entry, handler)| (*entry == mnemonic).then_some(*handler))
        .ok_or(EmulatorError::UnsupportedInstruction { mnemonic })
}

/// Stages one instruction fetched from the current program counter.
///
/// # Errors
///
/// Returns the fault the instruction raises; `state` is never modified.
pub fn execute_instruction(
    instr: &DecodedInstruction,
    state: &CoreState,
    config: &CoreConfig,
) -> Result<ExecuteState, EmulatorError> {
    let pc = state.registers.pc();
    let next_pc = pc.wrapping_add(instr.length().words());
    let last_word = match instr.length() {
        WordLength::One => pc,
        WordLength::Two => pc.wrapping_add(1),
    };
    let mut exec = ExecuteState::new(last_word.bank(), next_pc, machine_cycles(instr.length()));

    let handler = handler_for(instr.mnemonic())?;
    handler(instr, state, config, &mut exec)?;
    Ok(exec)
}

/// Applies staged effects to the core state.
///
/// Returns the return address evicted by a push onto a full stack, if any.
pub fn commit_execution(state: &mut CoreState, exec: &ExecuteState) -> Option<Address> {
    let registers = &mut state.registers;
    if let Some((reg, value)) = exec.register_write {
        registers.set_index(reg, value);
    }
    if let Some((pair, value)) = exec.pair_write {
        registers.set_pair(pair, value);
    }
    if let Some(value) = exec.accumulator {
        registers.set_accumulator(value);
    }
    if let Some(value) = exec.carry {
        registers.set_carry(value);
    }

    let evicted = match exec.stack {
        StackEffect::None => None,
        StackEffect::Push(address) => registers.stack_mut().push_evicting(address),
        StackEffect::Pop => {
            let popped = registers.stack_mut().pop();
            debug_assert!(popped.is_ok(), "pop staged on an empty return stack");
            None
        }
    };
    registers.set_pc(exec.next_pc);

    let memory = &mut state.memory;
    if let Some((cell, value)) = exec.ram_write {
        let targets: Vec<usize> = memory.control.ram_targets().collect();
        for target in targets {
            let written = memory.ram.bank_mut(target).and_then(|bank| match cell {
                RamCell::Character {
                    register,
                    character,
                } => bank.set_character(register, character, value),
                RamCell::Status { register, index } => bank.set_status(register, index, value),
                RamCell::OutputPort => {
                    bank.set_output_port(value);
                    Ok(())
                }
            });
            debug_assert!(written.is_ok(), "unvalidated RAM write staged: {written:?}");
        }
    }
    if let Some((chip, value)) = exec.rom_port_write {
        let written = memory
            .rom
            .bank_mut(chip)
            .map(|bank| bank.set_io_port(value));
        debug_assert!(written.is_ok(), "ROM port write staged for chip {chip}");
    }
    if let Some(address) = exec.src_latch {
        memory.control.latch_src(address);
    }
    if let Some(bank) = exec.designate {
        memory.control.designate(bank);
    }
    memory.control.select_rom(exec.rom_chip);

    state.counters.cycles = state.counters.cycles.wrapping_add(u64::from(exec.cycles));
    state.counters.instructions = state.counters.instructions.wrapping_add(1);
    evicted
}

/// Result of one retired instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retired {
    /// Address the instruction was fetched from.
    pub pc: Address,
    /// The instruction itself.
    pub instruction: DecodedInstruction,
    /// Machine cycles consumed.
    pub cycles: u8,
    /// Return address discarded by a call on a full stack.
    pub evicted: Option<Address>,
}

/// Assembles the instruction at `pc` by feeding ROM nibbles through `fetch`.
///
/// # Errors
///
/// Propagates [`EmulatorError::UnknownOpcode`] and
/// [`EmulatorError::ProtocolViolation`] from the fetch machine.
pub fn fetch_instruction(
    state: &CoreState,
    fetch: &mut FetchMachine,
    pc: Address,
) -> Result<DecodedInstruction, EmulatorError> {
    fetch.begin()?;
    let mut address = pc;
    loop {
        let word = state.memory.rom.read(address);
        fetch.feed(word.high())?;
        if fetch.feed(word.low())? == FetchStatus::Complete {
            return fetch.take();
        }
        address = address.wrapping_add(1);
    }
}

/// Fetches, stages, and commits one instruction.
///
/// # Errors
///
/// Returns any fetch or execution fault; on error `state` is unchanged and
/// `fetch` is idle.
pub fn step_one(
    state: &mut CoreState,
    fetch: &mut FetchMachine,
    config: &CoreConfig,
) -> Result<Retired, EmulatorError> {
    let pc = state.registers.pc();
    let instruction = fetch_instruction(state, fetch, pc).inspect_err(|_| fetch.abort())?;
    let exec = execute_instruction(&instruction, state, config)?;
    let evicted = commit_execution(state, &exec);
    Ok(Retired {
        pc,
        instruction,
        cycles: exec.cycles,
        evicted,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        commit_execution, execute_instruction, handler_for, step_one, ExecuteState, RamCell,
        StackEffect, HANDLERS,
    };
    use crate::decoder::{decode, DecodedInstruction};
    use crate::encoding::descriptors;
    use crate::fault::FaultCode;
    use crate::fetch::{FetchMachine, FetchPhase};
    use crate::state::{IndexRegister, StackOverflowPolicy};
    use crate::word::{Address, Byte, Nibble};
    use crate::{CoreConfig, CoreState};

    fn decode_instr(first: u8, second: u8) -> DecodedInstruction {
        decode(Byte::new(first), Byte::new(second)).expect("should decode")
    }

    fn state_with_program(program: &[u8]) -> CoreState {
        let mut state = CoreState::default();
        state.memory.rom.load_image(program, 0).expect("fits");
        state
    }

    #[test]
    fn every_table_mnemonic_has_exactly_one_handler() {
        for descriptor in descriptors() {
            assert!(handler_for(descriptor.mnemonic).is_ok());
            let count = HANDLERS
                .iter()
                .filter(|(mnemonic, _)| *mnemonic == descriptor.mnemonic)
                .count();
            assert_eq!(count, 1, "{}", descriptor.mnemonic);
        }
        assert_eq!(HANDLERS.len(), 46);
    }

    #[test]
    fn staging_leaves_state_untouched() {
        let mut state = CoreState::default();
        state.registers.set_accumulator(Nibble::new(0xF));
        let before = state.clone();

        let exec = execute_instruction(&decode_instr(0xF2, 0), &state, &CoreConfig::default())
            .expect("iac stages");
        assert_eq!(exec.accumulator, Some(Nibble::ZERO));
        assert_eq!(exec.carry, Some(true));
        assert_eq!(state, before);
    }

    #[test]
    fn step_one_retires_and_counts_cycles() {
        let mut state = state_with_program(&[0x40, 0x10]);
        let mut fetch = FetchMachine::new();
        let retired = step_one(&mut state, &mut fetch, &CoreConfig::default()).expect("jun");
        assert_eq!(retired.cycles, 2);
        assert_eq!(state.registers.pc(), Address::new(0x010));
        assert_eq!(state.counters.cycles, 2);
        assert_eq!(state.counters.instructions, 1);
    }

    #[test]
    fn unknown_opcode_faults_without_side_effects() {
        let mut state = state_with_program(&[0xFE]);
        state.registers.set_index(IndexRegister::R3, Nibble::new(4));
        let before = state.clone();
        let mut fetch = FetchMachine::new();

        let error = step_one(&mut state, &mut fetch, &CoreConfig::default())
            .expect_err("0xFE is undefined");
        assert_eq!(error.code(), FaultCode::UnknownOpcode);
        assert_eq!(state, before);
        assert_eq!(fetch.phase(), FetchPhase::Idle);
    }

    #[test]
    fn underflowing_bbl_faults_precisely() {
        let mut state = state_with_program(&[0xC5]);
        let before = state.clone();
        let error = step_one(&mut state, &mut FetchMachine::new(), &CoreConfig::default())
            .expect_err("empty stack");
        assert_eq!(error.code(), FaultCode::StackUnderflow);
        assert_eq!(state, before);
    }

    #[test]
    fn fault_policy_rejects_fourth_call() {
        let program = [0x50, 0x02, 0x50, 0x04, 0x50, 0x06, 0x50, 0x08];
        let mut state = state_with_program(&program);
        let config = CoreConfig {
            stack_overflow: StackOverflowPolicy::Fault,
            ..CoreConfig::default()
        };
        let mut fetch = FetchMachine::new();
        for _ in 0..3 {
            step_one(&mut state, &mut fetch, &config).expect("room on stack");
        }
        let before = state.clone();
        let error = step_one(&mut state, &mut fetch, &config).expect_err("fourth call");
        assert_eq!(error.code(), FaultCode::StackOverflow);
        assert_eq!(state, before);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "pop staged on an empty return stack")]
    fn commit_rejects_unvalidated_pop() {
        let mut state = CoreState::default();
        let mut exec = ExecuteState::new(Nibble::ZERO, Address::new(0x001), 1);
        exec.stack = StackEffect::Pop;
        let _ = commit_execution(&mut state, &exec);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "unvalidated RAM write staged")]
    fn commit_rejects_unvalidated_ram_write() {
        let mut state = CoreState::default();
        let mut exec = ExecuteState::new(Nibble::ZERO, Address::new(0x001), 1);
        exec.ram_write = Some((
            RamCell::Status {
                register: 0,
                index: 4,
            },
            Nibble::MAX,
        ));
        let _ = commit_execution(&mut state, &exec);
    }

    #[test]
    fn evicting_policy_reports_discarded_address() {
        let program = [0x50, 0x02, 0x50, 0x04, 0x50, 0x06, 0x50, 0x08];
        let mut state = state_with_program(&program);
        let mut fetch = FetchMachine::new();
        let config = CoreConfig::default();
        for _ in 0..3 {
            let retired = step_one(&mut state, &mut fetch, &config).expect("call");
            assert_eq!(retired.evicted, None);
        }
        let retired = step_one(&mut state, &mut fetch, &config).expect("fourth call");
        assert_eq!(retired.evicted, Some(Address::new(0x002)));
        assert_eq!(
            state.registers.stack().entries(),
            &[Address::new(0x004), Address::new(0x006), Address::new(0x008)]
        );
    }

    #[test]
    fn two_word_instruction_spanning_banks_selects_second_chip() {
        let mut state = CoreState::default();
        state.memory.rom.load_image(&[0x40, 0x00], 0x0FF).expect("fits");
        state.registers.set_pc(Address::new(0x0FF));
        step_one(&mut state, &mut FetchMachine::new(), &CoreConfig::default()).expect("jun");
        assert_eq!(state.memory.control.rom_chip(), Nibble::new(1));
        assert_eq!(state.registers.pc(), Address::new(0x000));
    }
}
