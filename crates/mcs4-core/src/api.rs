//! Public host-facing API contracts for embedding the emulator core.

use std::sync::{Arc, Mutex};

use crate::encoding::Mnemonic;
use crate::memory::{MemorySystem, RamLines};
use crate::state::{RegisterFile, RunState, StackOverflowPolicy, INDEX_REGISTER_COUNT};
use crate::word::{Address, Byte, Nibble};
use crate::FaultCode;

/// Default machine-cycle budget of one `Run` slice.
pub const DEFAULT_RUN_CYCLE_BUDGET: u64 = 12_500;

/// Top-level configuration for a core instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CoreConfig {
    /// Machine cycles executed by one [`RunMode::Run`] slice.
    pub run_cycle_budget: u64,
    /// Behavior of a call that finds the return stack full.
    pub stack_overflow: StackOverflowPolicy,
    /// Enables trace sink dispatch.
    pub tracing_enabled: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            run_cycle_budget: DEFAULT_RUN_CYCLE_BUDGET,
            stack_overflow: StackOverflowPolicy::EvictOldest,
            tracing_enabled: false,
        }
    }
}

/// Cycle and instruction counters since the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Counters {
    /// Machine cycles consumed.
    pub cycles: u64,
    /// Instructions retired.
    pub instructions: u64,
}

/// Complete machine state owned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoreState {
    /// Processor registers.
    pub registers: RegisterFile,
    /// ROM, RAM, and chip-select lines.
    pub memory: MemorySystem,
    /// Current execution state.
    pub run_state: RunState,
    /// Counters zeroed by reset.
    pub counters: Counters,
}

impl CoreState {
    /// Applies canonical reset semantics.
    ///
    /// Registers, RAM, ports, bank selection, counters, and run state return to
    /// power-on values. The ROM program image is preserved.
    pub fn reset_canonical(&mut self) {
        self.registers.reset();
        self.memory.reset();
        self.run_state = RunState::Ready;
        self.counters = Counters::default();
    }
}

/// Engine run modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RunMode {
    /// Execute exactly one instruction.
    Step,
    /// Execute up to [`CoreConfig::run_cycle_budget`] machine cycles.
    Run,
    /// Execute until the program counter lands on a breakpoint; one `Run` slice when none are set.
    Breakpoint,
}

/// Status from one instruction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// Instruction retired.
    Retired {
        /// Address the instruction was fetched from.
        pc: Address,
        /// Retired mnemonic.
        mnemonic: Mnemonic,
        /// Machine cycles consumed.
        cycles: u8,
    },
    /// A terminate request is pending; nothing was executed.
    Terminated,
}

/// Why a multi-instruction run returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StopReason {
    /// A single step completed.
    Stepped,
    /// The cycle limit was reached or crossed.
    CycleBudget,
    /// The program counter reached a breakpoint.
    Breakpoint(Address),
    /// A terminate request was observed between instructions.
    Terminated,
}

/// Aggregated outcome from one run call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RunOutcome {
    /// Instructions retired during this call.
    pub instructions: u64,
    /// Machine cycles consumed during this call.
    pub cycles: u64,
    /// Boundary that ended the call.
    pub stop: StopReason,
}

/// Read-only view of the machine for display and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Snapshot {
    /// Accumulator.
    pub accumulator: Nibble,
    /// Carry/link flag.
    pub carry: bool,
    /// TEST input.
    pub test: bool,
    /// `R0..R15`.
    pub index_registers: [Nibble; INDEX_REGISTER_COUNT],
    /// Active program counter.
    pub pc: Address,
    /// Saved return addresses, oldest first.
    pub return_stack: Vec<Address>,
    /// Bank number last designated by `DCL` (code `011` is bank 4, `100` is bank 3).
    pub ram_bank: u8,
    /// Active CM-RAM lines.
    pub ram_lines: RamLines,
    /// Address latched by the last `SRC`.
    pub src_address: Byte,
    /// Active CM-ROM chip.
    pub rom_chip: Nibble,
    /// Counters since reset.
    pub counters: Counters,
    /// Engine run state.
    pub run_state: RunState,
}

impl Snapshot {
    /// Captures the current state.
    #[must_use]
    pub fn capture(state: &CoreState) -> Self {
        let registers = &state.registers;
        let control = &state.memory.control;
        Self {
            accumulator: registers.accumulator(),
            carry: registers.carry(),
            test: registers.test(),
            index_registers: registers.index_registers(),
            pc: registers.pc(),
            return_stack: registers.stack().entries().to_vec(),
            ram_bank: control.ram_bank().bank_number(),
            ram_lines: control.ram_lines(),
            src_address: control.src().value(),
            rom_chip: control.rom_chip(),
            counters: state.counters,
            run_state: state.run_state,
        }
    }
}

/// Events emitted to a [`TraceSink`] when tracing is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// An instruction retired.
    InstructionRetired {
        /// Address it was fetched from.
        pc: Address,
        /// Raw encoding (first byte high for two-word forms).
        raw: u16,
        /// Mnemonic.
        mnemonic: Mnemonic,
        /// Machine cycles consumed.
        cycles: u8,
        /// Accumulator after retirement.
        accumulator: Nibble,
        /// Carry after retirement.
        carry: bool,
    },
    /// A call discarded the oldest return address.
    ReturnAddressEvicted {
        /// Discarded address.
        address: Address,
    },
    /// A fault latched.
    FaultRaised {
        /// Fault code.
        cause: FaultCode,
        /// Program counter of the faulting instruction.
        pc: Address,
    },
}

/// Sink trait for execution trace hooks.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent);
}

impl<T: TraceSink> TraceSink for Arc<Mutex<T>> {
    fn on_event(&mut self, event: TraceEvent) {
        if let Ok(mut sink) = self.lock() {
            sink.on_event(event);
        }
    }
}
