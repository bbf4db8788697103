//! Logical emulator core for the MCS-4 chip set: the 4004 CPU with 4001 ROM and 4002 RAM.

/// Fixed-width nibble, byte, and address containers.
pub mod word;
pub use word::{Address, Byte, Nibble};

/// Fault taxonomy and the error type every fallible operation returns.
pub mod fault;
pub use fault::{AddressSpace, EmulatorError, FaultClass, FaultCode};

/// ROM banks, RAM banks, and the chip-select lines that route between them.
pub mod memory;
pub use memory::{
    ControlLines, DclCode, MemorySystem, RamBank, RamImage, RamLines, RamSpace, RomBank,
    RomSpace, SrcAddress, DCL_TABLE, RAM_BANK_COUNT, ROM_BANK_COUNT, ROM_BANK_SIZE, ROM_SIZE,
};

/// Processor registers, return stack, and accumulator arithmetic.
pub mod state;
pub use state::{
    CarryWord, IndexRegister, RegisterFile, RegisterPair, ReturnStack, RunState,
    StackOverflowPolicy, INDEX_REGISTER_COUNT, REGISTER_PAIR_COUNT, RETURN_STACK_DEPTH,
};

/// Static opcode table and pattern lookup.
pub mod encoding;
pub use encoding::{
    classify_length, descriptors, lookup, InstructionDescriptor, LengthClass, Mnemonic,
    OperandLayout, WordLength, INSTRUCTION_TABLE,
};

/// Operand field extraction over resolved table entries.
pub mod decoder;
pub use decoder::{decode, DecodedInstruction, JumpCondition};

/// Nibble-serial instruction fetch.
pub mod fetch;
pub use fetch::{FetchMachine, FetchPhase, FetchStatus};

/// Machine-cycle costs and clock constants.
pub mod timing;
pub use timing::{
    cycle_cost, elapsed_nanos, machine_cycles, CycleCostKind, CLOCKS_PER_MACHINE_CYCLE, CLOCK_HZ,
    CYCLE_COST_TABLE,
};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{commit_execution, execute_instruction, step_one, ExecuteState, Retired};

/// Public host-facing API contract and integration types.
pub mod api;
pub use api::{
    CoreConfig, CoreState, Counters, RunMode, RunOutcome, Snapshot, StepOutcome, StopReason,
    TraceEvent, TraceSink, DEFAULT_RUN_CYCLE_BUDGET,
};

/// Run-mode coordinator.
pub mod engine;
pub use engine::{EmulatorEngine, TerminateHandle};

/// Assembly text rendering.
pub mod disasm;
pub use disasm::{disassemble_one, disassemble_range, DisassemblyRow};

/// Ready-made trace sinks.
pub mod trace;
pub use trace::{HistoryEntry, InstructionHistory, LogTraceSink};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
