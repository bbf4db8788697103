//! Processor state model: register file, accumulator arithmetic, run state.

/// 5-bit accumulator/carry arithmetic helpers.
pub mod alu;
/// Register file types and storage model.
pub mod registers;
/// Engine run-state machine.
pub mod run_state;

pub use alu::CarryWord;
pub use registers::{
    IndexRegister, RegisterFile, RegisterPair, ReturnStack, StackOverflowPolicy,
    INDEX_REGISTER_COUNT, REGISTER_PAIR_COUNT, RETURN_STACK_DEPTH,
};
pub use run_state::RunState;
