//! Run-mode coordinator over the fetch/execute pipeline.
//!
//! [`EmulatorEngine`] owns the machine state and drives [`step_one`] under the
//! three run modes. Termination is cooperative: the flag is sampled between
//! instructions, never inside one. A fault latches and is returned by every
//! later `step`/`run` until [`EmulatorEngine::reset`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info};

use crate::api::{
    CoreConfig, CoreState, RunMode, RunOutcome, Snapshot, StepOutcome, StopReason, TraceEvent,
    TraceSink,
};
use crate::execute::{step_one, Retired};
use crate::fault::EmulatorError;
use crate::fetch::FetchMachine;
use crate::memory::RamImage;
use crate::state::RunState;
use crate::word::{Address, Nibble};

/// Cloneable handle that requests termination from another thread.
#[derive(Debug, Clone)]
pub struct TerminateHandle(Arc<AtomicBool>);

impl TerminateHandle {
    /// Requests that the engine stop before its next instruction.
    pub fn terminate(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a terminate request is pending.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Emulator instance: machine state, configuration, and run control.
pub struct EmulatorEngine {
    state: CoreState,
    config: CoreConfig,
    fetch: FetchMachine,
    breakpoints: BTreeSet<Address>,
    terminate: Arc<AtomicBool>,
    latched: Option<EmulatorError>,
    trace: Option<Box<dyn TraceSink + Send>>,
}

impl fmt::Debug for EmulatorEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmulatorEngine")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("breakpoints", &self.breakpoints)
            .field("latched", &self.latched)
            .finish_non_exhaustive()
    }
}

impl Default for EmulatorEngine {
    fn default() -> Self {
        Self::new(CoreConfig::default())
    }
}

impl EmulatorEngine {
    /// Creates a machine in its power-on state.
    #[must_use]
    pub fn new(config: CoreConfig) -> Self {
        Self {
            state: CoreState::default(),
            config,
            fetch: FetchMachine::new(),
            breakpoints: BTreeSet::new(),
            terminate: Arc::new(AtomicBool::new(false)),
            latched: None,
            trace: None,
        }
    }

    /// Machine state.
    #[must_use]
    pub const fn state(&self) -> &CoreState {
        &self.state
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Read-only view for display and debugging.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state)
    }

    /// The fault that halted the engine, if any.
    #[must_use]
    pub const fn latched_fault(&self) -> Option<&EmulatorError> {
        self.latched.as_ref()
    }

    /// Installs a trace sink; events flow only while `tracing_enabled` is set.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink + Send>) {
        self.trace = Some(sink);
    }

    /// Removes the trace sink.
    pub fn clear_trace_sink(&mut self) {
        self.trace = None;
    }

    /// Writes `bytes` into ROM starting at `base`, crossing banks as needed.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] when the image does not fit
    /// below address 4096; ROM is unchanged in that case.
    pub fn load_rom_image(&mut self, bytes: &[u8], base: usize) -> Result<(), EmulatorError> {
        self.state.memory.rom.load_image(bytes, base)
    }

    /// Copies out one RAM bank's characters.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for bank indices above 15.
    pub fn read_ram_bank(&self, index: usize) -> Result<RamImage, EmulatorError> {
        Ok(self.state.memory.ram.bank(index)?.image())
    }

    /// Replaces one RAM bank's characters; the output port is kept.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for bank indices above 15.
    pub fn load_ram_image(&mut self, index: usize, image: RamImage) -> Result<(), EmulatorError> {
        self.state.memory.ram.bank_mut(index)?.load_image(image);
        info!("loaded RAM bank {index}");
        Ok(())
    }

    /// Drives the TEST input pin.
    pub const fn set_test(&mut self, level: bool) {
        self.state.registers.set_test(level);
    }

    /// Drives a ROM chip's I/O port as seen by `RDR`.
    ///
    /// # Errors
    ///
    /// Returns [`EmulatorError::AddressOutOfRange`] for chip indices above 15.
    pub fn set_rom_port_input(&mut self, chip: usize, value: Nibble) -> Result<(), EmulatorError> {
        self.state.memory.rom.bank_mut(chip)?.set_io_port(value);
        Ok(())
    }

    /// Adds a breakpoint address used by [`RunMode::Breakpoint`].
    pub fn add_breakpoint(&mut self, address: Address) -> bool {
        self.breakpoints.insert(address)
    }

    /// Removes a breakpoint address.
    pub fn remove_breakpoint(&mut self, address: Address) -> bool {
        self.breakpoints.remove(&address)
    }

    /// Removes every breakpoint.
    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    /// Breakpoint set used by [`RunMode::Breakpoint`].
    #[must_use]
    pub const fn breakpoints(&self) -> &BTreeSet<Address> {
        &self.breakpoints
    }

    /// Handle for terminating the engine from another thread.
    #[must_use]
    pub fn terminate_handle(&self) -> TerminateHandle {
        TerminateHandle(Arc::clone(&self.terminate))
    }

    /// Requests termination; the flag stays set until [`Self::resume`] or [`Self::reset`].
    pub fn terminate(&mut self) {
        self.terminate.store(true, Ordering::SeqCst);
        if self.state.run_state == RunState::Ready {
            self.state.run_state = RunState::Terminated;
        }
        info!("terminate requested at pc {}", self.state.registers.pc());
    }

    /// Clears a pending terminate request. A latched fault stays latched.
    pub fn resume(&mut self) {
        self.terminate.store(false, Ordering::SeqCst);
        if self.latched.is_none() && self.state.run_state == RunState::Terminated {
            self.state.run_state = RunState::Ready;
        }
    }

    /// Whether a terminate request is pending.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    /// Resumes from termination, then restores power-on state.
    ///
    /// Registers, RAM, ports, bank selection, counters, breakpoints, and any
    /// latched fault are cleared. ROM contents are kept.
    pub fn reset(&mut self) {
        self.resume();
        self.state.reset_canonical();
        self.fetch.abort();
        self.breakpoints.clear();
        self.latched = None;
        info!("core reset");
    }

    /// Executes one instruction.
    ///
    /// # Errors
    ///
    /// Returns the fault raised by the instruction, or the previously latched
    /// fault. State is left as of the last retired instruction.
    pub fn step(&mut self) -> Result<StepOutcome, EmulatorError> {
        if let Some(latched) = &self.latched {
            return Err(latched.clone());
        }
        if self.is_terminated() {
            self.state.run_state = RunState::Terminated;
            return Ok(StepOutcome::Terminated);
        }
        match step_one(&mut self.state, &mut self.fetch, &self.config) {
            Ok(retired) => {
                self.report(&retired);
                Ok(StepOutcome::Retired {
                    pc: retired.pc,
                    mnemonic: retired.instruction.mnemonic(),
                    cycles: retired.cycles,
                })
            }
            Err(fault) => Err(self.latch(fault)),
        }
    }

    /// Executes until at least `cycle_limit` machine cycles have elapsed.
    ///
    /// # Errors
    ///
    /// Returns the first fault raised.
    pub fn run(&mut self, cycle_limit: u64) -> Result<RunOutcome, EmulatorError> {
        self.run_until(cycle_limit, None)
    }

    /// Executes until the program counter after an instruction is in `breakpoints`.
    ///
    /// # Errors
    ///
    /// Returns the first fault raised.
    pub fn run_to_breakpoint(
        &mut self,
        breakpoints: &BTreeSet<Address>,
    ) -> Result<RunOutcome, EmulatorError> {
        self.run_until(u64::MAX, Some(breakpoints))
    }

    /// Like [`Self::run_to_breakpoint`] but gives up after `cycle_limit` cycles.
    ///
    /// # Errors
    ///
    /// Returns the first fault raised.
    pub fn run_to_breakpoint_within(
        &mut self,
        breakpoints: &BTreeSet<Address>,
        cycle_limit: u64,
    ) -> Result<RunOutcome, EmulatorError> {
        self.run_until(cycle_limit, Some(breakpoints))
    }

    /// Dispatches on `mode`: one step, one budgeted slice, or run to a stored breakpoint.
    ///
    /// With no stored breakpoints, `Breakpoint` runs one budgeted slice like `Run`.
    ///
    /// # Errors
    ///
    /// Returns the first fault raised.
    pub fn execute(&mut self, mode: RunMode) -> Result<RunOutcome, EmulatorError> {
        match mode {
            RunMode::Step => {
                let stop = match self.step()? {
                    StepOutcome::Retired { cycles, .. } => {
                        return Ok(RunOutcome {
                            instructions: 1,
                            cycles: u64::from(cycles),
                            stop: StopReason::Stepped,
                        });
                    }
                    StepOutcome::Terminated => StopReason::Terminated,
                };
                Ok(RunOutcome {
                    instructions: 0,
                    cycles: 0,
                    stop,
                })
            }
            RunMode::Run => self.run(self.config.run_cycle_budget),
            RunMode::Breakpoint if self.breakpoints.is_empty() => {
                self.run(self.config.run_cycle_budget)
            }
            RunMode::Breakpoint => {
                let breakpoints = self.breakpoints.clone();
                self.run_to_breakpoint(&breakpoints)
            }
        }
    }

    fn run_until(
        &mut self,
        cycle_limit: u64,
        breakpoints: Option<&BTreeSet<Address>>,
    ) -> Result<RunOutcome, EmulatorError> {
        let mut outcome = RunOutcome {
            instructions: 0,
            cycles: 0,
            stop: StopReason::CycleBudget,
        };
        while outcome.cycles < cycle_limit {
            match self.step()? {
                StepOutcome::Terminated => {
                    outcome.stop = StopReason::Terminated;
                    break;
                }
                StepOutcome::Retired { cycles, .. } => {
                    outcome.instructions += 1;
                    outcome.cycles = outcome.cycles.saturating_add(u64::from(cycles));
                }
            }
            let pc = self.state.registers.pc();
            if breakpoints.is_some_and(|set| set.contains(&pc)) {
                outcome.stop = StopReason::Breakpoint(pc);
                break;
            }
        }
        Ok(outcome)
    }

    fn report(&mut self, retired: &Retired) {
        debug!("{}: {}", retired.pc, retired.instruction);
        if !self.config.tracing_enabled {
            return;
        }
        let Some(sink) = self.trace.as_mut() else {
            return;
        };
        if let Some(address) = retired.evicted {
            sink.on_event(TraceEvent::ReturnAddressEvicted { address });
        }
        sink.on_event(TraceEvent::InstructionRetired {
            pc: retired.pc,
            raw: retired.instruction.raw(),
            mnemonic: retired.instruction.mnemonic(),
            cycles: retired.cycles,
            accumulator: self.state.registers.accumulator(),
            carry: self.state.registers.carry(),
        });
    }

    fn latch(&mut self, fault: EmulatorError) -> EmulatorError {
        let pc = self.state.registers.pc();
        let cause = fault.code();
        error!("fault at pc {pc}: {fault}");
        self.state.run_state = RunState::FaultLatched(cause);
        if self.config.tracing_enabled {
            if let Some(sink) = self.trace.as_mut() {
                sink.on_event(TraceEvent::FaultRaised { cause, pc });
            }
        }
        self.latched = Some(fault.clone());
        fault
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};

    use super::EmulatorEngine;
    use crate::api::{CoreConfig, RunMode, StepOutcome, StopReason};
    use crate::encoding::Mnemonic;
    use crate::fault::FaultCode;
    use crate::state::RunState;
    use crate::trace::InstructionHistory;
    use crate::word::{Address, Nibble};

    fn engine_with(program: &[u8]) -> EmulatorEngine {
        let mut engine = EmulatorEngine::default();
        engine.load_rom_image(program, 0).expect("fits");
        engine
    }

    #[test]
    fn step_reports_retired_instruction() {
        let mut engine = engine_with(&[0xD7]);
        let outcome = engine.step().expect("ldm");
        assert_eq!(
            outcome,
            StepOutcome::Retired {
                pc: Address::ZERO,
                mnemonic: Mnemonic::Ldm,
                cycles: 1,
            }
        );
        assert_eq!(engine.snapshot().accumulator, Nibble::new(7));
    }

    #[test]
    fn run_stops_once_budget_is_reached() {
        // JUN 0x000 loops forever at two cycles per instruction.
        let mut engine = engine_with(&[0x40, 0x00]);
        let outcome = engine.run(7).expect("loop");
        assert_eq!(outcome.stop, StopReason::CycleBudget);
        assert_eq!(outcome.instructions, 4);
        assert_eq!(outcome.cycles, 8);
        assert_eq!(engine.snapshot().counters.cycles, 8);
    }

    #[test]
    fn breakpoint_is_checked_after_each_instruction() {
        let mut engine = engine_with(&[0x00, 0x00, 0x00, 0x40, 0x00]);
        let breakpoints = BTreeSet::from([Address::new(0x002)]);
        let outcome = engine.run_to_breakpoint(&breakpoints).expect("runs");
        assert_eq!(outcome.stop, StopReason::Breakpoint(Address::new(0x002)));
        assert_eq!(outcome.instructions, 2);
    }

    #[test]
    fn terminate_blocks_execution_until_resume() {
        let mut engine = engine_with(&[0x00, 0x00]);
        engine.terminate();
        assert_eq!(engine.step().expect("no fault"), StepOutcome::Terminated);
        let outcome = engine.execute(RunMode::Run).expect("no fault");
        assert_eq!(outcome.stop, StopReason::Terminated);
        assert_eq!(outcome.instructions, 0);
        assert_eq!(engine.state().run_state, RunState::Terminated);

        engine.resume();
        assert_eq!(engine.execute(RunMode::Step).expect("nop").stop, StopReason::Stepped);
    }

    #[test]
    fn terminate_handle_stops_run_loop() {
        let mut engine = engine_with(&[0x40, 0x00]);
        let handle = engine.terminate_handle();
        handle.terminate();
        assert!(engine.is_terminated());
        let outcome = engine.run(1_000).expect("no fault");
        assert_eq!(outcome.stop, StopReason::Terminated);
    }

    #[test]
    fn reset_resumes_and_clears_breakpoints() {
        let mut engine = engine_with(&[0xD5]);
        engine.add_breakpoint(Address::new(0x001));
        engine.step().expect("ldm");
        engine.terminate();

        engine.reset();

        assert!(!engine.is_terminated());
        assert!(engine.breakpoints().is_empty());
        assert_eq!(engine.snapshot().accumulator, Nibble::ZERO);
        assert_eq!(engine.snapshot().counters.instructions, 0);
        assert_eq!(engine.state().run_state, RunState::Ready);
        engine.step().expect("program kept");
        assert_eq!(engine.snapshot().accumulator, Nibble::new(5));
    }

    #[test]
    fn fault_latches_until_reset() {
        let mut engine = engine_with(&[0xC0]);
        let first = engine.step().expect_err("bbl on empty stack");
        assert_eq!(first.code(), FaultCode::StackUnderflow);
        assert_eq!(
            engine.state().run_state,
            RunState::FaultLatched(FaultCode::StackUnderflow)
        );
        assert_eq!(engine.step().expect_err("still latched"), first);
        assert_eq!(engine.latched_fault(), Some(&first));

        engine.reset();
        assert!(engine.latched_fault().is_none());
    }

    #[test]
    fn latched_fault_survives_terminate_and_resume() {
        let mut engine = engine_with(&[0xC0]);
        let fault = engine.step().expect_err("bbl on empty stack");
        let latched = RunState::FaultLatched(FaultCode::StackUnderflow);

        engine.terminate();
        assert_eq!(engine.snapshot().run_state, latched);
        engine.resume();
        assert_eq!(engine.snapshot().run_state, latched);
        assert_eq!(engine.step().expect_err("still latched"), fault);

        engine.reset();
        assert_eq!(engine.snapshot().run_state, RunState::Ready);
    }

    #[test]
    fn breakpoint_mode_without_breakpoints_runs_one_budget() {
        let mut engine = EmulatorEngine::new(CoreConfig {
            run_cycle_budget: 10,
            ..CoreConfig::default()
        });
        engine.load_rom_image(&[0x40, 0x00], 0).expect("fits");
        let outcome = engine.execute(RunMode::Breakpoint).expect("no fault");
        assert_eq!(outcome.stop, StopReason::CycleBudget);
        assert_eq!(outcome.cycles, 10);
    }

    #[test]
    fn trace_sink_sees_retirements_only_when_enabled() {
        let history = Arc::new(Mutex::new(InstructionHistory::default()));
        let mut engine = EmulatorEngine::new(CoreConfig {
            tracing_enabled: true,
            ..CoreConfig::default()
        });
        engine.load_rom_image(&[0xF2, 0xF2], 0).expect("fits");
        engine.set_trace_sink(Box::new(Arc::clone(&history)));
        engine.run(2).expect("two iac");

        let recorded = history.lock().expect("not poisoned");
        let mnemonics: Vec<Mnemonic> = recorded.entries().map(|entry| entry.mnemonic).collect();
        assert_eq!(mnemonics, vec![Mnemonic::Iac, Mnemonic::Iac]);
    }

    #[test]
    fn ram_images_round_trip_through_engine() {
        let mut engine = EmulatorEngine::default();
        let mut image = engine.read_ram_bank(3).expect("bank 3");
        image[1][17] = Nibble::new(0x9);
        engine.load_ram_image(3, image).expect("bank 3");
        assert_eq!(engine.read_ram_bank(3).expect("bank 3")[1][17], Nibble::new(0x9));
        assert_eq!(
            engine.read_ram_bank(16).expect_err("no bank 16").code(),
            FaultCode::AddressOutOfRange
        );
    }
}
