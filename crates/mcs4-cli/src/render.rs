//! Text and JSON rendering of run results.

use std::fmt::Write;

use anyhow::Result;
use mcs4_core::{elapsed_nanos, DisassemblyRow, RunOutcome, Snapshot, StopReason, CLOCK_HZ};
use serde::Serialize;

#[derive(Serialize)]
struct Report<'a> {
    outcome: &'a RunOutcome,
    snapshot: &'a Snapshot,
}

pub fn json_report(outcome: &RunOutcome, snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Report { outcome, snapshot })?)
}

fn stop_text(stop: StopReason) -> String {
    match stop {
        StopReason::Stepped => "stepped".to_owned(),
        StopReason::CycleBudget => "cycle budget reached".to_owned(),
        StopReason::Breakpoint(address) => format!("breakpoint at {address}"),
        StopReason::Terminated => "terminated".to_owned(),
    }
}

pub fn text_report(outcome: &RunOutcome, snapshot: &Snapshot) -> String {
    let mut out = format!(
        "stop: {} ({} instructions, {} cycles)\n",
        stop_text(outcome.stop),
        outcome.instructions,
        outcome.cycles
    );
    let _ = writeln!(
        out,
        "elapsed: {} us at {} kHz",
        elapsed_nanos(outcome.cycles) / 1_000,
        CLOCK_HZ / 1_000
    );
    out.push_str(&snapshot_text(snapshot));
    out
}

pub fn snapshot_text(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "PC={}  ACC={}  CY={}  TEST={}",
        snapshot.pc,
        snapshot.accumulator,
        u8::from(snapshot.carry),
        u8::from(snapshot.test)
    );
    let registers: Vec<String> = snapshot
        .index_registers
        .iter()
        .map(ToString::to_string)
        .collect();
    let _ = writeln!(out, "R0-R15: {}", registers.join(" "));
    let stack: Vec<String> = snapshot.return_stack.iter().map(ToString::to_string).collect();
    let _ = writeln!(out, "stack: [{}]", stack.join(", "));
    let _ = writeln!(
        out,
        "ram bank: {} (lines {:04b})  src: {}  rom chip: {}",
        snapshot.ram_bank,
        snapshot.ram_lines.bits(),
        snapshot.src_address,
        snapshot.rom_chip
    );
    let _ = writeln!(
        out,
        "cycles: {}  instructions: {}  state: {:?}",
        snapshot.counters.cycles, snapshot.counters.instructions, snapshot.run_state
    );
    out
}

pub fn listing(rows: &[DisassemblyRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let raw = if row.len_words == 2 {
            format!("{:04X}", row.raw)
        } else {
            format!("{:02X}  ", row.raw)
        };
        let _ = writeln!(out, "{}: {raw}  {}", row.address, row.text);
    }
    out
}
