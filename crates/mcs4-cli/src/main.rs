//! CLI entry point for the `mcs4-run` binary.

mod render;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use mcs4_core::{
    disassemble_range, Address, CoreConfig, EmulatorEngine, LogTraceSink, RunMode, RunOutcome,
    StopReason, ROM_SIZE,
};
#[cfg(test)]
use tempfile as _;

/// Run 4004 ROM images and inspect the resulting machine state.
#[derive(Debug, Parser)]
#[command(name = "mcs4-run", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a raw ROM image and execute it.
    Run(RunArgs),
    /// List the instructions of a raw ROM image.
    Disasm(DisasmArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Step,
    Run,
    Breakpoint,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Step => Self::Step,
            ModeArg::Run => Self::Run,
            ModeArg::Breakpoint => Self::Breakpoint,
        }
    }
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Raw ROM image (one byte per ROM word).
    rom: PathBuf,

    /// ROM address the image is loaded at.
    #[arg(long, default_value = "0", value_parser = parse_address)]
    base: Address,

    /// Run mode.
    #[arg(short, long, value_enum, default_value_t = ModeArg::Run)]
    mode: ModeArg,

    /// Number of instructions in step mode.
    #[arg(long, default_value_t = 1)]
    steps: u64,

    /// Machine-cycle budget; overrides the configuration file.
    #[arg(short, long)]
    cycles: Option<u64>,

    /// Breakpoint address (repeatable).
    #[arg(short, long = "breakpoint", value_parser = parse_address)]
    breakpoints: Vec<Address>,

    /// JSON file deserialized into the core configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Forward retired instructions to the trace log.
    #[arg(long)]
    trace: bool,

    /// Print the final state as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, clap::Args)]
struct DisasmArgs {
    /// Raw ROM image.
    rom: PathBuf,

    /// ROM address the image is loaded at.
    #[arg(long, default_value = "0", value_parser = parse_address)]
    base: Address,

    /// First address to list.
    #[arg(long, value_parser = parse_address)]
    start: Option<Address>,

    /// Number of instructions to list; defaults to the image length.
    #[arg(short = 'n', long)]
    count: Option<usize>,
}

fn parse_address(text: &str) -> Result<Address, String> {
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => text.parse::<u16>(),
    }
    .map_err(|err| format!("invalid address {text:?}: {err}"))?;
    Address::try_new(value).ok_or_else(|| format!("address {text} exceeds 0xFFF"))
}

fn init_logging(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )
    .context("failed to initialise logging")
}

fn read_rom(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read ROM image {}", path.display()))?;
    if bytes.len() > ROM_SIZE {
        bail!(
            "ROM image {} is {} bytes; at most {ROM_SIZE} fit",
            path.display(),
            bytes.len()
        );
    }
    Ok(bytes)
}

fn load_config(args: &RunArgs) -> Result<CoreConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => CoreConfig::default(),
    };
    if let Some(cycles) = args.cycles {
        config.run_cycle_budget = cycles;
    }
    config.tracing_enabled |= args.trace;
    Ok(config)
}

fn execute(engine: &mut EmulatorEngine, args: &RunArgs) -> Result<RunOutcome> {
    let breakpoints: BTreeSet<Address> = args.breakpoints.iter().copied().collect();
    let outcome = match RunMode::from(args.mode) {
        RunMode::Step => {
            let mut total = RunOutcome {
                instructions: 0,
                cycles: 0,
                stop: StopReason::Stepped,
            };
            for _ in 0..args.steps {
                let step = engine.execute(RunMode::Step)?;
                total.instructions += step.instructions;
                total.cycles += step.cycles;
                total.stop = step.stop;
                if step.stop == StopReason::Terminated {
                    break;
                }
            }
            total
        }
        RunMode::Run => engine.execute(RunMode::Run)?,
        RunMode::Breakpoint => {
            if breakpoints.is_empty() {
                bail!("breakpoint mode needs at least one --breakpoint");
            }
            let limit = engine.config().run_cycle_budget;
            engine.run_to_breakpoint_within(&breakpoints, limit)?
        }
    };
    Ok(outcome)
}

fn run(args: &RunArgs) -> Result<()> {
    let rom = read_rom(&args.rom)?;
    let config = load_config(args)?;
    let mut engine = EmulatorEngine::new(config);
    engine
        .load_rom_image(&rom, usize::from(args.base.value()))
        .with_context(|| format!("ROM image does not fit at {}", args.base))?;
    if args.trace {
        engine.set_trace_sink(Box::new(LogTraceSink));
    }
    for address in &args.breakpoints {
        engine.add_breakpoint(*address);
    }
    info!("loaded {} bytes from {}", rom.len(), args.rom.display());

    let result = execute(&mut engine, args);
    let snapshot = engine.snapshot();
    match result {
        Ok(outcome) => {
            if args.json {
                println!("{}", render::json_report(&outcome, &snapshot)?);
            } else {
                print!("{}", render::text_report(&outcome, &snapshot));
            }
            Ok(())
        }
        Err(err) => {
            eprint!("{}", render::snapshot_text(&snapshot));
            Err(err.context(format!("execution halted at {}", snapshot.pc)))
        }
    }
}

fn disasm(args: &DisasmArgs) -> Result<()> {
    let rom = read_rom(&args.rom)?;
    let mut engine = EmulatorEngine::default();
    engine
        .load_rom_image(&rom, usize::from(args.base.value()))
        .with_context(|| format!("ROM image does not fit at {}", args.base))?;
    let start = args.start.unwrap_or(args.base);
    let count = args.count.unwrap_or(rom.len());
    let rows = disassemble_range(&engine.state().memory.rom, start, count);
    print!("{}", render::listing(&rows));
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(cli.verbose) {
        eprintln!("warning: {err:#}");
    }
    let result = match &cli.command {
        Command::Run(args) => run(args),
        Command::Disasm(args) => disasm(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
