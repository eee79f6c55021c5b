use anyhow::Context;
use clap::{ArgAction, Parser};
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use vm16_core::{Exit, Machine, RunConfig, StdConsole, DATA_SIZE};

#[derive(Parser, Debug)]
#[command(name = "vm16", about = "Run a raw vm16 program image.")]
struct Args {
    /// Program image, copied verbatim to address 0 (at most 4096 bytes).
    #[arg(value_name = "IMAGE", default_value = "vm_file")]
    image: PathBuf,

    /// Fault after this many instructions (0 = unlimited). Overrides VM16_MAX_STEPS.
    #[arg(long, value_name = "N")]
    max_steps: Option<u64>,

    /// Log every instruction before it executes. Overrides VM16_TRACE.
    #[arg(long, default_value_t = false)]
    trace: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Write a JSON register/stack snapshot here once the machine stops.
    #[arg(long, value_name = "PATH")]
    dump_state: Option<PathBuf>,

    /// Print a linear disassembly of the image instead of running it.
    #[arg(long, default_value_t = false)]
    disassemble: bool,
}

fn log_level(args: &Args) -> LevelFilter {
    if args.trace {
        return LevelFilter::Trace;
    }
    match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    SimpleLogger::new()
        .with_level(log_level(&args))
        .env()
        .init()?;

    let mut config = RunConfig::from_env()?;
    if let Some(limit) = args.max_steps {
        config = config.with_max_steps(Some(limit));
    }
    if args.trace {
        config = config.with_trace(true);
    }

    let mut machine = Machine::from_file(&args.image)
        .with_context(|| format!("loading {}", args.image.display()))?
        .with_config(config);

    if args.disassemble {
        let len = fs::metadata(&args.image)?.len().min(DATA_SIZE as u64) as u16;
        for item in machine.disassemble(len) {
            match item {
                Ok(instr) => println!("{:04X}  {instr}", instr.addr),
                Err(fault) => {
                    println!("; stopped: {fault}");
                    break;
                }
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut console = StdConsole::stdio();
    let summary = machine.run(&mut console);
    info!("stopped after {} steps", summary.steps);

    if let Some(path) = &args.dump_state {
        machine
            .snapshot()
            .save(path)
            .with_context(|| format!("writing snapshot to {}", path.display()))?;
    }

    match summary.exit {
        Exit::Halted => Ok(ExitCode::SUCCESS),
        Exit::Faulted(fault) => {
            error!("{fault}");
            Ok(ExitCode::FAILURE)
        }
    }
}
