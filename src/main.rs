use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::exit;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use colored::Colorize;

use bfpack::compiler;
use bfpack::disasm;
use bfpack::vm::{self, Env, ExecOutcome};

#[derive(Parser)]
#[clap(version, about, subcommand_required = true, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and run a brainf*ck source file
    Run {
        /// Path to the brainf*ck source
        path: PathBuf,

        /// Disable the `@` breakpoint operator
        #[arg(long)]
        no_breakpoints: bool,

        /// Print the compiled disassembly to stderr before running
        #[arg(short = 'A', long)]
        disasm: bool,

        /// Read program input from this file instead of stdin
        input: Option<PathBuf>,
    },

    /// Compile a source file and print its disassembly
    Disasm {
        path: PathBuf,

        #[arg(long)]
        no_breakpoints: bool,
    },
}

fn info(msg: impl std::fmt::Display) {
    eprintln!("[{}]: {msg}", "INFO".blue());
}

fn warn(msg: impl std::fmt::Display) {
    eprintln!("[{}]: {msg}", "WARNING".yellow());
}

fn error(msg: impl std::fmt::Display) {
    eprintln!("[{}]: {msg}", "ERROR".red());
}

fn read_source(path: &PathBuf) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("cannot load file content at {}", path.display()))
}

fn input_reader(path: Option<&PathBuf>) -> anyhow::Result<Box<dyn Read>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("cannot open input file {}", path.display()))?,
        )),
        None => Box::new(io::stdin()),
    })
}

fn run_cmd(path: PathBuf, no_breakpoints: bool, disasm_first: bool, input: Option<PathBuf>) -> anyhow::Result<()> {
    let source = read_source(&path)?;
    if source.is_empty() {
        warn("provided empty file");
        return Ok(());
    }

    compiler::verify(&source)?;
    let program = compiler::compile(&source, !no_breakpoints)?;

    if disasm_first {
        eprint!("{}", disasm::dump_instructions(&program));
    }

    let mut reader = input_reader(input.as_ref())?;
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    let mut env = Env::new(
        || {
            let mut byte = [0u8; 1];
            if reader.read_exact(&mut byte).is_ok() { byte[0] } else { 0 }
        },
        |byte| {
            let _ = stdout.write_all(&[byte]);
        },
    );

    // A context must be supplied for BREAKPOINT to suspend execution
    // at all; an empty one is enough to opt in from the first run.
    let mut ctx = Some(vm::Context::new());
    loop {
        match vm::execute(&program, &mut env, ctx)? {
            ExecOutcome::Halted => return Ok(()),
            ExecOutcome::Breakpoint(suspended) => {
                stdout.flush().ok();
                info("breakpoint hit, dumping local memory:");
                eprint!("{}", disasm::dump_tape_window(&suspended.tape, suspended.mc));
                ctx = Some(suspended);
            }
        }
    }
}

fn disasm_cmd(path: PathBuf, no_breakpoints: bool) -> anyhow::Result<()> {
    let source = read_source(&path)?;
    compiler::verify(&source)?;
    let program = compiler::compile(&source, !no_breakpoints)?;
    print!("{}", disasm::dump_instructions(&program));
    Ok(())
}

fn entry() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { path, no_breakpoints, disasm, input } => {
            run_cmd(path, no_breakpoints, disasm, input)?
        }
        Commands::Disasm { path, no_breakpoints } => disasm_cmd(path, no_breakpoints)?,
    }
    Ok(())
}

fn main() {
    if let Err(err) = entry() {
        error(format!("{err:?}"));
        exit(1);
    }
}
