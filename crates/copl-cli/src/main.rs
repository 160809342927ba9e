// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! `copl` — the command-line driver for the Copl toolchain (§6).
//!
//! Three run modes, matching the original's `-r`/`-c`/`-d` flags:
//!
//! - `copl -r file.copl` loads and runs a compiled bytecode file.
//! - `copl -c source.cpl` compiles source to `source.copl`.
//! - `copl -d file.copl` disassembles a compiled bytecode file.
//!
//! Exit code `0` on success, `1` on any fatal error (the spec's literal
//! `-1` clamped to Rust's `u8` process exit code range — see DESIGN.md).

use clap::{Parser, Subcommand};
use copl_vm::{RuntimeError, StdIo, Vm};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "copl", author, version, about = "Compiler and virtual machine for the Copl language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Raise tracing verbosity; repeat for more detail (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all logging below errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run a compiled bytecode file.
    #[command(name = "-r")]
    Run {
        /// Path to a `.copl` bytecode file.
        file: PathBuf,
    },
    /// Compile a source file to bytecode.
    #[command(name = "-c")]
    Compile {
        /// Path to a Copl source file.
        file: PathBuf,
    },
    /// Disassemble a compiled bytecode file.
    #[command(name = "-d")]
    Disassemble {
        /// Path to a `.copl` bytecode file.
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Run { file } => run(&file),
        Command::Compile { file } => compile(&file),
        Command::Disassemble { file } => disassemble(&file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("copl: {err:#}");
            // The spec's CLI contract is exit code -1 on any fatal error;
            // Rust's `ExitCode` is a `u8`, so `1` is the closest faithful
            // non-zero signal (see DESIGN.md, Open Question resolution).
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run(file: &Path) -> anyhow::Result<()> {
    let f = File::open(file).map_err(|e| anyhow::anyhow!("failed to open '{}': {e}", file.display()))?;
    let mut reader = BufReader::new(f);
    let program = copl_core::bytecode::read_program(&mut reader)?;
    tracing::info!(path = %file.display(), functions = program.functions.len(), "loaded bytecode");

    let mut vm = Vm::new(program);
    let mut io = StdIo::new();
    let code = vm.run(&mut io).map_err(runtime_error_to_anyhow)?;

    // Matches the original's `exit(code)` from the top-of-stack operand to
    // `HALT`: the process mirrors whatever the script requested.
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn compile(file: &Path) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(file).map_err(|e| anyhow::anyhow!("failed to read '{}': {e}", file.display()))?;
    let ast = copl_parser::parse(&source)?;
    let output = copl_compiler::compile(&ast)?;

    let out_path = file.with_extension("copl");
    let out_file = File::create(&out_path).map_err(|e| anyhow::anyhow!("failed to create '{}': {e}", out_path.display()))?;
    let mut writer = BufWriter::new(out_file);
    copl_core::bytecode::write_program(&mut writer, &output.program)?;
    writer.flush()?;

    tracing::info!(
        source = %file.display(),
        output = %out_path.display(),
        functions = output.program.functions.len(),
        "compiled"
    );
    println!("wrote {}", out_path.display());
    Ok(())
}

fn disassemble(file: &Path) -> anyhow::Result<()> {
    let f = File::open(file).map_err(|e| anyhow::anyhow!("failed to open '{}': {e}", file.display()))?;
    let mut reader = BufReader::new(f);
    let program = copl_core::bytecode::read_program(&mut reader)?;
    print!("{}", copl_vm::disassemble::disassemble_program(&program));
    Ok(())
}

fn runtime_error_to_anyhow(err: RuntimeError) -> anyhow::Error {
    anyhow::Error::new(err)
}
