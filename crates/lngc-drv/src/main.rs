//! The `lang` command-line front.
//!
//! Dispatches to the compiler and the VM:
//!
//! - `lang build <file>` compiles `<file>` into `<file>.vm`;
//! - `lang asm <file>` compiles and prints a disassembly;
//! - `lang run <file>` executes a compiled image;
//! - `lang help` prints usage.
//!
//! Exit codes: 0 on success, 1 on any error (including unknown
//! commands), or whatever integer the executed program passed to
//! `exit()`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

use lngc_bc::ProgramImage;
use lngc_util::Handler;
use lngc_vm::Vm;

/// The lng language compiler and virtual machine.
#[derive(Parser, Debug)]
#[command(name = "lang")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compiler and virtual machine for the lng language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile <file>, writing the program image to <file>.vm
    Build {
        /// Source file to compile
        file: PathBuf,
    },

    /// Compile <file> and print a human-readable disassembly
    Asm {
        /// Source file to compile
        file: PathBuf,
    },

    /// Execute a compiled program image
    Run {
        /// Image file to execute
        file: PathBuf,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            // `lang help`, `--help`, and `--version` are successes.
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{}", err);
                process::exit(0);
            },
            // Unknown commands and missing operands print usage and
            // fail with exit code 1.
            _ => {
                eprint!("{}", err);
                process::exit(1);
            },
        },
    };

    let code = match cli.command {
        Commands::Build { file } => cmd_build(&file),
        Commands::Asm { file } => cmd_asm(&file),
        Commands::Run { file } => cmd_run(&file),
    };

    match code {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            process::exit(1);
        },
    }
}

/// `lang build <file>`
fn cmd_build(file: &Path) -> anyhow::Result<i32> {
    let handler = Handler::new();
    let image = match lngc_drv::compile_file(file, &handler) {
        Ok(image) => image,
        Err(diagnostic) => {
            eprintln!("{}", diagnostic);
            return Ok(1);
        },
    };

    let output = format!("{}.vm", file.display());
    fs::write(&output, image.to_bytes())
        .with_context(|| format!("cannot write {}", output))?;

    Ok(0)
}

/// `lang asm <file>`
fn cmd_asm(file: &Path) -> anyhow::Result<i32> {
    let handler = Handler::new();
    let image = match lngc_drv::compile_file(file, &handler) {
        Ok(image) => image,
        Err(diagnostic) => {
            eprintln!("{}", diagnostic);
            return Ok(1);
        },
    };

    print!("{}", lngc_gen::disassemble(&image));
    Ok(0)
}

/// `lang run <file>`
fn cmd_run(file: &Path) -> anyhow::Result<i32> {
    let bytes =
        fs::read(file).with_context(|| format!("no such file {}", file.display()))?;

    let image = match ProgramImage::from_bytes(&bytes) {
        Ok(image) => image,
        Err(err) => {
            eprintln!("{}", err);
            return Ok(1);
        },
    };

    let mut vm = Vm::new(image);
    match vm.run() {
        Ok(code) => Ok(code),
        Err(panic) => {
            match vm.position_string() {
                Some(position) => eprintln!("{}: panic: {}", position, panic),
                None => eprintln!("panic: {}", panic),
            }
            for frame in vm.backtrace() {
                eprintln!("{}", frame);
            }
            Ok(1)
        },
    }
}
