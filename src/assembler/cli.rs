// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Command-line interface for asm86.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use crate::assembler::Assembler;
use crate::core::expr::parse_number;

#[derive(Parser, Debug)]
#[command(
    name = "asm86",
    version,
    about = "Intel-syntax 8086 assembler producing flat binary images"
)]
pub struct Cli {
    /// Assembly source file
    pub input: PathBuf,

    /// Output binary (default: input with .bin extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a listing file
    #[arg(short, long)]
    pub listing: Option<PathBuf>,

    /// Include search directory (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include_paths: Vec<PathBuf>,

    /// Predefine a preprocessor name (NAME or NAME=value, repeatable)
    #[arg(short = 'D', long = "define", value_name = "NAME[=value]")]
    pub defines: Vec<String>,

    /// Load origin used when the source has no ORG (any numeric base)
    #[arg(long)]
    pub org: Option<String>,

    /// Suppress warning diagnostics
    #[arg(long)]
    pub no_warnings: bool,

    /// Print the symbol table after assembling
    #[arg(long)]
    pub symbols: bool,

    /// One of TRACE, DEBUG, INFO, WARN, or ERROR
    #[arg(long, default_value_t = tracing::Level::WARN)]
    pub log_level: tracing::Level,
}

/// Run the assembler with command-line arguments.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let mut assembler = Assembler::new();

    if let Some(org) = &cli.org {
        match parse_number(org) {
            Some(value) if value >= 0 => assembler.set_origin(value as u64),
            _ => {
                eprintln!("asm86: invalid origin: {org}");
                return ExitCode::FAILURE;
            }
        }
    }
    assembler.set_include_paths(cli.include_paths.clone());
    for define in &cli.defines {
        match define.split_once('=') {
            Some((name, value)) => assembler.define(name, value),
            None => assembler.define(define, "1"),
        }
    }
    assembler.enable_warnings(!cli.no_warnings);

    let result = assembler.assemble_file(&cli.input);
    for diagnostic in &result.errors {
        eprintln!("{diagnostic}");
    }
    if !result.success {
        return ExitCode::FAILURE;
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("bin"));
    if let Err(err) = result.write_binary(&output) {
        eprintln!("asm86: could not write {}: {err}", output.display());
        return ExitCode::FAILURE;
    }
    tracing::info!(bytes = result.binary.len(), output = %output.display(), "wrote binary");

    if let Some(listing_path) = &cli.listing {
        if let Err(err) = fs::write(listing_path, result.listing_text()) {
            eprintln!("asm86: could not write {}: {err}", listing_path.display());
            return ExitCode::FAILURE;
        }
    }

    if cli.symbols {
        for (name, address) in &result.symbols {
            println!("{name:<16} = {address:04X}");
        }
    }

    ExitCode::SUCCESS
}
