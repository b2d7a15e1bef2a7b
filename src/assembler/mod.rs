// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Main assembler entry point.
//!
//! Ties the pipeline together: preprocess, parse, analyze, emit. Per-run
//! state is constructed fresh inside [`Assembler::assemble`], so one
//! instance can assemble any number of inputs; nothing leaks between runs.

pub mod cli;

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::codegen::emitter;
use crate::core::error::{Diagnostic, ErrorReporter, Severity, SourceLocation};
use crate::core::listing::{self, ListingEntry};
use crate::core::parser::parse_program;
use crate::core::preprocess::Preprocessor;
use crate::core::symbol_table::SymbolKind;
use crate::semantic::SemanticAnalyzer;

/// Result of one assembly run: the flat image plus everything needed to
/// inspect it.
#[derive(Debug, Default)]
pub struct AssemblyResult {
    pub binary: Vec<u8>,
    pub listing: Vec<ListingEntry>,
    /// Label name (fully qualified) to address.
    pub symbols: BTreeMap<String, u64>,
    pub errors: Vec<Diagnostic>,
    pub success: bool,
    pub origin_address: u64,
}

impl AssemblyResult {
    /// `ADDR | bytes | source` listing text.
    #[must_use]
    pub fn listing_text(&self) -> String {
        listing::format_listing(&self.listing)
    }

    pub fn write_binary(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(&self.binary)
    }
}

/// The assembler facade. Configure once, assemble many times.
#[derive(Debug, Clone)]
pub struct Assembler {
    origin: u64,
    include_paths: Vec<PathBuf>,
    defines: Vec<(String, String)>,
    warnings_enabled: bool,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: 0,
            include_paths: Vec::new(),
            defines: Vec::new(),
            warnings_enabled: true,
        }
    }

    /// Fallback origin used when the source has no ORG directive.
    pub fn set_origin(&mut self, origin: u64) {
        self.origin = origin;
    }

    pub fn set_include_paths(&mut self, paths: Vec<PathBuf>) {
        self.include_paths = paths;
    }

    /// Predefine a preprocessor name for every run.
    pub fn define(&mut self, name: &str, value: &str) {
        self.defines.push((name.to_string(), value.to_string()));
    }

    /// When disabled, warning-severity diagnostics are filtered from the
    /// result; encoding is unaffected.
    pub fn enable_warnings(&mut self, enable: bool) {
        self.warnings_enabled = enable;
    }

    pub fn assemble_file(&self, path: impl AsRef<Path>) -> AssemblyResult {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(source) => self.assemble(&source, &path.to_string_lossy()),
            Err(err) => {
                let diagnostic = Diagnostic::new(
                    format!("could not open file: {}: {err}", path.display()),
                    SourceLocation::new(path.to_string_lossy(), 0, 0),
                    Severity::Fatal,
                );
                AssemblyResult {
                    errors: vec![diagnostic],
                    success: false,
                    origin_address: self.origin,
                    ..AssemblyResult::default()
                }
            }
        }
    }

    pub fn assemble(&self, source: &str, filename: &str) -> AssemblyResult {
        let mut reporter = ErrorReporter::new();

        tracing::debug!(filename, "preprocessing");
        let mut preprocessor = Preprocessor::new();
        preprocessor.set_include_paths(self.include_paths.clone());
        for (name, value) in &self.defines {
            preprocessor.define(name, value);
        }
        let lines = preprocessor.process(source, filename, &mut reporter);
        if reporter.has_errors() {
            return self.finish(
                reporter,
                StageOutput {
                    origin_address: self.origin,
                    ..StageOutput::default()
                },
            );
        }

        tracing::debug!(lines = lines.len(), "parsing");
        let mut program = parse_program(&lines, filename, &mut reporter);
        if reporter.has_errors() {
            return self.finish(
                reporter,
                StageOutput {
                    origin_address: self.origin,
                    ..StageOutput::default()
                },
            );
        }

        tracing::debug!("analyzing");
        let mut analyzer = SemanticAnalyzer::new(self.origin);
        analyzer.analyze(&mut program, &mut reporter);

        let mut stages = StageOutput {
            origin_address: analyzer.origin_address(),
            ..StageOutput::default()
        };
        stages.symbols = analyzer
            .symbols()
            .all_symbols()
            .filter(|symbol| symbol.kind == SymbolKind::Label)
            .map(|symbol| (symbol.name.clone(), symbol.value as u64))
            .collect();

        if reporter.has_errors() {
            return self.finish(reporter, stages);
        }

        tracing::debug!("emitting");
        let output = emitter::emit(
            &program,
            analyzer.symbols(),
            analyzer.addresses(),
            &mut reporter,
        );
        stages.binary = output.binary;
        stages.listing = output.listing;

        self.finish(reporter, stages)
    }

    fn finish(&self, mut reporter: ErrorReporter, stages: StageOutput) -> AssemblyResult {
        let mut errors = reporter.take_diagnostics();
        if !self.warnings_enabled {
            errors.retain(Diagnostic::is_error);
        }
        let success = !errors.iter().any(Diagnostic::is_error);

        AssemblyResult {
            binary: stages.binary,
            listing: stages.listing,
            symbols: stages.symbols,
            errors,
            success,
            origin_address: stages.origin_address,
        }
    }
}

/// What the pipeline produced so far when a stage stops the run.
#[derive(Debug, Default)]
struct StageOutput {
    binary: Vec<u8>,
    listing: Vec<ListingEntry>,
    symbols: BTreeMap<String, u64>,
    origin_address: u64,
}
