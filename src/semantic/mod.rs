// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Semantic analysis: address assignment and instruction sizing.
//!
//! The analyzer walks the statement list, managing origin, segments, and
//! label scope, and records each statement's address and size in a vector
//! parallel to the statement list. Sizing passes repeat until addresses
//! reach a fixed point, so a forward `JMP SHORT` that must upgrade to NEAR
//! is already sized at three bytes before emission. In practice two passes
//! suffice.

use indexmap::IndexMap;

use crate::codegen::modrm;
use crate::codegen::table::{find_encoding, Form, Pattern};
use crate::core::ast::{
    DataValue, Instruction, Operand, Program, Statement, TimesCount,
};
use crate::core::error::{ErrorReporter, SourceLocation};
use crate::core::expr;
use crate::core::symbol_table::{SymbolKind, SymbolTable, SymbolTableContext, SymbolTableResult};

/// Sizing passes are capped well above what real programs need.
const MAX_PASSES: usize = 8;

/// Address decoration of one statement, indexed by statement position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressInfo {
    pub address: u64,
    pub size: u64,
    /// Resolved TIMES repeat count; 1 for everything else.
    pub repeat: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentSpan {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Default)]
pub struct SemanticAnalyzer {
    symbols: SymbolTable,
    addresses: Vec<AddressInfo>,
    segments: IndexMap<String, SegmentSpan>,
    default_origin: u64,
    origin: u64,
    current_address: u64,
    segment_start: u64,
    current_segment: String,
    last_was_terminator: bool,
}

impl SemanticAnalyzer {
    #[must_use]
    pub fn new(default_origin: u64) -> Self {
        Self {
            default_origin,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    #[must_use]
    pub fn addresses(&self) -> &[AddressInfo] {
        &self.addresses
    }

    #[must_use]
    pub fn segments(&self) -> &IndexMap<String, SegmentSpan> {
        &self.segments
    }

    #[must_use]
    pub fn origin_address(&self) -> u64 {
        self.origin
    }

    /// Analyze a program: build the symbol table, fold memory-operand
    /// symbols, and assign every statement a stable address and size.
    pub fn analyze(&mut self, program: &mut Program, reporter: &mut ErrorReporter) {
        self.symbols.clear();
        self.addresses.clear();

        tracing::debug!(statements = program.statements.len(), "semantic analysis");

        for pass in 0..MAX_PASSES {
            let first_pass = pass == 0;
            // Diagnostics are reported once, on the first pass; later
            // passes only refine sizes.
            let mut silent = ErrorReporter::new();
            let pass_reporter = if first_pass {
                &mut *reporter
            } else {
                &mut silent
            };

            let previous = std::mem::take(&mut self.addresses);
            self.run_pass(program, pass_reporter, first_pass);

            if !first_pass && previous == self.addresses {
                tracing::debug!(passes = pass + 1, "address assignment stable");
                break;
            }
        }

        self.verify_data_symbols(program, reporter);

        for symbol in self.symbols.all_symbols() {
            if !symbol.resolved {
                reporter.error(
                    format!("undefined symbol: {}", symbol.name),
                    SourceLocation::default(),
                );
            }
        }
    }

    fn run_pass(&mut self, program: &mut Program, reporter: &mut ErrorReporter, first_pass: bool) {
        self.origin = self.default_origin;
        self.current_address = self.origin;
        self.segment_start = self.origin;
        self.current_segment.clear();
        self.last_was_terminator = false;
        self.segments.clear();
        self.symbols.set_global_scope("");
        self.addresses = Vec::with_capacity(program.statements.len());

        for stmt in &mut program.statements {
            let mut info = AddressInfo {
                address: self.current_address,
                size: 0,
                repeat: 1,
            };
            self.process_statement(stmt, &mut info, reporter, first_pass);
            self.addresses.push(info);
        }
    }

    fn process_statement(
        &mut self,
        stmt: &mut Statement,
        info: &mut AddressInfo,
        reporter: &mut ErrorReporter,
        first_pass: bool,
    ) {
        match stmt {
            Statement::Label { name, location } => {
                if !SymbolTable::is_local(name) {
                    self.symbols.set_global_scope(name);
                }
                if first_pass {
                    if self.symbols.define(
                        name,
                        SymbolKind::Label,
                        self.current_address as i64,
                        location.line,
                    ) == SymbolTableResult::Duplicate
                    {
                        reporter.error(
                            format!("label '{name}' already defined"),
                            location.clone(),
                        );
                    }
                } else {
                    let _ = self.symbols.resolve(name, self.current_address as i64);
                }
            }

            Statement::Equ {
                name,
                value,
                location,
            } => {
                if first_pass
                    && self
                        .symbols
                        .define(name, SymbolKind::Constant, *value, location.line)
                        == SymbolTableResult::Duplicate
                {
                    reporter.error(
                        format!("constant '{name}' already defined"),
                        location.clone(),
                    );
                }
            }

            Statement::Org { address, .. } => {
                self.origin = *address;
                self.current_address = *address;
                self.segment_start = *address;
                info.address = *address;
            }

            Statement::Segment { name, location } => {
                self.enter_segment(name, location, reporter, first_pass);
            }

            Statement::Ends { name, .. } => {
                let segment = name.clone().unwrap_or_else(|| self.current_segment.clone());
                if let Some(span) = self.segments.get_mut(&segment) {
                    span.end = self.current_address;
                }
            }

            Statement::Reserve { width, count, .. } => {
                info.size = width.bytes() * *count;
                self.current_address += info.size;
            }

            Statement::Data { width, values, .. } => {
                info.size = values
                    .iter()
                    .map(|value| match value {
                        DataValue::String(bytes) => bytes.len() as u64,
                        _ => width.bytes(),
                    })
                    .sum();
                self.current_address += info.size;
            }

            Statement::Times {
                count,
                inner,
                location,
            } => {
                let repeat = self.resolve_times_count(count, location, reporter, first_pass);
                let single = self.statement_size(inner, reporter, first_pass);
                info.repeat = repeat;
                info.size = single * repeat;
                self.current_address += info.size;
            }

            Statement::Instruction(instr) => {
                if first_pass {
                    self.resolve_memory_operands(instr, reporter);
                }
                info.size = self.instruction_size(instr);
                self.current_address += info.size;
                self.last_was_terminator = is_terminator(&instr.mnemonic);
            }
        }
    }

    /// Size of a TIMES-repeated statement (one iteration).
    fn statement_size(
        &mut self,
        stmt: &mut Statement,
        reporter: &mut ErrorReporter,
        first_pass: bool,
    ) -> u64 {
        match stmt {
            Statement::Data { width, values, .. } => values
                .iter()
                .map(|value| match value {
                    DataValue::String(bytes) => bytes.len() as u64,
                    _ => width.bytes(),
                })
                .sum(),
            Statement::Reserve { width, count, .. } => width.bytes() * *count,
            Statement::Instruction(instr) => {
                if first_pass {
                    self.resolve_memory_operands(instr, reporter);
                }
                self.instruction_size(instr)
            }
            Statement::Times {
                count,
                inner,
                location,
            } => {
                let repeat = self.resolve_times_count(count, location, reporter, first_pass);
                self.statement_size(inner, reporter, first_pass) * repeat
            }
            _ => 0,
        }
    }

    fn resolve_times_count(
        &self,
        count: &TimesCount,
        location: &SourceLocation,
        reporter: &mut ErrorReporter,
        first_pass: bool,
    ) -> u64 {
        let value = match count {
            TimesCount::Literal(value) => Ok(*value),
            TimesCount::Expr(text) => {
                let ctx = SymbolTableContext::new(&self.symbols);
                expr::evaluate_with_position(text, self.current_address, self.segment_start, &ctx)
                    .map_err(|err| err.to_string())
            }
        };

        match value {
            Ok(value) if value >= 0 => value as u64,
            Ok(value) => {
                if first_pass {
                    reporter.error(
                        format!("TIMES count must be non-negative, got {value}"),
                        location.clone(),
                    );
                }
                0
            }
            Err(message) => {
                if first_pass {
                    reporter.error(message, location.clone());
                }
                0
            }
        }
    }

    /// Fold EQU constants and already-defined labels into memory operand
    /// displacements; at most one unresolved label may remain.
    fn resolve_memory_operands(&mut self, instr: &mut Instruction, reporter: &mut ErrorReporter) {
        for operand in &mut instr.operands {
            if let Operand::Memory(mem) = operand {
                let ctx = SymbolTableContext::new(&self.symbols);
                match expr::resolve_address(&mem.address, &ctx) {
                    Ok(resolved) => mem.address = resolved,
                    Err(err) => {
                        reporter.error(err.to_string(), instr.location.clone());
                    }
                }
            }
        }
    }

    /// Estimated size of an instruction, matching what the encoder will
    /// emit once all symbol values are final.
    fn instruction_size(&self, instr: &Instruction) -> u64 {
        let Some(encoding) = find_encoding(&instr.mnemonic, &instr.operands) else {
            // No row matches; the encoder reports the error at emission.
            return 3;
        };
        let operands = &instr.operands;

        let prefix = operands
            .iter()
            .filter_map(Operand::as_memory)
            .any(|mem| mem.segment_override.is_some()) as u64;

        let body = match encoding.form {
            Form::Fixed => 1,

            Form::RegInOpcode => match operands.get(1) {
                None | Some(Operand::Register(_)) => 1,
                Some(_) => {
                    let width = operands[0]
                        .as_register()
                        .map(|reg| u64::from(reg.size / 8))
                        .unwrap_or(2);
                    1 + width
                }
            },

            Form::Immediate => {
                let payload = match operands.len() {
                    1 => imm_pattern_size(encoding.operands[0]),
                    2 => {
                        if operands[0].as_immediate().is_some() {
                            imm_pattern_size(encoding.operands[0])
                        } else if operands[0].as_memory().is_some() {
                            2
                        } else if operands[1].as_immediate().is_some() {
                            imm_pattern_size(encoding.operands[1])
                        } else {
                            // moffs source
                            2
                        }
                    }
                    _ => 0,
                };
                1 + payload
            }

            Form::ModRm => {
                let modrm = if let Some(mem) =
                    operands.iter().find_map(Operand::as_memory)
                {
                    modrm::encoding_size(&mem.address)
                } else if operands.get(1).and_then(Operand::as_label_ref).is_some() {
                    // Bare label as direct address (LEA style).
                    3
                } else {
                    1
                };
                1 + modrm
            }

            Form::ModRmImm => {
                let dest = match &operands[0] {
                    Operand::Memory(mem) => modrm::encoding_size(&mem.address),
                    _ => 1,
                };
                let imm = match operands.get(1) {
                    None | Some(Operand::Register(_)) => 0,
                    Some(Operand::Immediate(imm)) => {
                        let value = match &imm.expr {
                            None => Some(imm.value),
                            Some(text) => {
                                let ctx = SymbolTableContext::new(&self.symbols);
                                expr::evaluate_with_symbols(text, &ctx).ok()
                            }
                        };
                        let implicit_one = (encoding.opcode == 0xD0 || encoding.opcode == 0xD1)
                            && value == Some(1);
                        if implicit_one {
                            0
                        } else {
                            imm_pattern_size(encoding.operands[1])
                        }
                    }
                    Some(_) => imm_pattern_size(encoding.operands[1]),
                };
                1 + dest + imm
            }

            Form::Relative => {
                if encoding.operands[0] != Pattern::Rel8 {
                    3
                } else if instr.mnemonic.eq_ignore_ascii_case("JMP") {
                    // Mirror the encoder's SHORT-to-NEAR auto-upgrade.
                    let target = operands[0]
                        .as_label_ref()
                        .and_then(|label| self.symbols.lookup_value(&label.name));
                    match target {
                        Some(target) => {
                            let displacement = target - (self.current_address as i64 + 2);
                            if (-128..=127).contains(&displacement) {
                                2
                            } else {
                                3
                            }
                        }
                        None => 2,
                    }
                } else {
                    2
                }
            }
        };

        prefix + body
    }

    fn enter_segment(
        &mut self,
        name: &str,
        location: &SourceLocation,
        reporter: &mut ErrorReporter,
        first_pass: bool,
    ) {
        if first_pass
            && !self.current_segment.is_empty()
            && is_code_segment(&self.current_segment)
            && is_data_segment(name)
            && !self.last_was_terminator
        {
            reporter.warning(
                format!(
                    "code segment '{}' may fall through into data segment '{}'; \
                     consider ending it with HLT, JMP, or RET",
                    self.current_segment, name
                ),
                location.clone(),
            );
        }
        self.last_was_terminator = false;

        // The segment name becomes a symbol at the segment start. The scope
        // is cleared so `.text`-style names are stored unqualified.
        let saved_scope = self.symbols.global_scope().to_string();
        self.symbols.set_global_scope("");
        if first_pass {
            if self.symbols.define(
                name,
                SymbolKind::Label,
                self.current_address as i64,
                location.line,
            ) == SymbolTableResult::Duplicate
            {
                let _ = self.symbols.update(name, self.current_address as i64);
            }
        } else {
            let _ = self.symbols.resolve(name, self.current_address as i64);
        }
        self.symbols.set_global_scope(&saved_scope);

        if let Some(span) = self.segments.get(name) {
            // Switch back to an already-open segment.
            self.current_address = span.end;
            self.segment_start = span.start;
        } else {
            self.segments.insert(
                name.to_string(),
                SegmentSpan {
                    start: self.current_address,
                    end: self.current_address,
                },
            );
            self.segment_start = self.current_address;
        }
        self.current_segment = name.to_string();
    }

    /// Report data values naming symbols that never got defined. Forward
    /// references are fine; by now every label has its final address.
    fn verify_data_symbols(&self, program: &Program, reporter: &mut ErrorReporter) {
        for stmt in &program.statements {
            self.verify_statement_symbols(stmt, reporter);
        }
    }

    fn verify_statement_symbols(&self, stmt: &Statement, reporter: &mut ErrorReporter) {
        match stmt {
            Statement::Data {
                values, location, ..
            } => {
                for value in values {
                    if let DataValue::Symbol(name) = value {
                        if self.symbols.lookup_value(name).is_none() {
                            reporter
                                .error(format!("undefined symbol: {name}"), location.clone());
                        }
                    }
                }
            }
            Statement::Times { inner, .. } => self.verify_statement_symbols(inner, reporter),
            _ => {}
        }
    }
}

fn imm_pattern_size(pattern: Pattern) -> u64 {
    if pattern == Pattern::Imm8 {
        1
    } else {
        2
    }
}

fn is_terminator(mnemonic: &str) -> bool {
    matches!(
        mnemonic.to_ascii_uppercase().as_str(),
        "HLT" | "RET" | "RETF" | "IRET" | "JMP" | "INT"
    )
}

fn is_code_segment(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        ".text" | "text" | ".code" | "code" | "_text" | "_code"
    )
}

fn is_data_segment(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        ".data" | "data" | ".bss" | "bss" | ".rodata" | "rodata" | "_data" | "_bss"
    )
}
