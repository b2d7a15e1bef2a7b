// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Second walk over the statement list: concatenates encoded bytes into the
//! flat image and builds the listing. Encoding failures are recorded per
//! statement and the walk continues so one run surfaces every error.

use crate::codegen::encoder::Encoder;
use crate::core::ast::{DataValue, DataWidth, Program, Statement, TimesCount};
use crate::core::error::ErrorReporter;
use crate::core::expr;
use crate::core::listing::ListingEntry;
use crate::core::symbol_table::{SymbolTable, SymbolTableContext};
use crate::semantic::AddressInfo;

#[derive(Debug, Default)]
pub struct EmitOutput {
    pub binary: Vec<u8>,
    pub listing: Vec<ListingEntry>,
}

/// Emit the program using the analyzer's address decorations.
pub fn emit(
    program: &Program,
    symbols: &SymbolTable,
    addresses: &[AddressInfo],
    reporter: &mut ErrorReporter,
) -> EmitOutput {
    let mut out = EmitOutput::default();
    let mut encoder = Encoder::new(symbols);

    tracing::debug!(statements = program.statements.len(), "emitting code");

    for (stmt, info) in program.statements.iter().zip(addresses) {
        let mut entry = ListingEntry {
            source_line: stmt.location().line,
            source_text: program.line_text(stmt.location().line).to_string(),
            address: info.address,
            machine_code: Vec::new(),
            ok: true,
            error_message: None,
        };

        emit_statement(
            stmt,
            info.address,
            Some(info.repeat),
            symbols,
            &mut encoder,
            &mut entry,
            reporter,
        );

        out.binary.extend_from_slice(&entry.machine_code);
        out.listing.push(entry);
    }

    out
}

fn emit_statement(
    stmt: &Statement,
    address: u64,
    known_repeat: Option<u64>,
    symbols: &SymbolTable,
    encoder: &mut Encoder<'_>,
    entry: &mut ListingEntry,
    reporter: &mut ErrorReporter,
) {
    match stmt {
        // No bytes; present in the listing for orientation.
        Statement::Label { .. }
        | Statement::Equ { .. }
        | Statement::Org { .. }
        | Statement::Segment { .. }
        | Statement::Ends { .. } => {}

        Statement::Reserve { width, count, .. } => {
            let total = (width.bytes() * *count) as usize;
            entry.machine_code.extend(std::iter::repeat(0u8).take(total));
        }

        Statement::Data {
            width,
            values,
            location,
        } => {
            for value in values {
                match value {
                    DataValue::Number(number) => {
                        push_le(&mut entry.machine_code, *number, *width);
                    }
                    DataValue::String(bytes) => {
                        entry.machine_code.extend_from_slice(bytes);
                    }
                    DataValue::Symbol(name) => match symbols.lookup_value(name) {
                        Some(resolved) => push_le(&mut entry.machine_code, resolved, *width),
                        None => {
                            let message = format!("undefined symbol: {name}");
                            entry.ok = false;
                            entry.error_message = Some(message.clone());
                            reporter.error(message, location.clone());
                            push_le(&mut entry.machine_code, 0, *width);
                        }
                    },
                }
            }
        }

        Statement::Times {
            count,
            inner,
            location,
        } => {
            // The top-level repeat comes pre-resolved from the analyzer;
            // a nested TIMES resolves its count here (position markers
            // only make sense at the statement's own address, which the
            // analyzer tracked).
            let repeat = match known_repeat {
                Some(repeat) => repeat,
                None => {
                    let resolved = match count {
                        TimesCount::Literal(value) => Ok(*value),
                        TimesCount::Expr(text) => {
                            let ctx = SymbolTableContext::new(symbols);
                            expr::evaluate_with_symbols(text, &ctx)
                                .map_err(|err| err.to_string())
                        }
                    };
                    match resolved {
                        Ok(value) if value >= 0 => value as u64,
                        Ok(_) | Err(_) => {
                            let message = "unresolvable nested TIMES count".to_string();
                            entry.ok = false;
                            entry.error_message = Some(message.clone());
                            reporter.error(message, location.clone());
                            return;
                        }
                    }
                }
            };

            // Each iteration's address advances by what the previous one
            // actually emitted.
            let mut offset = 0u64;
            for _ in 0..repeat {
                let before = entry.machine_code.len();
                emit_statement(
                    inner,
                    address + offset,
                    None,
                    symbols,
                    encoder,
                    entry,
                    reporter,
                );
                if !entry.ok {
                    break;
                }
                offset += (entry.machine_code.len() - before) as u64;
            }
        }

        Statement::Instruction(instr) => {
            encoder.set_current_address(address);
            match encoder.encode(instr) {
                Ok(bytes) => entry.machine_code.extend(bytes),
                Err(err) => {
                    let message = err.to_string();
                    entry.ok = false;
                    entry.error_message = Some(message.clone());
                    reporter.error(message, instr.location.clone());
                }
            }
        }
    }
}

fn push_le(out: &mut Vec<u8>, value: i64, width: DataWidth) {
    let mut value = value;
    for _ in 0..width.bytes() {
        out.push((value & 0xFF) as u8);
        value >>= 8;
    }
}
