// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Line parser: preprocessed source lines in, statements out.
//!
//! The tokenizer produces plain identifiers; this parser classifies them
//! against the register set and the encoding table. Parse errors are
//! collected per line and never abort the program walk.

use crate::codegen::table::{default_jump_kind, has_mnemonic, is_prefix_mnemonic};
use crate::core::ast::{
    DataValue, DataWidth, ImmediateOperand, Instruction, JumpKind, LabelRefOperand, MemoryOperand,
    Operand, Program, Register, SegmentReg, SizeHint, Statement, TimesCount,
};
use crate::core::error::{ErrorReporter, SourceLocation};
use crate::core::expr;
use crate::core::tokenizer::{Token, TokenKind, Tokenizer};

/// Parse all lines into a program, reporting errors as they come.
pub fn parse_program(
    source_lines: &[String],
    filename: &str,
    reporter: &mut ErrorReporter,
) -> Program {
    let mut statements = Vec::new();

    for (idx, line) in source_lines.iter().enumerate() {
        let line_num = idx as u32 + 1;
        let tokens = match Tokenizer::new(line, line_num).tokenize() {
            Ok(tokens) => tokens,
            Err(err) => {
                reporter.error(
                    err.message,
                    SourceLocation::new(filename, line_num, err.span.col_start as u32),
                );
                continue;
            }
        };

        let mut parser = LineParser {
            tokens,
            index: 0,
            filename,
            line_num,
            reporter,
        };
        parser.parse_line(&mut statements);
    }

    Program {
        statements,
        source_lines: source_lines.to_vec(),
    }
}

struct LineParser<'a> {
    tokens: Vec<Token>,
    index: usize,
    filename: &'a str,
    line_num: u32,
    reporter: &'a mut ErrorReporter,
}

impl LineParser<'_> {
    fn parse_line(&mut self, out: &mut Vec<Statement>) {
        while !self.at_end() {
            match self.parse_statement() {
                Some(stmt) => out.push(stmt),
                None => {
                    // The statement failed; drop the rest of the line.
                    self.index = self.tokens.len();
                }
            }
        }
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        let location = self.location();

        if let Some(name) = self.peek_identifier() {
            let name = name.to_string();
            let upper = name.to_ascii_uppercase();

            // label:
            if self.peek_kind_at(1) == Some(&TokenKind::Colon) {
                self.index += 2;
                return Some(Statement::Label { name, location });
            }

            // name EQU value
            if self.identifier_at(1).is_some_and(|next| next.eq_ignore_ascii_case("EQU")) {
                self.index += 2;
                return self.parse_equ(name, location);
            }

            // name ENDS
            if self.identifier_at(1).is_some_and(|next| next.eq_ignore_ascii_case("ENDS")) {
                self.index += 2;
                return Some(Statement::Ends {
                    name: Some(name),
                    location,
                });
            }

            // NASM sugar: `name DB ...` / `name RESB ...` defines a label.
            if let Some(next) = self.identifier_at(1) {
                if data_width(next).is_some() || reserve_width(next).is_some() {
                    self.index += 1;
                    return Some(Statement::Label { name, location });
                }
            }

            if let Some(width) = data_width(&upper) {
                self.index += 1;
                return self.parse_data(width, location);
            }
            if let Some(width) = reserve_width(&upper) {
                self.index += 1;
                return self.parse_reserve(width, location);
            }

            match upper.as_str() {
                "ORG" => {
                    self.index += 1;
                    return self.parse_org(location);
                }
                "SEGMENT" | "SECTION" => {
                    self.index += 1;
                    return self.parse_segment(location);
                }
                "ENDS" => {
                    self.index += 1;
                    return Some(Statement::Ends {
                        name: None,
                        location,
                    });
                }
                "TIMES" => {
                    self.index += 1;
                    return self.parse_times(location);
                }
                _ => {}
            }

            if has_mnemonic(&upper) {
                self.index += 1;
                return self.parse_instruction(upper, location);
            }

            self.error(format!("expected instruction, label, or directive: {name}"));
            return None;
        }

        self.error("expected instruction, label, or directive");
        None
    }

    fn parse_equ(&mut self, name: String, location: SourceLocation) -> Option<Statement> {
        let text = self.collect_const_expr();
        if text.is_empty() {
            self.error("EQU requires a value");
            return None;
        }
        match expr::evaluate(&text) {
            Ok(value) => Some(Statement::Equ {
                name,
                value,
                location,
            }),
            Err(err) => {
                self.error(err.to_string());
                None
            }
        }
    }

    fn parse_org(&mut self, location: SourceLocation) -> Option<Statement> {
        let text = self.collect_const_expr();
        if text.is_empty() {
            self.error("expected address after ORG");
            return None;
        }
        match expr::evaluate(&text) {
            Ok(value) if value >= 0 => Some(Statement::Org {
                address: value as u64,
                location,
            }),
            Ok(_) => {
                self.error("ORG address must be non-negative");
                None
            }
            Err(err) => {
                self.error(err.to_string());
                None
            }
        }
    }

    fn parse_segment(&mut self, location: SourceLocation) -> Option<Statement> {
        match self.take_identifier() {
            Some(name) => Some(Statement::Segment { name, location }),
            None => {
                self.error("expected segment name");
                None
            }
        }
    }

    fn parse_data(&mut self, width: DataWidth, location: SourceLocation) -> Option<Statement> {
        let mut values = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::Number(num)) => {
                    values.push(DataValue::Number(num.value));
                    self.index += 1;
                }
                Some(TokenKind::Minus) => {
                    self.index += 1;
                    match self.peek_kind() {
                        Some(TokenKind::Number(num)) => {
                            values.push(DataValue::Number(-num.value));
                            self.index += 1;
                        }
                        _ => {
                            self.error("expected number after '-'");
                            return None;
                        }
                    }
                }
                Some(TokenKind::String(lit)) => {
                    values.push(DataValue::String(lit.bytes.clone()));
                    self.index += 1;
                }
                Some(TokenKind::Identifier(name)) => {
                    values.push(DataValue::Symbol(name.clone()));
                    self.index += 1;
                }
                _ => {
                    self.error("expected number, string, character literal, or symbol");
                    return None;
                }
            }
            if self.peek_kind() == Some(&TokenKind::Comma) {
                self.index += 1;
                continue;
            }
            break;
        }
        Some(Statement::Data {
            width,
            values,
            location,
        })
    }

    fn parse_reserve(&mut self, width: DataWidth, location: SourceLocation) -> Option<Statement> {
        let text = self.collect_const_expr();
        if text.is_empty() {
            self.error("expected count after reservation directive");
            return None;
        }
        match expr::evaluate(&text) {
            Ok(count) if count >= 0 => Some(Statement::Reserve {
                width,
                count: count as u64,
                location,
            }),
            Ok(_) => {
                self.error("reservation count must be non-negative");
                None
            }
            Err(err) => {
                self.error(err.to_string());
                None
            }
        }
    }

    fn parse_times(&mut self, location: SourceLocation) -> Option<Statement> {
        // The count is any constant expression over numbers, symbols, and
        // the $/$$ markers; it ends where the repeated statement begins.
        let mut text = String::new();
        let mut token_count = 0usize;
        let mut only_number: Option<i64> = None;

        while let Some(kind) = self.peek_kind() {
            let fragment = match kind {
                TokenKind::Number(num) => {
                    if token_count == 0 {
                        only_number = Some(num.value);
                    } else {
                        only_number = None;
                    }
                    num.value.to_string()
                }
                TokenKind::Identifier(name) => {
                    // An identifier that starts a statement ends the count.
                    let upper = name.to_ascii_uppercase();
                    if has_mnemonic(&upper)
                        || data_width(&upper).is_some()
                        || reserve_width(&upper).is_some()
                        || upper == "TIMES"
                    {
                        break;
                    }
                    only_number = None;
                    name.clone()
                }
                TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::OpenParen
                | TokenKind::CloseParen
                | TokenKind::Dollar
                | TokenKind::DollarDollar => {
                    only_number = None;
                    self.tokens[self.index].text()
                }
                _ => break,
            };
            text.push_str(&fragment);
            token_count += 1;
            self.index += 1;
        }

        if text.is_empty() {
            self.error("expected count after TIMES");
            return None;
        }

        let inner = match self.parse_statement() {
            Some(stmt) => stmt,
            None => {
                self.error("expected statement after TIMES");
                return None;
            }
        };

        let count = match only_number {
            Some(value) => TimesCount::Literal(value),
            None => TimesCount::Expr(text),
        };

        Some(Statement::Times {
            count,
            inner: Box::new(inner),
            location,
        })
    }

    fn parse_instruction(
        &mut self,
        mnemonic: String,
        location: SourceLocation,
    ) -> Option<Statement> {
        let mut operands = Vec::new();

        if !is_prefix_mnemonic(&mnemonic) && self.at_operand_start() {
            operands.push(self.parse_operand(&mnemonic)?);
            while self.peek_kind() == Some(&TokenKind::Comma) {
                self.index += 1;
                operands.push(self.parse_operand(&mnemonic)?);
            }
        }

        Some(Statement::Instruction(Instruction {
            mnemonic,
            operands,
            location,
        }))
    }

    fn at_operand_start(&self) -> bool {
        match self.peek_kind() {
            None => false,
            Some(TokenKind::Identifier(_)) => {
                // `HLT` followed by `label:` on the same line.
                self.peek_kind_at(1) != Some(&TokenKind::Colon)
            }
            Some(
                TokenKind::Number(_)
                | TokenKind::Minus
                | TokenKind::Plus
                | TokenKind::OpenParen
                | TokenKind::OpenBracket,
            ) => true,
            _ => false,
        }
    }

    fn parse_operand(&mut self, mnemonic: &str) -> Option<Operand> {
        let mut size_hint = SizeHint::None;
        if let Some(ident) = self.peek_identifier() {
            match ident.to_ascii_uppercase().as_str() {
                "BYTE" | "BPTR" => {
                    size_hint = SizeHint::Byte;
                    self.index += 1;
                    self.skip_ptr_keyword();
                }
                "WORD" | "WPTR" => {
                    size_hint = SizeHint::Word;
                    self.index += 1;
                    self.skip_ptr_keyword();
                }
                // Accepted for source compatibility; no 32-bit operands
                // exist on the 8086, so no width is inferred from it.
                "DWORD" | "DPTR" => {
                    self.index += 1;
                    self.skip_ptr_keyword();
                }
                _ => {}
            }
        }

        // Segment override outside the brackets: ES:[DI]
        let mut segment_override = None;
        if let Some(ident) = self.peek_identifier() {
            if let Some(seg) = SegmentReg::from_name(ident) {
                if self.peek_kind_at(1) == Some(&TokenKind::Colon)
                    && self.peek_kind_at(2) == Some(&TokenKind::OpenBracket)
                {
                    segment_override = Some(seg);
                    self.index += 2;
                }
            }
        }

        if self.peek_kind() == Some(&TokenKind::OpenBracket) {
            self.index += 1;
            return self.parse_memory(segment_override, size_hint);
        }

        if let Some(ident) = self.peek_identifier() {
            if let Some(reg) = Register::by_name(ident) {
                self.index += 1;
                return Some(Operand::Register(reg));
            }
        }

        // Jump distance keyword, then a label reference.
        let mut jump_override = None;
        if let Some(ident) = self.peek_identifier() {
            match ident.to_ascii_uppercase().as_str() {
                "SHORT" => jump_override = Some(JumpKind::Short),
                "NEAR" => jump_override = Some(JumpKind::Near),
                "FAR" => jump_override = Some(JumpKind::Far),
                _ => {}
            }
            if jump_override.is_some() {
                self.index += 1;
            }
        }

        if let Some(ident) = self.peek_identifier() {
            let name = ident.to_string();
            // Jumps take label targets; LEA/LDS/LES accept a bare label as
            // a direct memory address.
            let default = default_jump_kind(mnemonic).or_else(|| {
                matches!(mnemonic, "LEA" | "LDS" | "LES").then_some(JumpKind::Near)
            });
            if let Some(default) = default {
                self.index += 1;
                return Some(Operand::LabelRef(LabelRefOperand {
                    name,
                    jump: jump_override.unwrap_or(default),
                }));
            }
        } else if jump_override.is_some() {
            self.error("expected label after jump distance keyword");
            return None;
        }

        // Immediate: a numeric or symbolic arithmetic expression.
        self.parse_immediate(size_hint)
    }

    fn parse_immediate(&mut self, size_hint: SizeHint) -> Option<Operand> {
        let mut text = String::new();
        let mut has_identifier = false;
        let mut last_was_operator = true;

        while let Some(kind) = self.peek_kind() {
            match kind {
                TokenKind::Number(num) => {
                    text.push_str(&num.value.to_string());
                    last_was_operator = false;
                }
                TokenKind::Identifier(name) => {
                    // Only after an operator, so the next statement's label
                    // is not swallowed.
                    if !last_was_operator {
                        break;
                    }
                    has_identifier = true;
                    text.push_str(name);
                    last_was_operator = false;
                }
                TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                    text.push_str(&self.tokens[self.index].text());
                    last_was_operator = true;
                }
                TokenKind::OpenParen => {
                    text.push('(');
                    last_was_operator = true;
                }
                TokenKind::CloseParen => {
                    text.push(')');
                    last_was_operator = false;
                }
                _ => break,
            }
            self.index += 1;
        }

        if text.is_empty() {
            self.error("expected operand (register, immediate, or memory address)");
            return None;
        }

        if has_identifier {
            return Some(Operand::Immediate(ImmediateOperand {
                value: 0,
                size_hint,
                expr: Some(text),
            }));
        }

        match expr::evaluate(&text) {
            Ok(value) => Some(Operand::Immediate(ImmediateOperand {
                value,
                size_hint,
                expr: None,
            })),
            Err(err) => {
                self.error(err.to_string());
                None
            }
        }
    }

    fn parse_memory(
        &mut self,
        outer_override: Option<SegmentReg>,
        size_hint: SizeHint,
    ) -> Option<Operand> {
        // Segment override inside the brackets: [ES:DI]
        let mut segment_override = outer_override;
        if let Some(ident) = self.peek_identifier() {
            if let Some(seg) = SegmentReg::from_name(ident) {
                if self.peek_kind_at(1) == Some(&TokenKind::Colon) {
                    if segment_override.is_none() {
                        segment_override = Some(seg);
                    }
                    self.index += 2;
                }
            }
        }

        let mut text = String::new();
        loop {
            match self.peek_kind() {
                None => {
                    self.error("missing ']' in memory operand");
                    return None;
                }
                Some(TokenKind::CloseBracket) => {
                    self.index += 1;
                    break;
                }
                Some(_) => {
                    text.push_str(&self.tokens[self.index].text());
                    self.index += 1;
                }
            }
        }

        match expr::parse_address(&text) {
            Ok(address) => Some(Operand::Memory(MemoryOperand {
                segment_override,
                address,
                size_hint,
                source_text: text,
            })),
            Err(err) => {
                self.error(err.to_string());
                None
            }
        }
    }

    fn collect_const_expr(&mut self) -> String {
        let mut text = String::new();
        while let Some(kind) = self.peek_kind() {
            match kind {
                TokenKind::Number(num) => text.push_str(&num.value.to_string()),
                TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::OpenParen
                | TokenKind::CloseParen => text.push_str(&self.tokens[self.index].text()),
                _ => break,
            }
            self.index += 1;
        }
        text
    }

    fn skip_ptr_keyword(&mut self) {
        if self
            .peek_identifier()
            .is_some_and(|ident| ident.eq_ignore_ascii_case("PTR"))
        {
            self.index += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.index).map(|t| &t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.index + offset).map(|t| &t.kind)
    }

    fn peek_identifier(&self) -> Option<&str> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => Some(name),
            _ => None,
        }
    }

    fn identifier_at(&self, offset: usize) -> Option<&str> {
        match self.peek_kind_at(offset) {
            Some(TokenKind::Identifier(name)) => Some(name),
            _ => None,
        }
    }

    fn take_identifier(&mut self) -> Option<String> {
        let name = self.peek_identifier()?.to_string();
        self.index += 1;
        Some(name)
    }

    fn location(&self) -> SourceLocation {
        let column = self
            .tokens
            .get(self.index)
            .map(|t| t.span.col_start as u32)
            .unwrap_or(1);
        SourceLocation::new(self.filename, self.line_num, column)
    }

    fn error(&mut self, message: impl Into<String>) {
        let location = self.location();
        self.reporter.error(message, location);
    }
}

fn data_width(name: &str) -> Option<DataWidth> {
    match name.to_ascii_uppercase().as_str() {
        "DB" => Some(DataWidth::Byte),
        "DW" => Some(DataWidth::Word),
        "DD" => Some(DataWidth::Dword),
        "DQ" => Some(DataWidth::Qword),
        "DT" => Some(DataWidth::Tbyte),
        _ => None,
    }
}

fn reserve_width(name: &str) -> Option<DataWidth> {
    match name.to_ascii_uppercase().as_str() {
        "RESB" => Some(DataWidth::Byte),
        "RESW" => Some(DataWidth::Word),
        "RESD" => Some(DataWidth::Dword),
        "RESQ" => Some(DataWidth::Qword),
        "REST" => Some(DataWidth::Tbyte),
        _ => None,
    }
}
