// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Per-form instruction encoding.
//!
//! The encoder consults the encoding table for the best-matching row, then
//! produces the byte sequence for that row's form. Label values come from
//! the symbol table; symbolic immediates go through the expression
//! evaluator with EQU constants in scope.

use thiserror::Error;

use crate::codegen::modrm::{self, ModRmError};
use crate::codegen::table::{find_encoding, Encoding, Form, Pattern};
use crate::core::ast::{ImmediateOperand, Instruction, MemoryOperand, Operand};
use crate::core::symbol_table::{Symbol, SymbolTable, SymbolTableContext};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("no encoding found for instruction: {0}")]
    NoEncoding(String),
    #[error("undefined label: {0}")]
    UndefinedLabel(String),
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
    #[error("{0}")]
    Addressing(#[from] ModRmError),
    #[error("jump target too far for SHORT jump (distance: {distance}, max \u{b1}127)")]
    JumpOutOfRange { distance: i64 },
    #[error("invalid operand combination for {0}")]
    InvalidOperands(&'static str),
    #[error("expected immediate operand")]
    ExpectedImmediate,
    #[error("expected label operand for jump")]
    ExpectedLabel,
}

pub struct Encoder<'a> {
    symbols: &'a SymbolTable,
    current_address: u64,
}

impl<'a> Encoder<'a> {
    #[must_use]
    pub fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            current_address: 0,
        }
    }

    /// Address of the instruction being encoded, for relative forms.
    pub fn set_current_address(&mut self, address: u64) {
        self.current_address = address;
    }

    pub fn encode(&self, instr: &Instruction) -> Result<Vec<u8>, EncodeError> {
        let encoding = find_encoding(&instr.mnemonic, &instr.operands)
            .ok_or_else(|| EncodeError::NoEncoding(instr.mnemonic.clone()))?;

        let mut bytes = Vec::new();
        if let Some(prefix) = segment_prefix(&instr.operands) {
            bytes.push(prefix);
        }

        match encoding.form {
            Form::Fixed => bytes.push(encoding.opcode),
            Form::RegInOpcode => self.encode_reg_in_opcode(encoding, instr, &mut bytes)?,
            Form::Immediate => self.encode_immediate_form(encoding, instr, &mut bytes)?,
            Form::ModRm => self.encode_modrm_form(encoding, instr, &mut bytes)?,
            Form::ModRmImm => self.encode_modrm_imm(encoding, instr, &mut bytes)?,
            Form::Relative => self.encode_relative(encoding, instr, &mut bytes)?,
        }

        Ok(bytes)
    }

    fn encode_reg_in_opcode(
        &self,
        encoding: &Encoding,
        instr: &Instruction,
        bytes: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        let reg = instr.operands[0]
            .as_register()
            .ok_or(EncodeError::InvalidOperands("register-in-opcode form"))?;

        // Segment registers stride by 8 (PUSH ES=06, CS=0E, SS=16, DS=1E).
        let opcode = if reg.is_segment {
            encoding.opcode + (reg.code << 3)
        } else {
            encoding.opcode + reg.code
        };
        bytes.push(opcode);

        if let Some(second) = instr.operands.get(1) {
            // XCHG AX, reg: the second register lands in the opcode.
            if let Some(reg2) = second.as_register() {
                let last = bytes.len() - 1;
                bytes[last] = encoding.opcode + reg2.code;
                return Ok(());
            }

            let value = self.operand_value(second)?;
            let size = usize::from(reg.size / 8);
            bytes.extend(modrm::encode_displacement(value, size));
        }

        Ok(())
    }

    fn encode_immediate_form(
        &self,
        encoding: &Encoding,
        instr: &Instruction,
        bytes: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        bytes.push(encoding.opcode);

        match instr.operands.len() {
            1 => {
                let imm = instr.operands[0]
                    .as_immediate()
                    .ok_or(EncodeError::ExpectedImmediate)?;
                let value = self.immediate_value(imm)?;
                bytes.extend(modrm::encode_displacement(
                    value,
                    pattern_imm_size(encoding.operands[0]),
                ));
                Ok(())
            }
            2 => {
                // OUT imm8, AL/AX: the port number is the first operand.
                if let Some(imm) = instr.operands[0].as_immediate() {
                    let value = self.immediate_value(imm)?;
                    bytes.extend(modrm::encode_displacement(
                        value,
                        pattern_imm_size(encoding.operands[0]),
                    ));
                    return Ok(());
                }
                // MOV [moffs], AL/AX: direct 16-bit address.
                if let Some(mem) = instr.operands[0].as_memory() {
                    let address = self.memory_address(mem)?;
                    bytes.extend(modrm::encode_displacement(address, 2));
                    return Ok(());
                }
                if let Some(imm) = instr.operands[1].as_immediate() {
                    let value = self.immediate_value(imm)?;
                    bytes.extend(modrm::encode_displacement(
                        value,
                        pattern_imm_size(encoding.operands[1]),
                    ));
                    return Ok(());
                }
                // MOV AL/AX, [moffs].
                if let Some(mem) = instr.operands[1].as_memory() {
                    let address = self.memory_address(mem)?;
                    bytes.extend(modrm::encode_displacement(address, 2));
                    return Ok(());
                }
                Err(EncodeError::ExpectedImmediate)
            }
            _ => Err(EncodeError::ExpectedImmediate),
        }
    }

    fn encode_modrm_form(
        &self,
        encoding: &Encoding,
        instr: &Instruction,
        bytes: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        bytes.push(encoding.opcode);

        let dest = &instr.operands[0];
        let src = &instr.operands[1];
        let ctx = SymbolTableContext::new(self.symbols);

        match (dest, src) {
            (Operand::Register(dest_reg), Operand::Register(src_reg)) => {
                // The operand sitting in the row's REG slot supplies the reg
                // field; the other lands in r/m. Rows like MOV SEGREG, RM16
                // (8E) put the destination first.
                let reg_slot_first = matches!(
                    encoding.operands.first(),
                    Some(Pattern::Reg8 | Pattern::Reg16 | Pattern::SegReg)
                );
                let modrm = if reg_slot_first {
                    modrm::reg_to_reg(dest_reg.code, src_reg.code)
                } else {
                    modrm::reg_to_reg(src_reg.code, dest_reg.code)
                };
                bytes.push(modrm);
                Ok(())
            }
            // LEA-style: register with a bare label, a direct memory address.
            (Operand::Register(dest_reg), Operand::LabelRef(label)) => {
                let symbol = self
                    .lookup_label(&label.name)
                    .ok_or_else(|| EncodeError::UndefinedLabel(label.name.clone()))?;
                let result = modrm::direct(symbol.value as u16, dest_reg.code);
                bytes.push(result.modrm);
                bytes.extend(result.displacement);
                Ok(())
            }
            (Operand::Memory(mem), Operand::Register(src_reg)) => {
                let result = modrm::memory(&mem.address, src_reg.code, &ctx)?;
                bytes.push(result.modrm);
                bytes.extend(result.displacement);
                Ok(())
            }
            (Operand::Register(dest_reg), Operand::Memory(mem)) => {
                let result = modrm::memory(&mem.address, dest_reg.code, &ctx)?;
                bytes.push(result.modrm);
                bytes.extend(result.displacement);
                Ok(())
            }
            _ => Err(EncodeError::InvalidOperands("ModR/M form")),
        }
    }

    fn encode_modrm_imm(
        &self,
        encoding: &Encoding,
        instr: &Instruction,
        bytes: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        bytes.push(encoding.opcode);

        let ctx = SymbolTableContext::new(self.symbols);
        match &instr.operands[0] {
            Operand::Register(reg) => {
                bytes.push(modrm::reg_to_reg(encoding.reg_field, reg.code));
            }
            Operand::Memory(mem) => {
                let result = modrm::memory(&mem.address, encoding.reg_field, &ctx)?;
                bytes.push(result.modrm);
                bytes.extend(result.displacement);
            }
            _ => return Err(EncodeError::InvalidOperands("ModR/M destination")),
        }

        if let Some(second) = instr.operands.get(1) {
            // Shift by CL: the row's opcode already says "by CL".
            if let Some(reg) = second.as_register() {
                if reg.size == 8 && reg.code == 1 {
                    return Ok(());
                }
                return Err(EncodeError::ExpectedImmediate);
            }

            let imm = second
                .as_immediate()
                .ok_or(EncodeError::ExpectedImmediate)?;
            let value = self.immediate_value(imm)?;

            // Shift by 1 with D0/D1: the count is implicit in the opcode.
            if (encoding.opcode == 0xD0 || encoding.opcode == 0xD1) && value == 1 {
                return Ok(());
            }

            bytes.extend(modrm::encode_displacement(
                value,
                pattern_imm_size(encoding.operands[1]),
            ));
        }

        Ok(())
    }

    fn encode_relative(
        &self,
        encoding: &Encoding,
        instr: &Instruction,
        bytes: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        let label = instr.operands[0]
            .as_label_ref()
            .ok_or(EncodeError::ExpectedLabel)?;
        let symbol = self
            .lookup_label(&label.name)
            .ok_or_else(|| EncodeError::UndefinedLabel(label.name.clone()))?;
        let target = symbol.value;

        let mut disp_size: u64 = if encoding.operands[0] == Pattern::Rel8 {
            1
        } else {
            2
        };
        let mut opcode = encoding.opcode;
        let mut displacement =
            target - (self.current_address as i64 + 1 + disp_size as i64);

        if disp_size == 1 && !(-128..=127).contains(&displacement) {
            if instr.mnemonic.eq_ignore_ascii_case("JMP") {
                // Unconditional jump auto-upgrades SHORT to NEAR.
                opcode = 0xE9;
                disp_size = 2;
                displacement = target - (self.current_address as i64 + 1 + disp_size as i64);
            } else {
                return Err(EncodeError::JumpOutOfRange {
                    distance: displacement,
                });
            }
        }

        bytes.push(opcode);
        bytes.extend(modrm::encode_displacement(displacement, disp_size as usize));
        Ok(())
    }

    /// Value of an immediate or label-reference operand.
    fn operand_value(&self, operand: &Operand) -> Result<i64, EncodeError> {
        match operand {
            Operand::Immediate(imm) => self.immediate_value(imm),
            Operand::LabelRef(label) => self
                .lookup_label(&label.name)
                .map(|symbol| symbol.value)
                .ok_or_else(|| EncodeError::UndefinedLabel(label.name.clone())),
            _ => Err(EncodeError::ExpectedImmediate),
        }
    }

    /// Resolve a possibly-symbolic immediate. Expressions are evaluated
    /// with EQU constants and label addresses in scope.
    fn immediate_value(&self, imm: &ImmediateOperand) -> Result<i64, EncodeError> {
        match &imm.expr {
            None => Ok(imm.value),
            Some(expr) => {
                let ctx = SymbolTableContext::new(self.symbols);
                crate::core::expr::evaluate_with_symbols(expr, &ctx).map_err(|err| match err {
                    crate::core::expr::EvalError::UndefinedSymbol(name) => {
                        EncodeError::UndefinedLabel(name)
                    }
                    _ => EncodeError::InvalidExpression(expr.clone()),
                })
            }
        }
    }

    /// Direct address of a moffs-style memory operand, label folded in.
    fn memory_address(&self, mem: &MemoryOperand) -> Result<i64, EncodeError> {
        let mut address = mem.address.displacement;
        if let Some(label) = &mem.address.label {
            let symbol = self
                .lookup_label(label)
                .ok_or_else(|| EncodeError::UndefinedLabel(label.clone()))?;
            address += if mem.address.label_negate {
                -symbol.value
            } else {
                symbol.value
            };
        }
        Ok(address)
    }

    /// Scoped lookup with the direct-name fallback for `.`-prefixed
    /// segment names; unresolved symbols count as undefined.
    fn lookup_label(&self, name: &str) -> Option<&Symbol> {
        self.symbols
            .lookup_scoped(name)
            .filter(|symbol| symbol.resolved)
    }
}

/// Segment override prefix byte when any memory operand carries one.
fn segment_prefix(operands: &[Operand]) -> Option<u8> {
    operands
        .iter()
        .filter_map(|op| op.as_memory())
        .find_map(|mem| mem.segment_override)
        .map(|seg| seg.prefix_byte())
}

fn pattern_imm_size(pattern: Pattern) -> usize {
    if pattern == Pattern::Imm8 {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ast::{
        ImmediateOperand, JumpKind, LabelRefOperand, MemoryOperand, Register, SegmentReg, SizeHint,
    };
    use crate::core::error::SourceLocation;
    use crate::core::expr::parse_address;
    use crate::core::symbol_table::SymbolKind;

    fn instr(mnemonic: &str, operands: Vec<Operand>) -> Instruction {
        Instruction {
            mnemonic: mnemonic.to_string(),
            operands,
            location: SourceLocation::default(),
        }
    }

    fn reg(name: &str) -> Operand {
        Operand::Register(Register::by_name(name).unwrap())
    }

    fn imm(value: i64) -> Operand {
        Operand::Immediate(ImmediateOperand {
            value,
            size_hint: SizeHint::None,
            expr: None,
        })
    }

    fn mem(expr: &str) -> Operand {
        Operand::Memory(MemoryOperand {
            segment_override: None,
            address: parse_address(expr).unwrap(),
            size_hint: SizeHint::None,
            source_text: expr.to_string(),
        })
    }

    fn label(name: &str, jump: JumpKind) -> Operand {
        Operand::LabelRef(LabelRefOperand {
            name: name.to_string(),
            jump,
        })
    }

    fn encode_one(symbols: &SymbolTable, address: u64, instruction: &Instruction) -> Vec<u8> {
        let mut encoder = Encoder::new(symbols);
        encoder.set_current_address(address);
        encoder.encode(instruction).unwrap()
    }

    #[test]
    fn fixed_form() {
        let symbols = SymbolTable::new();
        assert_eq!(encode_one(&symbols, 0, &instr("NOP", vec![])), vec![0x90]);
        assert_eq!(encode_one(&symbols, 0, &instr("HLT", vec![])), vec![0xF4]);
        assert_eq!(encode_one(&symbols, 0, &instr("REP", vec![])), vec![0xF3]);
    }

    #[test]
    fn reg_in_opcode_immediates() {
        let symbols = SymbolTable::new();
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![reg("AX"), imm(0x1234)])),
            vec![0xB8, 0x34, 0x12]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![reg("BX"), imm(0x1234)])),
            vec![0xBB, 0x34, 0x12]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![reg("AL"), imm(0x42)])),
            vec![0xB0, 0x42]
        );
    }

    #[test]
    fn push_pop_encodings() {
        let symbols = SymbolTable::new();
        assert_eq!(
            encode_one(&symbols, 0, &instr("PUSH", vec![reg("AX")])),
            vec![0x50]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("POP", vec![reg("BX")])),
            vec![0x5B]
        );
        // Segment registers stride by 8.
        assert_eq!(
            encode_one(&symbols, 0, &instr("PUSH", vec![reg("ES")])),
            vec![0x06]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("PUSH", vec![reg("DS")])),
            vec![0x1E]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("POP", vec![reg("SS")])),
            vec![0x17]
        );
    }

    #[test]
    fn xchg_with_ax_uses_second_register_code() {
        let symbols = SymbolTable::new();
        assert_eq!(
            encode_one(&symbols, 0, &instr("XCHG", vec![reg("AX"), reg("DX")])),
            vec![0x92]
        );
    }

    #[test]
    fn modrm_reg_to_reg() {
        let symbols = SymbolTable::new();
        assert_eq!(
            encode_one(&symbols, 0, &instr("XOR", vec![reg("AX"), reg("AX")])),
            vec![0x31, 0xC0]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![reg("DS"), reg("AX")])),
            vec![0x8E, 0xD8]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![reg("AX"), reg("DS")])),
            vec![0x8C, 0xD8]
        );
    }

    #[test]
    fn accumulator_moffs_forms() {
        let symbols = SymbolTable::new();
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![reg("AX"), mem("0x1234")])),
            vec![0xA1, 0x34, 0x12]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![mem("0x1234"), reg("AL")])),
            vec![0xA2, 0x34, 0x12]
        );
        // Non-accumulator goes through the general ModR/M form.
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![reg("BX"), mem("0x1234")])),
            vec![0x8B, 0x1E, 0x34, 0x12]
        );
    }

    #[test]
    fn memory_with_registers() {
        let symbols = SymbolTable::new();
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![reg("AX"), mem("BX+SI")])),
            vec![0x8B, 0x00]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![reg("AX"), mem("BP")])),
            vec![0x8B, 0x46, 0x00]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![mem("BX+10"), reg("CL")])),
            vec![0x88, 0x4F, 0x0A]
        );
    }

    #[test]
    fn segment_override_prefix() {
        let symbols = SymbolTable::new();
        let mut operand = mem("DI");
        if let Operand::Memory(m) = &mut operand {
            m.segment_override = Some(SegmentReg::Es);
        }
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![reg("AX"), operand])),
            vec![0x26, 0x8B, 0x05]
        );
    }

    #[test]
    fn modrm_imm_forms() {
        let symbols = SymbolTable::new();
        assert_eq!(
            encode_one(&symbols, 0, &instr("INC", vec![reg("BL")])),
            vec![0xFE, 0xC3]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("INC", vec![reg("BX")])),
            vec![0x43]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("ADD", vec![reg("BL"), imm(5)])),
            vec![0x80, 0xC3, 0x05]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![mem("0x10"), imm(5)])),
            vec![0xC6, 0x06, 0x10, 0x00, 0x05]
        );
    }

    #[test]
    fn shift_forms() {
        let symbols = SymbolTable::new();
        // By 1: implicit count.
        assert_eq!(
            encode_one(&symbols, 0, &instr("SHL", vec![reg("AL"), imm(1)])),
            vec![0xD0, 0xE0]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("SHR", vec![reg("BX")])),
            vec![0xD1, 0xEB]
        );
        // By CL.
        assert_eq!(
            encode_one(&symbols, 0, &instr("SHL", vec![reg("AL"), reg("CL")])),
            vec![0xD2, 0xE0]
        );
    }

    #[test]
    fn int_and_io() {
        let symbols = SymbolTable::new();
        assert_eq!(
            encode_one(&symbols, 0, &instr("INT", vec![imm(0x21)])),
            vec![0xCD, 0x21]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("IN", vec![reg("AL"), imm(0x60)])),
            vec![0xE4, 0x60]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("OUT", vec![imm(0x20), reg("AL")])),
            vec![0xE6, 0x20]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("OUT", vec![reg("DX"), reg("AX")])),
            vec![0xEF]
        );
    }

    #[test]
    fn relative_short_backward() {
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("top", SymbolKind::Label, 0x100, 1);
        let encoded = encode_one(
            &symbols,
            0x105,
            &instr("JMP", vec![label("top", JumpKind::Short)]),
        );
        // 0x100 - (0x105 + 2) = -7
        assert_eq!(encoded, vec![0xEB, 0xF9]);
    }

    #[test]
    fn relative_near() {
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("far_away", SymbolKind::Label, 0x500, 1);
        let encoded = encode_one(
            &symbols,
            0x100,
            &instr("CALL", vec![label("far_away", JumpKind::Near)]),
        );
        // 0x500 - (0x100 + 3) = 0x3FD
        assert_eq!(encoded, vec![0xE8, 0xFD, 0x03]);
    }

    #[test]
    fn short_jump_boundary() {
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("fwd", SymbolKind::Label, 0x81, 1);
        // displacement = 0x81 - 2 = 127: exactly in range.
        let encoded = encode_one(&symbols, 0, &instr("JE", vec![label("fwd", JumpKind::Short)]));
        assert_eq!(encoded, vec![0x74, 0x7F]);

        // One byte further: conditional jump fails.
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("fwd", SymbolKind::Label, 0x82, 1);
        let encoder = Encoder::new(&symbols);
        let result = encoder.encode(&instr("JE", vec![label("fwd", JumpKind::Short)]));
        assert!(matches!(result, Err(EncodeError::JumpOutOfRange { .. })));
    }

    #[test]
    fn jmp_short_auto_upgrades_to_near() {
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("fwd", SymbolKind::Label, 0x200, 1);
        let encoded = encode_one(&symbols, 0, &instr("JMP", vec![label("fwd", JumpKind::Short)]));
        // 0x200 - 3 = 0x1FD, NEAR form.
        assert_eq!(encoded, vec![0xE9, 0xFD, 0x01]);
    }

    #[test]
    fn undefined_label_reports() {
        let symbols = SymbolTable::new();
        let encoder = Encoder::new(&symbols);
        let result = encoder.encode(&instr("JMP", vec![label("nowhere", JumpKind::Near)]));
        assert_eq!(
            result,
            Err(EncodeError::UndefinedLabel("nowhere".to_string()))
        );
    }

    #[test]
    fn symbolic_immediate_resolves_through_table() {
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("VIDEO", SymbolKind::Constant, 0xB800, 1);
        let operand = Operand::Immediate(ImmediateOperand {
            value: 0,
            size_hint: SizeHint::None,
            expr: Some("VIDEO".to_string()),
        });
        assert_eq!(
            encode_one(&symbols, 0, &instr("MOV", vec![reg("AX"), operand])),
            vec![0xB8, 0x00, 0xB8]
        );
    }

    #[test]
    fn lea_with_bare_label() {
        let mut symbols = SymbolTable::new();
        let _ = symbols.define("data", SymbolKind::Label, 0x7C10, 1);
        let encoded = encode_one(
            &symbols,
            0,
            &instr("LEA", vec![reg("SI"), label("data", JumpKind::Near)]),
        );
        assert_eq!(encoded, vec![0x8D, 0x36, 0x10, 0x7C]);
    }

    #[test]
    fn ret_with_pop_count() {
        let symbols = SymbolTable::new();
        assert_eq!(
            encode_one(&symbols, 0, &instr("RET", vec![])),
            vec![0xC3]
        );
        assert_eq!(
            encode_one(&symbols, 0, &instr("RET", vec![imm(4)])),
            vec![0xC2, 0x04, 0x00]
        );
    }

    #[test]
    fn no_encoding_for_bad_operands() {
        let symbols = SymbolTable::new();
        let encoder = Encoder::new(&symbols);
        let result = encoder.encode(&instr("MOV", vec![imm(1), imm(2)]));
        assert_eq!(result, Err(EncodeError::NoEncoding("MOV".to_string())));
    }
}
