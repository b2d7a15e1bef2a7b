// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Static 8086 encoding table and operand matching.
//!
//! One mnemonic has multiple encodings for different operand combinations;
//! [`find_encoding`] picks the most specific row. This table is the single
//! source of truth for which mnemonics exist and how they encode.

use crate::core::ast::{JumpKind, Operand};

/// Operand pattern of one table-row slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Reg8,
    Reg16,
    Mem8,
    Mem16,
    Rm8,
    Rm16,
    Imm8,
    Imm16,
    Al,
    Ax,
    Cl,
    Dx,
    SegReg,
    Rel8,
    Rel16,
}

/// How a row is laid out in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// [opcode] [ModR/M] [displacement]
    ModRm,
    /// [opcode] [ModR/M] [displacement] [immediate], reg field is /0../7
    ModRmImm,
    /// [opcode+reg] [immediate]
    RegInOpcode,
    /// [opcode] [immediate or moffs]
    Immediate,
    /// [opcode] [rel8/rel16]
    Relative,
    /// [opcode]
    Fixed,
}

#[derive(Debug, Clone, Copy)]
pub struct Encoding {
    pub mnemonic: &'static str,
    pub operands: &'static [Pattern],
    pub form: Form,
    pub opcode: u8,
    /// ModR/M reg-field opcode extension for `ModRmImm` rows.
    pub reg_field: u8,
}

const fn row(
    mnemonic: &'static str,
    operands: &'static [Pattern],
    form: Form,
    opcode: u8,
) -> Encoding {
    Encoding {
        mnemonic,
        operands,
        form,
        opcode,
        reg_field: 0,
    }
}

const fn row_ext(
    mnemonic: &'static str,
    operands: &'static [Pattern],
    form: Form,
    opcode: u8,
    reg_field: u8,
) -> Encoding {
    Encoding {
        mnemonic,
        operands,
        form,
        opcode,
        reg_field,
    }
}

use Form::{Fixed, Immediate, ModRm, ModRmImm, RegInOpcode, Relative};
use Pattern::{Al, Ax, Cl, Dx, Imm16, Imm8, Mem16, Mem8, Reg16, Reg8, Rel16, Rel8, Rm16, Rm8, SegReg};

#[rustfmt::skip]
pub static INSTRUCTION_TABLE: &[Encoding] = &[
    // MOV
    row("MOV", &[Rm8, Reg8], ModRm, 0x88),
    row("MOV", &[Rm16, Reg16], ModRm, 0x89),
    row("MOV", &[Reg8, Rm8], ModRm, 0x8A),
    row("MOV", &[Reg16, Rm16], ModRm, 0x8B),
    row_ext("MOV", &[Rm8, Imm8], ModRmImm, 0xC6, 0),
    row_ext("MOV", &[Rm16, Imm16], ModRmImm, 0xC7, 0),
    // Accumulator/moffs shortcuts
    row("MOV", &[Al, Mem8], Immediate, 0xA0),
    row("MOV", &[Ax, Mem16], Immediate, 0xA1),
    row("MOV", &[Mem8, Al], Immediate, 0xA2),
    row("MOV", &[Mem16, Ax], Immediate, 0xA3),
    // Immediate to register, register in opcode
    row("MOV", &[Al, Imm8], RegInOpcode, 0xB0),
    row("MOV", &[Reg8, Imm8], RegInOpcode, 0xB0),
    row("MOV", &[Ax, Imm16], RegInOpcode, 0xB8),
    row("MOV", &[Reg16, Imm16], RegInOpcode, 0xB8),
    // Segment register moves
    row("MOV", &[Rm16, SegReg], ModRm, 0x8C),
    row("MOV", &[SegReg, Rm16], ModRm, 0x8E),

    // ADD
    row("ADD", &[Rm8, Reg8], ModRm, 0x00),
    row("ADD", &[Rm16, Reg16], ModRm, 0x01),
    row("ADD", &[Reg8, Rm8], ModRm, 0x02),
    row("ADD", &[Reg16, Rm16], ModRm, 0x03),
    row("ADD", &[Al, Imm8], Immediate, 0x04),
    row("ADD", &[Ax, Imm16], Immediate, 0x05),
    row_ext("ADD", &[Rm8, Imm8], ModRmImm, 0x80, 0),
    row_ext("ADD", &[Rm16, Imm16], ModRmImm, 0x81, 0),
    row_ext("ADD", &[Rm16, Imm8], ModRmImm, 0x83, 0),

    // ADC
    row("ADC", &[Rm8, Reg8], ModRm, 0x10),
    row("ADC", &[Rm16, Reg16], ModRm, 0x11),
    row("ADC", &[Reg8, Rm8], ModRm, 0x12),
    row("ADC", &[Reg16, Rm16], ModRm, 0x13),
    row("ADC", &[Al, Imm8], Immediate, 0x14),
    row("ADC", &[Ax, Imm16], Immediate, 0x15),
    row_ext("ADC", &[Rm8, Imm8], ModRmImm, 0x80, 2),
    row_ext("ADC", &[Rm16, Imm16], ModRmImm, 0x81, 2),
    row_ext("ADC", &[Rm16, Imm8], ModRmImm, 0x83, 2),

    // SUB
    row("SUB", &[Rm8, Reg8], ModRm, 0x28),
    row("SUB", &[Rm16, Reg16], ModRm, 0x29),
    row("SUB", &[Reg8, Rm8], ModRm, 0x2A),
    row("SUB", &[Reg16, Rm16], ModRm, 0x2B),
    row("SUB", &[Al, Imm8], Immediate, 0x2C),
    row("SUB", &[Ax, Imm16], Immediate, 0x2D),
    row_ext("SUB", &[Rm8, Imm8], ModRmImm, 0x80, 5),
    row_ext("SUB", &[Rm16, Imm16], ModRmImm, 0x81, 5),
    row_ext("SUB", &[Rm16, Imm8], ModRmImm, 0x83, 5),

    // SBB
    row("SBB", &[Rm8, Reg8], ModRm, 0x18),
    row("SBB", &[Rm16, Reg16], ModRm, 0x19),
    row("SBB", &[Reg8, Rm8], ModRm, 0x1A),
    row("SBB", &[Reg16, Rm16], ModRm, 0x1B),
    row("SBB", &[Al, Imm8], Immediate, 0x1C),
    row("SBB", &[Ax, Imm16], Immediate, 0x1D),
    row_ext("SBB", &[Rm8, Imm8], ModRmImm, 0x80, 3),
    row_ext("SBB", &[Rm16, Imm16], ModRmImm, 0x81, 3),
    row_ext("SBB", &[Rm16, Imm8], ModRmImm, 0x83, 3),

    // CMP
    row("CMP", &[Rm8, Reg8], ModRm, 0x38),
    row("CMP", &[Rm16, Reg16], ModRm, 0x39),
    row("CMP", &[Reg8, Rm8], ModRm, 0x3A),
    row("CMP", &[Reg16, Rm16], ModRm, 0x3B),
    row("CMP", &[Al, Imm8], Immediate, 0x3C),
    row("CMP", &[Ax, Imm16], Immediate, 0x3D),
    row_ext("CMP", &[Rm8, Imm8], ModRmImm, 0x80, 7),
    row_ext("CMP", &[Rm16, Imm16], ModRmImm, 0x81, 7),
    row_ext("CMP", &[Rm16, Imm8], ModRmImm, 0x83, 7),

    // AND
    row("AND", &[Rm8, Reg8], ModRm, 0x20),
    row("AND", &[Rm16, Reg16], ModRm, 0x21),
    row("AND", &[Reg8, Rm8], ModRm, 0x22),
    row("AND", &[Reg16, Rm16], ModRm, 0x23),
    row("AND", &[Al, Imm8], Immediate, 0x24),
    row("AND", &[Ax, Imm16], Immediate, 0x25),
    row_ext("AND", &[Rm8, Imm8], ModRmImm, 0x80, 4),
    row_ext("AND", &[Rm16, Imm16], ModRmImm, 0x81, 4),
    row_ext("AND", &[Rm16, Imm8], ModRmImm, 0x83, 4),

    // OR
    row("OR", &[Rm8, Reg8], ModRm, 0x08),
    row("OR", &[Rm16, Reg16], ModRm, 0x09),
    row("OR", &[Reg8, Rm8], ModRm, 0x0A),
    row("OR", &[Reg16, Rm16], ModRm, 0x0B),
    row("OR", &[Al, Imm8], Immediate, 0x0C),
    row("OR", &[Ax, Imm16], Immediate, 0x0D),
    row_ext("OR", &[Rm8, Imm8], ModRmImm, 0x80, 1),
    row_ext("OR", &[Rm16, Imm16], ModRmImm, 0x81, 1),
    row_ext("OR", &[Rm16, Imm8], ModRmImm, 0x83, 1),

    // XOR
    row("XOR", &[Rm8, Reg8], ModRm, 0x30),
    row("XOR", &[Rm16, Reg16], ModRm, 0x31),
    row("XOR", &[Reg8, Rm8], ModRm, 0x32),
    row("XOR", &[Reg16, Rm16], ModRm, 0x33),
    row("XOR", &[Al, Imm8], Immediate, 0x34),
    row("XOR", &[Ax, Imm16], Immediate, 0x35),
    row_ext("XOR", &[Rm8, Imm8], ModRmImm, 0x80, 6),
    row_ext("XOR", &[Rm16, Imm16], ModRmImm, 0x81, 6),
    row_ext("XOR", &[Rm16, Imm8], ModRmImm, 0x83, 6),

    // INC/DEC, short forms for 16-bit registers
    row_ext("INC", &[Rm8], ModRmImm, 0xFE, 0),
    row_ext("INC", &[Rm16], ModRmImm, 0xFF, 0),
    row("INC", &[Ax], Fixed, 0x40),
    row("INC", &[Reg16], RegInOpcode, 0x40),
    row_ext("DEC", &[Rm8], ModRmImm, 0xFE, 1),
    row_ext("DEC", &[Rm16], ModRmImm, 0xFF, 1),
    row("DEC", &[Ax], Fixed, 0x48),
    row("DEC", &[Reg16], RegInOpcode, 0x48),

    // Unary group
    row_ext("NOT", &[Rm8], ModRmImm, 0xF6, 2),
    row_ext("NOT", &[Rm16], ModRmImm, 0xF7, 2),
    row_ext("NEG", &[Rm8], ModRmImm, 0xF6, 3),
    row_ext("NEG", &[Rm16], ModRmImm, 0xF7, 3),
    row_ext("MUL", &[Rm8], ModRmImm, 0xF6, 4),
    row_ext("MUL", &[Rm16], ModRmImm, 0xF7, 4),
    row_ext("IMUL", &[Rm8], ModRmImm, 0xF6, 5),
    row_ext("IMUL", &[Rm16], ModRmImm, 0xF7, 5),
    row_ext("DIV", &[Rm8], ModRmImm, 0xF6, 6),
    row_ext("DIV", &[Rm16], ModRmImm, 0xF7, 6),
    row_ext("IDIV", &[Rm8], ModRmImm, 0xF6, 7),
    row_ext("IDIV", &[Rm16], ModRmImm, 0xF7, 7),

    // TEST (no direction bit on 8086, both operand orders share 84/85)
    row("TEST", &[Rm8, Reg8], ModRm, 0x84),
    row("TEST", &[Rm16, Reg16], ModRm, 0x85),
    row("TEST", &[Reg8, Rm8], ModRm, 0x84),
    row("TEST", &[Reg16, Rm16], ModRm, 0x85),
    row("TEST", &[Al, Imm8], Immediate, 0xA8),
    row("TEST", &[Ax, Imm16], Immediate, 0xA9),
    row_ext("TEST", &[Rm8, Imm8], ModRmImm, 0xF6, 0),
    row_ext("TEST", &[Rm16, Imm16], ModRmImm, 0xF7, 0),

    // Shifts and rotates: by 1 (implicit), by explicit count, by CL
    row_ext("ROL", &[Rm8], ModRmImm, 0xD0, 0),
    row_ext("ROL", &[Rm16], ModRmImm, 0xD1, 0),
    row_ext("ROR", &[Rm8], ModRmImm, 0xD0, 1),
    row_ext("ROR", &[Rm16], ModRmImm, 0xD1, 1),
    row_ext("RCL", &[Rm8], ModRmImm, 0xD0, 2),
    row_ext("RCL", &[Rm16], ModRmImm, 0xD1, 2),
    row_ext("RCR", &[Rm8], ModRmImm, 0xD0, 3),
    row_ext("RCR", &[Rm16], ModRmImm, 0xD1, 3),
    row_ext("SHL", &[Rm8], ModRmImm, 0xD0, 4),
    row_ext("SHL", &[Rm16], ModRmImm, 0xD1, 4),
    row_ext("SAL", &[Rm8], ModRmImm, 0xD0, 4),
    row_ext("SAL", &[Rm16], ModRmImm, 0xD1, 4),
    row_ext("SHR", &[Rm8], ModRmImm, 0xD0, 5),
    row_ext("SHR", &[Rm16], ModRmImm, 0xD1, 5),
    row_ext("SAR", &[Rm8], ModRmImm, 0xD0, 7),
    row_ext("SAR", &[Rm16], ModRmImm, 0xD1, 7),
    row_ext("ROL", &[Rm8, Imm8], ModRmImm, 0xD0, 0),
    row_ext("ROL", &[Rm16, Imm8], ModRmImm, 0xD1, 0),
    row_ext("ROR", &[Rm8, Imm8], ModRmImm, 0xD0, 1),
    row_ext("ROR", &[Rm16, Imm8], ModRmImm, 0xD1, 1),
    row_ext("RCL", &[Rm8, Imm8], ModRmImm, 0xD0, 2),
    row_ext("RCL", &[Rm16, Imm8], ModRmImm, 0xD1, 2),
    row_ext("RCR", &[Rm8, Imm8], ModRmImm, 0xD0, 3),
    row_ext("RCR", &[Rm16, Imm8], ModRmImm, 0xD1, 3),
    row_ext("SHL", &[Rm8, Imm8], ModRmImm, 0xD0, 4),
    row_ext("SHL", &[Rm16, Imm8], ModRmImm, 0xD1, 4),
    row_ext("SAL", &[Rm8, Imm8], ModRmImm, 0xD0, 4),
    row_ext("SAL", &[Rm16, Imm8], ModRmImm, 0xD1, 4),
    row_ext("SHR", &[Rm8, Imm8], ModRmImm, 0xD0, 5),
    row_ext("SHR", &[Rm16, Imm8], ModRmImm, 0xD1, 5),
    row_ext("SAR", &[Rm8, Imm8], ModRmImm, 0xD0, 7),
    row_ext("SAR", &[Rm16, Imm8], ModRmImm, 0xD1, 7),
    row_ext("ROL", &[Rm8, Cl], ModRmImm, 0xD2, 0),
    row_ext("ROL", &[Rm16, Cl], ModRmImm, 0xD3, 0),
    row_ext("ROR", &[Rm8, Cl], ModRmImm, 0xD2, 1),
    row_ext("ROR", &[Rm16, Cl], ModRmImm, 0xD3, 1),
    row_ext("RCL", &[Rm8, Cl], ModRmImm, 0xD2, 2),
    row_ext("RCL", &[Rm16, Cl], ModRmImm, 0xD3, 2),
    row_ext("RCR", &[Rm8, Cl], ModRmImm, 0xD2, 3),
    row_ext("RCR", &[Rm16, Cl], ModRmImm, 0xD3, 3),
    row_ext("SHL", &[Rm8, Cl], ModRmImm, 0xD2, 4),
    row_ext("SHL", &[Rm16, Cl], ModRmImm, 0xD3, 4),
    row_ext("SAL", &[Rm8, Cl], ModRmImm, 0xD2, 4),
    row_ext("SAL", &[Rm16, Cl], ModRmImm, 0xD3, 4),
    row_ext("SHR", &[Rm8, Cl], ModRmImm, 0xD2, 5),
    row_ext("SHR", &[Rm16, Cl], ModRmImm, 0xD3, 5),
    row_ext("SAR", &[Rm8, Cl], ModRmImm, 0xD2, 7),
    row_ext("SAR", &[Rm16, Cl], ModRmImm, 0xD3, 7),

    // PUSH/POP; segment registers encode as base + reg*8
    row("PUSH", &[Ax], Fixed, 0x50),
    row("PUSH", &[Reg16], RegInOpcode, 0x50),
    row("PUSH", &[SegReg], RegInOpcode, 0x06),
    row_ext("PUSH", &[Rm16], ModRmImm, 0xFF, 6),
    row("POP", &[Ax], Fixed, 0x58),
    row("POP", &[Reg16], RegInOpcode, 0x58),
    row("POP", &[SegReg], RegInOpcode, 0x07),
    row_ext("POP", &[Rm16], ModRmImm, 0x8F, 0),

    // XCHG
    row("XCHG", &[Ax, Reg16], RegInOpcode, 0x90),
    row("XCHG", &[Reg16, Ax], RegInOpcode, 0x90),
    row("XCHG", &[Reg8, Rm8], ModRm, 0x86),
    row("XCHG", &[Reg16, Rm16], ModRm, 0x87),

    // Load effective address / far pointers
    row("LEA", &[Reg16, Mem16], ModRm, 0x8D),
    row("LDS", &[Reg16, Mem16], ModRm, 0xC5),
    row("LES", &[Reg16, Mem16], ModRm, 0xC4),

    // Control flow
    row("JMP", &[Rel8], Relative, 0xEB),
    row("JMP", &[Rel16], Relative, 0xE9),
    row_ext("JMP", &[Rm16], ModRmImm, 0xFF, 4),
    row("CALL", &[Rel16], Relative, 0xE8),
    row_ext("CALL", &[Rm16], ModRmImm, 0xFF, 2),
    row("RET", &[], Fixed, 0xC3),
    row("RET", &[Imm16], Immediate, 0xC2),
    row("RETF", &[], Fixed, 0xCB),
    row("RETF", &[Imm16], Immediate, 0xCA),

    // Conditional jumps, SHORT only on 8086
    row("JO", &[Rel8], Relative, 0x70),
    row("JNO", &[Rel8], Relative, 0x71),
    row("JB", &[Rel8], Relative, 0x72),
    row("JC", &[Rel8], Relative, 0x72),
    row("JNAE", &[Rel8], Relative, 0x72),
    row("JNB", &[Rel8], Relative, 0x73),
    row("JAE", &[Rel8], Relative, 0x73),
    row("JNC", &[Rel8], Relative, 0x73),
    row("JE", &[Rel8], Relative, 0x74),
    row("JZ", &[Rel8], Relative, 0x74),
    row("JNE", &[Rel8], Relative, 0x75),
    row("JNZ", &[Rel8], Relative, 0x75),
    row("JBE", &[Rel8], Relative, 0x76),
    row("JNA", &[Rel8], Relative, 0x76),
    row("JNBE", &[Rel8], Relative, 0x77),
    row("JA", &[Rel8], Relative, 0x77),
    row("JS", &[Rel8], Relative, 0x78),
    row("JNS", &[Rel8], Relative, 0x79),
    row("JP", &[Rel8], Relative, 0x7A),
    row("JPE", &[Rel8], Relative, 0x7A),
    row("JNP", &[Rel8], Relative, 0x7B),
    row("JPO", &[Rel8], Relative, 0x7B),
    row("JL", &[Rel8], Relative, 0x7C),
    row("JNGE", &[Rel8], Relative, 0x7C),
    row("JNL", &[Rel8], Relative, 0x7D),
    row("JGE", &[Rel8], Relative, 0x7D),
    row("JLE", &[Rel8], Relative, 0x7E),
    row("JNG", &[Rel8], Relative, 0x7E),
    row("JNLE", &[Rel8], Relative, 0x7F),
    row("JG", &[Rel8], Relative, 0x7F),

    // Loops
    row("LOOP", &[Rel8], Relative, 0xE2),
    row("LOOPE", &[Rel8], Relative, 0xE1),
    row("LOOPZ", &[Rel8], Relative, 0xE1),
    row("LOOPNE", &[Rel8], Relative, 0xE0),
    row("LOOPNZ", &[Rel8], Relative, 0xE0),
    row("JCXZ", &[Rel8], Relative, 0xE3),

    // Interrupts
    row("INT", &[Imm8], Immediate, 0xCD),
    row("INT3", &[], Fixed, 0xCC),
    row("INTO", &[], Fixed, 0xCE),
    row("IRET", &[], Fixed, 0xCF),

    // String operations
    row("MOVSB", &[], Fixed, 0xA4),
    row("MOVSW", &[], Fixed, 0xA5),
    row("CMPSB", &[], Fixed, 0xA6),
    row("CMPSW", &[], Fixed, 0xA7),
    row("SCASB", &[], Fixed, 0xAE),
    row("SCASW", &[], Fixed, 0xAF),
    row("LODSB", &[], Fixed, 0xAC),
    row("LODSW", &[], Fixed, 0xAD),
    row("STOSB", &[], Fixed, 0xAA),
    row("STOSW", &[], Fixed, 0xAB),

    // Repeat prefixes, standalone mnemonics
    row("REP", &[], Fixed, 0xF3),
    row("REPE", &[], Fixed, 0xF3),
    row("REPZ", &[], Fixed, 0xF3),
    row("REPNE", &[], Fixed, 0xF2),
    row("REPNZ", &[], Fixed, 0xF2),

    // I/O
    row("IN", &[Al, Imm8], Immediate, 0xE4),
    row("IN", &[Ax, Imm8], Immediate, 0xE5),
    row("IN", &[Al, Dx], Fixed, 0xEC),
    row("IN", &[Ax, Dx], Fixed, 0xED),
    row("OUT", &[Imm8, Al], Immediate, 0xE6),
    row("OUT", &[Imm8, Ax], Immediate, 0xE7),
    row("OUT", &[Dx, Al], Fixed, 0xEE),
    row("OUT", &[Dx, Ax], Fixed, 0xEF),

    // No-operand instructions
    row("NOP", &[], Fixed, 0x90),
    row("HLT", &[], Fixed, 0xF4),
    row("PUSHA", &[], Fixed, 0x60),
    row("POPA", &[], Fixed, 0x61),
    row("CLC", &[], Fixed, 0xF8),
    row("STC", &[], Fixed, 0xF9),
    row("CMC", &[], Fixed, 0xF5),
    row("CLD", &[], Fixed, 0xFC),
    row("STD", &[], Fixed, 0xFD),
    row("CLI", &[], Fixed, 0xFA),
    row("STI", &[], Fixed, 0xFB),
    row("LAHF", &[], Fixed, 0x9F),
    row("SAHF", &[], Fixed, 0x9E),
    row("PUSHF", &[], Fixed, 0x9C),
    row("POPF", &[], Fixed, 0x9D),
    row("CBW", &[], Fixed, 0x98),
    row("CWD", &[], Fixed, 0x99),
    row("AAA", &[], Fixed, 0x37),
    row("AAS", &[], Fixed, 0x3F),
    row("AAM", &[], Fixed, 0xD4),
    row("AAD", &[], Fixed, 0xD5),
    row("DAA", &[], Fixed, 0x27),
    row("DAS", &[], Fixed, 0x2F),
    row("XLAT", &[], Fixed, 0xD7),
    row("WAIT", &[], Fixed, 0x9B),
    row("LOCK", &[], Fixed, 0xF0),
];

/// True if any table row carries this mnemonic.
#[must_use]
pub fn has_mnemonic(mnemonic: &str) -> bool {
    INSTRUCTION_TABLE
        .iter()
        .any(|enc| enc.mnemonic.eq_ignore_ascii_case(mnemonic))
}

/// Prefix mnemonics that take no operands of their own and precede another
/// instruction on the same line.
#[must_use]
pub fn is_prefix_mnemonic(mnemonic: &str) -> bool {
    matches!(
        mnemonic.to_ascii_uppercase().as_str(),
        "REP" | "REPE" | "REPZ" | "REPNE" | "REPNZ" | "LOCK"
    )
}

/// Default branch distance for a relative-form mnemonic: conditional jumps
/// and loops only have a SHORT encoding, JMP/CALL default to NEAR.
#[must_use]
pub fn default_jump_kind(mnemonic: &str) -> Option<JumpKind> {
    let mut has_rel8 = false;
    let mut has_rel16 = false;
    for enc in INSTRUCTION_TABLE {
        if !enc.mnemonic.eq_ignore_ascii_case(mnemonic) {
            continue;
        }
        match enc.operands.first() {
            Some(Pattern::Rel8) => has_rel8 = true,
            Some(Pattern::Rel16) => has_rel16 = true,
            _ => {}
        }
    }
    if has_rel16 {
        Some(JumpKind::Near)
    } else if has_rel8 {
        Some(JumpKind::Short)
    } else {
        None
    }
}

/// Specificity score of a pattern: specific registers beat register
/// classes, which beat r/m, which beat everything else.
fn specificity(pattern: Pattern) -> i32 {
    match pattern {
        Pattern::Al | Pattern::Ax | Pattern::Cl | Pattern::Dx => 10,
        Pattern::Reg8 | Pattern::Reg16 | Pattern::SegReg => 5,
        Pattern::Rm8 | Pattern::Rm16 => 3,
        _ => 1,
    }
}

/// Pick the most specific table row matching the operand list. Ties keep
/// the earliest row, so byte-sized forms win when both widths fit.
#[must_use]
pub fn find_encoding(mnemonic: &str, operands: &[Operand]) -> Option<&'static Encoding> {
    let mut best: Option<&'static Encoding> = None;
    let mut best_score = -1;

    for enc in INSTRUCTION_TABLE {
        if !enc.mnemonic.eq_ignore_ascii_case(mnemonic) {
            continue;
        }
        if enc.operands.len() != operands.len() {
            continue;
        }

        let mut score = 0;
        let mut all_match = true;
        for (operand, &pattern) in operands.iter().zip(enc.operands) {
            if !matches_pattern(operand, pattern) {
                all_match = false;
                break;
            }
            score += specificity(pattern);
        }

        if all_match && score > best_score {
            best = Some(enc);
            best_score = score;
        }
    }

    best
}

fn matches_pattern(operand: &Operand, pattern: Pattern) -> bool {
    use crate::core::ast::SizeHint;

    let reg = operand.as_register();
    let imm = operand.as_immediate();
    let mem = operand.as_memory();
    let label = operand.as_label_ref();

    match pattern {
        Pattern::Reg8 => reg.is_some_and(|r| r.size == 8 && !r.is_segment),
        Pattern::Reg16 => reg.is_some_and(|r| r.size == 16 && !r.is_segment),
        Pattern::SegReg => reg.is_some_and(|r| r.is_segment),
        Pattern::Al => reg.is_some_and(|r| r.size == 8 && r.code == 0),
        Pattern::Ax => reg.is_some_and(|r| r.size == 16 && r.code == 0 && !r.is_segment),
        Pattern::Cl => reg.is_some_and(|r| r.size == 8 && r.code == 1),
        Pattern::Dx => reg.is_some_and(|r| r.size == 16 && r.code == 2 && !r.is_segment),

        // Pure direct address, for the accumulator moffs encodings.
        Pattern::Mem8 => mem.is_some_and(|m| m.address.is_direct()),

        // Direct or label-only memory; a bare label reference also counts
        // (LEA-style usage).
        Pattern::Mem16 => {
            if label.is_some() {
                return true;
            }
            mem.is_some_and(|m| m.address.registers.is_empty())
        }

        Pattern::Rm8 => {
            if let Some(m) = mem {
                return m.size_hint != SizeHint::Word;
            }
            reg.is_some_and(|r| r.size == 8 && !r.is_segment)
        }
        Pattern::Rm16 => {
            if let Some(m) = mem {
                return m.size_hint != SizeHint::Byte;
            }
            reg.is_some_and(|r| r.size == 16 && !r.is_segment)
        }

        Pattern::Imm8 => {
            if let Some(i) = imm {
                if i.size_hint == SizeHint::Word {
                    return false;
                }
                return i.expr.is_some() || (-128..=255).contains(&i.value);
            }
            label.is_some()
        }
        Pattern::Imm16 => {
            if let Some(i) = imm {
                if i.size_hint == SizeHint::Byte {
                    return false;
                }
                return i.expr.is_some() || (-32768..=65535).contains(&i.value);
            }
            label.is_some()
        }

        Pattern::Rel8 => label.is_some_and(|l| l.jump == JumpKind::Short),
        Pattern::Rel16 => label.is_some_and(|l| matches!(l.jump, JumpKind::Near | JumpKind::Far)),
    }
}
