// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! ModR/M byte and displacement generation.
//!
//! `mod:2 | reg:3 | rm:3`, followed by 0, 1, or 2 little-endian
//! displacement bytes.

use thiserror::Error;

use crate::core::ast::{AddrReg, AddressExpression};
use crate::core::expr::EvalContext;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModRmError {
    #[error("invalid addressing mode combination")]
    InvalidCombination,
    #[error("undefined label: {0}")]
    UndefinedLabel(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModRmBytes {
    pub modrm: u8,
    pub displacement: Vec<u8>,
}

fn combine(mode: u8, reg: u8, rm: u8) -> u8 {
    ((mode & 0x03) << 6) | ((reg & 0x07) << 3) | (rm & 0x07)
}

/// Register-to-register form: mod = 11.
#[must_use]
pub fn reg_to_reg(reg_field: u8, rm_field: u8) -> u8 {
    combine(0b11, reg_field, rm_field)
}

/// Direct addressing: mod = 00, r/m = 110, 16-bit address.
#[must_use]
pub fn direct(address: u16, reg_field: u8) -> ModRmBytes {
    ModRmBytes {
        modrm: combine(0b00, reg_field, 0b110),
        displacement: encode_displacement(i64::from(address), 2),
    }
}

/// Encode a resolved memory operand. Any label is folded into the
/// displacement through `ctx`; an operand that carried a label always gets
/// a 16-bit displacement so the emitted size matches the analyzer's
/// worst-case estimate.
pub fn memory(
    addr: &AddressExpression,
    reg_field: u8,
    ctx: &dyn EvalContext,
) -> Result<ModRmBytes, ModRmError> {
    let mut displacement = addr.displacement;
    let mut has_disp = addr.has_displacement;
    let had_label = addr.label.is_some();

    if let Some(label) = &addr.label {
        let value = ctx
            .lookup_symbol(label)
            .ok_or_else(|| ModRmError::UndefinedLabel(label.clone()))?;
        displacement += if addr.label_negate { -value } else { value };
        has_disp = true;
    }

    let rm = rm_code(&addr.registers).ok_or(ModRmError::InvalidCombination)?;

    // Direct address: no registers, displacement and/or label only.
    if addr.registers.is_empty() {
        return Ok(ModRmBytes {
            modrm: combine(0b00, reg_field, 0b110),
            displacement: encode_displacement(displacement, 2),
        });
    }

    // [BP] with no displacement: mod=00/rm=110 would mean direct address,
    // so the encoding requires an explicit zero disp8.
    if addr.registers == [AddrReg::Bp] && !has_disp {
        return Ok(ModRmBytes {
            modrm: combine(0b01, reg_field, rm),
            displacement: vec![0x00],
        });
    }

    let (mode, disp_bytes) = if !has_disp {
        (0b00, 0)
    } else if !had_label && (-128..=127).contains(&displacement) {
        (0b01, 1)
    } else {
        (0b10, 2)
    };

    Ok(ModRmBytes {
        modrm: combine(mode, reg_field, rm),
        displacement: encode_displacement(displacement, disp_bytes),
    })
}

/// ModR/M + displacement byte count of a memory operand, as the encoder
/// will emit it. Unresolved labels count as 16-bit displacements.
#[must_use]
pub fn encoding_size(addr: &AddressExpression) -> u64 {
    if addr.registers.is_empty() {
        return 3;
    }
    if addr.label.is_some() {
        return 3;
    }
    if !addr.has_displacement {
        if addr.registers == [AddrReg::Bp] {
            return 2;
        }
        return 1;
    }
    if (-128..=127).contains(&addr.displacement) {
        2
    } else {
        3
    }
}

/// R/M field for a register combination; `None` for illegal shapes.
fn rm_code(registers: &[AddrReg]) -> Option<u8> {
    match registers {
        [] => Some(0b110),
        [AddrReg::Si] => Some(0b100),
        [AddrReg::Di] => Some(0b101),
        [AddrReg::Bp] => Some(0b110),
        [AddrReg::Bx] => Some(0b111),
        [a, b] => {
            let has = |reg: AddrReg| *a == reg || *b == reg;
            if a == b {
                return None;
            }
            match (has(AddrReg::Bx), has(AddrReg::Bp), has(AddrReg::Si), has(AddrReg::Di)) {
                (true, false, true, false) => Some(0b000),
                (true, false, false, true) => Some(0b001),
                (false, true, true, false) => Some(0b010),
                (false, true, false, true) => Some(0b011),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Little-endian, two's complement truncated to the requested width.
#[must_use]
pub fn encode_displacement(value: i64, size_bytes: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(size_bytes);
    let mut value = value;
    for _ in 0..size_bytes {
        bytes.push((value & 0xFF) as u8);
        value >>= 8;
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ast::SymbolTerm;
    use crate::core::expr::SimpleEvalContext;
    use proptest::prelude::*;

    fn addr(registers: Vec<AddrReg>, displacement: i64, has_displacement: bool) -> AddressExpression {
        AddressExpression {
            registers,
            displacement,
            has_displacement,
            ..Default::default()
        }
    }

    fn no_symbols() -> SimpleEvalContext<fn(&str) -> Option<i64>> {
        SimpleEvalContext::new(|_| None)
    }

    #[test]
    fn reg_to_reg_sets_mod_11() {
        assert_eq!(reg_to_reg(0, 0), 0xC0);
        assert_eq!(reg_to_reg(0, 3), 0xC3);
        assert_eq!(reg_to_reg(3, 0), 0xD8);
    }

    #[test]
    fn direct_address_uses_rm_110() {
        let result = direct(0x1234, 0);
        assert_eq!(result.modrm, 0x06);
        assert_eq!(result.displacement, vec![0x34, 0x12]);
    }

    #[test]
    fn base_index_pairs() {
        let cases = [
            (vec![AddrReg::Bx, AddrReg::Si], 0b000),
            (vec![AddrReg::Bx, AddrReg::Di], 0b001),
            (vec![AddrReg::Bp, AddrReg::Si], 0b010),
            (vec![AddrReg::Bp, AddrReg::Di], 0b011),
            (vec![AddrReg::Si], 0b100),
            (vec![AddrReg::Di], 0b101),
            (vec![AddrReg::Bx], 0b111),
        ];
        for (registers, rm) in cases {
            let result = memory(&addr(registers, 0, false), 0, &no_symbols()).unwrap();
            assert_eq!(result.modrm, rm, "rm mismatch");
            assert!(result.displacement.is_empty());
        }
    }

    #[test]
    fn bp_alone_forces_zero_disp8() {
        let result = memory(&addr(vec![AddrReg::Bp], 0, false), 0, &no_symbols()).unwrap();
        assert_eq!(result.modrm, combine(0b01, 0, 0b110));
        assert_eq!(result.displacement, vec![0x00]);
    }

    #[test]
    fn disp8_and_disp16_selection() {
        let result = memory(&addr(vec![AddrReg::Bx], 16, true), 0, &no_symbols()).unwrap();
        assert_eq!(result.modrm, combine(0b01, 0, 0b111));
        assert_eq!(result.displacement, vec![0x10]);

        let result = memory(&addr(vec![AddrReg::Bx], -2, true), 0, &no_symbols()).unwrap();
        assert_eq!(result.displacement, vec![0xFE]);

        let result = memory(&addr(vec![AddrReg::Bx], 0x200, true), 0, &no_symbols()).unwrap();
        assert_eq!(result.modrm, combine(0b10, 0, 0b111));
        assert_eq!(result.displacement, vec![0x00, 0x02]);
    }

    #[test]
    fn label_folds_and_widens_to_disp16() {
        let mut expr = addr(vec![AddrReg::Si], 2, true);
        expr.label = Some("buffer".to_string());
        let ctx = SimpleEvalContext::new(|name| (name == "buffer").then_some(0x10));
        let result = memory(&expr, 0, &ctx).unwrap();
        // Folded value is small, but a label always means 16-bit disp.
        assert_eq!(result.modrm, combine(0b10, 0, 0b100));
        assert_eq!(result.displacement, vec![0x12, 0x00]);
    }

    #[test]
    fn undefined_label_errors() {
        let mut expr = addr(vec![AddrReg::Si], 0, false);
        expr.label = Some("nope".to_string());
        assert_eq!(
            memory(&expr, 0, &no_symbols()),
            Err(ModRmError::UndefinedLabel("nope".to_string()))
        );
    }

    #[test]
    fn illegal_combinations_fail() {
        let bad = [
            vec![AddrReg::Si, AddrReg::Di],
            vec![AddrReg::Bx, AddrReg::Bp],
            vec![AddrReg::Bx, AddrReg::Bx],
            vec![AddrReg::Bx, AddrReg::Si, AddrReg::Di],
        ];
        for registers in bad {
            assert_eq!(
                memory(&addr(registers, 0, false), 0, &no_symbols()),
                Err(ModRmError::InvalidCombination)
            );
        }
    }

    #[test]
    fn encoding_size_matches_emitted_bytes() {
        let cases = [
            addr(vec![], 0x1234, true),
            addr(vec![AddrReg::Bx], 0, false),
            addr(vec![AddrReg::Bp], 0, false),
            addr(vec![AddrReg::Bx, AddrReg::Si], 5, true),
            addr(vec![AddrReg::Di], 0x300, true),
        ];
        for expr in cases {
            let emitted = memory(&expr, 0, &no_symbols()).unwrap();
            assert_eq!(
                encoding_size(&expr),
                1 + emitted.displacement.len() as u64,
                "size mismatch for {expr:?}"
            );
        }
    }

    #[test]
    fn unresolved_term_does_not_change_size_estimate() {
        // Size is estimated before resolution; terms are not labels yet.
        let mut expr = addr(vec![AddrReg::Bx], 0, false);
        expr.terms.push(SymbolTerm {
            name: "pending".to_string(),
            negate: false,
        });
        assert_eq!(encoding_size(&expr), 1);
    }

    proptest! {
        /// Any legal register shape with any displacement emits a ModR/M
        /// whose mod field agrees with the displacement length.
        #[test]
        fn mod_field_matches_disp_len(
            shape in 0usize..7,
            disp in -0x8000i64..0x8000,
            has_disp in any::<bool>(),
        ) {
            let registers = match shape {
                0 => vec![AddrReg::Bx, AddrReg::Si],
                1 => vec![AddrReg::Bx, AddrReg::Di],
                2 => vec![AddrReg::Bp, AddrReg::Si],
                3 => vec![AddrReg::Bp, AddrReg::Di],
                4 => vec![AddrReg::Si],
                5 => vec![AddrReg::Di],
                _ => vec![AddrReg::Bx],
            };
            let expr = addr(registers, disp, has_disp);
            let result = memory(&expr, 0, &no_symbols()).unwrap();
            let mode = result.modrm >> 6;
            match mode {
                0b00 => prop_assert_eq!(result.displacement.len(), 0),
                0b01 => prop_assert_eq!(result.displacement.len(), 1),
                0b10 => prop_assert_eq!(result.displacement.len(), 2),
                _ => prop_assert!(false, "unexpected mod for memory operand"),
            }
            prop_assert_eq!(encoding_size(&expr), 1 + result.displacement.len() as u64);
        }
    }
}
