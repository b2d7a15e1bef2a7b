// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Expression evaluation.
//!
//! Two surfaces: a constant integer evaluator (`evaluate*`) used for EQU
//! values, immediates, and TIMES counts, and the address-expression parser
//! (`parse_address`/`resolve_address`) for the contents of `[...]` operands.

use thiserror::Error;

use crate::core::ast::{AddrReg, AddressExpression, SymbolTerm};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("invalid expression: {0}")]
    Invalid(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("undefined symbol: {0}")]
    UndefinedSymbol(String),
    #[error("invalid addressing expression: {0}")]
    InvalidAddress(String),
    #[error("register cannot be negated in address expression: {0}")]
    NegativeRegister(String),
    #[error("only one unresolved symbol allowed in address expression: {0}")]
    MultipleLabels(String),
}

/// Symbol resolution context for expression evaluation.
pub trait EvalContext {
    fn lookup_symbol(&self, name: &str) -> Option<i64>;
}

/// Context wrapping a plain lookup function.
pub struct SimpleEvalContext<F>
where
    F: Fn(&str) -> Option<i64>,
{
    lookup: F,
}

impl<F> SimpleEvalContext<F>
where
    F: Fn(&str) -> Option<i64>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }
}

impl<F> EvalContext for SimpleEvalContext<F>
where
    F: Fn(&str) -> Option<i64>,
{
    fn lookup_symbol(&self, name: &str) -> Option<i64> {
        (self.lookup)(name)
    }
}

/// Parse a number literal (decimal, hex, binary, octal).
///
/// Accepts `0x2A`, `$2A`, `2Ah`, `0b1010`, `1010b`, `0o52`, `52o`, `52q`,
/// plain decimal, a leading `-`, and `_` separators.
#[must_use]
pub fn parse_number(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (is_neg, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let text: String = text.chars().filter(|&c| c != '_').collect();
    let text = text.as_str();
    if text.is_empty() {
        return None;
    }

    let val = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(hex) = text.strip_prefix('$') {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        // 0b with no binary digits falls through to the suffix forms below
        // (e.g. `0B8H` is hex).
        if !bin.is_empty() && bin.bytes().all(|c| c == b'0' || c == b'1') {
            i64::from_str_radix(bin, 2).ok()?
        } else {
            return parse_suffixed(text, is_neg);
        }
    } else if let Some(oct) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        i64::from_str_radix(oct, 8).ok()?
    } else {
        return parse_suffixed(text, is_neg);
    };

    Some(if is_neg { -val } else { val })
}

fn parse_suffixed(text: &str, is_neg: bool) -> Option<i64> {
    if !text.as_bytes().first()?.is_ascii_digit() {
        return None;
    }

    let val = if let Some(hex) = text.strip_suffix('h').or_else(|| text.strip_suffix('H')) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(body) = text.strip_suffix('b').or_else(|| text.strip_suffix('B')) {
        // `b` doubles as a hex digit; only all-binary bodies are binary.
        if !body.is_empty() && body.bytes().all(|c| c == b'0' || c == b'1') {
            i64::from_str_radix(body, 2).ok()?
        } else {
            return None;
        }
    } else if let Some(oct) = text
        .strip_suffix('o')
        .or_else(|| text.strip_suffix('O'))
        .or_else(|| text.strip_suffix('q'))
        .or_else(|| text.strip_suffix('Q'))
    {
        i64::from_str_radix(oct, 8).ok()?
    } else {
        text.parse::<i64>().ok()?
    };

    Some(if is_neg { -val } else { val })
}

/// True if the text is a plain identifier (letters, digits, `_`, `.`,
/// starting with a letter, `_`, or `.`).
#[must_use]
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Evaluate a constant arithmetic expression (`+ - * /`, parentheses,
/// numeric literals in any supported base).
pub fn evaluate(expr: &str) -> Result<i64, EvalError> {
    eval_clean(&strip_spaces(expr), None)
}

/// Evaluate with symbol resolution through `ctx`.
pub fn evaluate_with_symbols(expr: &str, ctx: &dyn EvalContext) -> Result<i64, EvalError> {
    eval_clean(&strip_spaces(expr), Some(ctx))
}

/// Evaluate with `$` and `$$` position markers substituted first.
pub fn evaluate_with_position(
    expr: &str,
    current: u64,
    segment_start: u64,
    ctx: &dyn EvalContext,
) -> Result<i64, EvalError> {
    let substituted = substitute_markers(expr, current, segment_start);
    eval_clean(&strip_spaces(&substituted), Some(ctx))
}

/// Replace `$$` with the segment start and a bare `$` with the current
/// address. A `$` introducing a hex literal (`$FF`) is left alone.
fn substitute_markers(expr: &str, current: u64, segment_start: u64) -> String {
    let bytes = expr.as_bytes();
    let mut out = String::with_capacity(expr.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            if bytes.get(i + 1) == Some(&b'$') {
                out.push_str(&segment_start.to_string());
                i += 2;
                continue;
            }
            let next = bytes.get(i + 1).copied().unwrap_or(0);
            if !next.is_ascii_hexdigit() && next != b'_' {
                out.push_str(&current.to_string());
                i += 1;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

fn strip_spaces(expr: &str) -> String {
    expr.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_operator(c: u8) -> bool {
    matches!(c, b'+' | b'-' | b'*' | b'/' | b'(')
}

fn eval_clean(clean: &str, ctx: Option<&dyn EvalContext>) -> Result<i64, EvalError> {
    if clean.is_empty() {
        return Err(EvalError::Invalid(clean.to_string()));
    }
    let bytes = clean.as_bytes();

    // Addition/subtraction bind loosest; scan right-to-left at paren depth 0.
    let mut depth = 0i32;
    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b')' => depth += 1,
            b'(' => depth -= 1,
            c @ (b'+' | b'-') if depth == 0 => {
                // A sign at the start or after an operator is unary.
                if i == 0 || is_operator(bytes[i - 1]) {
                    continue;
                }
                let left = eval_clean(&clean[..i], ctx)?;
                let right = eval_clean(&clean[i + 1..], ctx)?;
                return Ok(if c == b'+' {
                    left.wrapping_add(right)
                } else {
                    left.wrapping_sub(right)
                });
            }
            _ => {}
        }
    }

    depth = 0;
    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b')' => depth += 1,
            b'(' => depth -= 1,
            c @ (b'*' | b'/') if depth == 0 && i > 0 => {
                let left = eval_clean(&clean[..i], ctx)?;
                let right = eval_clean(&clean[i + 1..], ctx)?;
                if c == b'*' {
                    return Ok(left.wrapping_mul(right));
                }
                if right == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                return Ok(left / right);
            }
            _ => {}
        }
    }

    // Remaining unary sign on a non-literal (literals carry their own sign).
    if let Some(rest) = clean.strip_prefix('-') {
        if !rest.is_empty() && !rest.as_bytes()[0].is_ascii_digit() {
            return Ok(-eval_clean(rest, ctx)?);
        }
    }
    if let Some(rest) = clean.strip_prefix('+') {
        return eval_clean(rest, ctx);
    }

    // Parenthesized group.
    if clean.starts_with('(') && clean.ends_with(')') && is_balanced_group(bytes) {
        return eval_clean(&clean[1..clean.len() - 1], ctx);
    }

    if let Some(val) = parse_number(clean) {
        return Ok(val);
    }

    if is_identifier(clean) {
        if let Some(ctx) = ctx {
            return ctx
                .lookup_symbol(clean)
                .ok_or_else(|| EvalError::UndefinedSymbol(clean.to_string()));
        }
        return Err(EvalError::UndefinedSymbol(clean.to_string()));
    }

    Err(EvalError::Invalid(clean.to_string()))
}

/// True if the outermost parentheses wrap the whole expression.
fn is_balanced_group(bytes: &[u8]) -> bool {
    let mut depth = 0i32;
    for (i, &c) in bytes.iter().enumerate() {
        match c {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 && i != bytes.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Parse the textual contents of a `[...]` operand without symbol knowledge.
///
/// Splits at top-level `+`/`-`; each term is classified as an address
/// register, an integer constant, or a symbolic term to be folded later by
/// [`resolve_address`].
pub fn parse_address(expr: &str) -> Result<AddressExpression, EvalError> {
    let mut result = AddressExpression::default();

    for (term, negate) in split_terms(expr) {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }

        if let Some(reg) = AddrReg::from_name(term) {
            if negate {
                return Err(EvalError::NegativeRegister(term.to_string()));
            }
            result.registers.push(reg);
            continue;
        }

        if let Some(val) = parse_number(term) {
            result.displacement += if negate { -val } else { val };
            result.has_displacement = true;
            continue;
        }

        if is_identifier(term) {
            result.terms.push(SymbolTerm {
                name: term.to_string(),
                negate,
            });
            continue;
        }

        // Sub-expressions like `(8*2)` fold immediately.
        if let Ok(val) = evaluate(term) {
            result.displacement += if negate { -val } else { val };
            result.has_displacement = true;
            continue;
        }

        return Err(EvalError::InvalidAddress(expr.to_string()));
    }

    Ok(result)
}

/// Fold the symbolic terms of a parsed address through `ctx`. Resolvable
/// names (EQU constants, already-defined labels) land in the displacement;
/// at most one name may remain unresolved and becomes the label reference.
pub fn resolve_address(
    addr: &AddressExpression,
    ctx: &dyn EvalContext,
) -> Result<AddressExpression, EvalError> {
    let mut result = addr.clone();
    result.terms.clear();

    for term in &addr.terms {
        if let Some(val) = ctx.lookup_symbol(&term.name) {
            result.displacement += if term.negate { -val } else { val };
            result.has_displacement = true;
            continue;
        }
        if result.label.is_some() {
            return Err(EvalError::MultipleLabels(term.name.clone()));
        }
        result.label = Some(term.name.clone());
        result.label_negate = term.negate;
    }

    Ok(result)
}

/// Split at top-level `+`/`-`, honoring parentheses. Yields (term, negated).
fn split_terms(expr: &str) -> Vec<(String, bool)> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut negate = false;
    let mut depth = 0i32;

    for c in expr.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            '+' | '-' if depth == 0 => {
                if current.trim().is_empty() {
                    // Leading sign of the next term.
                    negate = c == '-';
                } else {
                    terms.push((std::mem::take(&mut current), negate));
                    negate = c == '-';
                }
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        terms.push((current, negate));
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_number_bases() {
        assert_eq!(parse_number("42"), Some(42));
        assert_eq!(parse_number("-10"), Some(-10));
        assert_eq!(parse_number("0x2A"), Some(42));
        assert_eq!(parse_number("$2A"), Some(42));
        assert_eq!(parse_number("2Ah"), Some(42));
        assert_eq!(parse_number("0b101010"), Some(42));
        assert_eq!(parse_number("101010b"), Some(42));
        assert_eq!(parse_number("0o52"), Some(42));
        assert_eq!(parse_number("52q"), Some(42));
        assert_eq!(parse_number("1_000"), Some(1000));
        assert_eq!(parse_number("$BB"), Some(0xBB));
        assert_eq!(parse_number("AX"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn evaluate_precedence_and_parens() {
        assert_eq!(evaluate("1+2*3").unwrap(), 7);
        assert_eq!(evaluate("(1+2)*3").unwrap(), 9);
        assert_eq!(evaluate("10-2-3").unwrap(), 5);
        assert_eq!(evaluate("100/5/2").unwrap(), 10);
        assert_eq!(evaluate("-4+10").unwrap(), 6);
        assert_eq!(evaluate("510-(8-0)").unwrap(), 502);
    }

    #[test]
    fn evaluate_division_by_zero() {
        assert_eq!(evaluate("1/0"), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn evaluate_rejects_garbage() {
        assert!(evaluate("").is_err());
        assert!(evaluate("1+").is_err());
        assert!(evaluate("(1").is_err());
    }

    #[test]
    fn evaluate_with_position_markers() {
        let ctx = SimpleEvalContext::new(|_| None);
        let val = evaluate_with_position("510-($-$$)", 0x7C08, 0x7C00, &ctx).unwrap();
        assert_eq!(val, 502);

        // `$FF` is a hex literal, not a position marker.
        let val = evaluate_with_position("$FF+$", 0x10, 0, &ctx).unwrap();
        assert_eq!(val, 0xFF + 0x10);
    }

    #[test]
    fn evaluate_resolves_symbols() {
        let ctx = SimpleEvalContext::new(|name| match name {
            "COUNT" => Some(16),
            _ => None,
        });
        assert_eq!(evaluate_with_symbols("COUNT*2", &ctx).unwrap(), 32);
        assert_eq!(
            evaluate_with_symbols("missing", &ctx),
            Err(EvalError::UndefinedSymbol("missing".to_string()))
        );
    }

    #[test]
    fn parse_address_register_pairs() {
        let addr = parse_address("BX+SI").unwrap();
        assert_eq!(addr.registers, vec![AddrReg::Bx, AddrReg::Si]);
        assert!(!addr.has_displacement);

        let addr = parse_address("bp+di+8").unwrap();
        assert_eq!(addr.registers, vec![AddrReg::Bp, AddrReg::Di]);
        assert_eq!(addr.displacement, 8);
    }

    #[test]
    fn parse_address_negative_displacement() {
        let addr = parse_address("BX-2").unwrap();
        assert_eq!(addr.displacement, -2);
        assert!(addr.has_displacement);
    }

    #[test]
    fn parse_address_negative_register_fails() {
        assert!(matches!(
            parse_address("BX-SI"),
            Err(EvalError::NegativeRegister(_))
        ));
    }

    #[test]
    fn parse_address_keeps_symbol_terms() {
        let addr = parse_address("BX+table").unwrap();
        assert_eq!(addr.terms.len(), 1);
        assert_eq!(addr.terms[0].name, "table");
        assert!(!addr.terms[0].negate);
    }

    #[test]
    fn resolve_address_folds_constants() {
        let parsed = parse_address("BX+OFFSET+2").unwrap();
        let ctx = SimpleEvalContext::new(|name| (name == "OFFSET").then_some(0x10));
        let resolved = resolve_address(&parsed, &ctx).unwrap();
        assert_eq!(resolved.displacement, 0x12);
        assert!(resolved.label.is_none());
        assert!(resolved.terms.is_empty());
    }

    #[test]
    fn resolve_address_keeps_one_label() {
        let parsed = parse_address("SI+buffer").unwrap();
        let ctx = SimpleEvalContext::new(|_| None);
        let resolved = resolve_address(&parsed, &ctx).unwrap();
        assert_eq!(resolved.label.as_deref(), Some("buffer"));

        let parsed = parse_address("one+two").unwrap();
        assert!(matches!(
            resolve_address(&parsed, &ctx),
            Err(EvalError::MultipleLabels(_))
        ));
    }

    proptest! {
        #[test]
        fn parse_number_decimal_round_trip_u32(value in any::<u32>()) {
            let text = value.to_string();
            prop_assert_eq!(parse_number(&text), Some(value as i64));
        }

        #[test]
        fn parse_number_hex_round_trip_u32(value in any::<u32>()) {
            let text = format!("0x{:X}", value);
            prop_assert_eq!(parse_number(&text), Some(value as i64));
        }

        #[test]
        fn parse_number_binary_round_trip_u16(value in any::<u16>()) {
            let text = format!("0b{:b}", value);
            prop_assert_eq!(parse_number(&text), Some(value as i64));
        }

        #[test]
        fn evaluate_matches_integer_arithmetic(a in -1000i64..1000, b in 1i64..1000) {
            prop_assert_eq!(evaluate(&format!("{a}+{b}")).unwrap(), a + b);
            prop_assert_eq!(evaluate(&format!("{a}*{b}")).unwrap(), a * b);
            prop_assert_eq!(evaluate(&format!("({a})/{b}")).unwrap(), a / b);
        }
    }
}
