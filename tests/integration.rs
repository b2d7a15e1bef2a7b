// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! End-to-end assembly scenarios and whole-pipeline invariants.

use asm86::{Assembler, AssemblyResult};

fn assemble(source: &str) -> AssemblyResult {
    Assembler::new().assemble(source, "test.asm")
}

fn assemble_ok(source: &str) -> AssemblyResult {
    let result = assemble(source);
    assert!(result.success, "errors: {:?}", result.errors);
    result
}

#[test]
fn nop_is_90() {
    assert_eq!(assemble_ok("NOP").binary, vec![0x90]);
}

#[test]
fn mov_ax_imm16() {
    assert_eq!(assemble_ok("MOV AX, 0x1234").binary, vec![0xB8, 0x34, 0x12]);
}

#[test]
fn mov_al_imm8() {
    assert_eq!(assemble_ok("MOV AL, 0x42").binary, vec![0xB0, 0x42]);
}

#[test]
fn push_pop_registers() {
    assert_eq!(assemble_ok("PUSH AX\nPOP BX").binary, vec![0x50, 0x5B]);
}

#[test]
fn int_21() {
    assert_eq!(assemble_ok("INT 0x21").binary, vec![0xCD, 0x21]);
}

#[test]
fn short_jump_over_nops() {
    let result = assemble_ok("JMP SHORT .l\nNOP\nNOP\n.l: HLT");
    assert_eq!(result.binary, vec![0xEB, 0x02, 0x90, 0x90, 0xF4]);
}

#[test]
fn rep_movsb_prefix_sequence() {
    assert_eq!(assemble_ok("REP MOVSB").binary, vec![0xF3, 0xA4]);
}

#[test]
fn boot_sector_is_512_bytes() {
    let source = "\
ORG 0x7C00
CLI
XOR AX, AX
MOV DS, AX
.h: HLT
JMP SHORT .h
TIMES 510-($-$$) DB 0
DW 0xAA55
";
    let result = assemble_ok(source);
    assert_eq!(result.binary.len(), 512);
    assert_eq!(result.binary[0], 0xFA);
    assert_eq!(&result.binary[510..], &[0x55, 0xAA]);
    assert_eq!(result.origin_address, 0x7C00);
}

#[test]
fn mov_accumulator_vs_general_moffs() {
    // AX uses the moffs shortcut, BX the general ModR/M form.
    assert_eq!(assemble_ok("MOV AX, [0x1234]").binary, vec![0xA1, 0x34, 0x12]);
    assert_eq!(
        assemble_ok("MOV BX, [0x1234]").binary,
        vec![0x8B, 0x1E, 0x34, 0x12]
    );
}

#[test]
fn mov_reg_imm_opcode_stride() {
    assert_eq!(assemble_ok("MOV AX, 0x1111").binary[0], 0xB8);
    assert_eq!(assemble_ok("MOV BX, 0x1111").binary[0], 0xBB);
    assert_eq!(assemble_ok("MOV SP, 0x1111").binary[0], 0xBC);
}

#[test]
fn bp_alone_gets_zero_disp8() {
    // Never mod=00/rm=110, which would read as a direct address.
    assert_eq!(assemble_ok("MOV AX, [BP]").binary, vec![0x8B, 0x46, 0x00]);
}

#[test]
fn short_jump_boundary_behaviors() {
    // Exactly +127: fits.
    let mut source = String::from("JE target\n");
    source.push_str(&"NOP\n".repeat(127));
    source.push_str("target: HLT");
    assert!(assemble(&source).success);

    // +128: conditional jump fails...
    let mut source = String::from("JE target\n");
    source.push_str(&"NOP\n".repeat(128));
    source.push_str("target: HLT");
    let result = assemble(&source);
    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|d| d.message.contains("too far")));

    // ...but an unconditional SHORT JMP auto-upgrades to NEAR.
    let mut source = String::from("JMP SHORT target\n");
    source.push_str(&"NOP\n".repeat(128));
    source.push_str("target: HLT");
    let result = assemble_ok(&source);
    assert_eq!(result.binary[0], 0xE9);
    assert_eq!(result.binary.len(), 3 + 128 + 1);
}

#[test]
fn backward_short_jump_encodes_negative_displacement() {
    let result = assemble_ok("top: NOP\nJMP SHORT top");
    // 0 - (1 + 2) = -3
    assert_eq!(result.binary, vec![0x90, 0xEB, 0xFD]);
}

#[test]
fn segment_override_prefixes() {
    assert_eq!(
        assemble_ok("MOV AX, ES:[DI]").binary,
        vec![0x26, 0x8B, 0x05]
    );
    assert_eq!(
        assemble_ok("MOV AX, [CS:SI]").binary,
        vec![0x2E, 0x8B, 0x04]
    );
}

#[test]
fn equ_constants_fold_into_addresses_and_immediates() {
    let result = assemble_ok("OFS EQU 4\nMOV AX, [BX+OFS]\nMOV CX, OFS*2");
    assert_eq!(
        result.binary,
        vec![0x8B, 0x47, 0x04, 0xB9, 0x08, 0x00]
    );
}

#[test]
fn data_directives_emit_little_endian() {
    let result = assemble_ok("DB 1, 2\nDW 0x1234\nDD 0x11223344");
    assert_eq!(
        result.binary,
        vec![1, 2, 0x34, 0x12, 0x44, 0x33, 0x22, 0x11]
    );
}

#[test]
fn strings_emit_raw_bytes() {
    let result = assemble_ok("msg: DB \"Hello\", 0x0D, 0x0A, 0");
    assert_eq!(result.binary, b"Hello\x0D\x0A\0");
}

#[test]
fn reservations_advance_addresses_and_emit_zeros() {
    let result = assemble_ok("RESB 4\nmark: DB 0xEE");
    assert_eq!(result.binary, vec![0, 0, 0, 0, 0xEE]);
    assert_eq!(result.symbols.get("mark"), Some(&4));
}

#[test]
fn labels_resolve_forward_and_backward() {
    let result = assemble_ok("start: JMP end_\nmid: NOP\nJMP start\nend_: HLT");
    assert!(result.symbols.contains_key("start"));
    assert!(result.symbols.contains_key("end_"));
    // JMP end_ is NEAR: E9 disp16, target at offset 7.
    assert_eq!(&result.binary[..3], &[0xE9, 0x04, 0x00]);
}

#[test]
fn local_labels_qualify_per_global_scope() {
    let result = assemble_ok(
        "first:\n.loop: NOP\nJMP SHORT .loop\nsecond:\n.loop: NOP\nJMP SHORT .loop",
    );
    assert_eq!(result.symbols.get("first.loop"), Some(&0));
    assert_eq!(result.symbols.get("second.loop"), Some(&3));
}

#[test]
fn duplicate_labels_fail_case_insensitively() {
    let result = assemble("data1: NOP\nDATA1: NOP");
    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|d| d.message.contains("already defined")));
}

#[test]
fn undefined_jump_target_fails() {
    let result = assemble("JMP nowhere");
    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|d| d.message.contains("undefined label")));
}

#[test]
fn invalid_addressing_mode_fails() {
    let result = assemble("MOV AX, [SI+DI]");
    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|d| d.message.contains("addressing mode")));
}

#[test]
fn listing_bytes_sum_to_binary_length() {
    let result = assemble_ok(
        "ORG 0x100\nstart: MOV AX, 1\nDB \"xy\"\nTIMES 3 DB 0\nRESB 2\nHLT",
    );
    let total: usize = result.listing.iter().map(|e| e.machine_code.len()).sum();
    assert_eq!(total, result.binary.len());
}

#[test]
fn listing_addresses_track_binary_offsets() {
    let result = assemble_ok("ORG 0x200\nMOV AX, 1\nDB 5\nNOP");
    let mut offset = 0u64;
    for entry in &result.listing {
        if entry.machine_code.is_empty() {
            continue;
        }
        assert_eq!(entry.address, result.origin_address + offset);
        offset += entry.machine_code.len() as u64;
    }
}

#[test]
fn label_addresses_match_following_statement() {
    let result = assemble_ok("NOP\nhere: MOV AX, 1\nHLT");
    let label_addr = result.symbols["here"];
    let entry = result
        .listing
        .iter()
        .find(|e| e.source_text.contains("MOV"))
        .unwrap();
    assert_eq!(entry.address, label_addr);
}

#[test]
fn assembling_same_source_twice_is_byte_identical() {
    let source = "\
ORG 0x7C00
start:
    MOV SI, msg
.print:
    LODSB
    CMP AL, 0
    JE .done
    INT 0x10
    JMP SHORT .print
.done:
    HLT
msg: DB \"hi\", 0
TIMES 510-($-$$) DB 0
DW 0xAA55
";
    let assembler = Assembler::new();
    let first = assembler.assemble(source, "boot.asm");
    let second = assembler.assemble(source, "boot.asm");
    assert!(first.success, "errors: {:?}", first.errors);
    assert_eq!(first.binary, second.binary);
    assert_eq!(first.symbols, second.symbols);
    assert_eq!(first.binary.len(), 512);
}

#[test]
fn preprocessor_pipeline_reaches_the_encoder() {
    let source = "\
%define PORT 0x60
%macro emit_twice 1
DB %1
DB %1
%endmacro
%ifdef PORT
IN AL, PORT
%endif
emit_twice 7
";
    let result = assemble_ok(source);
    assert_eq!(result.binary, vec![0xE4, 0x60, 7, 7]);
}

#[test]
fn include_files_are_spliced(){
    let dir = std::env::temp_dir().join(format!("asm86-inc-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("defs.inc"), "VALUE EQU 0x5A\n").unwrap();

    let mut assembler = Assembler::new();
    assembler.set_include_paths(vec![dir.clone()]);
    let result = assembler.assemble("%include \"defs.inc\"\nDB VALUE", "main.asm");
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.binary, vec![0x5A]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn errors_carry_gcc_style_locations() {
    let result = assemble("NOP\nJE nowhere");
    assert!(!result.success);
    let formatted = result.errors[0].to_string();
    assert!(formatted.starts_with("test.asm:2:"), "got {formatted}");
    assert!(formatted.contains("error:"));
}

#[test]
fn multiple_errors_surface_in_one_run() {
    let result = assemble("JE a_far_place\nJMP also_missing\nNOP");
    assert!(!result.success);
    assert!(result.errors.len() >= 2);
}

#[test]
fn string_ops_and_flags() {
    let result = assemble_ok("CLD\nREP STOSB\nSTI\nCLC");
    assert_eq!(result.binary, vec![0xFC, 0xF3, 0xAA, 0xFB, 0xF8]);
}

#[test]
fn arithmetic_smoke() {
    let result = assemble_ok(
        "ADD AX, 5\nSUB BL, 1\nCMP AX, BX\nINC BX\nDEC CX\nNEG DX\nMUL CL",
    );
    assert_eq!(
        result.binary,
        vec![
            0x05, 0x05, 0x00, // ADD AX, imm16
            0x80, 0xEB, 0x01, // SUB BL, 1
            0x39, 0xD8,       // CMP AX, BX
            0x43,             // INC BX
            0x49,             // DEC CX
            0xF7, 0xDA,       // NEG DX
            0xF6, 0xE1,       // MUL CL
        ]
    );
}
