// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Listing output: one entry per statement, correlating source lines with
//! addresses and emitted bytes.

use std::fmt::Write as _;

/// One line of the assembly listing.
#[derive(Debug, Clone)]
pub struct ListingEntry {
    pub source_line: u32,
    pub source_text: String,
    pub address: u64,
    pub machine_code: Vec<u8>,
    pub ok: bool,
    pub error_message: Option<String>,
}

/// Format bytes as spaced hex for listing display.
#[must_use]
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render entries as `ADDR | bytes | source` text.
#[must_use]
pub fn format_listing(entries: &[ListingEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = write!(out, "{:04X} | ", entry.address);
        let bytes = format_bytes(&entry.machine_code);
        let _ = write!(out, "{bytes:<23} | {}", entry.source_text);
        if let Some(error) = &entry.error_message {
            let _ = write!(out, " ; error: {error}");
        }
        out.push('\n');
    }
    out
}
