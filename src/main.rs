// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for asm86.

use std::process::ExitCode;

fn main() -> ExitCode {
    asm86::assembler::cli::run()
}
