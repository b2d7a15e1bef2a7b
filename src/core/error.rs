// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Diagnostics: source locations, severities, and per-run error collection.

use std::fmt;

/// Position of a token or statement in the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal error",
        }
    }
}

/// A single diagnostic with its source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub location: SourceLocation,
    pub severity: Severity,
}

impl Diagnostic {
    #[must_use]
    pub fn new(message: impl Into<String>, location: SourceLocation, severity: Severity) -> Self {
        Self {
            message: message.into(),
            location,
            severity,
        }
    }

    /// True for error and fatal severities.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity >= Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    /// GCC/Clang-compatible `file:line:col: severity: message`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}",
            self.location,
            self.severity.as_str(),
            self.message
        )
    }
}

/// Per-run diagnostic collection. Non-fatal errors never abort a phase;
/// callers keep going so the user sees many errors per compile.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
    has_errors: bool,
}

impl ErrorReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.diagnostics
            .push(Diagnostic::new(message, location, Severity::Error));
        self.has_errors = true;
    }

    pub fn warning(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.diagnostics
            .push(Diagnostic::new(message, location, Severity::Warning));
    }

    pub fn fatal(&mut self, message: impl Into<String>, location: SourceLocation) {
        self.diagnostics
            .push(Diagnostic::new(message, location, Severity::Fatal));
        self.has_errors = true;
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push(diagnostic);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Fatal)
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.has_errors = false;
        std::mem::take(&mut self.diagnostics)
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.has_errors = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_formats_gcc_style() {
        let diag = Diagnostic::new(
            "undefined symbol: foo",
            SourceLocation::new("boot.asm", 12, 5),
            Severity::Error,
        );
        assert_eq!(diag.to_string(), "boot.asm:12:5: error: undefined symbol: foo");
    }

    #[test]
    fn reporter_tracks_error_state() {
        let mut reporter = ErrorReporter::new();
        assert!(!reporter.has_errors());

        reporter.warning("looks odd", SourceLocation::default());
        assert!(!reporter.has_errors());
        assert_eq!(reporter.error_count(), 0);

        reporter.error("bad", SourceLocation::default());
        assert!(reporter.has_errors());
        assert_eq!(reporter.error_count(), 1);
        assert_eq!(reporter.diagnostics().len(), 2);
    }

    #[test]
    fn fatal_counts_as_error() {
        let mut reporter = ErrorReporter::new();
        reporter.fatal("internal inconsistency", SourceLocation::default());
        assert!(reporter.has_errors());
        assert!(reporter.has_fatal());
    }
}
