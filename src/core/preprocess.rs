// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Text preprocessor: `%define`/`%undef`, `%if` conditionals, `%macro`
//! expansion, and `%include`.
//!
//! Consumed directive lines and inactive branches are replaced by blank
//! lines so diagnostics on the main file keep meaningful line numbers;
//! includes and macro expansions splice lines in.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{ErrorReporter, SourceLocation};
use crate::core::expr;

const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Clone)]
struct MacroDef {
    params: usize,
    body: Vec<String>,
}

#[derive(Debug, Clone)]
struct CondFrame {
    active: bool,
    any_true: bool,
    in_else: bool,
    line: u32,
}

#[derive(Debug, Default)]
pub struct Preprocessor {
    defines: HashMap<String, String>,
    macros: HashMap<String, MacroDef>,
    include_paths: Vec<PathBuf>,
}

impl Preprocessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Predefine a name, as with `-D NAME=value` on the command line.
    pub fn define(&mut self, name: &str, value: &str) {
        self.defines
            .insert(name.to_ascii_uppercase(), value.to_string());
    }

    pub fn set_include_paths(&mut self, paths: Vec<PathBuf>) {
        self.include_paths = paths;
    }

    /// Preprocess a source text into plain lines for the parser. Errors are
    /// collected in `reporter`; processing continues past them.
    pub fn process(
        &mut self,
        source: &str,
        filename: &str,
        reporter: &mut ErrorReporter,
    ) -> Vec<String> {
        let lines: Vec<String> = source.lines().map(str::to_string).collect();
        let mut out = Vec::with_capacity(lines.len());
        self.process_lines(&lines, filename, reporter, &mut out, 0);
        out
    }

    fn process_lines(
        &mut self,
        lines: &[String],
        filename: &str,
        reporter: &mut ErrorReporter,
        out: &mut Vec<String>,
        depth: usize,
    ) {
        let mut cond_stack: Vec<CondFrame> = Vec::new();
        let mut recording: Option<(String, MacroDef, u32)> = None;

        let mut i = 0usize;
        while i < lines.len() {
            let line_num = (i + 1) as u32;
            let location = SourceLocation::new(filename, line_num, 1);

            // Line continuation: merge following lines, keep placeholders.
            let mut text = lines[i].clone();
            let mut consumed = 0usize;
            while text.trim_end().ends_with('\\') && i + consumed + 1 < lines.len() {
                let trimmed = text.trim_end();
                text = trimmed[..trimmed.len() - 1].to_string();
                consumed += 1;
                text.push_str(&lines[i + consumed]);
            }
            i += consumed + 1;

            let trimmed = text.trim();
            let active = cond_stack.iter().all(|frame| frame.active);

            if let Some((name, mut def, start_line)) = recording.take() {
                if directive_name(trimmed).as_deref() == Some("endmacro") {
                    self.macros.insert(name.to_ascii_uppercase(), def);
                } else {
                    def.body.push(text.clone());
                    recording = Some((name, def, start_line));
                }
                out.push(String::new());
                for _ in 0..consumed {
                    out.push(String::new());
                }
                continue;
            }

            if let Some(directive) = directive_name(trimmed) {
                let rest = directive_rest(trimmed, &directive);
                match directive.as_str() {
                    "define" if active => self.handle_define(rest, &location, reporter),
                    "undef" if active => {
                        let name = rest.trim();
                        if name.is_empty() {
                            reporter.error("%undef requires a name", location);
                        } else {
                            self.defines.remove(&name.to_ascii_uppercase());
                        }
                    }
                    "ifdef" | "ifndef" => {
                        let name = rest.trim();
                        if name.is_empty() {
                            reporter.error(format!("%{directive} requires a name"), location);
                        }
                        let defined = self.defines.contains_key(&name.to_ascii_uppercase());
                        let cond = if directive == "ifdef" { defined } else { !defined };
                        let parent_active = cond_stack.iter().all(|f| f.active);
                        cond_stack.push(CondFrame {
                            active: parent_active && cond,
                            any_true: parent_active && cond,
                            in_else: false,
                            line: line_num,
                        });
                    }
                    "if" => {
                        let cond = self.eval_condition(rest, &location, reporter);
                        let parent_active = cond_stack.iter().all(|f| f.active);
                        cond_stack.push(CondFrame {
                            active: parent_active && cond,
                            any_true: parent_active && cond,
                            in_else: false,
                            line: line_num,
                        });
                    }
                    "elif" => {
                        if cond_stack.is_empty() {
                            reporter.error("%elif without matching %if", location);
                        } else {
                            let parent_active =
                                cond_stack[..cond_stack.len() - 1].iter().all(|f| f.active);
                            let last = cond_stack.last().unwrap();
                            if last.in_else {
                                reporter.error("%elif found after %else", location);
                            } else if last.any_true {
                                cond_stack.last_mut().unwrap().active = false;
                            } else {
                                let cond = self.eval_condition(rest, &location, reporter);
                                let frame = cond_stack.last_mut().unwrap();
                                frame.active = parent_active && cond;
                                frame.any_true = frame.active;
                            }
                        }
                    }
                    "else" => {
                        if cond_stack.is_empty() {
                            reporter.error("%else without matching %if", location);
                        } else {
                            let parent_active =
                                cond_stack[..cond_stack.len() - 1].iter().all(|f| f.active);
                            let frame = cond_stack.last_mut().unwrap();
                            if frame.in_else {
                                reporter.error("%else found after %else", location);
                            } else {
                                frame.active = parent_active && !frame.any_true;
                                frame.any_true = true;
                                frame.in_else = true;
                            }
                        }
                    }
                    "endif" => {
                        if cond_stack.pop().is_none() {
                            reporter.error("%endif without matching %if", location);
                        }
                    }
                    "macro" if active => {
                        let mut parts = rest.trim().split_whitespace();
                        match parts.next() {
                            None => reporter.error("%macro requires a name", location),
                            Some(name) => {
                                let params = parts
                                    .next()
                                    .and_then(|count| count.parse::<usize>().ok())
                                    .unwrap_or(0);
                                recording = Some((
                                    name.to_string(),
                                    MacroDef {
                                        params,
                                        body: Vec::new(),
                                    },
                                    line_num,
                                ));
                            }
                        }
                    }
                    "endmacro" if active => {
                        reporter.error("%endmacro without matching %macro", location);
                    }
                    "include" if active => {
                        self.handle_include(rest, filename, &location, reporter, out, depth);
                    }
                    // Directives inside inactive branches are skipped.
                    "define" | "undef" | "macro" | "endmacro" | "include" => {}
                    other => {
                        reporter.error(format!("unknown preprocessor directive: %{other}"), location);
                    }
                }
                out.push(String::new());
                for _ in 0..consumed {
                    out.push(String::new());
                }
                continue;
            }

            if !active {
                out.push(String::new());
                for _ in 0..consumed {
                    out.push(String::new());
                }
                continue;
            }

            let expanded = self.expand_defines(&text);
            if let Some(lines) = self.expand_macro_invocation(&expanded) {
                out.extend(lines);
            } else {
                out.push(expanded);
            }
            for _ in 0..consumed {
                out.push(String::new());
            }
        }

        if let Some((name, _, line)) = recording {
            reporter.error(
                format!("unclosed macro definition (missing %endmacro): {name}"),
                SourceLocation::new(filename, line, 1),
            );
        }
        if let Some(frame) = cond_stack.last() {
            reporter.error(
                "unclosed conditional block (missing %endif)",
                SourceLocation::new(filename, frame.line, 1),
            );
        }
    }

    fn handle_define(
        &mut self,
        rest: &str,
        location: &SourceLocation,
        reporter: &mut ErrorReporter,
    ) {
        let rest = rest.trim();
        if rest.is_empty() {
            reporter.error("%define requires a name", location.clone());
            return;
        }
        match rest.split_once(char::is_whitespace) {
            Some((name, value)) => self.define(name, value.trim()),
            None => self.define(rest, ""),
        }
    }

    fn handle_include(
        &mut self,
        rest: &str,
        filename: &str,
        location: &SourceLocation,
        reporter: &mut ErrorReporter,
        out: &mut Vec<String>,
        depth: usize,
    ) {
        if depth >= MAX_INCLUDE_DEPTH {
            reporter.error("include nesting too deep", location.clone());
            return;
        }

        let rest = rest.trim();
        let name = parse_include_name(rest);
        let Some(name) = name else {
            reporter.error(
                "%include filename must be in quotes or angle brackets",
                location.clone(),
            );
            return;
        };

        let mut candidates = vec![PathBuf::from(&name)];
        if let Some(parent) = PathBuf::from(filename).parent() {
            candidates.push(parent.join(&name));
        }
        for path in &self.include_paths {
            candidates.push(path.join(&name));
        }

        for candidate in candidates {
            if let Ok(content) = fs::read_to_string(&candidate) {
                let lines: Vec<String> = content.lines().map(str::to_string).collect();
                let included_name = candidate.to_string_lossy().to_string();
                self.process_lines(&lines, &included_name, reporter, out, depth + 1);
                return;
            }
        }

        reporter.error(
            format!("could not find include file: {name}"),
            location.clone(),
        );
    }

    /// Word-boundary textual substitution of object defines.
    fn expand_defines(&self, line: &str) -> String {
        if self.defines.is_empty() {
            return line.to_string();
        }

        let bytes = line.as_bytes();
        let mut out = String::with_capacity(line.len());
        let mut i = 0usize;
        let mut in_string: Option<u8> = None;

        while i < bytes.len() {
            let c = bytes[i];
            match in_string {
                Some(quote) => {
                    out.push(c as char);
                    if c == quote {
                        in_string = None;
                    }
                    i += 1;
                    continue;
                }
                None if c == b'"' || c == b'\'' => {
                    in_string = Some(c);
                    out.push(c as char);
                    i += 1;
                    continue;
                }
                None if c == b';' => {
                    out.push_str(&line[i..]);
                    break;
                }
                None => {}
            }

            if is_word_start(c) {
                let mut j = i + 1;
                while j < bytes.len() && is_word_char(bytes[j]) {
                    j += 1;
                }
                let word = &line[i..j];
                match self.defines.get(&word.to_ascii_uppercase()) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(word),
                }
                i = j;
            } else {
                out.push(c as char);
                i += 1;
            }
        }

        out
    }

    /// Expand a macro invocation line into its body, or `None` when the
    /// line does not start with a known macro name.
    fn expand_macro_invocation(&self, line: &str) -> Option<Vec<String>> {
        let trimmed = line.trim_start();
        let bytes = trimmed.as_bytes();
        if bytes.is_empty() || !is_word_start(bytes[0]) {
            return None;
        }
        let mut end = 1usize;
        while end < bytes.len() && is_word_char(bytes[end]) {
            end += 1;
        }
        let name = &trimmed[..end];
        let def = self.macros.get(&name.to_ascii_uppercase())?;

        let args: Vec<String> = trimmed[end..]
            .trim()
            .split(',')
            .map(|arg| arg.trim().to_string())
            .filter(|arg| !arg.is_empty())
            .collect();

        let mut lines = Vec::with_capacity(def.body.len());
        for body_line in &def.body {
            let mut expanded = body_line.clone();
            for n in (1..=def.params.max(args.len())).rev() {
                let placeholder = format!("%{n}");
                let value = args.get(n - 1).map(String::as_str).unwrap_or("");
                expanded = expanded.replace(&placeholder, value);
            }
            lines.push(self.expand_defines(&expanded));
        }
        Some(lines)
    }

    /// `%if`/`%elif` condition: an integer expression, optionally a single
    /// comparison between two of them.
    fn eval_condition(
        &self,
        rest: &str,
        location: &SourceLocation,
        reporter: &mut ErrorReporter,
    ) -> bool {
        let text = self.expand_defines(rest.trim());
        if text.is_empty() {
            reporter.error("%if requires an expression", location.clone());
            return false;
        }

        for op in ["==", "!=", "<=", ">=", "<", ">"] {
            if let Some(pos) = text.find(op) {
                let left = expr::evaluate(&text[..pos]);
                let right = expr::evaluate(&text[pos + op.len()..]);
                return match (left, right) {
                    (Ok(l), Ok(r)) => match op {
                        "==" => l == r,
                        "!=" => l != r,
                        "<=" => l <= r,
                        ">=" => l >= r,
                        "<" => l < r,
                        _ => l > r,
                    },
                    _ => {
                        reporter
                            .error(format!("invalid %if expression: {text}"), location.clone());
                        false
                    }
                };
            }
        }

        match expr::evaluate(&text) {
            Ok(value) => value != 0,
            Err(_) => {
                reporter.error(format!("invalid %if expression: {text}"), location.clone());
                false
            }
        }
    }
}

fn directive_name(line: &str) -> Option<String> {
    let rest = line.strip_prefix('%')?;
    let name: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        return None;
    }
    Some(name.to_ascii_lowercase())
}

fn directive_rest<'a>(line: &'a str, directive: &str) -> &'a str {
    let rest = line.strip_prefix('%').unwrap_or(line).trim_start();
    rest.get(directive.len()..).unwrap_or("")
}

fn parse_include_name(rest: &str) -> Option<String> {
    let rest = rest.trim();
    let (open, close) = match rest.chars().next()? {
        '"' => ('"', '"'),
        '<' => ('<', '>'),
        _ => return None,
    };
    let inner = rest.strip_prefix(open)?;
    let end = inner.find(close)?;
    Some(inner[..end].to_string())
}

fn is_word_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_word_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}
