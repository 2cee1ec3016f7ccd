//! Textual rewriting of user code before it is embedded
//!
//! Each rewrite is a small, independent stage. The tool strategy applies:
//!
//! | stage | pattern | replacement |
//! |-------|---------|-------------|
//! | [`SigilRewrite`] | `\$([A-Za-z_][A-Za-z0-9_]*)` | `$1` |
//! | [`TopLevelReturnRewrite`] | `return <expr>` outside `def`/`class` | `__bridge_return = <expr or None>` then `raise __bridge_return_signal()` |
//!
//! The return stage is a line scanner rather than a pattern: it follows
//! indentation to know which lines sit inside a function or class body, and
//! it tracks brackets, strings and backslash continuations so the signal is
//! raised only after the returned expression is complete. A `return` that
//! shares its line with a compound header (`if x: return y`) is left alone.
//!
//! Other source dialects get their own stages and pipeline; the process
//! supervisor never sees any of this.

use crate::prelude::{CAPTURE_VAR, RETURN_SIGNAL};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use tracing::trace;

static SIGIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("sigil pattern is valid"));

/// One text-to-text rewrite stage
pub trait CodeRewrite: Send + Sync {
    /// Stage name for logs
    fn name(&self) -> &'static str;

    /// Rewrite `code`, borrowing it unchanged when nothing matches
    fn rewrite<'a>(&self, code: &'a str) -> Cow<'a, str>;
}

/// `$identifier` -> `identifier`
#[derive(Debug, Default, Clone, Copy)]
pub struct SigilRewrite;

impl CodeRewrite for SigilRewrite {
    fn name(&self) -> &'static str {
        "sigil"
    }

    fn rewrite<'a>(&self, code: &'a str) -> Cow<'a, str> {
        SIGIL.replace_all(code, "$1")
    }
}

/// Module-level `return <expr>` -> assignment into the capture variable,
/// followed by a raise of the return signal so the rest of the body is skipped
///
/// Returns nested in `if`/`for`/`while`/`try`/`with` blocks are rewritten in
/// place; returns inside a `def` or `class` body are left for Python.
#[derive(Debug, Default, Clone, Copy)]
pub struct TopLevelReturnRewrite;

impl CodeRewrite for TopLevelReturnRewrite {
    fn name(&self) -> &'static str {
        "top_level_return"
    }

    fn rewrite<'a>(&self, code: &'a str) -> Cow<'a, str> {
        let mut lines: Vec<Cow<'a, str>> = Vec::new();
        let mut scanner = LineScanner::default();
        // Indentation of every enclosing `def`/`class` header
        let mut scopes: Vec<usize> = Vec::new();
        // Indentation of a rewritten return still waiting for its raise
        let mut pending: Option<&'a str> = None;
        let mut changed = false;

        for line in code.split('\n') {
            let mut current = Cow::Borrowed(line);

            if scanner.at_statement_start() {
                let body = line.trim_start_matches([' ', '\t']);
                if !body.is_empty() && !body.starts_with('#') {
                    let indent = &line[..line.len() - body.len()];
                    while matches!(scopes.last(), Some(&depth) if depth >= indent.len()) {
                        scopes.pop();
                    }

                    if opens_scope(body) {
                        scopes.push(indent.len());
                    } else if scopes.is_empty() {
                        if let Some(expr) = keyword_tail(body, "return") {
                            current = Cow::Owned(format!("{}{}", indent, capture_assignment(expr)));
                            pending = Some(indent);
                            changed = true;
                        }
                    }
                }
            }

            scanner.advance(line);
            lines.push(current);

            if scanner.at_statement_start() {
                if let Some(indent) = pending.take() {
                    lines.push(Cow::Owned(format!("{}raise {}()", indent, RETURN_SIGNAL)));
                }
            }
        }

        if !changed {
            return Cow::Borrowed(code);
        }
        Cow::Owned(lines.join("\n"))
    }
}

/// The text after `keyword` when `text` starts with it as a whole word
fn keyword_tail<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() || c == '_' => None,
        _ => Some(rest),
    }
}

fn opens_scope(body: &str) -> bool {
    keyword_tail(body, "def").is_some()
        || keyword_tail(body, "class").is_some()
        || keyword_tail(body, "async")
            .and_then(|rest| keyword_tail(rest.trim_start(), "def"))
            .is_some()
}

fn capture_assignment(expr: &str) -> String {
    let expr = expr.trim();
    if expr.is_empty() {
        format!("{} = None", CAPTURE_VAR)
    } else if expr.starts_with('#') {
        format!("{} = None  {}", CAPTURE_VAR, expr)
    } else {
        format!("{} = {}", CAPTURE_VAR, expr)
    }
}

/// Lexical state carried from one physical line to the next
#[derive(Debug, Default)]
struct LineScanner {
    depth: usize,
    quote: Option<&'static [u8]>,
    continued: bool,
}

impl LineScanner {
    /// Whether the next physical line begins a new logical line
    fn at_statement_start(&self) -> bool {
        self.depth == 0 && self.quote.is_none() && !self.continued
    }

    fn advance(&mut self, line: &str) {
        let bytes = line.as_bytes();
        let mut comment = false;
        let mut i = 0;

        while i < bytes.len() {
            if let Some(quote) = self.quote {
                if bytes[i] == b'\\' {
                    i += 2;
                } else if bytes[i..].starts_with(quote) {
                    self.quote = None;
                    i += quote.len();
                } else {
                    i += 1;
                }
                continue;
            }

            match bytes[i] {
                b'#' => {
                    comment = true;
                    break;
                }
                b'\'' | b'"' => {
                    let triple: &'static [u8] = if bytes[i] == b'\'' { b"'''" } else { b"\"\"\"" };
                    if bytes[i..].starts_with(triple) {
                        self.quote = Some(triple);
                        i += 3;
                        continue;
                    }
                    self.quote = Some(&triple[..1]);
                }
                b'(' | b'[' | b'{' => self.depth += 1,
                b')' | b']' | b'}' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
            i += 1;
        }

        // Single-quoted strings end with their line
        if matches!(self.quote, Some(quote) if quote.len() == 1) {
            self.quote = None;
        }
        self.continued = !comment && self.quote.is_none() && line.trim_end().ends_with('\\');
    }
}

/// Ordered list of rewrite stages
pub struct RewritePipeline {
    stages: Vec<Box<dyn CodeRewrite>>,
}

impl RewritePipeline {
    /// Pipeline with no stages
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Stages used by the tool strategy
    pub fn python_tool() -> Self {
        Self::new()
            .with_stage(SigilRewrite)
            .with_stage(TopLevelReturnRewrite)
    }

    pub fn with_stage(mut self, stage: impl CodeRewrite + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run every stage in order
    pub fn apply(&self, code: &str) -> String {
        let mut current = code.to_string();
        for stage in &self.stages {
            let rewritten = match stage.rewrite(&current) {
                Cow::Owned(text) => Some(text),
                Cow::Borrowed(_) => None,
            };
            if let Some(text) = rewritten {
                trace!(stage = stage.name(), "rewrote user code");
                current = text;
            }
        }
        current
    }
}

impl Default for RewritePipeline {
    fn default() -> Self {
        Self::new()
    }
}
