//! Result selection for tool scripts
//!
//! After user code has run, exactly one source provides the emitted value.
//! [`RESULT_PRIORITY`] is the single ordering: the Rust-side selector and the
//! Python postamble are both derived from it.

use crate::prelude::{CAPTURE_VAR, RESULT_VAR, USER_FUNC};
use std::fmt;

/// Where a tool script's result comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// User code defined a callable under the reserved function name; it is
    /// invoked with the full payload
    UserFunction,
    /// A top-level `return` was rewritten into the capture variable
    CapturedReturn,
    /// User code (or a flattened input key) bound `result`
    ResultVariable,
    /// Nothing produced a value
    Null,
}

/// Highest priority first; `Null` always terminates the list
pub const RESULT_PRIORITY: [ResultSource; 4] = [
    ResultSource::UserFunction,
    ResultSource::CapturedReturn,
    ResultSource::ResultVariable,
    ResultSource::Null,
];

/// Names present in the script namespace once user code has finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bindings {
    pub user_function: bool,
    pub captured_return: bool,
    pub result_variable: bool,
}

impl ResultSource {
    fn is_bound(self, bindings: &Bindings) -> bool {
        match self {
            ResultSource::UserFunction => bindings.user_function,
            ResultSource::CapturedReturn => bindings.captured_return,
            ResultSource::ResultVariable => bindings.result_variable,
            ResultSource::Null => true,
        }
    }

    /// Python test for this source, `None` for the fallback
    fn python_condition(self) -> Option<String> {
        match self {
            ResultSource::UserFunction => Some(format!("callable(globals().get('{}'))", USER_FUNC)),
            ResultSource::CapturedReturn => Some(format!("'{}' in globals()", CAPTURE_VAR)),
            ResultSource::ResultVariable => Some(format!("'{}' in globals()", RESULT_VAR)),
            ResultSource::Null => None,
        }
    }

    /// Python expression yielding this source's value
    fn python_value(self, payload_var: &str) -> String {
        match self {
            ResultSource::UserFunction => format!("globals()['{}']({})", USER_FUNC, payload_var),
            ResultSource::CapturedReturn => format!("globals()['{}']", CAPTURE_VAR),
            ResultSource::ResultVariable => format!("globals()['{}']", RESULT_VAR),
            ResultSource::Null => "None".to_string(),
        }
    }
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultSource::UserFunction => "user_function",
            ResultSource::CapturedReturn => "captured_return",
            ResultSource::ResultVariable => "result_variable",
            ResultSource::Null => "null",
        };
        f.write_str(name)
    }
}

/// First source in priority order that is bound
pub fn select_result_source(bindings: &Bindings) -> ResultSource {
    RESULT_PRIORITY
        .iter()
        .copied()
        .find(|source| source.is_bound(bindings))
        .unwrap_or(ResultSource::Null)
}

/// Render the selection chain as Python, assigning into `target`
pub(crate) fn render_python_selection(target: &str, payload_var: &str, indent: usize) -> String {
    let pad = " ".repeat(indent);
    let mut out = String::new();
    let mut first = true;

    for source in RESULT_PRIORITY {
        match source.python_condition() {
            Some(condition) => {
                let keyword = if first { "if" } else { "elif" };
                out.push_str(&format!("{pad}{keyword} {condition}:\n"));
                first = false;
            }
            None => {
                out.push_str(&format!("{pad}else:\n"));
            }
        }
        out.push_str(&format!(
            "{pad}    {target} = {}\n",
            source.python_value(payload_var)
        ));
        if source == ResultSource::Null {
            break;
        }
    }

    out
}
