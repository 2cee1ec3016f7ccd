//! Python fragments shared by both synthesis strategies

/// Capture variable that top-level `return` statements are rewritten into
pub const CAPTURE_VAR: &str = "__bridge_return";

/// Exception raised after a rewritten `return` to skip the rest of the body.
/// Derives from `BaseException`, so `except Exception` in user code lets it pass.
pub const RETURN_SIGNAL: &str = "__bridge_return_signal";

/// Names starting with this prefix belong to the generated script and are
/// never bound from user input
pub const RESERVED_PREFIX: &str = "__bridge_";

/// Callable that, when user code defines it, produces the result
pub const USER_FUNC: &str = "__bridge_user_func";

/// Plain variable user code may assign its result to
pub const RESULT_VAR: &str = "result";

/// Generated wrapper around function-node user code
pub const NODE_FUNC: &str = "__bridge_function";

/// Exit status of a script whose payload could not be decoded
pub const PAYLOAD_EXIT_CODE: i32 = 2;

/// Module imports under private aliases. User code and flattened input keys
/// may rebind `json` or `sys`; the postamble must keep working regardless.
pub const IMPORTS: &str = "\
import json as __bridge_json
import sys as __bridge_sys
import traceback as __bridge_traceback
";

/// Emits the single output line. Values `json` cannot encode are coerced to
/// their `str()` form, and anything that still fails is emitted as a string.
pub const EMIT_HELPER: &str = "\
def __bridge_emit(value):
    try:
        text = __bridge_json.dumps(value, default=str)
    except Exception:
        text = __bridge_json.dumps(str(value))
    __bridge_sys.stdout.write(text + '\\n')
    __bridge_sys.stdout.flush()
";

/// Prefix every line of `code` with `width` spaces
pub fn indent(code: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    code.split('\n')
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}
