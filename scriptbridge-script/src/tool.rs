//! Tool strategy: payload on stdin, rewritten user code executed as a script body

use crate::escape::triple_quoted_literal;
use crate::prelude::{EMIT_HELPER, IMPORTS, PAYLOAD_EXIT_CODE, RESERVED_PREFIX, RETURN_SIGNAL};
use crate::rewrite::RewritePipeline;
use crate::selection::render_python_selection;
use crate::{ScriptSynthesizer, SynthesisError, SynthesizedScript};
use scriptbridge_core::ExecutionRequest;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

const PAYLOAD_VAR: &str = "__bridge_payload";
const RESULT_TARGET: &str = "__bridge_result";

/// Synthesizer for schema-validated tool calls
///
/// The generated script reads `{"input", "vars", "flow"}` from stdin, binds
/// those three names, lifts every identifier-shaped `input` key into the
/// module namespace (so `$query` and `query` both resolve), runs the user code
/// and emits the value picked by [`crate::RESULT_PRIORITY`].
pub struct ToolScriptSynthesizer {
    rewrites: RewritePipeline,
}

impl ToolScriptSynthesizer {
    pub fn new() -> Self {
        Self {
            rewrites: RewritePipeline::python_tool(),
        }
    }

    /// Use a custom rewrite pipeline
    pub fn with_rewrites(rewrites: RewritePipeline) -> Self {
        Self { rewrites }
    }

    /// Wire payload streamed on the interpreter's stdin
    pub fn payload(request: &ExecutionRequest) -> JsonValue {
        json!({
            "input": request.named_variables,
            "vars": request.sandbox_variables,
            "flow": request.flow_context.to_json(),
        })
    }

    fn render(&self, user_code: &str) -> String {
        let mut script = String::new();

        script.push_str(IMPORTS);
        script.push('\n');
        script.push_str(EMIT_HELPER);
        script.push('\n');
        script.push_str(&format!("class {RETURN_SIGNAL}(BaseException):\n    pass\n\n"));

        script.push_str(&format!(
            "try:\n    {PAYLOAD_VAR} = __bridge_json.load(__bridge_sys.stdin)\n\
             except Exception:\n    __bridge_traceback.print_exc(file=__bridge_sys.stderr)\n    \
             __bridge_sys.exit({PAYLOAD_EXIT_CODE})\n\n"
        ));

        script.push_str(&format!(
            "input = {PAYLOAD_VAR}.get('input') or {{}}\n\
             _input = input\n\
             vars = {PAYLOAD_VAR}.get('vars') or {{}}\n\
             flow = {PAYLOAD_VAR}.get('flow') or {{}}\n\n"
        ));

        script.push_str(&format!(
            "for __bridge_key, __bridge_value in list(input.items()):\n    \
             if __bridge_key.isidentifier() and not __bridge_key.startswith('{RESERVED_PREFIX}'):\n        \
             globals()[__bridge_key] = __bridge_value\n\n"
        ));

        script.push_str(&format!(
            "__bridge_user_code = {}\n\n",
            triple_quoted_literal(user_code)
        ));

        script.push_str(&format!(
            "try:\n    exec(compile(__bridge_user_code, '<user_code>', 'exec'), globals())\n\
             except {RETURN_SIGNAL}:\n    pass\n\
             except Exception:\n    __bridge_traceback.print_exc(file=__bridge_sys.stderr)\n    \
             __bridge_sys.exit(1)\n\n"
        ));

        script.push_str("try:\n");
        script.push_str(&render_python_selection(RESULT_TARGET, PAYLOAD_VAR, 4));
        script.push_str(
            "except Exception:\n    __bridge_traceback.print_exc(file=__bridge_sys.stderr)\n    \
             __bridge_sys.exit(1)\n\n",
        );

        script.push_str(&format!("__bridge_emit({RESULT_TARGET})\n"));
        script
    }
}

impl Default for ToolScriptSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptSynthesizer for ToolScriptSynthesizer {
    fn synthesize(&self, request: &ExecutionRequest) -> Result<SynthesizedScript, SynthesisError> {
        let user_code = self.rewrites.apply(&request.code);
        let payload = serde_json::to_string(&Self::payload(request))?;

        debug!(
            code_len = request.code.len(),
            payload_len = payload.len(),
            "synthesized tool script"
        );

        Ok(SynthesizedScript {
            source: self.render(&user_code),
            stdin_payload: Some(payload),
        })
    }
}
