//! Function-node strategy: payload inlined, user code wrapped in a function

use crate::escape::{is_identifier, triple_quoted_literal};
use crate::prelude::{
    indent, EMIT_HELPER, IMPORTS, NODE_FUNC, PAYLOAD_EXIT_CODE, RESERVED_PREFIX, RESULT_VAR,
};
use crate::{ScriptSynthesizer, SynthesisError, SynthesizedScript};
use scriptbridge_core::ExecutionRequest;
use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, warn};

const PAYLOAD_VAR: &str = "__bridge_payload";

/// Synthesizer for pipeline function nodes
///
/// The payload (`input_text`, `vars`, `flow` and every named variable) is
/// embedded as a JSON literal. Each named variable with an identifier-shaped
/// name gets its own module-level binding. The user code becomes the body of
/// a zero-argument function that is called exactly once; if the body falls
/// off the end, a local `result` is returned instead of `None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FunctionNodeSynthesizer;

impl FunctionNodeSynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Payload embedded in the script; named variables override the fixed
    /// entries of the same name
    pub fn payload(request: &ExecutionRequest) -> JsonValue {
        let mut payload = Map::new();
        payload.insert(
            "input_text".to_string(),
            json!(request.flow_context.input.clone().unwrap_or_default()),
        );
        payload.insert(
            "vars".to_string(),
            JsonValue::Object(request.sandbox_variables.clone()),
        );
        payload.insert("flow".to_string(), request.flow_context.to_json());

        for (name, value) in &request.named_variables {
            payload.insert(name.clone(), value.clone());
        }

        JsonValue::Object(payload)
    }

    fn bindings(request: &ExecutionRequest) -> String {
        let mut lines = vec![
            format!("input_text = {PAYLOAD_VAR}.get('input_text', '')"),
            format!("vars = {PAYLOAD_VAR}.get('vars', {{}})"),
            format!("flow = {PAYLOAD_VAR}.get('flow', {{}})"),
        ];

        for name in request.named_variables.keys() {
            if !is_identifier(name) {
                warn!(variable = %name, "Skipping input variable that is not a valid identifier");
            } else if name.starts_with(RESERVED_PREFIX) {
                warn!(variable = %name, "Skipping input variable that uses the reserved prefix");
            } else {
                lines.push(format!("{name} = {PAYLOAD_VAR}.get('{name}', None)"));
            }
        }

        lines.join("\n")
    }
}

impl ScriptSynthesizer for FunctionNodeSynthesizer {
    fn synthesize(&self, request: &ExecutionRequest) -> Result<SynthesizedScript, SynthesisError> {
        let payload = serde_json::to_string(&Self::payload(request))?;

        let mut script = String::new();
        script.push_str(IMPORTS);
        script.push('\n');
        script.push_str(EMIT_HELPER);
        script.push('\n');

        script.push_str(&format!(
            "try:\n    {PAYLOAD_VAR} = __bridge_json.loads({})\n\
             except Exception:\n    __bridge_traceback.print_exc(file=__bridge_sys.stderr)\n    \
             __bridge_sys.exit({PAYLOAD_EXIT_CODE})\n\n",
            triple_quoted_literal(&payload)
        ));

        script.push_str(&Self::bindings(request));
        script.push_str("\n\n");

        script.push_str(&format!("def {NODE_FUNC}():\n"));
        script.push_str(&indent(&request.code, 4));
        script.push('\n');
        script.push_str(&format!("    return locals().get('{RESULT_VAR}')\n\n"));

        script.push_str(&format!(
            "try:\n    __bridge_result = {NODE_FUNC}()\n\
             except Exception as e:\n    \
             __bridge_sys.stderr.write(__bridge_json.dumps({{'error': str(e)}}) + '\\n')\n    \
             __bridge_sys.exit(1)\n\n"
        ));
        script.push_str("__bridge_emit(__bridge_result)\n");

        debug!(
            code_len = request.code.len(),
            payload_len = payload.len(),
            "synthesized function node script"
        );

        Ok(SynthesizedScript {
            source: script,
            stdin_payload: None,
        })
    }
}
