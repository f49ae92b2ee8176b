//! Parsing of model responses and formatting of tool results.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Value,
}

/// The output of one executed tool call.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub tool: String,
    pub result: String,
}

static TOOL_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<tool_call>\s*(\{.*?\})\s*</tool_call>")
        .unwrap_or_else(|e| panic!("invalid tool call regex: {e}"))
});

const COMPLETION_INDICATORS: [&str; 4] = ["task completed", "done", "finished", "successfully"];

/// Extract every `<tool_call>{...}</tool_call>` block from `response`.
///
/// Blocks that are not valid JSON objects with a string `name` are skipped.
/// Missing `arguments` become `{}`; arguments sent as a JSON-encoded string
/// are decoded.
pub fn parse_tool_calls(response: &str) -> Vec<ToolCall> {
    TOOL_CALL
        .captures_iter(response)
        .filter_map(|caps| {
            let raw = caps.get(1)?.as_str();
            let value: Value = match serde_json::from_str(raw) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, raw, "failed to parse tool call");
                    return None;
                }
            };
            let name = value.get("name")?.as_str()?.to_string();
            let arguments = match value.get("arguments") {
                None | Some(Value::Null) => Value::Object(Default::default()),
                Some(Value::String(s)) => {
                    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
                }
                Some(other) => other.clone(),
            };
            Some(ToolCall { name, arguments })
        })
        .collect()
}

/// Whether a response without tool calls reads as a final answer.
pub fn is_final_answer(response: &str) -> bool {
    if response.contains("<tool_call>") {
        return false;
    }
    let lower = response.to_lowercase();
    COMPLETION_INDICATORS.iter().any(|ind| lower.contains(ind))
}

/// Render tool outputs as `<tool_result>` blocks for the next model turn.
pub fn format_tool_results(results: &[ToolOutcome]) -> String {
    results
        .iter()
        .map(|r| format!("<tool_result tool=\"{}\">\n{}\n</tool_result>", r.tool, r.result))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_single_tool_call() {
        let response = "Let me look.\n<tool_call>\n{\"name\": \"read\", \"arguments\": {\"file_path\": \"a.py\"}}\n</tool_call>";
        let calls = parse_tool_calls(response);
        assert_eq!(
            calls,
            vec![ToolCall {
                name: "read".into(),
                arguments: json!({"file_path": "a.py"}),
            }]
        );
    }

    #[test]
    fn test_parse_multiple_tool_calls_in_order() {
        let response = concat!(
            "<tool_call>{\"name\": \"bash\", \"arguments\": {\"command\": \"ls\"}}</tool_call>\n",
            "<tool_call>\n{\"name\": \"grep\", \"arguments\": {\"pattern\": \"fn\"}}\n</tool_call>"
        );
        let names: Vec<String> = parse_tool_calls(response).into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["bash", "grep"]);
    }

    #[test]
    fn test_parse_skips_invalid_blocks() {
        let response = concat!(
            "<tool_call>{not json}</tool_call>",
            "<tool_call>{\"arguments\": {}}</tool_call>",
            "<tool_call>{\"name\": \"glob\"}</tool_call>"
        );
        let calls = parse_tool_calls(response);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "glob");
        assert_eq!(calls[0].arguments, json!({}));
    }

    #[test]
    fn test_parse_string_encoded_arguments() {
        let response = r#"<tool_call>{"name": "bash", "arguments": "{\"command\": \"pwd\"}"}</tool_call>"#;
        let calls = parse_tool_calls(response);
        assert_eq!(calls[0].arguments, json!({"command": "pwd"}));
    }

    #[test]
    fn test_parse_no_tool_call() {
        assert!(parse_tool_calls("The weather is sunny today.").is_empty());
    }

    #[test]
    fn test_is_final_answer() {
        assert!(is_final_answer("I fixed the bug. Task completed."));
        assert!(is_final_answer("All tests pass, DONE"));
        assert!(!is_final_answer("Let me check the file first."));
        assert!(!is_final_answer("done <tool_call>{}</tool_call>"));
    }

    #[test]
    fn test_format_tool_results() {
        let out = format_tool_results(&[
            ToolOutcome {
                tool: "bash".into(),
                result: "ok".into(),
            },
            ToolOutcome {
                tool: "read".into(),
                result: "     1\tx".into(),
            },
        ]);
        assert_eq!(
            out,
            "<tool_result tool=\"bash\">\nok\n</tool_result>\n<tool_result tool=\"read\">\n     1\tx\n</tool_result>"
        );
    }
}
