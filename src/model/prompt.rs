//! Prompt construction for the coding agent.
//!
//! - [`system_prompt`] lists the available tools and the calling convention.
//! - [`messages_to_prompt`] renders a conversation with the ChatML template
//!   expected by the `/generate` endpoint.

use crate::model::api::{ChatMessage, Role};
use crate::tools::ToolSpec;

/// Build the system prompt advertising `tools` to the agent.
pub fn system_prompt(tools: &[ToolSpec]) -> String {
    let tool_descriptions = tools
        .iter()
        .map(|t| format!("- {}: {}", t.function.name, t.function.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are Claude Code, an AI assistant that helps with software engineering tasks.

You have access to the following tools:
{tool_descriptions}

To use a tool, format your response as:
<tool_call>
{{"name": "tool_name", "arguments": {{"arg1": "value1", "arg2": "value2"}}}}
</tool_call>

You can call multiple tools in sequence. Tool results will be provided in <tool_result> tags.

When you have completed the task, provide your final answer without any tool calls.
"#
    )
}

/// Render `messages` with the ChatML template and open an assistant turn.
///
/// Messages with an unrecognised role are skipped.
pub fn messages_to_prompt(messages: &[ChatMessage]) -> String {
    let mut parts: Vec<String> = messages
        .iter()
        .filter(|m| m.role != Role::Other)
        .map(|m| format!("<|im_start|>{}\n{}<|im_end|>", m.role.as_str(), m.content))
        .collect();

    parts.push("<|im_start|>assistant\n".to_string());
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tool_specs;

    #[test]
    fn test_system_prompt_lists_every_tool() {
        let specs = tool_specs();
        let prompt = system_prompt(&specs);
        for spec in &specs {
            assert!(prompt.contains(&format!("- {}:", spec.function.name)));
        }
        assert!(prompt.contains(r#"{"name": "tool_name", "arguments": {"arg1": "value1", "arg2": "value2"}}"#));
    }

    #[test]
    fn test_messages_to_prompt_chatml() {
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user("fix the bug"),
            ChatMessage::assistant("<tool_call>{}</tool_call>"),
            ChatMessage::tool("result"),
        ];
        let prompt = messages_to_prompt(&messages);
        assert_eq!(
            prompt,
            "<|im_start|>system\nsys<|im_end|>\n\
             <|im_start|>user\nfix the bug<|im_end|>\n\
             <|im_start|>assistant\n<tool_call>{}</tool_call><|im_end|>\n\
             <|im_start|>tool\nresult<|im_end|>\n\
             <|im_start|>assistant\n"
        );
    }

    #[test]
    fn test_messages_to_prompt_empty() {
        assert_eq!(messages_to_prompt(&[]), "<|im_start|>assistant\n");
    }
}
