//! Function-calling specifications for the agent's tools.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// A tool advertised to the model, in function-calling form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

fn function(name: &str, description: &str, parameters: serde_json::Value) -> ToolSpec {
    ToolSpec {
        kind: "function".into(),
        function: FunctionSpec {
            name: name.into(),
            description: description.into(),
            parameters,
        },
    }
}

/// The full tool catalogue, in the order it is shown to the model.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        function(
            "bash",
            "Execute a bash command in the workspace directory",
            json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "The bash command to execute"}
                },
                "required": ["command"],
            }),
        ),
        function(
            "read",
            "Read the contents of a file",
            json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path to the file to read"}
                },
                "required": ["file_path"],
            }),
        ),
        function(
            "write",
            "Write content to a file (creates or overwrites)",
            json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path to the file to write"},
                    "content": {"type": "string", "description": "Content to write to the file"},
                },
                "required": ["file_path", "content"],
            }),
        ),
        function(
            "edit",
            "Edit a file by replacing old_string with new_string",
            json!({
                "type": "object",
                "properties": {
                    "file_path": {"type": "string", "description": "Path to the file to edit"},
                    "old_string": {"type": "string", "description": "String to replace"},
                    "new_string": {"type": "string", "description": "Replacement string"},
                },
                "required": ["file_path", "old_string", "new_string"],
            }),
        ),
        function(
            "grep",
            "Search for pattern in files (regex)",
            json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "The regex pattern to search for"},
                    "path": {
                        "type": "string",
                        "description": "Directory or file to search in (default: workspace root)",
                    },
                },
                "required": ["pattern"],
            }),
        ),
        function(
            "glob",
            "Find files matching a glob pattern",
            json!({
                "type": "object",
                "properties": {
                    "pattern": {"type": "string", "description": "Glob pattern (e.g., '**/*.py')"},
                    "path": {
                        "type": "string",
                        "description": "Directory to search in (default: workspace root)",
                    },
                },
                "required": ["pattern"],
            }),
        ),
        function(
            "web_search",
            "Search the web for information. Returns search results with titles, URLs, and snippets.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The search query"},
                    "num_results": {
                        "type": "integer",
                        "description": "Number of results to return (default: 5)",
                    },
                },
                "required": ["query"],
            }),
        ),
        function(
            "web_fetch",
            "Fetch content from a URL and convert to markdown. Useful for reading documentation, blog posts, or web pages.",
            json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "The URL to fetch"},
                    "extract_main_content": {
                        "type": "boolean",
                        "description": "Try to extract main content only (default: true)",
                    },
                },
                "required": ["url"],
            }),
        ),
    ]
}
