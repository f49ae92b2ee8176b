//! File tools: `read`, `write`, `edit`.

use std::io::ErrorKind;

use serde_json::Value;

use super::{str_arg, ToolExecutor};

/// Number lines like `cat -n`.
fn number_lines(content: &str) -> String {
    content
        .split('\n')
        .enumerate()
        .map(|(i, line)| format!("{:6}\t{line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ToolExecutor {
    pub(super) async fn read(&self, arguments: &Value) -> String {
        let file_path = str_arg(arguments, "file_path");
        if file_path.is_empty() {
            return "Error: No file_path provided".into();
        }
        let full_path = match self.resolve(file_path) {
            Ok(p) => p,
            Err(e) => return e,
        };

        match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => self.truncate(number_lines(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                format!("Error: File not found: {file_path}")
            }
            Err(e) => format!("Error: {e}"),
        }
    }

    pub(super) async fn write(&self, arguments: &Value) -> String {
        let file_path = str_arg(arguments, "file_path");
        let content = str_arg(arguments, "content");
        if file_path.is_empty() {
            return "Error: No file_path provided".into();
        }
        let full_path = match self.resolve(file_path) {
            Ok(p) => p,
            Err(e) => return e,
        };

        if let Some(parent) = full_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return format!("Error: {e}");
            }
        }

        match tokio::fs::write(&full_path, content).await {
            Ok(()) => format!(
                "Successfully wrote {} characters to {file_path}",
                content.chars().count()
            ),
            Err(e) => format!("Error: {e}"),
        }
    }

    pub(super) async fn edit(&self, arguments: &Value) -> String {
        let file_path = str_arg(arguments, "file_path");
        let old_string = str_arg(arguments, "old_string");
        let new_string = str_arg(arguments, "new_string");
        if file_path.is_empty() {
            return "Error: No file_path provided".into();
        }
        if old_string.is_empty() {
            return "Error: No old_string provided".into();
        }
        let full_path = match self.resolve(file_path) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let content = match tokio::fs::read_to_string(&full_path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return format!("Error: File not found: {file_path}");
            }
            Err(e) => return format!("Error: {e}"),
        };

        match content.matches(old_string).count() {
            0 => format!("Error: old_string not found in {file_path}"),
            1 => {
                let updated = content.replacen(old_string, new_string, 1);
                match tokio::fs::write(&full_path, updated).await {
                    Ok(()) => format!("Successfully replaced text in {file_path}"),
                    Err(e) => format!("Error: {e}"),
                }
            }
            count => format!(
                "Error: old_string appears {count} times in {file_path}. Please provide a more specific string."
            ),
        }
    }
}
