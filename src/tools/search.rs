//! Search tools: `grep` (regex over file contents) and `glob` (file names).

use std::path::Path;

use glob::{MatchOptions, Pattern};
use regex::Regex;
use serde_json::Value;
use walkdir::{DirEntry, WalkDir};

use super::{str_arg, ToolExecutor};

/// `*` and `?` stay within one path segment; only `**` crosses directories.
const PATH_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

fn is_vcs_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == ".git"
}

/// All regular files under `root` (or `root` itself if it is a file), in a
/// stable order.
fn walk_files(root: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_vcs_dir(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
}

impl ToolExecutor {
    pub(super) async fn grep(&self, arguments: &Value) -> String {
        let pattern = str_arg(arguments, "pattern");
        if pattern.is_empty() {
            return "Error: No pattern provided".into();
        }
        let search_path = match str_arg(arguments, "path") {
            "" => ".",
            p => p,
        };
        let root = match self.resolve(search_path) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let regex = match Regex::new(pattern) {
            Ok(r) => r,
            Err(e) => return format!("Error: invalid pattern: {e}"),
        };

        let exec = self.clone();
        let matches = tokio::task::spawn_blocking(move || {
            let mut lines = Vec::new();
            for entry in walk_files(&root) {
                // Binary and non-UTF-8 files are skipped.
                let Ok(content) = std::fs::read_to_string(entry.path()) else {
                    continue;
                };
                let rel = exec.display_relative(entry.path());
                for (idx, line) in content.lines().enumerate() {
                    if regex.is_match(line) {
                        lines.push(format!("{rel}:{}:{line}", idx + 1));
                    }
                }
            }
            lines
        })
        .await;

        match matches {
            Ok(lines) if lines.is_empty() => format!("No matches found for pattern: {pattern}"),
            Ok(lines) => self.truncate(lines.join("\n")),
            Err(e) => format!("Error: {e}"),
        }
    }

    pub(super) async fn glob(&self, arguments: &Value) -> String {
        let pattern = str_arg(arguments, "pattern");
        if pattern.is_empty() {
            return "Error: No pattern provided".into();
        }
        let search_path = match str_arg(arguments, "path") {
            "" => ".",
            p => p,
        };
        let root = match self.resolve(search_path) {
            Ok(p) => p,
            Err(e) => return e,
        };
        let glob = match Pattern::new(pattern) {
            Ok(g) => g,
            Err(e) => return format!("Error: invalid pattern: {e}"),
        };
        // Patterns with a separator match the path below the search root,
        // plain patterns match the file name.
        let match_path = pattern.contains('/');

        let exec = self.clone();
        let found = tokio::task::spawn_blocking(move || {
            let mut paths: Vec<String> = walk_files(&root)
                .filter(|entry| {
                    if match_path {
                        entry
                            .path()
                            .strip_prefix(&root)
                            .map(|rel| glob.matches_path_with(rel, PATH_MATCH))
                            .unwrap_or(false)
                    } else {
                        glob.matches(&entry.file_name().to_string_lossy())
                    }
                })
                .map(|entry| exec.display_relative(entry.path()))
                .collect();
            paths.sort();
            paths
        })
        .await;

        match found {
            Ok(paths) if paths.is_empty() => {
                format!("No files found matching pattern: {pattern}")
            }
            Ok(paths) => self.truncate(paths.join("\n")),
            Err(e) => format!("Error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use serde_json::json;

    fn setup() -> (tempfile::TempDir, ToolExecutor) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/util")).unwrap();
        std::fs::write(root.join("src/main.py"), "import util\nprint('hello')\n").unwrap();
        std::fs::write(root.join("src/util/helpers.py"), "def hello():\n    pass\n").unwrap();
        std::fs::write(root.join("README.md"), "# hello project\n").unwrap();
        let exec = ToolExecutor::new(root, &ToolConfig::default()).unwrap();
        (dir, exec)
    }

    #[tokio::test]
    async fn test_grep_reports_relative_paths_and_lines() {
        let (_dir, exec) = setup();
        let out = exec.grep(&json!({"pattern": "def \\w+"})).await;
        assert_eq!(out, "src/util/helpers.py:1:def hello():");
    }

    #[tokio::test]
    async fn test_grep_scoped_path() {
        let (_dir, exec) = setup();
        let out = exec.grep(&json!({"pattern": "hello", "path": "src"})).await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            ["src/main.py:2:print('hello')", "src/util/helpers.py:1:def hello():"]
        );
    }

    #[tokio::test]
    async fn test_grep_no_matches_and_bad_regex() {
        let (_dir, exec) = setup();
        let out = exec.grep(&json!({"pattern": "nonexistent_symbol"})).await;
        assert_eq!(out, "No matches found for pattern: nonexistent_symbol");

        let out = exec.grep(&json!({"pattern": "("})).await;
        assert!(out.starts_with("Error: invalid pattern"));
    }

    #[tokio::test]
    async fn test_glob_by_file_name() {
        let (_dir, exec) = setup();
        let out = exec.glob(&json!({"pattern": "*.py"})).await;
        assert_eq!(out, "src/main.py\nsrc/util/helpers.py");
    }

    #[tokio::test]
    async fn test_glob_by_path_pattern() {
        let (_dir, exec) = setup();
        let out = exec.glob(&json!({"pattern": "src/util/*.py"})).await;
        assert_eq!(out, "src/util/helpers.py");

        let out = exec.glob(&json!({"pattern": "**/*.md"})).await;
        assert_eq!(out, "README.md");
    }

    #[tokio::test]
    async fn test_glob_star_stays_in_one_directory() {
        let (_dir, exec) = setup();
        let out = exec.glob(&json!({"pattern": "src/*.py"})).await;
        assert_eq!(out, "src/main.py");

        let out = exec.glob(&json!({"pattern": "src/**/*.py"})).await;
        assert_eq!(out, "src/main.py\nsrc/util/helpers.py");
    }

    #[tokio::test]
    async fn test_glob_no_files() {
        let (_dir, exec) = setup();
        let out = exec.glob(&json!({"pattern": "*.rs"})).await;
        assert_eq!(out, "No files found matching pattern: *.rs");
    }
}
