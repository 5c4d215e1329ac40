//! `find_file` tool.

use crate::tool::{object_schema, parse_input};
use crate::{Result, Tool, ToolError, Workspace};
use globset::GlobBuilder;
use serde::Deserialize;
use serde_json::Value;
use walkdir::WalkDir;

pub struct FindFile {
    workspace: Workspace,
}

impl FindFile {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default)]
    dir: String,
    #[serde(default)]
    pattern: String,
}

impl Tool for FindFile {
    fn name(&self) -> &str {
        "find_file"
    }

    fn description(&self) -> &str {
        "Find files in a directory that match a name pattern. Supports glob patterns like *.txt \
         or *test*.rs"
    }

    fn schema(&self) -> Value {
        object_schema(
            &[
                (
                    "dir",
                    "string",
                    "The directory to search in (defaults to current directory if empty)",
                ),
                (
                    "pattern",
                    "string",
                    "The file name pattern to match (e.g., *.txt, *test*.rs)",
                ),
            ],
            &["pattern"],
        )
    }

    fn execute(&self, input: Value) -> Result<String> {
        let input: Input = parse_input(input)?;
        if input.pattern.is_empty() {
            return Err(ToolError::InvalidInput("pattern is required".into()));
        }
        let dir_label = if input.dir.is_empty() { "." } else { input.dir.as_str() };
        let dir = self.workspace.resolve(&input.dir)?;
        if !dir.is_dir() {
            return Err(ToolError::InvalidInput(format!(
                "directory does not exist: {dir_label}"
            )));
        }

        let matcher = GlobBuilder::new(&input.pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| ToolError::InvalidInput(format!("invalid pattern: {e}")))?
            .compile_matcher();
        // Without a separator the pattern names files; with one it names paths.
        let match_path = input.pattern.contains('/');

        let mut matches = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| ToolError::Execution(e.to_string()))?;
            if entry.file_type().is_dir() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&dir)
                .map_err(|e| ToolError::Execution(e.to_string()))?;
            let candidate = if match_path {
                relative.as_os_str()
            } else {
                entry.file_name()
            };
            if matcher.is_match(candidate) {
                matches.push(relative.to_string_lossy().into_owned());
            }
        }

        if matches.is_empty() {
            return Ok(format!(
                "No files found matching pattern '{}' in directory '{dir_label}'",
                input.pattern
            ));
        }
        Ok(format!(
            "Found {} files matching pattern '{}':\n{}",
            matches.len(),
            input.pattern,
            matches.join("\n")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn setup() -> (tempfile::TempDir, FindFile) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("src/parser_test.rs"), "").unwrap();
        fs::write(dir.path().join("src/nested/todo.txt"), "").unwrap();
        let tool = FindFile::new(Workspace::new(dir.path()));
        (dir, tool)
    }

    #[test]
    fn name_patterns_match_at_any_depth() {
        let (_dir, tool) = setup();
        let out = tool.execute(json!({"pattern": "*.txt"})).unwrap();
        assert_eq!(
            out,
            "Found 2 files matching pattern '*.txt':\nnotes.txt\nsrc/nested/todo.txt"
        );
    }

    #[test]
    fn path_patterns_respect_separators() {
        let (_dir, tool) = setup();
        let out = tool.execute(json!({"pattern": "src/*.rs"})).unwrap();
        assert_eq!(out, "Found 1 files matching pattern 'src/*.rs':\nsrc/parser_test.rs");
    }

    #[test]
    fn reports_no_matches_and_missing_dir() {
        let (_dir, tool) = setup();
        assert_eq!(
            tool.execute(json!({"dir": "src", "pattern": "*.md"})).unwrap(),
            "No files found matching pattern '*.md' in directory 'src'"
        );
        assert!(matches!(
            tool.execute(json!({"dir": "absent", "pattern": "*"})),
            Err(ToolError::InvalidInput(_))
        ));
        assert!(matches!(
            tool.execute(json!({"dir": "src"})),
            Err(ToolError::InvalidInput(_))
        ));
    }
}
