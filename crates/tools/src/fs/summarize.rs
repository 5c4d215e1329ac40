//! `summarize_file` tool: a cheap structural overview of a file's head.

use crate::tool::{object_schema, parse_input};
use crate::{Result, Tool, ToolError, Workspace};
use serde::Deserialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::Read;

const HEAD_BYTES: u64 = 1000;
const PREVIEW_LINES: usize = 5;

pub struct SummarizeFile {
    workspace: Workspace,
}

impl SummarizeFile {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default)]
    path: String,
}

impl Tool for SummarizeFile {
    fn name(&self) -> &str {
        "summarize_file"
    }

    fn description(&self) -> &str {
        "Summarizes the contents of a file, providing a brief overview of its structure and \
         purpose. Use this when you want to understand what a file does without reading its \
         entire contents."
    }

    fn schema(&self) -> Value {
        object_schema(
            &[(
                "path",
                "string",
                "Path to the file to summarize, relative to the workspace root",
            )],
            &["path"],
        )
    }

    fn execute(&self, input: Value) -> Result<String> {
        let input: Input = parse_input(input)?;
        if input.path.is_empty() {
            return Err(ToolError::InvalidInput("path is required".into()));
        }
        let path = self.workspace.resolve(&input.path)?;
        let metadata = fs::metadata(&path).map_err(|e| ToolError::io(&input.path, e))?;
        if metadata.is_dir() {
            return Err(ToolError::InvalidInput(
                "path is a directory, not a file".into(),
            ));
        }

        let mut head = Vec::new();
        File::open(&path)
            .and_then(|file| file.take(HEAD_BYTES).read_to_end(&mut head))
            .map_err(|e| ToolError::io(&input.path, e))?;
        let content = String::from_utf8_lossy(&head);

        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let analysis = analyze(&extension, &content);

        Ok(format!(
            "File: {}\nSize: {} bytes\nType: {extension}\n\n{analysis}",
            input.path,
            metadata.len()
        ))
    }
}

fn analyze(extension: &str, content: &str) -> String {
    let count = |needle: &str| content.matches(needle).count();
    let (label, facts) = match extension {
        ".rs" => (
            "Rust file analysis",
            vec![
                (count("use "), "imports"),
                (count("fn "), "functions"),
                (count("struct ") + count("enum ") + count("trait "), "types"),
            ],
        ),
        ".go" => (
            "Go file analysis",
            vec![
                (count("import"), "imports"),
                (count("func"), "functions"),
                (
                    count("type").saturating_sub(count("type interface")),
                    "structs/interfaces",
                ),
            ],
        ),
        ".py" => (
            "Python file analysis",
            vec![
                (count("import") + count("from"), "imports"),
                (count("def"), "functions"),
                (count("class"), "classes"),
            ],
        ),
        ".js" | ".ts" | ".jsx" | ".tsx" => (
            "JavaScript/TypeScript file analysis",
            vec![
                (count("import") + count("require"), "imports"),
                (count("function") + count("=>"), "functions"),
                (count("class"), "classes"),
            ],
        ),
        ".md" => (
            "Markdown file analysis",
            vec![
                (count("#"), "headers"),
                (count("- ") + count("* "), "list items"),
            ],
        ),
        _ => (
            "File analysis",
            vec![
                (count("\n"), "lines"),
                (content.split_whitespace().count(), "words"),
            ],
        ),
    };

    let facts: String = facts
        .into_iter()
        .map(|(n, what)| format!("- {n} {what}\n"))
        .collect();
    let preview: Vec<&str> = content.split('\n').take(PREVIEW_LINES).collect();
    format!("{label}:\n{facts}\nFirst few lines:\n{}", preview.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summarizes_rust_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = "use std::fs;\n\nstruct A;\n\nfn main() {}\nfn other() {}\n";
        fs::write(dir.path().join("main.rs"), source).unwrap();
        let tool = SummarizeFile::new(Workspace::new(dir.path()));

        let out = tool.execute(json!({"path": "main.rs"})).unwrap();
        assert!(out.starts_with(&format!(
            "File: main.rs\nSize: {} bytes\nType: .rs\n\nRust file analysis:\n",
            source.len()
        )));
        assert!(out.contains("- 1 imports\n- 2 functions\n- 1 types\n"));
        assert!(out.ends_with("First few lines:\nuse std::fs;\n\nstruct A;\n\nfn main() {}"));
    }

    #[test]
    fn generic_files_count_words() {
        let summary = analyze("", "alpha beta\ngamma\n");
        assert!(summary.starts_with("File analysis:\n- 2 lines\n- 3 words\n"));
    }

    #[test]
    fn only_the_head_is_analyzed() {
        let dir = tempfile::tempdir().unwrap();
        let long = "word ".repeat(1000);
        fs::write(dir.path().join("big.txt"), &long).unwrap();
        let tool = SummarizeFile::new(Workspace::new(dir.path()));

        let out = tool.execute(json!({"path": "big.txt"})).unwrap();
        assert!(out.contains("Size: 5000 bytes"));
        assert!(out.contains("- 200 words"));
    }

    #[test]
    fn directories_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SummarizeFile::new(Workspace::new(dir.path()));
        assert!(matches!(
            tool.execute(json!({"path": "."})),
            Err(ToolError::InvalidInput(_))
        ));
    }
}
