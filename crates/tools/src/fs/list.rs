//! Directory listing tools: recursive `list_files` and one-level `list_dir`.

use crate::tool::{object_schema, parse_input};
use crate::{Result, Tool, ToolError, Workspace};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default)]
    path: String,
}

pub struct ListFiles {
    workspace: Workspace,
}

impl ListFiles {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

impl Tool for ListFiles {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and directories at a given path. If no path is provided, lists files in the \
         current directory."
    }

    fn schema(&self) -> Value {
        object_schema(
            &[(
                "path",
                "string",
                "Optional relative path to list files from. Defaults to current directory if not provided.",
            )],
            &[],
        )
    }

    fn execute(&self, input: Value) -> Result<String> {
        let input: Input = parse_input(input)?;
        let dir = self.workspace.resolve(&input.path)?;

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| ToolError::Execution(e.to_string()))?;
            let relative = entry
                .path()
                .strip_prefix(&dir)
                .map_err(|e| ToolError::Execution(e.to_string()))?
                .to_string_lossy()
                .into_owned();
            if entry.file_type().is_dir() {
                files.push(format!("{relative}/"));
            } else {
                files.push(relative);
            }
        }

        serde_json::to_string(&files).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

pub struct ListDir {
    workspace: Workspace,
}

impl ListDir {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

impl Tool for ListDir {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "Lists the contents of a directory, showing files and subdirectories. Use this to \
         explore the workspace structure."
    }

    fn schema(&self) -> Value {
        object_schema(
            &[(
                "path",
                "string",
                "Path to the directory to list, relative to the workspace root",
            )],
            &["path"],
        )
    }

    fn execute(&self, input: Value) -> Result<String> {
        let input: Input = parse_input(input)?;
        let dir = self.workspace.resolve(&input.path)?;

        let metadata = fs::metadata(&dir).map_err(|e| ToolError::io(&input.path, e))?;
        if !metadata.is_dir() {
            return Err(ToolError::InvalidInput(format!(
                "{} is not a directory",
                input.path
            )));
        }

        let mut entries: Vec<_> = fs::read_dir(&dir)
            .map_err(|e| ToolError::io(&input.path, e))?
            .filter_map(|entry| entry.ok())
            .collect();
        entries.sort_by_key(|entry| entry.file_name());

        let mut output = format!("Contents of {}:\n\n", input.path);
        for entry in entries {
            // Entries that vanish or cannot be inspected are skipped.
            let Ok(info) = entry.metadata() else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if info.is_dir() {
                output.push_str(&format!("📁 {name}\t<dir>\n"));
            } else {
                output.push_str(&format!("📄 {name}\t{}\n", format_size(info.len())));
            }
        }
        Ok(output)
    }
}

/// Human-readable size using binary units.
pub(crate) fn format_size(size: u64) -> String {
    const UNIT: u64 = 1024;
    if size < UNIT {
        return format!("{size} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = size / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let prefix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {prefix}B", size as f64 / div as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src").join("lib.rs"), "pub fn a() {}\n").unwrap();
        fs::write(dir.path().join("README.md"), vec![b'x'; 2048]).unwrap();
        dir
    }

    #[test]
    fn list_files_walks_recursively() {
        let dir = workspace();
        let tool = ListFiles::new(Workspace::new(dir.path()));
        let out = tool.execute(Value::Null).unwrap();
        let files: Vec<String> = serde_json::from_str(&out).unwrap();
        assert_eq!(files, ["README.md", "src/", "src/lib.rs"]);
    }

    #[test]
    fn list_files_honours_subdirectory() {
        let dir = workspace();
        let tool = ListFiles::new(Workspace::new(dir.path()));
        let out = tool.execute(json!({"path": "src"})).unwrap();
        assert_eq!(out, r#"["lib.rs"]"#);
    }

    #[test]
    fn list_dir_shows_sizes() {
        let dir = workspace();
        let tool = ListDir::new(Workspace::new(dir.path()));
        let out = tool.execute(json!({"path": "."})).unwrap();
        assert!(out.starts_with("Contents of .:\n\n"));
        assert!(out.contains("📄 README.md\t2.0 KB"));
        assert!(out.contains("📁 src\t<dir>"));
    }

    #[test]
    fn list_dir_rejects_files_and_escapes() {
        let dir = workspace();
        let tool = ListDir::new(Workspace::new(dir.path()));
        assert!(matches!(
            tool.execute(json!({"path": "README.md"})),
            Err(ToolError::InvalidInput(_))
        ));
        assert!(matches!(
            tool.execute(json!({"path": "../"})),
            Err(ToolError::OutsideWorkspace(_))
        ));
    }

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
