//! `edit_file` tool.

use crate::tool::{object_schema, parse_input};
use crate::{Result, Tool, ToolError, Workspace};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use tracing::debug;

pub struct EditFile {
    workspace: Workspace,
}

impl EditFile {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default)]
    path: String,
    #[serde(default)]
    old_str: String,
    #[serde(default)]
    new_str: String,
}

impl Tool for EditFile {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Make edits to a text file.\n\n\
         Replaces every occurrence of 'old_str' with 'new_str' in the given file. 'old_str' and 'new_str' MUST be \
         different from each other.\n\n\
         If the file specified with path doesn't exist, it will be created."
    }

    fn schema(&self) -> Value {
        object_schema(
            &[
                ("path", "string", "The path to the file"),
                (
                    "old_str",
                    "string",
                    "Text to search for - must match exactly; every occurrence is replaced",
                ),
                ("new_str", "string", "Text to replace old_str with"),
            ],
            &["path", "old_str", "new_str"],
        )
    }

    fn execute(&self, input: Value) -> Result<String> {
        let input: Input = parse_input(input)?;
        if input.path.is_empty() {
            return Err(ToolError::InvalidInput("path is required".into()));
        }
        if input.old_str == input.new_str {
            return Err(ToolError::InvalidInput(
                "old_str and new_str must differ".into(),
            ));
        }
        let path = self.workspace.resolve(&input.path)?;

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound && input.old_str.is_empty() => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|e| ToolError::io(&input.path, e))?;
                }
                fs::write(&path, &input.new_str).map_err(|e| ToolError::io(&input.path, e))?;
                debug!(path = %input.path, "created file");
                return Ok(format!("Successfully created file {}", input.path));
            }
            Err(e) => return Err(ToolError::io(&input.path, e)),
        };

        if input.old_str.is_empty() {
            return Err(ToolError::InvalidInput(format!(
                "{} already exists; old_str must not be empty",
                input.path
            )));
        }
        if !content.contains(&input.old_str) {
            return Err(ToolError::Execution("old_str not found in file".into()));
        }

        let updated = content.replace(&input.old_str, &input.new_str);
        fs::write(&path, updated).map_err(|e| ToolError::io(&input.path, e))?;
        Ok("OK".into())
    }
}
