//! `read_file` tool.

use crate::tool::{object_schema, parse_input};
use crate::{Result, Tool, ToolError, Workspace};
use serde::Deserialize;
use serde_json::Value;
use std::fs;

pub struct ReadFile {
    workspace: Workspace,
}

impl ReadFile {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default)]
    path: String,
}

impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a given relative file path. Use this when you want to see what's \
         inside a file. Do not use this with directory names."
    }

    fn schema(&self) -> Value {
        object_schema(
            &[("path", "string", "The relative path of a file in the working directory.")],
            &["path"],
        )
    }

    fn execute(&self, input: Value) -> Result<String> {
        let input: Input = parse_input(input)?;
        if input.path.is_empty() {
            return Err(ToolError::InvalidInput("path is required".into()));
        }
        let path = self.workspace.resolve(&input.path)?;
        if path.is_dir() {
            return Err(ToolError::InvalidInput(format!(
                "{} is a directory, not a file",
                input.path
            )));
        }
        fs::read_to_string(&path).map_err(|e| ToolError::io(&input.path, e))
    }
}
