//! `search_file` tool.

use crate::tool::{object_schema, parse_input};
use crate::{Result, Tool, ToolError, Workspace};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};

pub struct SearchFile {
    workspace: Workspace,
}

impl SearchFile {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Deserialize)]
struct Input {
    #[serde(default)]
    path: String,
    #[serde(default)]
    pattern: String,
    #[serde(default)]
    regex: bool,
}

enum Matcher {
    Literal(String),
    Regex(Regex),
}

impl Matcher {
    fn is_match(&self, line: &str) -> bool {
        match self {
            Matcher::Literal(needle) => line.contains(needle.as_str()),
            Matcher::Regex(re) => re.is_match(line),
        }
    }
}

impl Tool for SearchFile {
    fn name(&self) -> &str {
        "search_file"
    }

    fn description(&self) -> &str {
        "Search for a string or regex pattern within a file and return matching lines. Use \
         regex:true for regex pattern matching."
    }

    fn schema(&self) -> Value {
        object_schema(
            &[
                ("path", "string", "The path of the file to search in"),
                ("pattern", "string", "The string or regex pattern to search for"),
                (
                    "regex",
                    "boolean",
                    "Whether to treat the pattern as a regex (true) or plain string (false)",
                ),
            ],
            &["path", "pattern"],
        )
    }

    fn execute(&self, input: Value) -> Result<String> {
        let input: Input = parse_input(input)?;
        if input.path.is_empty() || input.pattern.is_empty() {
            return Err(ToolError::InvalidInput("path and pattern are required".into()));
        }

        let matcher = if input.regex {
            Matcher::Regex(
                Regex::new(&input.pattern)
                    .map_err(|e| ToolError::InvalidInput(format!("invalid regex pattern: {e}")))?,
            )
        } else {
            Matcher::Literal(input.pattern.clone())
        };

        let path = self.workspace.resolve(&input.path)?;
        let file = File::open(&path).map_err(|e| ToolError::io(&input.path, e))?;

        let mut matches = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| ToolError::io(&input.path, e))?;
            if matcher.is_match(&line) {
                matches.push(format!("Line {}: {line}", index + 1));
            }
        }

        if matches.is_empty() {
            return Ok("No matches found".into());
        }
        Ok(format!(
            "Found {} matches:\n{}",
            matches.len(),
            matches.join("\n")
        ))
    }
}
