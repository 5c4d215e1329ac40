//! Side-effecting tools the model may request.
//!
//! Each [`Tool`] has a name, a description, a JSON-Schema-like parameter
//! schema, and an `execute` function mapping an argument payload to text.
//! Tools validate their own input; nothing upstream checks payloads against
//! the schema.
//!
//! The built-in tools operate on the local file system, confined to a
//! [`Workspace`] root:
//!
//! | name             | purpose                                   |
//! |------------------|-------------------------------------------|
//! | `read_file`      | read a file                               |
//! | `list_files`     | recursive listing as a JSON array         |
//! | `list_dir`       | one-level listing with sizes              |
//! | `edit_file`      | replace text in, or create, a file        |
//! | `search_file`    | literal or regex search within a file     |
//! | `find_file`      | glob search for file names                |
//! | `summarize_file` | structural overview of a file's head      |
//!
//! # Example
//!
//! ```no_run
//! use tools::{Tool, Workspace};
//!
//! let tools = tools::builtin(Workspace::new("."));
//! let read = tools.iter().find(|t| t.name() == "read_file").unwrap();
//! let text = read.execute(serde_json::json!({"path": "Cargo.toml"}))?;
//! println!("{text}");
//! # Ok::<(), tools::ToolError>(())
//! ```

mod error;
pub mod fs;
mod tool;
mod workspace;

pub use error::{Result, ToolError};
pub use tool::{Tool, ToolSpec, parse_input};
pub use workspace::Workspace;

/// All built-in tools, rooted at `workspace`.
pub fn builtin(workspace: Workspace) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(fs::ReadFile::new(workspace.clone())),
        Box::new(fs::ListFiles::new(workspace.clone())),
        Box::new(fs::EditFile::new(workspace.clone())),
        Box::new(fs::SearchFile::new(workspace.clone())),
        Box::new(fs::FindFile::new(workspace.clone())),
        Box::new(fs::ListDir::new(workspace.clone())),
        Box::new(fs::SummarizeFile::new(workspace)),
    ]
}
