//! Local file-system tools.

mod edit;
mod find;
mod list;
mod read;
mod search;
mod summarize;

pub use edit::EditFile;
pub use find::FindFile;
pub use list::{ListDir, ListFiles};
pub use read::ReadFile;
pub use search::SearchFile;
pub use summarize::SummarizeFile;
