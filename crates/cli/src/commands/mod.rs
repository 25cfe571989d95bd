//! Command handlers for the ragline CLI.

pub mod check;
pub mod query;
pub mod retrieve;
pub mod storage;

pub use check::CheckCommand;
pub use query::QueryCommand;
pub use retrieve::RetrieveCommand;
pub use storage::{DownloadCommand, UploadCommand};
