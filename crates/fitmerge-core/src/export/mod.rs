//! Flat exports of a single backup for inspection outside the app.
//!
//! - [`csv`] writes one comma-separated file per collection.
//! - [`sqlite`] writes a database with one table per collection and a
//!   `history` view.
//!
//! Both are read-only views of a backup; nothing here is read back.

pub mod csv;
pub mod sqlite;

use std::io;
use std::path::PathBuf;

use crate::error::ErrorCode;

/// Separator for list-valued columns.
pub const LIST_SEPARATOR: &str = "|";

/// Failures while exporting a backup.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("sqlite export to {} failed: {source}", .path.display())]
    Sqlite {
        path: PathBuf,
        source: rusqlite::Error,
    },
}

impl ExportError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::ExportFailed
    }
}

pub(crate) fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(LIST_SEPARATOR)
}
