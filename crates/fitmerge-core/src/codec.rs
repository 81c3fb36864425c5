//! JSON codec for backup files.
//!
//! Reading is strict about the fields the merge engine depends on (ids,
//! dates, durations, intensities) and ignores anything else the app may add.
//! Writing produces pretty JSON with the same camelCase keys.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ErrorCode;
use crate::model::{Backup, format_timestamp};

/// File-name prefix of consolidated backups written by [`write_backup`].
pub const CONSOLIDATED_PREFIX: &str = "fitness-tracker__consolidated-backup__";

/// Failures while reading or writing a backup file.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// The requested path does not exist.
    #[error("backup file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be read.
    #[error("failed to read backup {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The content is not a backup this tool understands.
    #[error("unsupported backup found at {}: {source}", .path.display())]
    UnsupportedFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Serializing a backup to JSON failed.
    #[error("failed to serialize backup: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The destination could not be written.
    #[error("failed to write backup {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

impl BackupError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::BackupNotFound,
            Self::Read { .. } | Self::UnsupportedFormat { .. } => {
                ErrorCode::UnsupportedBackupFormat
            }
            Self::Serialize(_) | Self::Write { .. } => ErrorCode::BackupWriteFailed,
        }
    }

    /// Path of the offending file, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path }
            | Self::Read { path, .. }
            | Self::UnsupportedFormat { path, .. }
            | Self::Write { path, .. } => Some(path),
            Self::Serialize(_) => None,
        }
    }
}

/// Deserialize a backup from JSON text. `origin` is only used in errors.
///
/// # Errors
///
/// Returns [`BackupError::UnsupportedFormat`] when required fields are
/// missing or mistyped.
pub fn parse_backup(json: &str, origin: &Path) -> Result<Backup, BackupError> {
    serde_json::from_str(json).map_err(|source| BackupError::UnsupportedFormat {
        path: origin.to_path_buf(),
        source,
    })
}

/// Read and deserialize a backup file.
///
/// # Errors
///
/// Returns [`BackupError::NotFound`] for a missing path,
/// [`BackupError::Read`] for I/O failures and
/// [`BackupError::UnsupportedFormat`] for content that does not decode.
pub fn read_backup(path: &Path) -> Result<Backup, BackupError> {
    info!(path = %path.display(), "reading backup");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            BackupError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            BackupError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let backup = parse_backup(&content, path)?;
    debug!(
        path = %path.display(),
        activities = backup.activities.len(),
        completed_activities = backup.completed_activities.len(),
        "reading backup completed"
    );
    Ok(backup)
}

/// Deterministic output file name for a backup, derived from its `date`.
#[must_use]
pub fn backup_file_name(backup: &Backup) -> String {
    format!("{CONSOLIDATED_PREFIX}{}.json", format_timestamp(&backup.date))
}

/// Serialize `backup` into `output_dir` and return the written path.
///
/// The file is written to a temporary sibling and renamed into place, so a
/// crash never leaves a half-written backup behind.
///
/// # Errors
///
/// Returns [`BackupError::Serialize`] or [`BackupError::Write`].
pub fn write_backup(backup: &Backup, output_dir: &Path) -> Result<PathBuf, BackupError> {
    let path = output_dir.join(backup_file_name(backup));
    info!(path = %path.display(), "writing backup");

    let body = serde_json::to_vec_pretty(backup).map_err(BackupError::Serialize)?;

    let write_err = |source| BackupError::Write {
        path: path.clone(),
        source,
    };
    fs::create_dir_all(output_dir).map_err(write_err)?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, body).map_err(write_err)?;
    fs::rename(&tmp_path, &path).map_err(write_err)?;

    debug!(path = %path.display(), "writing backup completed");
    Ok(path)
}
