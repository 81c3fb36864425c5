//! Consolidation driver: discover, load, validate, order and fold backups.
//!
//! ```text
//! dir ──discover──▶ paths (name order)
//!     ──load+validate──▶ one backup per date (later file wins)
//!     ──fold merge_backups from the sentinel──▶ consolidated backup
//! ```
//!
//! The fold is strictly sequential: each step merges the accumulator with the
//! next backup by date, and decisions taken in one step are visible to every
//! later step through the shared [`DecisionStore`].

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::codec::{BackupError, read_backup};
use crate::decision::DecisionStore;
use crate::error::ErrorCode;
use crate::merge::{MergeError, MergeStats, merge_backups};
use crate::model::{Backup, Timestamp, format_timestamp};
use crate::resolve::ConflictResolver;
use crate::validate::{ValidationReport, validate_backup};

/// File-name pattern of backups exported by the app.
pub const DEFAULT_BACKUP_PATTERN: &str = "fitness-tracker__*.json";

/// What to do with a file that cannot be read or decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnreadablePolicy {
    /// Stop the run on the first unreadable file.
    #[default]
    Abort,
    /// Log the failure and continue with the remaining files.
    Skip,
}

/// Knobs for a consolidation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidateOptions {
    /// File-name pattern with at most one `*` wildcard.
    pub pattern: String,
    pub on_unreadable: UnreadablePolicy,
    /// Treat a validator finding as fatal.
    pub halt_on_corruption: bool,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_BACKUP_PATTERN.to_string(),
            on_unreadable: UnreadablePolicy::Abort,
            halt_on_corruption: false,
        }
    }
}

/// Failures that stop a consolidation run.
#[derive(Debug, thiserror::Error)]
pub enum ConsolidateError {
    #[error("no backups matching the pattern were found in {}", .dir.display())]
    NoBackups { dir: PathBuf },

    #[error("failed to list backups in {}: {source}", .dir.display())]
    Discover { dir: PathBuf, source: io::Error },

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("backup {} is corrupted ({violations} dangling references)", .path.display())]
    Corrupted { path: PathBuf, violations: usize },

    #[error(transparent)]
    Merge(#[from] MergeError),
}

impl ConsolidateError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NoBackups { .. } => ErrorCode::NoBackupsFound,
            Self::Discover { .. } => ErrorCode::BackupNotFound,
            Self::Backup(err) => err.code(),
            Self::Corrupted { .. } => ErrorCode::CorruptedBackup,
            Self::Merge(err) => err.code(),
        }
    }
}

/// A backup read from disk together with its validation verdict.
#[derive(Debug, Clone)]
pub struct LoadedBackup {
    pub path: PathBuf,
    pub backup: Backup,
    pub report: ValidationReport,
}

/// Backups ready to fold, plus what was set aside while loading them.
#[derive(Debug, Default)]
pub struct LoadedSet {
    /// One backup per date, ascending.
    pub backups: Vec<LoadedBackup>,
    /// Files skipped under [`UnreadablePolicy::Skip`].
    pub skipped: Vec<PathBuf>,
    /// Files replaced by a later file declaring the same date.
    pub superseded: Vec<PathBuf>,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsolidationReport {
    /// Files merged, in fold order.
    pub merged: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub superseded: Vec<PathBuf>,
    /// Merged files with at least one dangling reference.
    pub corrupted: Vec<PathBuf>,
    pub stats: MergeStats,
}

/// The consolidated backup and its run summary.
#[derive(Debug, Clone)]
pub struct Consolidation {
    pub backup: Backup,
    pub report: ConsolidationReport,
}

/// Match a file name against a pattern with at most one `*`.
///
/// A pattern without `*` must equal the name. Additional `*` characters after
/// the first are matched literally.
#[must_use]
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == name,
        Some((prefix, suffix)) => {
            name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
        }
    }
}

/// List regular files in `dir` whose name matches `pattern`, sorted by name.
///
/// # Errors
///
/// Returns [`ConsolidateError::Discover`] when `dir` cannot be listed.
pub fn discover_backups(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, ConsolidateError> {
    let discover_err = |source| ConsolidateError::Discover {
        dir: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(discover_err)? {
        let entry = entry.map_err(discover_err)?;
        if !entry.file_type().map_err(discover_err)?.is_file() {
            continue;
        }
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| matches_pattern(pattern, name))
        {
            paths.push(entry.path());
        }
    }
    paths.sort();

    info!(dir = %dir.display(), pattern, count = paths.len(), "discovered backups");
    Ok(paths)
}

/// Read and validate every path, keeping one backup per date.
///
/// Paths are processed in the given order; when two files declare the same
/// date the later one wins.
///
/// # Errors
///
/// - [`ConsolidateError::Backup`] for an unreadable file under
///   [`UnreadablePolicy::Abort`].
/// - [`ConsolidateError::Corrupted`] when `halt_on_corruption` is set and a
///   file fails validation.
pub fn load_backups(
    paths: &[PathBuf],
    options: &ConsolidateOptions,
) -> Result<LoadedSet, ConsolidateError> {
    let mut by_date: BTreeMap<Timestamp, LoadedBackup> = BTreeMap::new();
    let mut set = LoadedSet::default();

    for path in paths {
        let backup = match read_backup(path) {
            Ok(backup) => backup,
            Err(err) if options.on_unreadable == UnreadablePolicy::Skip => {
                error!(path = %path.display(), "skipping backup: {err}");
                set.skipped.push(path.clone());
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        debug!(path = %path.display(), "validating backup");
        let report = validate_backup(&backup);
        if report.is_corrupted() {
            if options.halt_on_corruption {
                return Err(ConsolidateError::Corrupted {
                    path: path.clone(),
                    violations: report.violations.len(),
                });
            }
            warn!(
                path = %path.display(),
                violations = report.violations.len(),
                "backup is corrupted, merging it anyway"
            );
        }

        let loaded = LoadedBackup {
            path: path.clone(),
            backup,
            report,
        };
        if let Some(previous) = by_date.insert(loaded.backup.date, loaded) {
            warn!(
                date = %format_timestamp(&previous.backup.date),
                replaced = %previous.path.display(),
                by = %path.display(),
                "two backups share a date, keeping the later file"
            );
            set.superseded.push(previous.path);
        }
    }

    set.backups = by_date.into_values().collect();
    Ok(set)
}

/// Left-fold [`merge_backups`] over `backups` starting from
/// [`Backup::sentinel`].
///
/// `backups` must already be in ascending date order.
///
/// # Errors
///
/// Propagates the first [`MergeError`].
pub fn fold_backups<'a>(
    backups: impl IntoIterator<Item = &'a Backup>,
    decisions: &mut DecisionStore,
    resolver: &mut dyn ConflictResolver,
) -> Result<(Backup, MergeStats), MergeError> {
    let mut accumulated = Backup::sentinel();
    let mut stats = MergeStats::default();

    for backup in backups {
        let outcome = merge_backups(&accumulated, backup, decisions, resolver)?;
        stats.absorb(outcome.stats);
        accumulated = outcome.backup;
    }

    Ok((accumulated, stats))
}

/// Consolidate every backup in `dir` matching `options.pattern`.
///
/// # Errors
///
/// Returns [`ConsolidateError::NoBackups`] when nothing is left to merge,
/// plus anything [`discover_backups`], [`load_backups`] or the fold report.
pub fn consolidate_dir(
    dir: &Path,
    options: &ConsolidateOptions,
    decisions: &mut DecisionStore,
    resolver: &mut dyn ConflictResolver,
) -> Result<Consolidation, ConsolidateError> {
    let paths = discover_backups(dir, &options.pattern)?;
    let loaded = load_backups(&paths, options)?;
    if loaded.backups.is_empty() {
        return Err(ConsolidateError::NoBackups {
            dir: dir.to_path_buf(),
        });
    }

    info!(backups = loaded.backups.len(), "consolidating backups");
    let (backup, stats) = fold_backups(
        loaded.backups.iter().map(|loaded| &loaded.backup),
        decisions,
        resolver,
    )?;
    info!(
        date = %format_timestamp(&backup.date),
        completed_activities = backup.completed_activities.len(),
        "consolidating backups completed"
    );

    let report = ConsolidationReport {
        corrupted: loaded
            .backups
            .iter()
            .filter(|loaded| loaded.report.is_corrupted())
            .map(|loaded| loaded.path.clone())
            .collect(),
        merged: loaded.backups.into_iter().map(|loaded| loaded.path).collect(),
        skipped: loaded.skipped,
        superseded: loaded.superseded,
        stats,
    };

    Ok(Consolidation { backup, report })
}
