//! Durable record of how past ambiguous deletions were resolved.
//!
//! The store is a map from completed-activity id to the latest [`Decision`]
//! about it, backed by a flat file with the columns
//! `id,reviewed_at,must_be_deleted`. Rows are kept sorted by `reviewed_at`
//! ascending.
//!
//! Every [`DecisionStore::decide`] rewrites the whole file through a
//! temporary sibling and a rename, so an interrupted run loses at most the
//! decision being written and never one committed earlier.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ErrorCode;
use crate::model::{CompletedActivityId, Timestamp, format_timestamp, parse_timestamp};
use crate::tabular::{self, Row};

/// Column names of the decision file, in order.
pub const HEADER: [&str; 3] = ["id", "reviewed_at", "must_be_deleted"];

/// Default decision file name, relative to the working directory.
pub const DEFAULT_DECISIONS_FILE: &str = "decisions__deleted-completed-activities.csv";

/// An operator's answer about one ambiguous completed activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub id: CompletedActivityId,
    #[serde(with = "crate::model::timestamp::serde_ts")]
    pub reviewed_at: Timestamp,
    pub must_be_deleted: bool,
}

/// Failures while loading or persisting decisions.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("failed to read decision file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write decision file {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("malformed decision file {} at line {line}: {reason}", .path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl DecisionError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } | Self::Malformed { .. } => ErrorCode::DecisionFileMalformed,
            Self::Write { .. } => ErrorCode::DecisionFileWriteFailed,
        }
    }
}

/// In-memory decisions bound to the file they persist to.
#[derive(Debug, Clone)]
pub struct DecisionStore {
    path: PathBuf,
    decisions: HashMap<CompletedActivityId, Decision>,
}

impl DecisionStore {
    /// An empty store that will save to `path`. Nothing is written until the
    /// first [`decide`](Self::decide).
    #[must_use]
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            decisions: HashMap::new(),
        }
    }

    /// Load decisions from `path`. A missing file yields an empty store bound
    /// to that path. When a file repeats an id, the row with the latest
    /// `reviewed_at` wins.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::Read`] for I/O failures and
    /// [`DecisionError::Malformed`] for rows that do not decode.
    pub fn load(path: &Path) -> Result<Self, DecisionError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no decision file yet");
                return Ok(Self::empty(path));
            }
            Err(source) => {
                return Err(DecisionError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let malformed = |line: usize, reason: String| DecisionError::Malformed {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let rows = tabular::parse_rows(&content).map_err(|err| malformed(err.line, err.to_string()))?;

        let mut store = Self::empty(path);
        let mut rows = rows.into_iter();
        match rows.next() {
            Some(header) if header.fields == HEADER => {}
            Some(header) => {
                return Err(malformed(
                    header.line,
                    format!("expected header '{}'", HEADER.join(",")),
                ));
            }
            None => return Ok(store),
        }

        for row in rows {
            let decision = decode_row(&row).map_err(|reason| malformed(row.line, reason))?;
            store.insert(decision);
        }

        info!(path = %path.display(), decisions = store.len(), "loaded decisions");
        Ok(store)
    }

    /// Path the store persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// The current decision for `id`, if any.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Decision> {
        self.decisions.get(id)
    }

    /// Insert or replace the decision for `id`, then persist the full set.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::Write`] if the file cannot be saved. The
    /// in-memory store already holds the new decision in that case.
    pub fn decide(
        &mut self,
        id: &str,
        reviewed_at: Timestamp,
        must_be_deleted: bool,
    ) -> Result<(), DecisionError> {
        self.decisions.insert(
            id.to_string(),
            Decision {
                id: id.to_string(),
                reviewed_at,
                must_be_deleted,
            },
        );
        self.save()
    }

    /// All decisions ordered by `reviewed_at`, then id.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Decision> {
        let mut decisions: Vec<&Decision> = self.decisions.values().collect();
        decisions.sort_by(|a, b| {
            a.reviewed_at
                .cmp(&b.reviewed_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        decisions
    }

    /// Rewrite the backing file with every decision.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError::Write`] on I/O failure.
    pub fn save(&self) -> Result<(), DecisionError> {
        let write_err = |source| DecisionError::Write {
            path: self.path.clone(),
            source,
        };

        let mut body = Vec::new();
        tabular::write_row(&mut body, &HEADER).map_err(write_err)?;
        for decision in self.sorted() {
            let row = [
                decision.id.clone(),
                format_timestamp(&decision.reviewed_at),
                decision.must_be_deleted.to_string(),
            ];
            tabular::write_row(&mut body, &row).map_err(write_err)?;
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, body).map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(write_err)?;

        debug!(path = %self.path.display(), decisions = self.len(), "saved decisions");
        Ok(())
    }

    fn insert(&mut self, decision: Decision) {
        match self.decisions.get(&decision.id) {
            Some(existing) if existing.reviewed_at > decision.reviewed_at => {}
            _ => {
                self.decisions.insert(decision.id.clone(), decision);
            }
        }
    }
}

fn decode_row(row: &Row) -> Result<Decision, String> {
    let [id, reviewed_at, must_be_deleted] = row.fields.as_slice() else {
        return Err(format!("expected 3 columns, found {}", row.fields.len()));
    };

    if id.is_empty() {
        return Err("empty id".to_string());
    }

    let reviewed_at = parse_timestamp(reviewed_at).map_err(|err| err.to_string())?;
    let must_be_deleted = parse_bool(must_be_deleted)
        .ok_or_else(|| format!("invalid must_be_deleted value '{must_be_deleted}'"))?;

    Ok(Decision {
        id: id.clone(),
        reviewed_at,
        must_be_deleted,
    })
}

// Files written by earlier tooling use `True`/`False`.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
