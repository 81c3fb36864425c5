//! Pairwise backup merge.
//!
//! Two backups are ordered by `date` into `earliest` and `latest`, then each
//! collection is combined according to how the app treats it:
//!
//! | Collection            | Policy                                            |
//! |-----------------------|---------------------------------------------------|
//! | activities            | union by id, `latest` wins                        |
//! | trainables            | union by id, `latest` wins                        |
//! | completed activities  | union by id, `latest` wins, ambiguity protocol    |
//! | trainings             | `latest` wholesale                                |
//! | shortcuts             | `latest` wholesale                                |
//!
//! `last_modified` is never compared. Presence in `latest` is what wins.
//!
//! # Ambiguity protocol
//!
//! A completed activity present in `earliest` but absent from `latest` is
//! either older than anything `latest` covers (it was pruned by the app and
//! is kept silently), or it falls inside `latest`'s time range. In the second
//! case the merge consults the [`DecisionStore`], and only when no decision
//! exists asks the [`ConflictResolver`]. Remembered answers are written to
//! the store before they are applied.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::decision::{DecisionError, DecisionStore};
use crate::error::ErrorCode;
use crate::model::{
    Activity, Backup, CompletedActivity, Record, Trainable, UndefinedTimeRange, format_timestamp,
};
use crate::resolve::{AmbiguousRecord, ConflictResolver, ResolveError, Verdict};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Counters describing how earliest-only completed activities were handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Kept because they predate the later backup's time range.
    pub kept_pruned: usize,
    /// Kept by a recorded or freshly made decision.
    pub kept_by_decision: usize,
    /// Dropped by a recorded or freshly made decision.
    pub dropped_by_decision: usize,
    /// Records the resolver was asked about.
    pub resolved: usize,
}

impl MergeStats {
    /// Accumulate another step's counters into `self`.
    pub const fn absorb(&mut self, other: Self) {
        self.kept_pruned += other.kept_pruned;
        self.kept_by_decision += other.kept_by_decision;
        self.dropped_by_decision += other.dropped_by_decision;
        self.resolved += other.resolved;
    }
}

/// A merged backup plus what happened while producing it.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub backup: Backup,
    pub stats: MergeStats,
}

/// Failures that stop a merge.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The later backup has no completed activities to derive a window from.
    #[error(transparent)]
    UndefinedTimeRange(#[from] UndefinedTimeRange),

    /// A decision could not be persisted.
    #[error(transparent)]
    Decision(#[from] DecisionError),

    /// The resolver could not produce a verdict.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl MergeError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UndefinedTimeRange(_) => ErrorCode::UndefinedTimeRange,
            Self::Decision(err) => err.code(),
            Self::Resolve(err) => err.code(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Merge two backups into a new one dated like the later of the two.
///
/// Neither input is modified. When both share a date, `b` is treated as the
/// earlier one.
///
/// # Errors
///
/// - [`MergeError::UndefinedTimeRange`] when the later backup has no
///   completed activities. Checked before any record is examined.
/// - [`MergeError::Resolve`] when the resolver cannot decide.
/// - [`MergeError::Decision`] when a remembered verdict cannot be saved.
pub fn merge_backups(
    a: &Backup,
    b: &Backup,
    decisions: &mut DecisionStore,
    resolver: &mut dyn ConflictResolver,
) -> Result<MergeOutcome, MergeError> {
    let (earliest, latest) = if a.date < b.date { (a, b) } else { (b, a) };

    info!(
        earliest = %format_timestamp(&earliest.date),
        latest = %format_timestamp(&latest.date),
        "merging backups"
    );

    let mut stats = MergeStats::default();
    let completed_activities =
        merge_completed_activities(earliest, latest, decisions, resolver, &mut stats)?;

    let backup = Backup {
        date: latest.date,
        activities: merge_activities(&earliest.activities, &latest.activities),
        completed_activities,
        trainings: latest.trainings.clone(),
        trainables: Some(merge_trainables(
            earliest.trainables.as_deref(),
            latest.trainables.as_deref(),
        )),
        shortcuts: latest.shortcuts.clone(),
    };

    debug!(
        activities = backup.activities.len(),
        completed_activities = backup.completed_activities.len(),
        kept_pruned = stats.kept_pruned,
        kept_by_decision = stats.kept_by_decision,
        dropped_by_decision = stats.dropped_by_decision,
        "merging backups completed"
    );

    Ok(MergeOutcome { backup, stats })
}

/// Union of two collections keyed by id.
///
/// Every `latest` record is kept in its original order, followed by the
/// `earliest` records whose id `latest` does not have.
#[must_use]
pub fn union_latest_wins<T: Record + Clone>(earliest: &[T], latest: &[T]) -> Vec<T> {
    let seen: HashSet<&str> = latest.iter().map(T::id).collect();
    latest
        .iter()
        .chain(earliest.iter().filter(|record| !seen.contains(record.id())))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Per-collection merges
// ---------------------------------------------------------------------------

fn merge_activities(earliest: &[Activity], latest: &[Activity]) -> Vec<Activity> {
    union_latest_wins(earliest, latest)
}

/// A missing `latest` collection inherits `earliest`'s.
fn merge_trainables(earliest: Option<&[Trainable]>, latest: Option<&[Trainable]>) -> Vec<Trainable> {
    let earliest = earliest.unwrap_or_default();
    latest.map_or_else(|| earliest.to_vec(), |latest| union_latest_wins(earliest, latest))
}

fn merge_completed_activities(
    earliest: &Backup,
    latest: &Backup,
    decisions: &mut DecisionStore,
    resolver: &mut dyn ConflictResolver,
    stats: &mut MergeStats,
) -> Result<Vec<CompletedActivity>, MergeError> {
    let window = latest.time_range()?;

    let in_latest: HashSet<&str> = latest
        .completed_activities
        .iter()
        .map(CompletedActivity::id)
        .collect();
    let mut merged = latest.completed_activities.clone();

    for old in &earliest.completed_activities {
        if in_latest.contains(old.id.as_str()) {
            continue;
        }

        if window.predates(&old.date) {
            stats.kept_pruned += 1;
            merged.push(old.clone());
            continue;
        }

        info!(id = %old.id, "earliest backup contains a completed activity the latest doesn't");

        let verdict = if let Some(decision) = decisions.find(&old.id) {
            debug!(id = %old.id, must_be_deleted = decision.must_be_deleted, "found decision");
            Verdict::from_must_be_deleted(decision.must_be_deleted)
        } else {
            let activity_name = earliest
                .activity(&old.activity_id)
                .or_else(|| latest.activity(&old.activity_id))
                .map(|activity| activity.name.as_str());

            let resolution = resolver.resolve(&AmbiguousRecord {
                completed: old,
                activity_name,
                window,
            })?;
            stats.resolved += 1;

            if resolution.remember {
                decisions.decide(&old.id, Utc::now(), resolution.verdict.must_be_deleted())?;
            }
            info!(id = %old.id, verdict = ?resolution.verdict, "decision made");
            resolution.verdict
        };

        match verdict {
            Verdict::Keep => {
                stats.kept_by_decision += 1;
                merged.push(old.clone());
            }
            Verdict::Delete => stats.dropped_by_decision += 1,
        }
    }

    Ok(merged)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
