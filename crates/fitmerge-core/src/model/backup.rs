use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::entity::{Activity, CompletedActivity, Shortcut, Trainable, Training};
use super::timestamp::{Timestamp, format_timestamp, serde_ts};

/// One timestamped snapshot of the tracked dataset.
///
/// Backups are values: merging never mutates an input, it builds a new
/// `Backup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(with = "serde_ts")]
    pub date: Timestamp,
    pub activities: Vec<Activity>,
    pub completed_activities: Vec<CompletedActivity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trainings: Option<Vec<Training>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trainables: Option<Vec<Trainable>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcuts: Option<Vec<Shortcut>>,
}

/// Inclusive `[lower, upper]` window spanned by a backup's completed activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub lower: Timestamp,
    pub upper: Timestamp,
}

impl TimeRange {
    /// True when `ts` falls before the window.
    #[must_use]
    pub fn predates(&self, ts: &Timestamp) -> bool {
        *ts < self.lower
    }
}

/// The time range of a backup with zero completed activities was requested.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("backup dated {} has no completed activities; its time range is undefined", format_timestamp(.date))]
pub struct UndefinedTimeRange {
    pub date: Timestamp,
}

impl Backup {
    /// An empty backup dated `date`, used as the seed of a consolidation fold.
    #[must_use]
    pub const fn empty(date: Timestamp) -> Self {
        Self {
            date,
            activities: Vec::new(),
            completed_activities: Vec::new(),
            trainings: Some(Vec::new()),
            trainables: Some(Vec::new()),
            shortcuts: Some(Vec::new()),
        }
    }

    /// The fold seed: an empty backup older than any real one.
    #[must_use]
    pub const fn sentinel() -> Self {
        Self::empty(DateTime::<chrono::Utc>::MIN_UTC)
    }

    /// Min and max `date` over all completed activities.
    ///
    /// # Errors
    ///
    /// Returns [`UndefinedTimeRange`] when the backup has no completed
    /// activities.
    pub fn time_range(&self) -> Result<TimeRange, UndefinedTimeRange> {
        let mut dates = self.completed_activities.iter().map(|done| done.date);
        let first = dates.next().ok_or(UndefinedTimeRange { date: self.date })?;

        let (lower, upper) = dates.fold((first, first), |(lower, upper), date| {
            (lower.min(date), upper.max(date))
        });

        Ok(TimeRange { lower, upper })
    }

    /// Look up an activity by id.
    #[must_use]
    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|activity| activity.id == id)
    }

    #[must_use]
    pub fn trainings(&self) -> &[Training] {
        self.trainings.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn trainables(&self) -> &[Trainable] {
        self.trainables.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn shortcuts(&self) -> &[Shortcut] {
        self.shortcuts.as_deref().unwrap_or_default()
    }
}
