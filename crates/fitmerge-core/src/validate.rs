//! Referential-integrity checks for a single backup.
//!
//! Every cross-entity reference inside a backup should resolve within the
//! same backup:
//!
//! 1. **Activity → Trainable** — each `trainableIds` entry names a trainable.
//! 2. **CompletedActivity → Activity** — each `activityId` names an activity.
//! 3. **Training → Activity** — each training step names an activity.
//! 4. **Shortcut → Activity** — each shortcut names an activity.
//!
//! Violations are advisory. [`validate_backup`] reports and logs them; the
//! caller decides whether a corrupted backup stops the run.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::model::{Backup, Record};

/// A single dangling reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// An activity points to a trainable missing from the backup.
    DanglingTrainable {
        activity_id: String,
        trainable_id: String,
    },
    /// A completed activity points to an activity missing from the backup.
    DanglingActivity {
        completed_activity_id: String,
        activity_id: String,
    },
    /// A training step points to an activity missing from the backup.
    DanglingTrainingStep {
        training_id: String,
        activity_id: String,
    },
    /// A shortcut points to an activity missing from the backup.
    DanglingShortcut { activity_id: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingTrainable {
                activity_id,
                trainable_id,
            } => write!(
                f,
                "Activity '{activity_id}' points to a Trainable '{trainable_id}' which is not present in the backup"
            ),
            Self::DanglingActivity {
                completed_activity_id,
                activity_id,
            } => write!(
                f,
                "CompletedActivity '{completed_activity_id}' points to an Activity '{activity_id}' which is not present in the backup"
            ),
            Self::DanglingTrainingStep {
                training_id,
                activity_id,
            } => write!(
                f,
                "Training '{training_id}' points to an Activity '{activity_id}' which is not present in the backup"
            ),
            Self::DanglingShortcut { activity_id } => write!(
                f,
                "the Activity '{activity_id}' is used in the shortcuts but this Activity is not present in the backup"
            ),
        }
    }
}

/// Outcome of validating one backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Dangling references, in check order.
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// A backup is corrupted when it has at least one dangling reference.
    #[must_use]
    pub fn is_corrupted(&self) -> bool {
        !self.violations.is_empty()
    }
}

fn ids<T: Record>(records: &[T]) -> HashSet<&str> {
    records.iter().map(T::id).collect()
}

/// Check the referential integrity of `backup`.
///
/// Each violation is logged at `warn` level with a `corrupted-backup:`
/// prefix. Never fails; integrity problems are only reported.
#[must_use]
pub fn validate_backup(backup: &Backup) -> ValidationReport {
    let trainables = ids(backup.trainables());
    let activities = ids(&backup.activities);

    let mut violations = Vec::new();

    for activity in &backup.activities {
        for trainable_id in activity.trainable_ids() {
            if !trainables.contains(trainable_id) {
                violations.push(Violation::DanglingTrainable {
                    activity_id: activity.id.clone(),
                    trainable_id: trainable_id.to_string(),
                });
            }
        }
    }

    for done in &backup.completed_activities {
        if !activities.contains(done.activity_id.as_str()) {
            violations.push(Violation::DanglingActivity {
                completed_activity_id: done.id.clone(),
                activity_id: done.activity_id.clone(),
            });
        }
    }

    for training in backup.trainings() {
        for step in &training.activities {
            if !activities.contains(step.activity_id.as_str()) {
                violations.push(Violation::DanglingTrainingStep {
                    training_id: training.id.clone(),
                    activity_id: step.activity_id.clone(),
                });
            }
        }
    }

    for shortcut in backup.shortcuts() {
        if !activities.contains(shortcut.as_str()) {
            violations.push(Violation::DanglingShortcut {
                activity_id: shortcut.clone(),
            });
        }
    }

    for violation in &violations {
        warn!("corrupted-backup: {violation}");
    }

    ValidationReport { violations }
}
