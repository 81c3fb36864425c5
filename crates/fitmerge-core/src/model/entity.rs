//! Records carried by a backup.
//!
//! Identifiers are opaque strings minted by the mobile app; nothing in this
//! crate generates them. Field names on the wire are camelCase.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::timestamp::{Timestamp, serde_ts, serde_ts_option};

pub type ActivityId = String;
pub type CompletedActivityId = String;
pub type TrainableId = String;
pub type TrainingId = String;

/// A shortcut is the id of an activity pinned in the app's UI.
pub type Shortcut = ActivityId;

/// Anything stored in a backup collection keyed by its own id.
pub trait Record {
    /// Entity kind used in diagnostics (`Activity`, `Trainable`, ...).
    const KIND: &'static str;

    fn id(&self) -> &str;
}

/// How long a completed activity lasted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Duration {
    Short,
    Medium,
    Long,
}

impl Duration {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How hard a completed activity was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reusable exercise definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub name: String,
    pub other_names: Vec<String>,
    #[serde(default, with = "serde_ts_option", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trainable_ids: Option<Vec<TrainableId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Activity {
    /// Trainables referenced by this activity (empty when the field is absent).
    pub fn trainable_ids(&self) -> impl Iterator<Item = &str> {
        self.trainable_ids.iter().flatten().map(String::as_str)
    }
}

impl Record for Activity {
    const KIND: &'static str = "Activity";

    fn id(&self) -> &str {
        &self.id
    }
}

/// One logged occurrence of an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedActivity {
    pub id: CompletedActivityId,
    pub activity_id: ActivityId,
    #[serde(with = "serde_ts")]
    pub date: Timestamp,
    pub duration: Duration,
    pub intensity: Intensity,
    pub notes: String,
    #[serde(default, with = "serde_ts_option", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

impl Record for CompletedActivity {
    const KIND: &'static str = "CompletedActivity";

    fn id(&self) -> &str {
        &self.id
    }
}

/// A tag or piece of equipment an activity trains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trainable {
    pub id: TrainableId,
    pub name: String,
    pub notes: String,
    #[serde(default, with = "serde_ts_option", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

impl Record for Trainable {
    const KIND: &'static str = "Trainable";

    fn id(&self) -> &str {
        &self.id
    }
}

/// One step of a training template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingActivity {
    pub activity_id: ActivityId,
    pub duration: Duration,
    pub intensity: Intensity,
}

/// A composite workout template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Training {
    pub id: TrainingId,
    pub name: String,
    pub activities: Vec<TrainingActivity>,
    #[serde(default, with = "serde_ts_option", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
    #[serde(default, rename = "isOneOff", skip_serializing_if = "Option::is_none")]
    pub is_oneoff: Option<bool>,
}

impl Record for Training {
    const KIND: &'static str = "Training";

    fn id(&self) -> &str {
        &self.id
    }
}
