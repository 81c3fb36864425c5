//! Shared builders for fitmerge-core integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use fitmerge_core::model::{
    Activity, Backup, CompletedActivity, Duration, Intensity, Timestamp, Trainable,
};
use fitmerge_core::resolve::{AmbiguousRecord, ConflictResolver, Resolution, ResolveError, Verdict};

/// Midnight UTC on the given day of January 2020.
pub fn day(d: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2020, 1, d, 0, 0, 0)
        .single()
        .expect("valid date")
}

pub fn activity(id: &str, name: &str) -> Activity {
    Activity {
        id: id.to_string(),
        name: name.to_string(),
        other_names: vec![],
        last_modified: None,
        trainable_ids: None,
        notes: None,
    }
}

pub fn done(id: &str, activity_id: &str, date: Timestamp) -> CompletedActivity {
    CompletedActivity {
        id: id.to_string(),
        activity_id: activity_id.to_string(),
        date,
        duration: Duration::Medium,
        intensity: Intensity::Medium,
        notes: String::new(),
        last_modified: None,
    }
}

pub fn trainable(id: &str, name: &str) -> Trainable {
    Trainable {
        id: id.to_string(),
        name: name.to_string(),
        notes: String::new(),
        last_modified: None,
    }
}

/// A backup with a single `act_1 = Run` activity and the given log.
pub fn backup(date: Timestamp, completed: Vec<CompletedActivity>) -> Backup {
    let mut backup = Backup::empty(date);
    backup.activities = vec![activity("act_1", "Run")];
    backup.completed_activities = completed;
    backup
}

pub fn completed_ids(backup: &Backup) -> Vec<&str> {
    backup
        .completed_activities
        .iter()
        .map(|done| done.id.as_str())
        .collect()
}

/// Serialize `backup` as `name` inside `dir`.
pub fn write_backup_file(dir: &Path, name: &str, backup: &Backup) -> PathBuf {
    let path = dir.join(name);
    let body = serde_json::to_string_pretty(backup).expect("serialize backup");
    std::fs::write(&path, body).expect("write backup file");
    path
}

/// Answers from a fixed script and records every question.
///
/// Panics when asked more questions than it has answers for.
#[derive(Debug, Default)]
pub struct ScriptedResolver {
    answers: VecDeque<Verdict>,
    pub asked: Vec<String>,
}

impl ScriptedResolver {
    pub fn new(answers: impl IntoIterator<Item = Verdict>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }
}

impl ConflictResolver for ScriptedResolver {
    fn resolve(&mut self, record: &AmbiguousRecord<'_>) -> Result<Resolution, ResolveError> {
        self.asked.push(record.completed.id.clone());
        let verdict = self
            .answers
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected question about {}", record.completed.id));
        Ok(Resolution {
            verdict,
            remember: true,
        })
    }
}
