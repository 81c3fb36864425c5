//! SQLite export of a single backup.
//!
//! The schema mirrors the backup collections. Tables carry no foreign keys
//! because a corrupted backup must still export; use the `history` view for a
//! joined, date-ordered log of completed activities.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};
use tracing::{debug, info};

use super::{ExportError, join_list};
use crate::model::{Backup, format_timestamp};

/// Tables and the `history` view.
pub const EXPORT_SCHEMA_SQL: &str = r"
CREATE TABLE activities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    other_names TEXT NOT NULL,
    last_modified TEXT,
    trainable_ids TEXT NOT NULL,
    notes TEXT
);

CREATE TABLE completed_activities (
    id TEXT PRIMARY KEY,
    activity_id TEXT NOT NULL,
    date TEXT NOT NULL,
    duration TEXT NOT NULL CHECK (duration IN ('short', 'medium', 'long')),
    intensity TEXT NOT NULL CHECK (intensity IN ('low', 'medium', 'high')),
    notes TEXT NOT NULL,
    last_modified TEXT
);

CREATE TABLE trainables (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    notes TEXT NOT NULL,
    last_modified TEXT
);

CREATE TABLE trainings (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    last_modified TEXT,
    is_oneoff INTEGER CHECK (is_oneoff IS NULL OR is_oneoff IN (0, 1))
);

CREATE TABLE training_activities (
    training_id TEXT NOT NULL,
    position INTEGER NOT NULL,
    activity_id TEXT NOT NULL,
    duration TEXT NOT NULL,
    intensity TEXT NOT NULL,
    PRIMARY KEY (training_id, position)
);

CREATE INDEX idx_completed_activities_date ON completed_activities(date);

CREATE VIEW history AS
SELECT
    c.date AS date,
    a.name AS activity,
    c.duration AS duration,
    c.intensity AS intensity,
    c.notes AS notes,
    c.id AS completed_activity_id,
    c.activity_id AS activity_id
FROM completed_activities c
LEFT JOIN activities a ON a.id = c.activity_id
ORDER BY c.date;
";

/// Write `backup` to `<output_dir>/<stem>.sqlite`, replacing any existing
/// file, and return its path.
///
/// All rows are inserted in a single transaction.
///
/// # Errors
///
/// Returns [`ExportError::Io`] when the old file cannot be removed and
/// [`ExportError::Sqlite`] for any database failure.
pub fn backup_to_sqlite(
    backup: &Backup,
    stem: &str,
    output_dir: &Path,
) -> Result<PathBuf, ExportError> {
    let path = output_dir.join(format!("{stem}.sqlite"));
    let io_err = |source| ExportError::Io {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(output_dir).map_err(io_err)?;
    match fs::remove_file(&path) {
        Ok(()) => debug!(path = %path.display(), "replaced existing export"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(err)),
    }

    let mut conn = Connection::open(&path).map_err(|source| ExportError::Sqlite {
        path: path.clone(),
        source,
    })?;
    write_rows(&mut conn, backup).map_err(|source| ExportError::Sqlite {
        path: path.clone(),
        source,
    })?;

    info!(
        path = %path.display(),
        completed_activities = backup.completed_activities.len(),
        "wrote sqlite export"
    );
    Ok(path)
}

fn write_rows(conn: &mut Connection, backup: &Backup) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(EXPORT_SCHEMA_SQL)?;

    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO activities
                (id, name, other_names, last_modified, trainable_ids, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for activity in &backup.activities {
            stmt.execute(params![
                activity.id,
                activity.name,
                join_list(&activity.other_names),
                activity.last_modified.as_ref().map(format_timestamp),
                join_list(activity.trainable_ids.as_deref().unwrap_or_default()),
                activity.notes,
            ])?;
        }

        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO completed_activities
                (id, activity_id, date, duration, intensity, notes, last_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for done in &backup.completed_activities {
            stmt.execute(params![
                done.id,
                done.activity_id,
                format_timestamp(&done.date),
                done.duration.as_str(),
                done.intensity.as_str(),
                done.notes,
                done.last_modified.as_ref().map(format_timestamp),
            ])?;
        }

        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO trainables (id, name, notes, last_modified)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for trainable in backup.trainables() {
            stmt.execute(params![
                trainable.id,
                trainable.name,
                trainable.notes,
                trainable.last_modified.as_ref().map(format_timestamp),
            ])?;
        }

        let mut training_stmt = tx.prepare(
            "INSERT OR REPLACE INTO trainings (id, name, last_modified, is_oneoff)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        let mut step_stmt = tx.prepare(
            "INSERT OR REPLACE INTO training_activities
                (training_id, position, activity_id, duration, intensity)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for training in backup.trainings() {
            training_stmt.execute(params![
                training.id,
                training.name,
                training.last_modified.as_ref().map(format_timestamp),
                training.is_oneoff,
            ])?;
            for (position, step) in training.activities.iter().enumerate() {
                step_stmt.execute(params![
                    training.id,
                    position,
                    step.activity_id,
                    step.duration.as_str(),
                    step.intensity.as_str(),
                ])?;
            }
        }
    }

    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Activity, CompletedActivity, Duration, Intensity, Timestamp, Training, TrainingActivity,
    };
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2020, 1, d, 0, 0, 0).single().expect("valid date")
    }

    fn sample() -> Backup {
        let mut backup = Backup::empty(day(11));
        backup.activities = vec![Activity {
            id: "act_1".to_string(),
            name: "Run".to_string(),
            other_names: vec![],
            last_modified: Some(day(1)),
            trainable_ids: None,
            notes: Some("outdoors".to_string()),
        }];
        backup.completed_activities = [("cpa_2", 9), ("cpa_1", 3)]
            .into_iter()
            .map(|(id, d)| CompletedActivity {
                id: id.to_string(),
                activity_id: "act_1".to_string(),
                date: day(d),
                duration: Duration::Medium,
                intensity: Intensity::Low,
                notes: String::new(),
                last_modified: None,
            })
            .collect();
        backup.trainings = Some(vec![Training {
            id: "trn_1".to_string(),
            name: "Legs".to_string(),
            activities: vec![
                TrainingActivity {
                    activity_id: "act_1".to_string(),
                    duration: Duration::Short,
                    intensity: Intensity::High,
                },
                TrainingActivity {
                    activity_id: "act_404".to_string(),
                    duration: Duration::Long,
                    intensity: Intensity::Low,
                },
            ],
            last_modified: None,
            is_oneoff: None,
        }]);
        backup
    }

    #[test]
    fn history_view_joins_names_in_date_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = backup_to_sqlite(&sample(), "backup", dir.path()).expect("export");
        assert_eq!(path, dir.path().join("backup.sqlite"));

        let conn = Connection::open(&path).expect("open");
        let mut stmt = conn
            .prepare("SELECT completed_activity_id, activity FROM history")
            .expect("prepare");
        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("rows");
        assert_eq!(
            rows,
            vec![
                ("cpa_1".to_string(), "Run".to_string()),
                ("cpa_2".to_string(), "Run".to_string()),
            ]
        );

        let steps: i64 = conn
            .query_row("SELECT COUNT(*) FROM training_activities", [], |row| row.get(0))
            .expect("count");
        assert_eq!(steps, 2);
    }

    #[test]
    fn existing_export_is_replaced() {
        let dir = tempfile::tempdir().expect("tempdir");
        backup_to_sqlite(&sample(), "backup", dir.path()).expect("first export");

        let mut smaller = sample();
        smaller.completed_activities.truncate(1);
        let path = backup_to_sqlite(&smaller, "backup", dir.path()).expect("second export");

        let conn = Connection::open(&path).expect("open");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM completed_activities", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }
}
