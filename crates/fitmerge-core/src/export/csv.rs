//! One CSV file per backup collection.
//!
//! Files are named `<prefix>__<collection>.csv`. List-valued columns are
//! joined with `|`; training steps render as `activity_id:duration:intensity`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::{ExportError, join_list};
use crate::model::{Backup, Timestamp, TrainingActivity, format_timestamp};
use crate::tabular::write_row;

const ACTIVITIES_HEADER: [&str; 6] = [
    "id",
    "name",
    "other_names",
    "last_modified",
    "trainable_ids",
    "notes",
];
const COMPLETED_HEADER: [&str; 7] = [
    "id",
    "activity_id",
    "date",
    "duration",
    "intensity",
    "notes",
    "last_modified",
];
const TRAINABLES_HEADER: [&str; 4] = ["id", "name", "notes", "last_modified"];
const TRAININGS_HEADER: [&str; 5] = ["id", "name", "activities", "last_modified", "is_oneoff"];

fn optional_ts(ts: Option<&Timestamp>) -> String {
    ts.map(format_timestamp).unwrap_or_default()
}

fn step(step: &TrainingActivity) -> String {
    format!("{}:{}:{}", step.activity_id, step.duration, step.intensity)
}

fn render<const N: usize>(header: [&str; N], rows: impl IntoIterator<Item = [String; N]>) -> Vec<u8> {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_row(&mut buf, &header);
    for row in rows {
        let _ = write_row(&mut buf, &row);
    }
    buf
}

/// Write the four collection files for `backup` into `output_dir`.
///
/// `prefix` is usually the source file name. Returns the written paths in
/// the order activities, completed activities, trainables, trainings.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if the directory or a file cannot be written.
pub fn backup_to_csv(
    backup: &Backup,
    prefix: &str,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(output_dir).map_err(|source| ExportError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let activities = render(
        ACTIVITIES_HEADER,
        backup.activities.iter().map(|activity| {
            [
                activity.id.clone(),
                activity.name.clone(),
                join_list(&activity.other_names),
                optional_ts(activity.last_modified.as_ref()),
                join_list(activity.trainable_ids.as_deref().unwrap_or_default()),
                activity.notes.clone().unwrap_or_default(),
            ]
        }),
    );

    let completed = render(
        COMPLETED_HEADER,
        backup.completed_activities.iter().map(|done| {
            [
                done.id.clone(),
                done.activity_id.clone(),
                format_timestamp(&done.date),
                done.duration.to_string(),
                done.intensity.to_string(),
                done.notes.clone(),
                optional_ts(done.last_modified.as_ref()),
            ]
        }),
    );

    let trainables = render(
        TRAINABLES_HEADER,
        backup.trainables().iter().map(|trainable| {
            [
                trainable.id.clone(),
                trainable.name.clone(),
                trainable.notes.clone(),
                optional_ts(trainable.last_modified.as_ref()),
            ]
        }),
    );

    let trainings = render(
        TRAININGS_HEADER,
        backup.trainings().iter().map(|training| {
            let steps: Vec<String> = training.activities.iter().map(step).collect();
            [
                training.id.clone(),
                training.name.clone(),
                join_list(&steps),
                optional_ts(training.last_modified.as_ref()),
                training.is_oneoff.map(|b| b.to_string()).unwrap_or_default(),
            ]
        }),
    );

    let mut written = Vec::with_capacity(4);
    for (collection, body) in [
        ("activities", activities),
        ("completed-activities", completed),
        ("trainables", trainables),
        ("trainings", trainings),
    ] {
        let path = output_dir.join(format!("{prefix}__{collection}.csv"));
        fs::write(&path, body).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "wrote csv export");
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Activity, CompletedActivity, Duration, Intensity, Training};
    use crate::tabular::parse_rows;
    use chrono::{TimeZone, Utc};

    fn sample() -> Backup {
        let date = Utc.with_ymd_and_hms(2020, 1, 11, 0, 0, 0).single().expect("date");
        let mut backup = Backup::empty(date);
        backup.activities = vec![Activity {
            id: "act_1".to_string(),
            name: "Run, easy".to_string(),
            other_names: vec!["jog".to_string(), "trot".to_string()],
            last_modified: None,
            trainable_ids: Some(vec!["tra_1".to_string()]),
            notes: None,
        }];
        backup.completed_activities = vec![CompletedActivity {
            id: "cpa_1".to_string(),
            activity_id: "act_1".to_string(),
            date,
            duration: Duration::Long,
            intensity: Intensity::High,
            notes: "felt \"great\"".to_string(),
            last_modified: None,
        }];
        backup.trainings = Some(vec![Training {
            id: "trn_1".to_string(),
            name: "Monday".to_string(),
            activities: vec![TrainingActivity {
                activity_id: "act_1".to_string(),
                duration: Duration::Short,
                intensity: Intensity::Low,
            }],
            last_modified: None,
            is_oneoff: Some(true),
        }]);
        backup
    }

    #[test]
    fn writes_one_file_per_collection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = backup_to_csv(&sample(), "backup.json", dir.path()).expect("export");

        let names: Vec<_> = paths
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(
            names,
            [
                "backup.json__activities.csv",
                "backup.json__completed-activities.csv",
                "backup.json__trainables.csv",
                "backup.json__trainings.csv",
            ]
        );
    }

    #[test]
    fn rows_keep_quoted_and_list_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = backup_to_csv(&sample(), "b", dir.path()).expect("export");

        let activities = fs::read_to_string(&paths[0]).expect("read");
        let rows = parse_rows(&activities).expect("parse");
        assert_eq!(rows[0].fields, ACTIVITIES_HEADER);
        assert_eq!(rows[1].fields, ["act_1", "Run, easy", "jog|trot", "", "tra_1", ""]);

        let completed = fs::read_to_string(&paths[1]).expect("read");
        let rows = parse_rows(&completed).expect("parse");
        assert_eq!(rows[1].fields[5], "felt \"great\"");
        assert_eq!(rows[1].fields[3], "long");

        let trainables = fs::read_to_string(&paths[2]).expect("read");
        assert_eq!(trainables, "id,name,notes,last_modified\n");

        let trainings = fs::read_to_string(&paths[3]).expect("read");
        let rows = parse_rows(&trainings).expect("parse");
        assert_eq!(rows[1].fields[2], "act_1:short:low");
        assert_eq!(rows[1].fields[4], "true");
    }
}
