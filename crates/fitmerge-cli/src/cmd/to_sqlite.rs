//! `fitmerge to-sqlite` — load a backup into a queryable SQLite file.

use std::path::PathBuf;

use clap::Args;
use fitmerge_core::export::sqlite::backup_to_sqlite;
use fitmerge_core::{read_backup, validate_backup};

use super::to_csv::{ExportSummary, render_pretty, render_text};
use crate::output::{OutputMode, fail, render_mode};

/// Arguments for `fitmerge to-sqlite`.
#[derive(Args, Debug)]
pub struct ToSqliteArgs {
    /// Backup file to convert.
    pub file: PathBuf,

    /// Directory the `.sqlite` file is written to.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

/// Execute `fitmerge to-sqlite`.
///
/// # Errors
///
/// Returns an error when the backup cannot be read or the database cannot
/// be written.
pub fn run_to_sqlite(args: &ToSqliteArgs, output: OutputMode) -> anyhow::Result<()> {
    let backup = read_backup(&args.file).map_err(|err| {
        let code = err.code();
        fail(output, err, code)
    })?;
    let report = validate_backup(&backup);

    let stem = args
        .file
        .file_stem()
        .map_or_else(|| "backup".to_string(), |stem| stem.to_string_lossy().into_owned());
    let path = backup_to_sqlite(&backup, &stem, &args.output_dir).map_err(|err| {
        let code = err.code();
        fail(output, err, code)
    })?;

    let summary = ExportSummary {
        source: args.file.clone(),
        corrupted: report.is_corrupted(),
        written: vec![path],
    };
    render_mode(output, &summary, render_text, render_pretty)
}
