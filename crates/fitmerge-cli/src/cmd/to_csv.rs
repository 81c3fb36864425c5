//! `fitmerge to-csv` — one CSV file per collection of a backup.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use fitmerge_core::export::csv::backup_to_csv;
use fitmerge_core::{read_backup, validate_backup};
use serde::Serialize;

use crate::output::{OutputMode, fail, pretty_section, render_mode};

/// Arguments for `fitmerge to-csv`.
#[derive(Args, Debug)]
pub struct ToCsvArgs {
    /// Backup file to convert.
    pub file: PathBuf,

    /// Directory the CSV files are written to.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ExportSummary {
    pub source: PathBuf,
    pub corrupted: bool,
    pub written: Vec<PathBuf>,
}

/// Execute `fitmerge to-csv`.
///
/// # Errors
///
/// Returns an error when the backup cannot be read or a file cannot be
/// written. Dangling references are reported but do not fail the export.
pub fn run_to_csv(args: &ToCsvArgs, output: OutputMode) -> anyhow::Result<()> {
    let backup = read_backup(&args.file).map_err(|err| {
        let code = err.code();
        fail(output, err, code)
    })?;
    let report = validate_backup(&backup);

    let prefix = args
        .file
        .file_name()
        .map_or_else(|| "backup".to_string(), |name| name.to_string_lossy().into_owned());
    let written = backup_to_csv(&backup, &prefix, &args.output_dir).map_err(|err| {
        let code = err.code();
        fail(output, err, code)
    })?;

    let summary = ExportSummary {
        source: args.file.clone(),
        corrupted: report.is_corrupted(),
        written,
    };
    render_mode(output, &summary, render_text, render_pretty)
}

pub fn render_text(summary: &ExportSummary, w: &mut dyn Write) -> io::Result<()> {
    for path in &summary.written {
        writeln!(w, "{}", path.display())?;
    }
    Ok(())
}

pub fn render_pretty(summary: &ExportSummary, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Exported {}", summary.source.display()))?;
    if summary.corrupted {
        writeln!(w, "warning: backup has dangling references (see logs)")?;
    }
    for path in &summary.written {
        writeln!(w, "  {}", path.display())?;
    }
    Ok(())
}
