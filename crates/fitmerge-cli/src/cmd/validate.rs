//! `fitmerge validate` — referential-integrity report for backup files.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use fitmerge_core::validate::Violation;
use fitmerge_core::{read_backup, validate_backup};
use serde::Serialize;

use crate::output::{OutputMode, pretty_rule, render_mode};

/// Arguments for `fitmerge validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Backup files to check.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Outcome for one file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub ok: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    /// Set when the file could not be read at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

/// Execute `fitmerge validate`.
///
/// # Errors
///
/// Fails when any file is unreadable or corrupted, after every file has been
/// reported.
pub fn run_validate(args: &ValidateArgs, output: OutputMode) -> anyhow::Result<()> {
    let reports: Vec<FileReport> = args
        .files
        .iter()
        .map(|path| match read_backup(path) {
            Ok(backup) => {
                let report = validate_backup(&backup);
                FileReport {
                    path: path.clone(),
                    ok: !report.is_corrupted(),
                    violations: report.violations,
                    error: None,
                    error_code: None,
                }
            }
            Err(err) => FileReport {
                path: path.clone(),
                ok: false,
                violations: Vec::new(),
                error: Some(err.to_string()),
                error_code: Some(err.code().code()),
            },
        })
        .collect();

    render_mode(output, &reports, render_text, render_pretty)?;

    let failed = reports.iter().filter(|report| !report.ok).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} backups failed validation", reports.len());
    }
    Ok(())
}

#[allow(clippy::ptr_arg)]
fn render_text(reports: &Vec<FileReport>, w: &mut dyn Write) -> io::Result<()> {
    for report in reports {
        let status = if report.ok { "ok" } else { "corrupted" };
        match report.error {
            Some(ref error) => writeln!(w, "{}\tunreadable\t{error}", report.path.display())?,
            None => writeln!(w, "{}\t{status}\t{}", report.path.display(), report.violations.len())?,
        }
        for violation in &report.violations {
            writeln!(w, "{}\t{violation}", report.path.display())?;
        }
    }
    Ok(())
}

#[allow(clippy::ptr_arg)]
fn render_pretty(reports: &Vec<FileReport>, w: &mut dyn Write) -> io::Result<()> {
    for report in reports {
        let status = match (&report.error, report.ok) {
            (Some(_), _) => "unreadable",
            (None, true) => "ok",
            (None, false) => "corrupted",
        };
        writeln!(w, "{status:<11} {}", report.path.display())?;
        if let Some(ref error) = report.error {
            writeln!(w, "            {error}")?;
        }
        for violation in &report.violations {
            writeln!(w, "            - {violation}")?;
        }
    }
    pretty_rule(w)?;
    let failed = reports.iter().filter(|report| !report.ok).count();
    writeln!(w, "{} checked, {failed} failed", reports.len())
}
