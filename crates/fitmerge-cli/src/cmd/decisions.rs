//! `fitmerge decisions` — list remembered answers to ambiguous deletions.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use fitmerge_core::config::ConsolidateConfig;
use fitmerge_core::decision::{Decision, DecisionStore};
use fitmerge_core::model::format_timestamp;

use crate::output::{OutputMode, fail, pretty_section, render_mode};

/// Arguments for `fitmerge decisions`.
#[derive(Args, Debug, Default)]
pub struct DecisionsArgs {
    /// Decision file to read (defaults to the configured one).
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Only show records marked for deletion.
    #[arg(long)]
    pub deleted: bool,
}

/// Execute `fitmerge decisions`.
///
/// # Errors
///
/// Returns an error when the decision file exists but cannot be parsed.
pub fn run_decisions(
    args: &DecisionsArgs,
    config: &ConsolidateConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let path = args
        .file
        .clone()
        .unwrap_or_else(|| config.decisions_file.clone());
    let store = DecisionStore::load(&path).map_err(|err| {
        let code = err.code();
        fail(output, err, code)
    })?;

    let decisions: Vec<Decision> = store
        .sorted()
        .into_iter()
        .filter(|decision| !args.deleted || decision.must_be_deleted)
        .cloned()
        .collect();

    render_mode(output, &decisions, render_text, render_pretty)
}

#[allow(clippy::ptr_arg)]
fn render_text(decisions: &Vec<Decision>, w: &mut dyn Write) -> io::Result<()> {
    for decision in decisions {
        writeln!(
            w,
            "{}\t{}\t{}",
            decision.id,
            format_timestamp(&decision.reviewed_at),
            decision.must_be_deleted
        )?;
    }
    Ok(())
}

#[allow(clippy::ptr_arg)]
fn render_pretty(decisions: &Vec<Decision>, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Decisions ({})", decisions.len()))?;
    if decisions.is_empty() {
        writeln!(w, "No decisions recorded.")?;
        return Ok(());
    }
    for decision in decisions {
        let verdict = if decision.must_be_deleted {
            "delete"
        } else {
            "keep"
        };
        writeln!(
            w,
            "{verdict:<7} {:<28} {}",
            decision.id,
            format_timestamp(&decision.reviewed_at)
        )?;
    }
    Ok(())
}
