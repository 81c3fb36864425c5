//! `fitmerge consolidate` — merge every backup in a directory into one.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, ValueEnum};
use fitmerge_core::config::{AmbiguityPolicy, ConsolidateConfig};
use fitmerge_core::consolidate::{ConsolidateOptions, UnreadablePolicy, consolidate_dir};
use fitmerge_core::decision::DecisionStore;
use fitmerge_core::merge::MergeStats;
use fitmerge_core::model::format_timestamp;
use fitmerge_core::resolve::{
    ConflictResolver, PolicyResolver, PromptResolver, StrictResolver, Verdict,
};
use fitmerge_core::write_backup;
use serde::Serialize;
use tracing::debug;

use crate::output::{OutputMode, fail, pretty_kv, pretty_section, render_mode};

/// How to settle ambiguous deletions without a recorded decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AmbiguityArg {
    /// Ask on the terminal and remember the answer.
    Ask,
    /// Keep the record (not remembered).
    Keep,
    /// Delete the record (not remembered).
    Delete,
    /// Stop with an error.
    Fail,
}

impl From<AmbiguityArg> for AmbiguityPolicy {
    fn from(arg: AmbiguityArg) -> Self {
        match arg {
            AmbiguityArg::Ask => Self::Ask,
            AmbiguityArg::Keep => Self::Keep,
            AmbiguityArg::Delete => Self::Delete,
            AmbiguityArg::Fail => Self::Fail,
        }
    }
}

/// Arguments for `fitmerge consolidate`.
#[derive(Args, Debug, Default)]
pub struct ConsolidateArgs {
    /// Directory to search for backups.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// File-name pattern of backups (one `*` wildcard).
    #[arg(long)]
    pub pattern: Option<String>,

    /// Decision file to read and update.
    #[arg(long)]
    pub decisions: Option<PathBuf>,

    /// Directory the consolidated backup is written to.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// What to do with an ambiguous deletion that has no recorded decision.
    #[arg(long, value_enum)]
    pub on_ambiguity: Option<AmbiguityArg>,

    /// Skip unreadable backups instead of stopping.
    #[arg(long)]
    pub skip_unreadable: bool,

    /// Stop when a backup has dangling references.
    #[arg(long)]
    pub halt_on_corruption: bool,
}

/// Result payload for `fitmerge consolidate`.
#[derive(Debug, Serialize)]
pub struct ConsolidateSummary {
    pub date: String,
    pub output: PathBuf,
    pub decisions_file: PathBuf,
    pub merged: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub superseded: Vec<PathBuf>,
    pub corrupted: Vec<PathBuf>,
    pub activities: usize,
    pub completed_activities: usize,
    pub stats: MergeStats,
}

fn options(args: &ConsolidateArgs, config: &ConsolidateConfig) -> ConsolidateOptions {
    let mut options = config.options();
    if let Some(ref pattern) = args.pattern {
        options.pattern.clone_from(pattern);
    }
    if args.skip_unreadable {
        options.on_unreadable = UnreadablePolicy::Skip;
    }
    if args.halt_on_corruption {
        options.halt_on_corruption = true;
    }
    options
}

fn resolver(policy: AmbiguityPolicy) -> Box<dyn ConflictResolver> {
    match policy {
        // Prompts go to stderr so stdout only carries the summary.
        AmbiguityPolicy::Ask => Box::new(PromptResolver::new(io::stdin().lock(), io::stderr())),
        AmbiguityPolicy::Keep => Box::new(PolicyResolver {
            verdict: Verdict::Keep,
        }),
        AmbiguityPolicy::Delete => Box::new(PolicyResolver {
            verdict: Verdict::Delete,
        }),
        AmbiguityPolicy::Fail => Box::new(StrictResolver),
    }
}

/// Execute `fitmerge consolidate`.
///
/// # Errors
///
/// Returns an error when loading decisions, consolidating or writing the
/// result fails. Library errors are also rendered on stderr with their code.
pub fn run_consolidate(
    args: &ConsolidateArgs,
    config: &ConsolidateConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let options = options(args, config);
    let decisions_path = args
        .decisions
        .clone()
        .unwrap_or_else(|| config.decisions_file.clone());
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output_dir.clone());
    let policy = args.on_ambiguity.map_or(config.on_ambiguity, Into::into);
    debug!(?options, ?policy, decisions = %decisions_path.display(), "consolidate settings");

    let mut decisions = DecisionStore::load(&decisions_path).map_err(|err| {
        let code = err.code();
        fail(output, err, code)
    })?;
    let mut resolver = resolver(policy);

    let consolidation = consolidate_dir(&args.dir, &options, &mut decisions, resolver.as_mut())
        .map_err(|err| {
            let code = err.code();
            fail(output, err, code)
        })?;

    let written = write_backup(&consolidation.backup, &output_dir).map_err(|err| {
        let code = err.code();
        fail(output, err, code)
    })?;

    let report = consolidation.report;
    let summary = ConsolidateSummary {
        date: format_timestamp(&consolidation.backup.date),
        output: written,
        decisions_file: decisions_path,
        merged: report.merged,
        skipped: report.skipped,
        superseded: report.superseded,
        corrupted: report.corrupted,
        activities: consolidation.backup.activities.len(),
        completed_activities: consolidation.backup.completed_activities.len(),
        stats: report.stats,
    };

    render_mode(output, &summary, render_text, render_pretty)
        .context("render consolidate summary")
}

fn render_text(summary: &ConsolidateSummary, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "output\t{}", summary.output.display())?;
    writeln!(w, "date\t{}", summary.date)?;
    writeln!(w, "merged\t{}", summary.merged.len())?;
    writeln!(w, "skipped\t{}", summary.skipped.len())?;
    writeln!(w, "corrupted\t{}", summary.corrupted.len())?;
    writeln!(w, "completed_activities\t{}", summary.completed_activities)?;
    writeln!(w, "kept_pruned\t{}", summary.stats.kept_pruned)?;
    writeln!(w, "kept_by_decision\t{}", summary.stats.kept_by_decision)?;
    writeln!(w, "dropped_by_decision\t{}", summary.stats.dropped_by_decision)?;
    writeln!(w, "resolved\t{}", summary.stats.resolved)
}

fn render_pretty(summary: &ConsolidateSummary, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Consolidated backup")?;
    pretty_kv(w, "Output", summary.output.display().to_string())?;
    pretty_kv(w, "Date", &summary.date)?;
    pretty_kv(w, "Activities", summary.activities.to_string())?;
    pretty_kv(w, "Completed", summary.completed_activities.to_string())?;
    writeln!(w)?;

    pretty_section(w, "Inputs")?;
    for path in &summary.merged {
        let marker = if summary.corrupted.contains(path) {
            "corrupted"
        } else {
            "ok"
        };
        writeln!(w, "  {marker:<10} {}", path.display())?;
    }
    for path in &summary.skipped {
        writeln!(w, "  {:<10} {}", "skipped", path.display())?;
    }
    for path in &summary.superseded {
        writeln!(w, "  {:<10} {}", "superseded", path.display())?;
    }
    writeln!(w)?;

    pretty_section(w, "Ambiguous deletions")?;
    pretty_kv(w, "Kept (pruned)", summary.stats.kept_pruned.to_string())?;
    pretty_kv(w, "Kept (decided)", summary.stats.kept_by_decision.to_string())?;
    pretty_kv(w, "Dropped", summary.stats.dropped_by_decision.to_string())?;
    pretty_kv(w, "Newly resolved", summary.stats.resolved.to_string())?;
    pretty_kv(w, "Decision file", summary.decisions_file.display().to_string())
}
