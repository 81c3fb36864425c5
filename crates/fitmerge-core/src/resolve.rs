//! Conflict resolvers for ambiguous deletions.
//!
//! The merge engine asks a [`ConflictResolver`] what to do with a completed
//! activity that an older backup has, a newer backup lacks, and whose date
//! falls inside the newer backup's window. Three resolvers are provided:
//!
//! - [`PromptResolver`] asks an operator over any `BufRead`/`Write` pair and
//!   blocks until a valid answer arrives. Its answers are remembered.
//! - [`PolicyResolver`] applies a fixed verdict without asking. Its answers
//!   are not remembered, since no human reviewed the record.
//! - [`StrictResolver`] refuses to guess and fails the merge.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::model::{CompletedActivity, TimeRange, format_timestamp};

/// What happens to an ambiguous record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Keep,
    Delete,
}

impl Verdict {
    #[must_use]
    pub const fn must_be_deleted(self) -> bool {
        matches!(self, Self::Delete)
    }

    #[must_use]
    pub const fn from_must_be_deleted(must_be_deleted: bool) -> Self {
        if must_be_deleted { Self::Delete } else { Self::Keep }
    }
}

/// A resolver's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub verdict: Verdict,
    /// Persist the verdict to the decision store before applying it.
    pub remember: bool,
}

/// A record the merge engine cannot classify on its own.
#[derive(Debug, Clone, Copy)]
pub struct AmbiguousRecord<'a> {
    pub completed: &'a CompletedActivity,
    /// Name of the referenced activity, when either backup defines it.
    pub activity_name: Option<&'a str>,
    /// Observation window of the newer backup.
    pub window: TimeRange,
}

/// Failures while resolving an ambiguous record.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The resolver refuses to decide.
    #[error("CompletedActivity '{id}' exists in the earlier backup but not in the later one, and no decision is recorded")]
    Ambiguous { id: String },

    /// The operator's input ended before a valid answer was given.
    #[error("input closed while asking about CompletedActivity '{id}'")]
    InputClosed { id: String },

    /// Reading the answer or writing the question failed.
    #[error("prompt I/O failed: {0}")]
    Io(#[from] io::Error),
}

impl ResolveError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Ambiguous { .. } => ErrorCode::AmbiguousDeletion,
            Self::InputClosed { .. } => ErrorCode::PromptInputClosed,
            Self::Io(_) => ErrorCode::InternalUnexpected,
        }
    }
}

/// Decides the fate of an ambiguous completed activity.
pub trait ConflictResolver {
    /// # Errors
    ///
    /// Returns a [`ResolveError`] when no verdict can be produced.
    fn resolve(&mut self, record: &AmbiguousRecord<'_>) -> Result<Resolution, ResolveError>;
}

/// Asks an operator to keep or delete each ambiguous record.
#[derive(Debug)]
pub struct PromptResolver<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptResolver<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the resolver, returning the output sink.
    pub fn into_output(self) -> W {
        self.output
    }

    fn describe(&mut self, record: &AmbiguousRecord<'_>) -> io::Result<()> {
        let done = record.completed;
        let name = record.activity_name.unwrap_or("unknown activity");
        writeln!(self.output)?;
        writeln!(self.output)?;
        writeln!(self.output, "lower_boundary:              {}", format_timestamp(&record.window.lower))?;
        writeln!(self.output, "upper_boundary:              {}", format_timestamp(&record.window.upper))?;
        writeln!(self.output, "old_completed_activity.date: {}", format_timestamp(&done.date))?;
        writeln!(
            self.output,
            "the CompletedActivity '{}' ({name}) exists in old backup, but it's not in the new backup",
            done.id
        )?;
        writeln!(self.output)
    }
}

fn parse_answer(raw: &str) -> Option<Verdict> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "k" | "keep" => Some(Verdict::Keep),
        "d" | "delete" => Some(Verdict::Delete),
        _ => None,
    }
}

impl<R: BufRead, W: Write> ConflictResolver for PromptResolver<R, W> {
    fn resolve(&mut self, record: &AmbiguousRecord<'_>) -> Result<Resolution, ResolveError> {
        self.describe(record)?;

        let id = &record.completed.id;
        loop {
            write!(
                self.output,
                "should CompletedActivity '{id}' be [k]ept or [d]eleted? "
            )?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                return Err(ResolveError::InputClosed { id: id.clone() });
            }

            if let Some(verdict) = parse_answer(&answer) {
                return Ok(Resolution {
                    verdict,
                    remember: true,
                });
            }
        }
    }
}

/// Applies the same verdict to every ambiguous record.
#[derive(Debug, Clone, Copy)]
pub struct PolicyResolver {
    pub verdict: Verdict,
}

impl ConflictResolver for PolicyResolver {
    fn resolve(&mut self, _record: &AmbiguousRecord<'_>) -> Result<Resolution, ResolveError> {
        Ok(Resolution {
            verdict: self.verdict,
            remember: false,
        })
    }
}

/// Fails on the first ambiguous record.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictResolver;

impl ConflictResolver for StrictResolver {
    fn resolve(&mut self, record: &AmbiguousRecord<'_>) -> Result<Resolution, ResolveError> {
        Err(ResolveError::Ambiguous {
            id: record.completed.id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Duration, Intensity, Timestamp};
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;

    fn day(d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2020, 1, d, 0, 0, 0).single().expect("valid date")
    }

    fn completed() -> CompletedActivity {
        CompletedActivity {
            id: "cpa_1".to_string(),
            activity_id: "act_1".to_string(),
            date: day(7),
            duration: Duration::Short,
            intensity: Intensity::Low,
            notes: String::new(),
            last_modified: None,
        }
    }

    fn record(done: &CompletedActivity) -> AmbiguousRecord<'_> {
        AmbiguousRecord {
            completed: done,
            activity_name: Some("Run"),
            window: TimeRange {
                lower: day(5),
                upper: day(10),
            },
        }
    }

    fn prompt(input: &str) -> PromptResolver<Cursor<Vec<u8>>, Vec<u8>> {
        PromptResolver::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn keep_answer_is_remembered() {
        let done = completed();
        let mut resolver = prompt("k\n");
        let resolution = resolver.resolve(&record(&done)).expect("resolve");
        assert_eq!(resolution.verdict, Verdict::Keep);
        assert!(resolution.remember);
    }

    #[test]
    fn invalid_answers_are_asked_again() {
        let done = completed();
        let mut resolver = prompt("\nmaybe\nDELETE\n");
        let resolution = resolver.resolve(&record(&done)).expect("resolve");
        assert_eq!(resolution.verdict, Verdict::Delete);

        let transcript = String::from_utf8(resolver.into_output()).expect("utf8");
        assert_eq!(transcript.matches("be [k]ept or [d]eleted?").count(), 3);
        assert!(transcript.contains("the CompletedActivity 'cpa_1' (Run) exists in old backup"));
        assert!(transcript.contains("lower_boundary:              2020-01-05T00:00:00.000Z"));
    }

    #[test]
    fn closed_input_fails_instead_of_looping() {
        let done = completed();
        let mut resolver = prompt("nope\n");
        let err = resolver.resolve(&record(&done)).expect_err("must fail");
        assert!(matches!(err, ResolveError::InputClosed { ref id } if id == "cpa_1"));
        assert_eq!(err.code(), ErrorCode::PromptInputClosed);
    }

    #[test]
    fn policy_resolver_is_not_remembered() {
        let done = completed();
        let mut resolver = PolicyResolver {
            verdict: Verdict::Delete,
        };
        let resolution = resolver.resolve(&record(&done)).expect("resolve");
        assert_eq!(resolution.verdict, Verdict::Delete);
        assert!(!resolution.remember);
    }

    #[test]
    fn strict_resolver_refuses() {
        let done = completed();
        let err = StrictResolver.resolve(&record(&done)).expect_err("must fail");
        assert_eq!(err.code(), ErrorCode::AmbiguousDeletion);
    }

    #[test]
    fn verdict_round_trips_through_must_be_deleted() {
        for verdict in [Verdict::Keep, Verdict::Delete] {
            assert_eq!(Verdict::from_must_be_deleted(verdict.must_be_deleted()), verdict);
        }
    }
}
