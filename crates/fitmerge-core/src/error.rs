use std::fmt;

/// Machine-readable error codes surfaced by the CLI and in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    BackupNotFound,
    UnsupportedBackupFormat,
    ConfigParseError,
    NoBackupsFound,
    CorruptedBackup,
    UndefinedTimeRange,
    AmbiguousDeletion,
    PromptInputClosed,
    DecisionFileMalformed,
    DecisionFileWriteFailed,
    BackupWriteFailed,
    ExportFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BackupNotFound => "E1001",
            Self::UnsupportedBackupFormat => "E1002",
            Self::ConfigParseError => "E1003",
            Self::NoBackupsFound => "E1004",
            Self::CorruptedBackup => "E2001",
            Self::UndefinedTimeRange => "E2002",
            Self::AmbiguousDeletion => "E2003",
            Self::PromptInputClosed => "E2004",
            Self::DecisionFileMalformed => "E3001",
            Self::DecisionFileWriteFailed => "E3002",
            Self::BackupWriteFailed => "E5001",
            Self::ExportFailed => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::BackupNotFound => "Backup file not found",
            Self::UnsupportedBackupFormat => "Unsupported backup format",
            Self::ConfigParseError => "Config file parse error",
            Self::NoBackupsFound => "No backups found",
            Self::CorruptedBackup => "Corrupted backup",
            Self::UndefinedTimeRange => "Backup time range is undefined",
            Self::AmbiguousDeletion => "Ambiguous deletion left unresolved",
            Self::PromptInputClosed => "Operator input closed",
            Self::DecisionFileMalformed => "Decision file is malformed",
            Self::DecisionFileWriteFailed => "Decision file write failed",
            Self::BackupWriteFailed => "Backup write failed",
            Self::ExportFailed => "Export failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::BackupNotFound => Some("Check the path; backups are never created by fitmerge."),
            Self::UnsupportedBackupFormat => {
                Some("Export a fresh backup from the app or exclude this file.")
            }
            Self::ConfigParseError => Some("Fix syntax in fitmerge.toml and retry."),
            Self::NoBackupsFound => Some("Check --dir and --pattern match your backup files."),
            Self::CorruptedBackup => {
                Some("Inspect the dangling references with `fitmerge validate`.")
            }
            Self::UndefinedTimeRange => {
                Some("Remove the backup without completed activities from the input set.")
            }
            Self::AmbiguousDeletion => {
                Some("Rerun with --on-ambiguity ask, keep or delete to resolve it.")
            }
            Self::PromptInputClosed => Some("Answer every prompt with k (keep) or d (delete)."),
            Self::DecisionFileMalformed => {
                Some("Fix or remove the offending row in the decision file.")
            }
            Self::DecisionFileWriteFailed | Self::BackupWriteFailed | Self::ExportFailed => {
                Some("Check disk space and write permissions.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
