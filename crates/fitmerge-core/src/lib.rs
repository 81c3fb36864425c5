//! fitmerge-core library.
//!
//! Consolidates timestamped fitness-tracker backups into one canonical
//! backup. The pipeline is:
//!
//! 1. [`codec`] reads each backup file.
//! 2. [`validate`] reports dangling references (advisory).
//! 3. [`merge`] combines two backups, consulting the [`decision`] store and a
//!    [`resolve::ConflictResolver`] for ambiguous deletions.
//! 4. [`consolidate`] orders backups by date and folds them with [`merge`].
//!
//! # Conventions
//!
//! - **Errors**: library modules return typed `thiserror` enums, each with a
//!   `code()` mapping to [`error::ErrorCode`]. [`config`] uses `anyhow`.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`).

pub mod codec;
pub mod config;
pub mod consolidate;
pub mod decision;
pub mod error;
pub mod export;
pub mod merge;
pub mod model;
pub mod resolve;
pub mod tabular;
pub mod validate;

pub use codec::{BackupError, read_backup, write_backup};
pub use consolidate::{ConsolidateError, ConsolidateOptions, Consolidation, consolidate_dir};
pub use decision::{Decision, DecisionError, DecisionStore};
pub use merge::{MergeError, MergeOutcome, MergeStats, merge_backups};
pub use model::Backup;
pub use resolve::{ConflictResolver, PolicyResolver, PromptResolver, StrictResolver, Verdict};
pub use validate::{ValidationReport, validate_backup};
