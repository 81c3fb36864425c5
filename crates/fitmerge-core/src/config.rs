use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::consolidate::{ConsolidateOptions, DEFAULT_BACKUP_PATTERN, UnreadablePolicy};
use crate::decision::DEFAULT_DECISIONS_FILE;

/// Name of the per-project config file, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "fitmerge.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub consolidate: ConsolidateConfig,
}

/// How ambiguous deletions are settled when no decision is recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    /// Prompt the operator and remember the answer.
    #[default]
    Ask,
    Keep,
    Delete,
    /// Stop the run.
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidateConfig {
    #[serde(default = "default_backup_pattern")]
    pub backup_pattern: String,
    #[serde(default = "default_decisions_file")]
    pub decisions_file: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub on_unreadable: UnreadablePolicy,
    #[serde(default)]
    pub halt_on_corruption: bool,
    #[serde(default)]
    pub on_ambiguity: AmbiguityPolicy,
}

impl Default for ConsolidateConfig {
    fn default() -> Self {
        Self {
            backup_pattern: default_backup_pattern(),
            decisions_file: default_decisions_file(),
            output_dir: default_output_dir(),
            on_unreadable: UnreadablePolicy::default(),
            halt_on_corruption: false,
            on_ambiguity: AmbiguityPolicy::default(),
        }
    }
}

impl ConsolidateConfig {
    #[must_use]
    pub fn options(&self) -> ConsolidateOptions {
        ConsolidateOptions {
            pattern: self.backup_pattern.clone(),
            on_unreadable: self.on_unreadable,
            halt_on_corruption: self.halt_on_corruption,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Read `fitmerge.toml` from `project_root`; defaults when absent.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PROJECT_CONFIG_FILE);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// # Errors
///
/// Fails when the user config exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("fitmerge/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// # Errors
///
/// Propagates project and user config load failures.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn resolve_output(cli_json: bool, user_output: Option<&str>, env_format: Option<&str>) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "plain" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    let configured = env_format
        .and_then(normalize_output_mode)
        .or_else(|| user_output.and_then(normalize_output_mode));
    if let Some(mode) = configured {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_backup_pattern() -> String {
    DEFAULT_BACKUP_PATTERN.to_string()
}

fn default_decisions_file() -> PathBuf {
    PathBuf::from(DEFAULT_DECISIONS_FILE)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
