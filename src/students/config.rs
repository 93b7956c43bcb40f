//! Configuration primitives for Cognitive Twin installations.
//!
//! Stored in a machine-readable TOML file located under the workspace root:
//!   `$COGNITIVETWIN_HOME/config/config.toml` when the variable is set, otherwise
//!   the OS data directory (`directories::BaseDirs::data_dir`) joined with
//!   `CognitiveTwin/config/config.toml`.
//!
//! The config tracks the last active student plus quiz, generation and
//! logging defaults. The mastery threshold is not configurable; see
//! [`crate::decision::MASTERY_THRESHOLD`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

/// Root configuration persisted per installation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Identifier of the student that was active when the app last shut down.
    pub last_active_student_id: Option<String>,
    /// Quiz sizing defaults.
    #[serde(default)]
    pub quiz: QuizSettings,
    /// Content-generation collaborator settings.
    #[serde(default)]
    pub generation: GenerationSettings,
    /// Tracing output settings.
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSettings {
    /// Number of questions requested when the caller does not pick one.
    #[serde(default = "default_question_count")]
    pub default_question_count: usize,
    /// Upper bound applied to any requested quiz length.
    #[serde(default = "default_max_question_count")]
    pub max_question_count: usize,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            default_question_count: default_question_count(),
            max_question_count: default_max_question_count(),
        }
    }
}

const fn default_question_count() -> usize {
    5
}

const fn default_max_question_count() -> usize {
    15
}

/// Settings for the remote content generator.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    /// Name of the environment variable holding the API key. The key itself
    /// is never written to the config file.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Wall-clock budget for a single generation call.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_call_timeout", rename = "call_timeout_ms")]
    pub call_timeout: Duration,
    /// Source text longer than this is truncated before mindmap generation.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_endpoint: default_api_endpoint(),
            api_key_env: default_api_key_env(),
            call_timeout: default_call_timeout(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

const fn default_call_timeout() -> Duration {
    Duration::from_millis(60_000)
}

const fn default_max_input_chars() -> usize {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `info` or `cognitivetwin=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Mirror log output into daily-rolling files.
    #[serde(default)]
    pub file_logs: bool,
    /// Directory for rolling log files; defaults to `<root>/logs`.
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_logs: false,
            log_dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Standard relative path to the config file (resolved per OS at runtime).
pub const CONFIG_FILE_NAME: &str = "config.toml";

use anyhow::{Context, Result};
use directories::BaseDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the root directory where Cognitive Twin stores data.
///
/// Order of precedence:
/// 1. `COGNITIVETWIN_HOME` environment variable.
/// 2. OS-specific data directory via `directories::BaseDirs`.
pub fn workspace_root() -> Result<PathBuf> {
    if let Ok(path) = env::var("COGNITIVETWIN_HOME") {
        return Ok(PathBuf::from(path));
    }
    let base_dirs = BaseDirs::new().context("Unable to determine OS data directory")?;
    Ok(base_dirs.data_dir().join("CognitiveTwin"))
}

/// Path to the config file below a workspace root.
pub fn config_file_path(root: &Path) -> PathBuf {
    root.join("config").join(CONFIG_FILE_NAME)
}

/// Loads the configuration from disk or returns defaults.
pub fn load_or_default(root: &Path) -> Result<AppConfig> {
    let path = config_file_path(root);
    if path.exists() {
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let cfg: AppConfig = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(cfg)
    } else {
        Ok(AppConfig::default())
    }
}

/// Persists the configuration to disk.
pub fn save(root: &Path, config: &AppConfig) -> Result<()> {
    let path = config_file_path(root);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let data = toml::to_string_pretty(config)?;
    fs::write(&path, data).with_context(|| format!("Failed to write config file {:?}", path))?;
    Ok(())
}

/// Ensures the workspace structure exists (config/ and students/ directories).
pub fn ensure_workspace_structure(root: &Path) -> Result<WorkspacePaths> {
    let config_dir = root.join("config");
    let students_dir = root.join("students");
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    fs::create_dir_all(&students_dir)
        .with_context(|| format!("Failed to create {}", students_dir.display()))?;
    Ok(WorkspacePaths {
        root: root.to_path_buf(),
        config_dir,
        students_dir,
    })
}

/// Convenience struct exposing important workspace paths.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub config_dir: PathBuf,
    pub students_dir: PathBuf,
}

impl WorkspacePaths {
    pub fn student_dir(&self, student_id: &str) -> PathBuf {
        self.students_dir.join(student_id)
    }

    pub fn default_log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}
