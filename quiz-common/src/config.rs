//! Configuration loading and config file resolution
//!
//! Bootstrap settings come from one TOML file. Resolution order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`QUIZ_CONFIG`)
//! 3. Platform config directory (`~/.config/quiz/config.toml` on Linux)
//! 4. Compiled defaults (fallback)
//!
//! A missing file is not an error: the service logs a warning and starts
//! with defaults. A file that exists but does not parse is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::collection::DEFAULT_COLLECTION_URL;
use crate::location::{DEFAULT_GEOLOCATION_URL, DEFAULT_LOOKUP_TIMEOUT_MS};
use crate::payload::DEFAULT_SOURCE_TAG;
use crate::pipeline::{PipelineSettings, ResponseMode, DEFAULT_SUPPORT_EMAIL};
use crate::steps::{QuizDefinition, StepDefinition, DEFAULT_EMAIL_FIELD, DEFAULT_LEAD_CAPTURE_STEP};
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "QUIZ_CONFIG";

/// Default HTTP port of the quiz service
pub const DEFAULT_PORT: u16 = 5790;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP server port
    pub port: u16,
    /// Interface the service binds to
    pub bind_host: String,
    /// Value of the `source` field in every submission
    pub source_tag: String,
    /// Contact named in the failure message
    pub support_email: String,
    pub collection: CollectionConfig,
    pub geolocation: GeolocationConfig,
    pub logging: LoggingConfig,
    /// Custom quiz; the built-in niche quiz is used when absent
    pub quiz: Option<QuizConfig>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_host: "127.0.0.1".to_string(),
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            collection: CollectionConfig::default(),
            geolocation: GeolocationConfig::default(),
            logging: LoggingConfig::default(),
            quiz: None,
        }
    }
}

/// Collection endpoint settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub url: String,
    pub response_mode: ResponseMode,
    pub thank_you_view: String,
    pub results_view: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        let pipeline = PipelineSettings::default();
        Self {
            url: DEFAULT_COLLECTION_URL.to_string(),
            response_mode: ResponseMode::default(),
            thank_you_view: pipeline.thank_you_view,
            results_view: pipeline.results_view,
        }
    }
}

/// Geolocation lookup settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GEOLOCATION_URL.to_string(),
            timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Quiz definition as written in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct QuizConfig {
    #[serde(default = "default_lead_capture_step")]
    pub lead_capture_step: usize,
    #[serde(default = "default_email_field")]
    pub email_field: String,
    pub steps: Vec<StepDefinition>,
}

fn default_lead_capture_step() -> usize {
    DEFAULT_LEAD_CAPTURE_STEP
}

fn default_email_field() -> String {
    DEFAULT_EMAIL_FIELD.to_string()
}

impl TomlConfig {
    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validated quiz definition (custom or built-in)
    pub fn quiz_definition(&self) -> Result<QuizDefinition> {
        match &self.quiz {
            Some(quiz) => QuizDefinition::new(
                quiz.steps.clone(),
                quiz.lead_capture_step,
                quiz.email_field.clone(),
            ),
            None => Ok(QuizDefinition::niche_quiz()),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            response_mode: self.collection.response_mode,
            source_tag: self.source_tag.clone(),
            support_email: self.support_email.clone(),
            thank_you_view: self.collection.thank_you_view.clone(),
            results_view: self.collection.results_view.clone(),
            lookup_timeout: Duration::from_millis(self.geolocation.timeout_ms),
        }
    }
}

/// Locates the config file following the priority order above
pub struct ConfigResolver {
    env_var: String,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::with_env_var(CONFIG_ENV_VAR)
    }

    pub fn with_env_var(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }

    /// Candidate config path, if any source names one
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory
        default_config_path().filter(|path| path.exists())
    }

    /// Load the resolved config, degrading to defaults when no file exists
    pub fn load(&self, cli_arg: Option<&Path>) -> Result<TomlConfig> {
        match self.resolve(cli_arg) {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                TomlConfig::from_file(&path)
            }
            Some(path) => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(TomlConfig::default())
            }
            None => {
                info!("No config file found, using compiled defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Platform config file location (`<config_dir>/quiz/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("quiz").join("config.toml"))
}
