//! Configuration loaded from YAML files.
//!
//! Files are rendered as [`tera`] templates before they are deserialised, so
//! values may be taken from the environment:
//!
//! ```yaml
//! project:
//!   data_path: {{ get_env(name="ONTOFORGE_DATA", default="output/data.xml") }}
//! ```
//!
//! Every section has defaults; an empty document is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration file `{path}`: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot render configuration template: {0}")]
    Template(#[from] tera::Error),
    #[error("cannot parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logger: LoggerConfig,
    pub project: ProjectConfig,
    pub reasoner: ReasonerConfig,
    pub retrieval: RetrievalConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Loads the configuration stored at `path`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, rendered or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&content)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Renders and parses a YAML configuration document.
    ///
    /// # Errors
    ///
    /// Fails when the template does not render or the YAML does not match.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let rendered = tera::Tera::one_off(content, &tera::Context::new(), false)?;
        if rendered.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&rendered)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub enable: bool,
    pub level: LogLevel,
    pub format: LogFormat,
    /// Replaces the filter built from `level`, e.g. `ontoforge=trace,info`.
    pub override_filter: Option<String>,
    pub file_appender: Option<FileAppenderConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enable: true,
            level: LogLevel::Info,
            format: LogFormat::Compact,
            override_filter: None,
            file_appender: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FileAppenderConfig {
    pub enable: bool,
    pub dir: PathBuf,
    pub filename_prefix: String,
    pub rotation: Rotation,
}

impl Default for FileAppenderConfig {
    fn default() -> Self {
        Self {
            enable: false,
            dir: PathBuf::from("logs"),
            filename_prefix: "ontoforge".to_string(),
            rotation: Rotation::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

/// Locations of the persisted project documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub schema_path: PathBuf,
    pub data_path: PathBuf,
    /// Root of the working store. `None` keeps the store in memory.
    pub workdir: Option<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            schema_path: PathBuf::from("output/schema.yaml"),
            data_path: PathBuf::from("output/data.xml"),
            workdir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonerBackend {
    #[default]
    Native,
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReasonerConfig {
    pub backend: ReasonerBackend,
    pub max_nodes: usize,
    pub max_branches: usize,
    pub command: CommandConfig,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            backend: ReasonerBackend::Native,
            max_nodes: 10_000,
            max_branches: 10_000,
            command: CommandConfig::default(),
        }
    }
}

/// External reasoner invocation. `{input}` in `args` is replaced by the path
/// of the serialised world.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Regex matched against the output; a match means inconsistent.
    pub inconsistent_pattern: String,
    /// Output before this marker is banner text and is dropped.
    pub explanation_marker: Option<String>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            program: "pellet".to_string(),
            args: vec!["explain".to_string(), "{input}".to_string()],
            inconsistent_pattern: "(?i)inconsistent".to_string(),
            explanation_marker: Some("This is the output of `pellet explain`:".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub timeout_secs: u64,
    pub max_page_length: usize,
    pub ols_base_url: String,
    /// Rows requested from OLS when the caller sets no limit.
    pub ols_page_size: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            max_page_length: 10_000,
            ols_base_url: "https://www.ebi.ac.uk/ols4/api".to_string(),
            ols_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_attempts: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_yaml("").expect("config");
        assert_eq!(config, Config::default());
        assert_eq!(config.retrieval.timeout_secs, 20);
        assert_eq!(config.session.max_attempts, 3);
        assert_eq!(config.project.data_path, PathBuf::from("output/data.xml"));
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::from_yaml(
            r"
logger:
  level: debug
  format: json
reasoner:
  backend: command
  command:
    program: hermit
    args: ['{input}']
    inconsistent_pattern: 'false'
session:
  max_attempts: 5
",
        )
        .expect("config");
        assert_eq!(config.logger.level, LogLevel::Debug);
        assert_eq!(config.logger.format, LogFormat::Json);
        assert_eq!(config.reasoner.backend, ReasonerBackend::Command);
        assert_eq!(config.reasoner.command.program, "hermit");
        assert_eq!(config.reasoner.command.explanation_marker, CommandConfig::default().explanation_marker);
        assert_eq!(config.reasoner.max_nodes, 10_000);
        assert_eq!(config.session.max_attempts, 5);
    }

    #[test]
    fn renders_environment_lookups() {
        let config = Config::from_yaml(
            r#"
project:
  data_path: {{ get_env(name="ONTOFORGE_TEST_UNSET_VARIABLE", default="facts/out.xml") }}
"#,
        )
        .expect("config");
        assert_eq!(config.project.data_path, PathBuf::from("facts/out.xml"));
    }

    #[test]
    fn rejects_unknown_levels() {
        let err = Config::from_yaml("logger:\n  level: loud\n").expect_err("invalid level");
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
