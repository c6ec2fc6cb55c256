//! Dashboard configuration.
//!
//! Loaded from an optional `dashboard.toml`. Every field has a default, so a
//! missing file (or a partial one) falls back to the stock column layout of
//! the televendas exports.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub actions: ActionColumns,

    #[serde(default)]
    pub activity: ActivityColumns,

    #[serde(default)]
    pub highlight: HighlightConfig,

    #[serde(default)]
    pub parsing: ParsingConfig,
}

/// Locations of the two input tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Sales actions log.
    #[serde(default = "default_actions_path")]
    pub actions: PathBuf,

    /// Hourly call-center activity log.
    #[serde(default = "default_activity_path")]
    pub activity: PathBuf,

    /// Base directory for relative source paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            actions: default_actions_path(),
            activity: default_activity_path(),
            data_dir: None,
        }
    }
}

impl SourcesConfig {
    pub fn actions_path(&self) -> PathBuf {
        self.resolve(&self.actions)
    }

    pub fn activity_path(&self) -> PathBuf {
        self.resolve(&self.activity)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.data_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn default_actions_path() -> PathBuf {
    PathBuf::from("dados_analisados.csv")
}

fn default_activity_path() -> PathBuf {
    PathBuf::from("HORA.csv")
}

/// Column aliases for the actions table. Each list resolves to the first
/// alias present in the header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionColumns {
    #[serde(default = "default_action_date")]
    pub date: Vec<String>,

    #[serde(default = "default_supervisor")]
    pub supervisor: Vec<String>,

    #[serde(default = "default_action_total")]
    pub total: Vec<String>,
}

impl Default for ActionColumns {
    fn default() -> Self {
        Self {
            date: default_action_date(),
            supervisor: default_supervisor(),
            total: default_action_total(),
        }
    }
}

/// Column aliases for the activity table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityColumns {
    #[serde(default = "default_operator")]
    pub operator: Vec<String>,

    #[serde(default = "default_activity_date")]
    pub date: Vec<String>,

    #[serde(default = "default_supervisor")]
    pub supervisor: Vec<String>,

    #[serde(default = "default_channel")]
    pub channel: Vec<String>,

    #[serde(default = "default_count")]
    pub count: Vec<String>,
}

impl Default for ActivityColumns {
    fn default() -> Self {
        Self {
            operator: default_operator(),
            date: default_activity_date(),
            supervisor: default_supervisor(),
            channel: default_channel(),
            count: default_count(),
        }
    }
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn default_action_date() -> Vec<String> {
    aliases(&["fecha_accion"])
}

fn default_supervisor() -> Vec<String> {
    aliases(&["SUPERVISOR"])
}

fn default_action_total() -> Vec<String> {
    aliases(&["Total"])
}

fn default_operator() -> Vec<String> {
    aliases(&["OPERADOR", "NOME"])
}

fn default_activity_date() -> Vec<String> {
    aliases(&["DATA"])
}

fn default_channel() -> Vec<String> {
    aliases(&["CD", "CONTATO DIRETO"])
}

fn default_count() -> Vec<String> {
    aliases(&["GESTIONES"])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Values at or above this are classified high.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> f64 {
    130.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// `chrono` formats tried in order. Date-time formats keep the date part.
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            date_formats: default_date_formats(),
        }
    }
}

fn default_date_formats() -> Vec<String> {
    aliases(&[
        "%Y-%m-%d",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%d/%m/%Y",
        "%m/%d/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%Y%m%d",
    ])
}

impl Config {
    /// Load from `path`. An absent file at the default location yields the
    /// defaults; an explicitly requested file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !explicit && !path.exists() {
            tracing::debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.actions.date.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "actions.date",
                reason: "at least one column alias is required".to_string(),
            });
        }
        if self.activity.date.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "activity.date",
                reason: "at least one column alias is required".to_string(),
            });
        }
        if !self.highlight.threshold.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "highlight.threshold",
                reason: "must be a finite number".to_string(),
            });
        }
        if self.parsing.date_formats.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "parsing.date_formats",
                reason: "at least one format is required".to_string(),
            });
        }
        Ok(())
    }

    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }
}
