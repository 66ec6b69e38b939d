//! TOML-based configuration for upbound.
//!
//! Example configuration:
//! ```toml
//! [optimizer]
//! provider = "learned"      # or "frequency"
//! tightening = true
//! operators = "pessimistic" # or "unrestricted"
//!
//! [learned]
//! clamp_to_frequency_bound = true
//!
//! [[learned.overrides]]
//! relations = ["orders", "customer"]
//! cardinality = 1200.0
//!
//! [logging]
//! level = "debug"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::planner::{
    BoundProvider, FrequencyBound, LearnedBound, OperatorPolicy, OptimizerOptions,
    StaticOverrides,
};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub optimizer: OptimizerSettings,
    pub learned: LearnedSettings,
    pub logging: LoggingSettings,
}

/// Which bound provider drives the selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Frequency,
    Learned,
}

/// Optimizer configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub provider: ProviderKind,

    /// Cap unjoined relations after key joins.
    pub tightening: bool,

    /// Physical operator assignment.
    pub operators: OperatorPolicy,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Frequency,
            tightening: true,
            operators: OperatorPolicy::Pessimistic,
        }
    }
}

/// Settings of the learned provider.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LearnedSettings {
    /// Never report more than the frequency bound.
    pub clamp_to_frequency_bound: bool,

    /// Fixed cardinalities for relation sets.
    pub overrides: Vec<CardinalityOverride>,
}

impl Default for LearnedSettings {
    fn default() -> Self {
        Self {
            clamp_to_frequency_bound: true,
            overrides: Vec::new(),
        }
    }
}

/// A cardinality injected for one relation set.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CardinalityOverride {
    pub relations: Vec<String>,
    pub cardinality: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// One of trace, debug, info, warn, error.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LoggingSettings {
    pub fn level(&self) -> Result<tracing::Level, SettingsError> {
        self.level.parse().map_err(|_| {
            SettingsError::InvalidConfig(format!("unknown log level '{}'", self.level))
        })
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `UPBOUND_CONFIG`
    /// 2. `./upbound.toml`
    /// 3. `~/.config/upbound/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("UPBOUND_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("upbound.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("upbound").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.logging.level()?;

        for (i, o) in self.learned.overrides.iter().enumerate() {
            if o.relations.is_empty() {
                return Err(SettingsError::InvalidConfig(format!(
                    "learned.overrides[{}] names no relations",
                    i
                )));
            }
            if !o.cardinality.is_finite() || o.cardinality < 0.0 {
                return Err(SettingsError::InvalidConfig(format!(
                    "learned.overrides[{}] has invalid cardinality {}",
                    i, o.cardinality
                )));
            }
        }

        if self.optimizer.provider == ProviderKind::Frequency && !self.learned.overrides.is_empty()
        {
            tracing::warn!("learned.overrides are ignored by the frequency provider");
        }

        Ok(())
    }

    pub fn optimizer_options(&self) -> OptimizerOptions {
        OptimizerOptions {
            tightening: self.optimizer.tightening,
            operators: self.optimizer.operators,
        }
    }

    /// Instantiate the configured bound provider.
    pub fn build_provider(&self) -> Result<Box<dyn BoundProvider>, SettingsError> {
        self.validate()?;

        match self.optimizer.provider {
            ProviderKind::Frequency => Ok(Box::new(FrequencyBound)),
            ProviderKind::Learned => {
                let mut overrides = StaticOverrides::new();
                for o in &self.learned.overrides {
                    overrides.insert(o.relations.iter().cloned(), o.cardinality);
                }
                Ok(Box::new(
                    LearnedBound::new(overrides).with_clamp(self.learned.clamp_to_frequency_bound),
                ))
            }
        }
    }
}
