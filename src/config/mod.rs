//! Configuration module for upbound.
//!
//! Handles optimizer, provider and logging settings.

mod settings;

pub use settings::{
    CardinalityOverride, LearnedSettings, LoggingSettings, OptimizerSettings, ProviderKind,
    Settings, SettingsError,
};
