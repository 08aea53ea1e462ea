//! Configuration module for reltrack.
//!
//! Handles the engine endpoint, the data source, and planning options.

mod settings;

pub use settings::{
    expand_env_vars, EngineSettings, Settings, SettingsError, SourceSettings, CONFIG_ENV_VAR,
};
