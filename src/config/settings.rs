//! TOML-based configuration for reltrack.
//!
//! Supports a config file (reltrack.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [engine]
//! endpoint = "http://localhost:8080"
//! admin_secret = "${HASURA_GRAPHQL_ADMIN_SECRET}"
//! timeout_seconds = 30
//!
//! [source]
//! name = "default"
//! kind = "mssql"
//!
//! [inference]
//! name_case = "snake"
//! include_down_queries = false
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::inference::InferenceConfig;
use crate::metadata::{DataSource, GraphqlEngineClient, MetadataError, SourceKind, DEFAULT_TIMEOUT_SECS};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "RELTRACK_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to create engine client: {0}")]
    Client(#[from] MetadataError),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// GraphQL engine connection.
    pub engine: EngineSettings,

    /// Data source whose relationships are tracked.
    pub source: SourceSettings,

    /// Planning options.
    pub inference: InferenceConfig,
}

/// GraphQL engine connection settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Base URL (supports ${ENV_VAR} expansion).
    pub endpoint: String,

    /// Admin secret sent with every request (supports ${ENV_VAR} expansion).
    pub admin_secret: Option<String>,

    /// Per-request timeout.
    pub timeout_seconds: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            admin_secret: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl EngineSettings {
    /// Get the endpoint with environment variables expanded.
    pub fn resolved_endpoint(&self) -> Result<String, SettingsError> {
        let endpoint = expand_env_vars(&self.endpoint)?;
        if endpoint.trim().is_empty() {
            return Err(SettingsError::InvalidConfig("engine endpoint is empty".to_string()));
        }
        Ok(endpoint)
    }

    /// Get the admin secret with environment variables expanded.
    pub fn resolved_admin_secret(&self) -> Result<Option<String>, SettingsError> {
        self.admin_secret.as_deref().map(expand_env_vars).transpose()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Data source settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Source name as registered in the engine.
    pub name: String,

    /// Database kind (mssql, postgres).
    pub kind: SourceKind,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            kind: SourceKind::default(),
        }
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
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `RELTRACK_CONFIG`
    /// 2. `./reltrack.toml`
    /// 3. `~/.config/reltrack/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("reltrack.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("reltrack").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// The configured data source.
    pub fn data_source(&self) -> DataSource {
        DataSource::new(self.source.name.clone(), self.source.kind)
    }

    /// Build an engine client for the configured endpoint and source.
    pub fn engine_client(&self) -> Result<GraphqlEngineClient, SettingsError> {
        let client = GraphqlEngineClient::with_timeout(
            self.engine.resolved_endpoint()?,
            self.data_source(),
            self.engine.timeout(),
        )?;
        Ok(match self.engine.resolved_admin_secret()? {
            Some(secret) => client.with_admin_secret(secret),
            None => client,
        })
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A `$` not followed by a name is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let lookup = |name: String| env::var(&name).map_err(|_| SettingsError::MissingEnvVar(name));

    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        if chars.next_if_eq(&'{').is_some() {
            let var_name: String = chars.by_ref().take_while(|&ch| ch != '}').collect();
            result.push_str(&lookup(var_name)?);
        } else {
            let mut var_name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                result.push('$');
            } else {
                result.push_str(&lookup(var_name)?);
            }
        }
    }

    Ok(result)
}
