// ABOUTME: TOML configuration for the engine host.
// ABOUTME: Selects a runtime by type and carries host context and handshake tuning.

use crate::coordinator::CoordinatorOptions;
use crate::runtime::HostContext;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub host: HostContext,
    #[serde(default)]
    pub handshake: HandshakeConfig,
}

/// Runtime configuration with type discriminator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Runtime type: "scripted", etc.
    #[serde(rename = "type")]
    pub runtime_type: String,

    /// Remaining fields passed to the runtime factory
    #[serde(flatten)]
    pub config: toml::Table,
}

/// Startup handshake tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeConfig {
    #[serde(flatten)]
    pub options: CoordinatorOptions,

    /// How long the host supervises startup before giving up on the worker
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
}

fn default_startup_timeout_secs() -> u64 {
    30
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            options: CoordinatorOptions::default(),
            startup_timeout_secs: default_startup_timeout_secs(),
        }
    }
}

impl HandshakeConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    /// Find config file in standard locations
    /// Searches: ./engine-host.toml, ~/.config/engine-host/config.toml
    pub fn find_and_load() -> Result<Option<Self>> {
        let candidates = [
            std::env::current_dir()
                .ok()
                .map(|p| p.join("engine-host.toml")),
            user_config_dir().map(|p| p.join("engine-host/config.toml")),
        ];

        for candidate in candidates.into_iter().flatten() {
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "Found config file");
                return Ok(Some(Self::from_file(&candidate)?));
            }
        }

        Ok(None)
    }
}

impl RuntimeConfig {
    /// Get runtime type name
    pub fn runtime_type(&self) -> &str {
        &self.runtime_type
    }

    /// Convert config table to serde_json::Value for the registry
    pub fn to_json_value(&self) -> serde_json::Value {
        let json_str = serde_json::to_string(&self.config).unwrap_or_default();
        serde_json::from_str(&json_str).unwrap_or(serde_json::json!({}))
    }
}

/// Get user config directory
fn user_config_dir() -> Option<std::path::PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| std::path::PathBuf::from(h).join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scripted_runtime() {
        let toml = r#"
[runtime]
type = "scripted"
ready_after_ms = 5

[host]
app_id = "example.app"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.runtime.runtime_type, "scripted");
        assert_eq!(config.host.app_id, "example.app");
        assert_eq!(config.host.data_dir, None);

        let json = config.runtime.to_json_value();
        assert_eq!(json["ready_after_ms"], 5);
    }

    #[test]
    fn test_handshake_defaults() {
        let toml = r#"
[runtime]
type = "scripted"

[host]
app_id = "example.app"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.handshake.options.entry_point, "runEngine");
        assert_eq!(config.handshake.options.ready_method, "controlReady");
        assert_eq!(config.handshake.startup_timeout_secs, 30);
    }

    #[test]
    fn test_handshake_overrides() {
        let toml = r#"
[runtime]
type = "scripted"

[host]
app_id = "example.app"
data_dir = "/var/lib/example"

[handshake]
entry_point = "boot"
ready_method = "engineUp"
startup_timeout_secs = 5
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.handshake.options.entry_point, "boot");
        assert_eq!(config.handshake.options.ready_method, "engineUp");
        assert_eq!(config.handshake.startup_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.host.data_dir.as_deref(),
            Some(Path::new("/var/lib/example"))
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine-host.toml");
        std::fs::write(
            &path,
            r#"
[runtime]
type = "scripted"

[host]
app_id = "example.app"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.runtime.runtime_type, "scripted");

        let missing = Config::from_file(&dir.path().join("missing.toml"));
        assert!(missing.is_err());
    }
}
