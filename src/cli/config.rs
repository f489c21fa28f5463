//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Explicit `--config` path
//! 2. Current directory: ./dockbridge.toml or ./.dockbridge/config.toml
//! 3. User config: ~/.dockbridge/config.toml
//! 4. System config: /etc/dockbridge/config.toml
//! 5. Built-in defaults
//!
//! Command line flags and environment variables are applied on top of whatever
//! was loaded, see [`ConfigOverrides`].

use crate::container::{ContainerClientConfig, ContainerOrchestratorConfig};
use crate::env::{self, defaults};
use crate::mcp::HttpOptions;
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fmt::Write as _;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Shown in place of secrets.
const REDACTED: &str = "<redacted>";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Container targeted when a tool call does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    pub http: HttpConfig,
    pub docker: DockerConfig,
    pub tools: ToolsConfig,
}

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: defaults::BIND.to_string(),
            port: defaults::PORT,
            endpoint: defaults::ENDPOINT.to_string(),
            auth_token: None,
        }
    }
}

/// Docker connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Daemon address; bollard defaults (and `DOCKER_HOST`) apply when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub timeout_secs: u64,
    pub stop_timeout_secs: i32,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: None,
            timeout_secs: defaults::DOCKER_TIMEOUT_SECS,
            stop_timeout_secs: defaults::STOP_TIMEOUT_SECS,
        }
    }
}

/// Tool execution limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Per-command timeout in seconds
    pub timeout_secs: u64,
    /// Maximum bytes of text a tool returns
    pub max_output_bytes: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::TIMEOUT_SECS,
            max_output_bytes: defaults::MAX_OUTPUT_BYTES,
        }
    }
}

/// Values from flags and environment variables. `None` keeps the file value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub container: Option<String>,
    pub timeout_secs: Option<u64>,
    pub docker_host: Option<String>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub endpoint: Option<String>,
    pub auth_token: Option<String>,
}

impl ServerConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Serialize as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Copy with the auth token masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.http.auth_token.is_some() {
            config.http.auth_token = Some(REDACTED.to_string());
        }
        config
    }

    /// Apply flag and environment values over the loaded configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        fn non_empty(value: &Option<String>) -> Option<String> {
            value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
        }

        if let Some(container) = non_empty(&overrides.container) {
            self.container = Some(container);
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.tools.timeout_secs = timeout;
        }
        if let Some(host) = non_empty(&overrides.docker_host) {
            self.docker.host = Some(host);
        }
        if let Some(bind) = non_empty(&overrides.bind) {
            self.http.bind = bind;
        }
        if let Some(port) = overrides.port {
            self.http.port = port;
        }
        if let Some(endpoint) = non_empty(&overrides.endpoint) {
            self.http.endpoint = endpoint;
        }
        if let Some(token) = non_empty(&overrides.auth_token) {
            self.http.auth_token = Some(token);
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "tools.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.tools.max_output_bytes == 0 {
            return Err(ConfigError::Invalid(
                "tools.max_output_bytes must be at least 1".to_string(),
            ));
        }
        if !self.http.endpoint.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "http.endpoint must start with '/' (got {:?})",
                self.http.endpoint
            )));
        }
        if self.http.endpoint == "/health" {
            return Err(ConfigError::Invalid(
                "http.endpoint must not be /health".to_string(),
            ));
        }
        if self.docker.stop_timeout_secs < 0 {
            return Err(ConfigError::Invalid(
                "docker.stop_timeout_secs must not be negative".to_string(),
            ));
        }
        self.socket_addr().map(|_| ())
    }

    /// Address the HTTP transport listens on.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.http.bind.parse().map_err(|_| {
            ConfigError::Invalid(format!("http.bind is not an IP address: {:?}", self.http.bind))
        })?;
        Ok(SocketAddr::new(ip, self.http.port))
    }

    /// Settings for [`crate::mcp::http::serve`].
    pub fn http_options(&self) -> Result<HttpOptions, ConfigError> {
        Ok(HttpOptions {
            addr: self.socket_addr()?,
            endpoint: self.http.endpoint.clone(),
            auth_token: self.http.auth_token.clone(),
        })
    }

    /// Docker client settings. The daemon is not pinged at startup so that an
    /// unreachable daemon surfaces as tool errors.
    pub fn client_config(&self) -> ContainerClientConfig {
        ContainerClientConfig {
            docker_host: self.docker.host.clone(),
            timeout: self.docker.timeout_secs,
            verify: false,
        }
    }

    pub fn orchestrator_config(&self) -> ContainerOrchestratorConfig {
        ContainerOrchestratorConfig {
            stop_timeout: self.docker.stop_timeout_secs,
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.timeout_secs)
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load the configuration (explicit path or discovery hierarchy), apply
    /// overrides and validate. Returns the file used, if any.
    pub fn load(
        overrides: &ConfigOverrides,
    ) -> Result<(ServerConfig, Option<PathBuf>), ConfigError> {
        let (mut config, source) = match overrides.config_path.as_deref() {
            Some(path) => {
                info!("Loading configuration from: {:?}", path);
                (ServerConfig::from_toml_file(path)?, Some(path.to_path_buf()))
            }
            None => Self::discover_config()?,
        };

        config.apply_overrides(overrides);
        config.validate()?;
        Ok((config, source))
    }

    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> Result<(ServerConfig, Option<PathBuf>), ConfigError> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            let config = ServerConfig::from_toml_file(&config_path)?;
            return Ok((config, Some(config_path)));
        }

        debug!("No configuration file found, using defaults");
        Ok((ServerConfig::default(), None))
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        Self::get_config_candidates()
            .into_iter()
            .inspect(|candidate| debug!("Checking for config file: {:?}", candidate))
            .find(|candidate| candidate.is_file())
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join(env::LOCAL_CONFIG_FILE_NAME));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::get_home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        #[cfg(unix)]
        candidates.push(PathBuf::from(env::SYSTEM_CONFIG_FILE));

        candidates
    }

    /// Get home directory path
    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
    }

    /// Discovery hierarchy and the effective configuration, secrets redacted.
    pub fn discovery_report(
        config: &ServerConfig,
        source: Option<&Path>,
    ) -> Result<String, ConfigError> {
        let mut report = String::from("Configuration Discovery Hierarchy:\n\n");

        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.is_file() {
                "✓ EXISTS"
            } else if candidate.exists() {
                "✗ NOT A FILE"
            } else {
                "✗ NOT FOUND"
            };
            let _ = writeln!(report, "  {}. {:?} - {}", i + 1, candidate, status);
        }

        report.push('\n');
        match source {
            Some(path) => {
                let _ = writeln!(report, "Active configuration: {:?}", path);
            }
            None => report.push_str("Active configuration: Built-in defaults\n"),
        }

        report.push_str("\nEffective configuration:\n\n");
        report.push_str(&config.redacted().to_toml_string()?);
        Ok(report)
    }
}
