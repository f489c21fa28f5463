//! Environment constants and path utilities.
//!
//! Centralizes environment variable names, defaults and configuration file
//! locations so the CLI and the config loader agree on them.

use std::path::{Path, PathBuf};

/// Application directory name (hidden directory like .git, .vscode)
pub const APP_DIR_NAME: &str = ".dockbridge";

/// Configuration file name inside the application directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration file name in the current directory
pub const LOCAL_CONFIG_FILE_NAME: &str = "dockbridge.toml";

/// System-wide configuration file
#[cfg(unix)]
pub const SYSTEM_CONFIG_FILE: &str = "/etc/dockbridge/config.toml";

/// Environment variable names
pub mod vars {
    /// Default target container
    pub const CONTAINER: &str = "DOCKBRIDGE_CONTAINER";

    /// HTTP listening port
    pub const PORT: &str = "DOCKBRIDGE_PORT";

    /// HTTP bind address
    pub const BIND: &str = "DOCKBRIDGE_BIND";

    /// Bearer token for the HTTP transport
    pub const AUTH_TOKEN: &str = "DOCKBRIDGE_AUTH_TOKEN";

    /// Command timeout in seconds
    pub const TIMEOUT: &str = "DOCKBRIDGE_TIMEOUT";

    /// Docker daemon address, read by bollard
    pub const DOCKER_HOST: &str = "DOCKER_HOST";
}

/// Built-in defaults
pub mod defaults {
    /// HTTP port
    pub const PORT: u16 = 8080;

    /// HTTP bind address
    pub const BIND: &str = "127.0.0.1";

    /// JSON-RPC endpoint path
    pub const ENDPOINT: &str = "/mcp";

    /// Command timeout in seconds
    pub const TIMEOUT_SECS: u64 = 30;

    /// Docker API request timeout in seconds
    pub const DOCKER_TIMEOUT_SECS: u64 = 120;

    /// Maximum bytes of text returned by a tool
    pub const MAX_OUTPUT_BYTES: usize = 100_000;

    /// Grace period for stop and restart, in seconds
    pub const STOP_TIMEOUT_SECS: i32 = 10;
}

/// Build the application directory path under `root`
pub fn app_dir_path(root: &Path) -> PathBuf {
    root.join(APP_DIR_NAME)
}

/// Build config file path in user's home directory
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    app_dir_path(home_dir).join(CONFIG_FILE_NAME)
}

/// Build local config file path in the current directory
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    app_dir_path(current_dir).join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let home_dir = Path::new("/home/user");
        let current_dir = Path::new("/current/project");

        assert_eq!(
            user_config_file_path(home_dir),
            Path::new("/home/user/.dockbridge/config.toml")
        );

        assert_eq!(
            local_config_file_path(current_dir),
            Path::new("/current/project/.dockbridge/config.toml")
        );
    }
}
