//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "POSTULA_ROOT_FOLDER";

/// Service settings from the `[service]` table of config.toml
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind: String,
    pub port: u16,
    /// Database file name, relative to the root folder
    pub database_file: String,
    /// Snapshots buffered per subscriber before it is reported as lagging
    pub event_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 5740,
            database_file: "postula.db".to_string(),
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    root_folder: Option<PathBuf>,
    #[serde(default)]
    service: ServiceConfig,
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. `root_folder` in the TOML config file
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config_file: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    if let Some(path) = config_file {
        if let Some(root_folder) = parse_config_file(path)?.root_folder {
            return Ok(root_folder);
        }
    }

    Ok(default_root_folder())
}

/// Load `[service]` settings, falling back to defaults when no file exists
pub fn load_service_config(config_file: Option<&Path>) -> Result<ServiceConfig> {
    match config_file {
        Some(path) => Ok(parse_config_file(path)?.service),
        None => {
            debug!("No config file found, using default service settings");
            Ok(ServiceConfig::default())
        }
    }
}

fn parse_config_file(path: &Path) -> Result<TomlConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Config file {} disappeared, using defaults", path.display());
            return Ok(TomlConfig::default());
        }
        Err(e) => return Err(e.into()),
    };

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Locate the config file for the platform, if one exists
///
/// Linux checks `~/.config/postula/config.toml` then `/etc/postula/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("postula").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/postula/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/postula (or /var/lib/postula for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("postula"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/postula"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("postula"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/postula"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("postula"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\postula"))
    } else {
        PathBuf::from("./postula_data")
    }
}
