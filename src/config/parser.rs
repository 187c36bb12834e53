//! Configuration parser for loading configuration files.
//!
//! This module loads the YAML files of both integrations, normalizes the
//! single-target shorthands, and locates the files when no explicit path
//! is given.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::spec::{
    ControlDConfig, DomainEntry, DomainsFile, PangolinConfig, ProfileConfig, ResourceEntry,
    ResourcesFile,
};

/// Name of the main configuration file.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Directory name under the user config dir.
pub const APP_DIR_NAME: &str = "homesync";

/// Configuration parser.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving `.env`.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path used to find `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads and deserializes a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or invalid.
    pub fn load_yaml<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Result<T> {
        let path = path.as_ref();
        info!("Loading {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::parse(
                format!("Failed to read file: {e}"),
                Some(path.display().to_string()),
            )
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml<T: DeserializeOwned>(&self, content: &str, source: Option<&Path>) -> Result<T> {
        serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            ConfigError::parse(format!("YAML parse error: {e}"), location).into()
        })
    }

    /// Loads a ControlD `config.yaml` and folds the single-profile form
    /// into `profiles`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or names no profile.
    pub fn load_controld(&self, path: impl AsRef<Path>) -> Result<ControlDConfig> {
        let config: ControlDConfig = self.load_yaml(path)?;
        Ok(normalize_controld(config)?)
    }

    /// Parses a ControlD `config.yaml` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or names no profile.
    pub fn parse_controld(&self, content: &str) -> Result<ControlDConfig> {
        let config: ControlDConfig = self.parse_yaml(content, None)?;
        Ok(normalize_controld(config)?)
    }

    /// Loads the domain list from `domains.yaml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded.
    pub fn load_domains(&self, path: impl AsRef<Path>) -> Result<Vec<DomainEntry>> {
        let file: DomainsFile = self.load_yaml(path)?;
        debug!("Loaded {} domains", file.domains.len());
        Ok(file.domains)
    }

    /// Loads a Pangolin `config.yaml` and folds `site_name` into `sites`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or names no site.
    pub fn load_pangolin(&self, path: impl AsRef<Path>) -> Result<PangolinConfig> {
        let config: PangolinConfig = self.load_yaml(path)?;
        Ok(normalize_pangolin(config)?)
    }

    /// Parses a Pangolin `config.yaml` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or names no site.
    pub fn parse_pangolin(&self, content: &str) -> Result<PangolinConfig> {
        let config: PangolinConfig = self.parse_yaml(content, None)?;
        Ok(normalize_pangolin(config)?)
    }

    /// Loads the resource list from `resources.yaml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded.
    pub fn load_resources(&self, path: impl AsRef<Path>) -> Result<Vec<ResourceEntry>> {
        let file: ResourcesFile = self.load_yaml(path)?;
        debug!("Loaded {} resources", file.resources.len());
        Ok(file.resources)
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ConfigError::parse(
                    format!("Failed to load .env file: {e}"),
                    Some(env_path.display().to_string()),
                )
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Folds `profile_name` + `folder_name` into `profiles`.
fn normalize_controld(mut config: ControlDConfig) -> std::result::Result<ControlDConfig, ConfigError> {
    if config.profiles.is_empty() {
        match (config.profile_name.take(), config.folder_name.take()) {
            (Some(name), Some(folder_name)) => {
                config.profiles.push(ProfileConfig { name, folder_name });
            }
            _ => {
                return Err(ConfigError::validation(
                    "Config must have either a non-empty 'profiles' list or both 'profile_name' and 'folder_name'",
                    "profiles",
                ));
            }
        }
    }
    Ok(config)
}

/// Folds `site_name` into `sites`.
fn normalize_pangolin(mut config: PangolinConfig) -> std::result::Result<PangolinConfig, ConfigError> {
    if config.sites.is_empty() {
        match config.site_name.take() {
            Some(site) => config.sites.push(site),
            None => {
                return Err(ConfigError::validation(
                    "Config must have either a non-empty 'sites' list or 'site_name'",
                    "sites",
                ));
            }
        }
    }
    Ok(config)
}

/// Finds `<integration>/config.yaml`.
///
/// Searches `start_dir` and its ancestors for `<integration>/config.yaml`
/// or `scripts/<integration>/config.yaml`, then falls back to the user
/// config directory (`homesync/<integration>/config.yaml`).
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>, integration: &str) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for candidate in [
            current.join(integration).join(CONFIG_FILE_NAME),
            current.join("scripts").join(integration).join(CONFIG_FILE_NAME),
        ] {
            if candidate.exists() {
                info!("Found configuration file: {}", candidate.display());
                return Ok(candidate);
            }
        }

        if !current.pop() {
            break;
        }
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join(APP_DIR_NAME).join(integration).join(CONFIG_FILE_NAME);
        if candidate.exists() {
            info!("Found configuration file: {}", candidate.display());
            return Ok(candidate);
        }
    }

    Err(ConfigError::FileNotFound {
        path: start.join(integration).join(CONFIG_FILE_NAME),
    }
    .into())
}

/// Finds the repository root (the nearest ancestor holding `.git`),
/// or returns `start_dir` itself.
#[must_use]
pub fn find_repo_root(start_dir: impl AsRef<Path>) -> PathBuf {
    let start = start_dir.as_ref();
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .unwrap_or(start)
        .to_path_buf()
}
