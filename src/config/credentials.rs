//! API credential loading.
//!
//! An environment variable wins; otherwise the credential is read from a
//! SOPS-encrypted YAML file by running `sops -d`.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

/// Where one integration's credential comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSource {
    /// Environment variable override.
    pub env_var: &'static str,
    /// SOPS-encrypted YAML file.
    pub token_file: PathBuf,
    /// Key inside the decrypted document.
    pub key: &'static str,
}

impl CredentialSource {
    /// ControlD API token source.
    #[must_use]
    pub fn controld(token_file: impl Into<PathBuf>) -> Self {
        Self {
            env_var: "CONTROLD_API_TOKEN",
            token_file: token_file.into(),
            key: "token",
        }
    }

    /// Pangolin API key source.
    #[must_use]
    pub fn pangolin(token_file: impl Into<PathBuf>) -> Self {
        Self {
            env_var: "PANGOLIN_API_KEY",
            token_file: token_file.into(),
            key: "pangolin_api_key",
        }
    }

    /// Loads the credential from the environment or the encrypted file.
    ///
    /// # Errors
    ///
    /// Returns an error if neither source yields a credential or the file
    /// cannot be decrypted.
    pub fn load(&self) -> Result<String> {
        self.resolve(std::env::var(self.env_var).ok())
    }

    /// Resolves the credential given the environment override value.
    fn resolve(&self, env_value: Option<String>) -> Result<String> {
        if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
            debug!("Using credential from {}", self.env_var);
            return Ok(value);
        }

        if !self.token_file.exists() {
            return Err(self.missing().into());
        }

        info!("Loading credential from {}", self.token_file.display());
        let decrypted = decrypt_with_sops(&self.token_file)?;
        extract_secret(&decrypted, self.key)?.ok_or_else(|| self.missing().into())
    }

    fn missing(&self) -> ConfigError {
        ConfigError::MissingCredential {
            env_var: self.env_var.to_string(),
            token_file: self.token_file.clone(),
        }
    }
}

/// Runs `sops -d <path>` and returns its stdout.
fn decrypt_with_sops(path: &Path) -> std::result::Result<String, ConfigError> {
    let output = Command::new("sops")
        .arg("-d")
        .arg(path)
        .output()
        .map_err(|e| ConfigError::SecretDecryption {
            path: path.to_path_buf(),
            message: if e.kind() == std::io::ErrorKind::NotFound {
                String::from("'sops' command not found")
            } else {
                e.to_string()
            },
        })?;

    if !output.status.success() {
        return Err(ConfigError::SecretDecryption {
            path: path.to_path_buf(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|e| ConfigError::SecretDecryption {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Reads a string value from a decrypted YAML document.
fn extract_secret(document: &str, key: &str) -> std::result::Result<Option<String>, ConfigError> {
    let value: serde_yaml::Value = serde_yaml::from_str(document)
        .map_err(|e| ConfigError::parse(format!("Invalid secret document: {e}"), None))?;

    Ok(value
        .get(key)
        .and_then(serde_yaml::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from))
}
