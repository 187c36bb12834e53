//! Error types for the homelab sync system.
//!
//! Errors are split by where they originate: configuration loading,
//! the remote gateways, and the reconciliation protocol itself.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the homelab sync system.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote API errors.
    #[error("Remote API error: {0}")]
    Gateway(#[from] GatewayError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// No credential could be found.
    #[error("No API credential found: set {env_var} or provide {token_file}")]
    MissingCredential {
        /// Environment variable that overrides the secret file.
        env_var: String,
        /// Encrypted secret file that was looked up.
        token_file: PathBuf,
    },

    /// The secret file could not be decrypted.
    #[error("Failed to decrypt {path}: {message}")]
    SecretDecryption {
        /// Path to the encrypted file.
        path: PathBuf,
        /// Decryption failure detail.
        message: String,
    },

    /// Two desired entries produce the same identity.
    #[error("Duplicate {resource_type} name: {name}")]
    DuplicateName {
        /// Type of resource (hostname, resource, target).
        resource_type: String,
        /// The duplicated name.
        name: String,
    },
}

/// Errors produced by a remote gateway call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Authentication failed.
    #[error("authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// The remote API rejected the request.
    #[error("API error {status}: {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error body returned by the API.
        message: String,
    },

    /// Rate limited.
    #[error("rate limited by remote API")]
    RateLimited,

    /// Connection-level failure.
    #[error("network error: {message}")]
    Network {
        /// Description of the network error.
        message: String,
    },

    /// The per-call timeout elapsed.
    #[error("request timed out: {message}")]
    Timeout {
        /// Description of the timed out request.
        message: String,
    },

    /// Invalid response from API.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// The retry budget ran out.
    #[error("max retries ({attempts}) exceeded: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The error seen on the final attempt.
        last: Box<Self>,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// A named profile, folder, or site does not exist remotely.
    #[error("{kind} '{name}' not found (available: {})", available.join(", "))]
    TargetNotFound {
        /// What was looked up (profile, folder, site).
        kind: String,
        /// The name that failed to resolve.
        name: String,
        /// Names that do exist, for operator correction.
        available: Vec<String>,
    },

    /// A target filter named something absent from the configuration.
    #[error("target '{name}' is not configured (configured: {})", configured.join(", "))]
    TargetNotConfigured {
        /// The unknown target name.
        name: String,
        /// Target names present in the configuration.
        configured: Vec<String>,
    },

    /// A destructive command was invoked without its confirmation flag.
    #[error("{command} requires --confirm (or use --dry-run to preview)")]
    ConfirmationRequired {
        /// The refused command.
        command: String,
    },
}

/// Result type alias for homelab sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a parse error with an optional location.
    #[must_use]
    pub fn parse(message: impl Into<String>, location: Option<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location,
        }
    }
}

impl GatewayError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Returns true for a rate-limit response.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// Returns true for connection failures and timeouts.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(GatewayError::RateLimited.is_rate_limited());
        assert!(!GatewayError::RateLimited.is_transient());
        assert!(GatewayError::network("refused").is_transient());
        assert!(
            GatewayError::Timeout {
                message: String::from("30s")
            }
            .is_transient()
        );
        assert!(!GatewayError::api_error(500, "boom").is_transient());
        assert!(!GatewayError::api_error(500, "boom").is_rate_limited());
    }

    #[test]
    fn test_target_not_found_lists_alternatives() {
        let err = ReconcileError::TargetNotFound {
            kind: String::from("folder"),
            name: String::from("home-infra"),
            available: vec![String::from("ads"), String::from("iot")],
        };
        assert_eq!(
            err.to_string(),
            "folder 'home-infra' not found (available: ads, iot)"
        );
    }

    #[test]
    fn test_retries_exhausted_message() {
        let err = GatewayError::RetriesExhausted {
            attempts: 3,
            last: Box::new(GatewayError::RateLimited),
        };
        assert_eq!(
            err.to_string(),
            "max retries (3) exceeded: rate limited by remote API"
        );
    }
}
