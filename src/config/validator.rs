//! Configuration validation for both integrations.
//!
//! Collects every error and warning in one pass so an operator can fix a
//! file in one go; the first error is surfaced as the failure.

use std::collections::HashSet;
use std::net::IpAddr;
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};

use super::spec::{ControlDConfig, DomainEntry, PangolinConfig, ResourceEntry, RetryConfig};

/// Upper bound for `retry.base_delay_secs`.
pub const MAX_BASE_DELAY_SECS: u64 = 300;

/// Validator for integration configurations.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ValidationResult {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Returns the result, or the first error.
    fn finish(self) -> Result<Self> {
        for warning in &self.warnings {
            warn!("{warning}");
        }

        if let Some(first) = self.errors.first() {
            return Err(ConfigError::ValidationError {
                message: first.message.clone(),
                field: Some(first.field.clone()),
            }
            .into());
        }

        debug!("Configuration validation passed");
        Ok(self)
    }
}

impl ConfigValidator {
    /// Validates a ControlD configuration and its domain definitions.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate_controld(
        config: &ControlDConfig,
        domains: &[DomainEntry],
    ) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_url("api_base_url", &config.api_base_url, &mut result);
        Self::validate_retry(&config.retry, &mut result);

        if config.profiles.is_empty() {
            result.error("profiles", "At least one profile must be configured");
        }
        let mut seen = HashSet::new();
        for (i, profile) in config.profiles.iter().enumerate() {
            if profile.name.trim().is_empty() {
                result.error(format!("profiles[{i}].name"), "Profile name cannot be empty");
            }
            if profile.folder_name.trim().is_empty() {
                result.error(
                    format!("profiles[{i}].folder_name"),
                    "Folder name cannot be empty",
                );
            }
            // One folder per profile: rules are keyed by hostname profile-wide.
            if !seen.insert(profile.name.trim()) {
                result.error(
                    format!("profiles[{i}].name"),
                    format!("Profile '{}' is configured more than once", profile.name),
                );
            }
        }

        for (i, suffix) in config.suffixes.iter().enumerate() {
            if !is_valid_hostname(suffix.trim_start_matches('.')) {
                result.error(format!("suffixes[{i}]"), format!("Invalid suffix '{suffix}'"));
            }
        }

        Self::validate_domains(domains, config.suffixes.is_empty(), &mut result);

        result.finish()
    }

    /// Validates domain entries.
    fn validate_domains(domains: &[DomainEntry], no_default_suffixes: bool, result: &mut ValidationResult) {
        if domains.is_empty() {
            result
                .warnings
                .push(String::from("No domains defined; sync will remove every managed rule"));
        }

        for (i, domain) in domains.iter().enumerate() {
            let prefix = format!("domains[{i}]");

            if domain.ip.parse::<IpAddr>().is_err() {
                result.error(
                    format!("{prefix}.ip"),
                    format!("'{}' is not a valid IP address", domain.ip),
                );
            }

            match &domain.fqdn {
                Some(fqdn) => {
                    for host in fqdn.to_vec() {
                        if !is_valid_hostname(&host) {
                            result.error(format!("{prefix}.fqdn"), format!("Invalid hostname '{host}'"));
                        }
                    }
                }
                None => {
                    for short in std::iter::once(&domain.name).chain(&domain.aliases) {
                        if !is_valid_hostname(short) {
                            result.error(
                                format!("{prefix}.name"),
                                format!("Invalid host name '{short}'"),
                            );
                        }
                    }
                    let no_suffixes = domain
                        .suffixes
                        .as_ref()
                        .map_or(no_default_suffixes, Vec::is_empty);
                    if no_suffixes {
                        result.warnings.push(format!(
                            "{prefix}: '{}' has no suffixes and produces no hostnames",
                            domain.name
                        ));
                    }
                }
            }
        }
    }

    /// Validates a Pangolin configuration and its resource definitions.
    ///
    /// # Errors
    ///
    /// Returns the first validation error found.
    pub fn validate_pangolin(
        config: &PangolinConfig,
        resources: &[ResourceEntry],
    ) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_url("pangolin_url", &config.pangolin_url, &mut result);
        Self::validate_retry(&config.retry, &mut result);

        if config.org_id.trim().is_empty() {
            result.error("org_id", "Organization id cannot be empty");
        }
        if config.sites.is_empty() {
            result.error("sites", "At least one site must be configured");
        }
        let mut seen = HashSet::new();
        for (i, site) in config.sites.iter().enumerate() {
            if site.trim().is_empty() {
                result.error(format!("sites[{i}]"), "Site name cannot be empty");
            } else if !seen.insert(site.to_lowercase()) {
                result.error(format!("sites[{i}]"), format!("Duplicate site: {site}"));
            }
        }
        if !is_valid_hostname(&config.default_suffix) {
            result.error(
                "default_suffix",
                format!("Invalid suffix '{}'", config.default_suffix),
            );
        }

        if resources.is_empty() {
            result
                .warnings
                .push(String::from("No resources defined; sync will remove every resource"));
        }

        for (i, resource) in resources.iter().enumerate() {
            Self::validate_resource(&format!("resources[{i}]"), resource, &mut result);
        }

        result.finish()
    }

    /// Validates one private resource.
    fn validate_resource(prefix: &str, resource: &ResourceEntry, result: &mut ValidationResult) {
        if resource.name.trim().is_empty() {
            result.error(format!("{prefix}.name"), "Resource name cannot be empty");
        }

        if resource.destination.parse::<IpAddr>().is_err() && !is_valid_hostname(&resource.destination) {
            result.error(
                format!("{prefix}.destination"),
                format!("'{}' is not an IP address or hostname", resource.destination),
            );
        }

        if let Some(alias) = &resource.alias
            && !is_valid_hostname(alias)
        {
            result.error(format!("{prefix}.alias"), format!("Invalid alias '{alias}'"));
        }

        for (field, spec) in [("tcp_ports", &resource.tcp_ports), ("udp_ports", &resource.udp_ports)] {
            if !is_valid_port_spec(spec) {
                result.error(
                    format!("{prefix}.{field}"),
                    format!("Invalid port range '{spec}'. Use '*' or a list like '80,443,8000-9000'."),
                );
            }
        }
    }

    fn validate_url(field: &str, url: &str, result: &mut ValidationResult) {
        if url.trim().is_empty() {
            result.error(field, "URL cannot be empty");
        } else if !(url.starts_with("https://") || url.starts_with("http://")) {
            result.error(field, format!("URL '{url}' must start with http:// or https://"));
        } else if url.starts_with("http://") {
            result.warnings.push(format!("{field}: '{url}' is not using TLS"));
        }
    }

    fn validate_retry(retry: &RetryConfig, result: &mut ValidationResult) {
        if retry.max_attempts == 0 {
            result.error("retry.max_attempts", "max_attempts must be at least 1");
        }
        if retry.base_delay_secs > MAX_BASE_DELAY_SECS {
            result.error(
                "retry.base_delay_secs",
                format!("base_delay_secs must be at most {MAX_BASE_DELAY_SECS}"),
            );
        }
    }
}

/// Checks if a hostname is made of valid DNS labels.
///
/// A leading `*.` wildcard label is accepted.
fn is_valid_hostname(host: &str) -> bool {
    let host = host.strip_prefix("*.").unwrap_or(host);
    if host.is_empty() || host.len() > 253 {
        return false;
    }

    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

/// Checks a port range string: `*` or a comma list of ports and ranges.
fn is_valid_port_spec(spec: &str) -> bool {
    if spec.trim() == "*" {
        return true;
    }

    let port = |s: &str| s.trim().parse::<u16>().ok().filter(|p| *p > 0);

    !spec.trim().is_empty()
        && spec.split(',').all(|part| match part.split_once('-') {
            Some((start, end)) => matches!((port(start), port(end)), (Some(a), Some(b)) if a <= b),
            None => port(part).is_some(),
        })
}
