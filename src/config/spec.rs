//! Configuration specification types for both integrations.
//!
//! These structs map to the `config.yaml`, `domains.yaml` and
//! `resources.yaml` files. They describe the desired state declaratively;
//! turning them into a [`DesiredResourceSet`](crate::resource::DesiredResourceSet)
//! happens in the `desired` module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::gateway::{RetryPolicy, TargetSpec, DEFAULT_TIMEOUT_SECS};

/// Default ControlD API endpoint.
pub const DEFAULT_CONTROLD_URL: &str = "https://api.controld.com";

/// Default suffix for Pangolin aliases.
pub const DEFAULT_PANGOLIN_SUFFIX: &str = "home.arpa";

/// Retry settings shared by both integrations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum attempts per remote call, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay in seconds between attempts.
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
}

/// ControlD `config.yaml`.
///
/// Accepts either a `profiles` list or the single-profile pair
/// `profile_name` + `folder_name`; the parser folds the latter into
/// `profiles`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlDConfig {
    /// API base URL.
    #[serde(default = "default_controld_url")]
    pub api_base_url: String,
    /// Profiles to manage.
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
    /// Single-profile form: profile name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
    /// Single-profile form: folder name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
    /// Default hostname suffixes.
    #[serde(default)]
    pub suffixes: Vec<String>,
    /// Retry settings.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// One managed ControlD profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileConfig {
    /// Profile name as shown in ControlD.
    pub name: String,
    /// Folder (rule group) holding the managed rules.
    pub folder_name: String,
}

/// ControlD `domains.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainsFile {
    /// Domain definitions.
    #[serde(default)]
    pub domains: Vec<DomainEntry>,
}

/// One domain definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainEntry {
    /// Short host name.
    pub name: String,
    /// Address the rule resolves to.
    pub ip: String,
    /// Extra short names resolving to the same address.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Suffixes overriding the configured defaults.
    #[serde(default)]
    pub suffixes: Option<Vec<String>>,
    /// Exact hostnames, bypassing suffix expansion.
    #[serde(default)]
    pub fqdn: Option<OneOrMany>,
}

/// A value that may be written as a scalar or a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneOrMany {
    /// Single value.
    One(String),
    /// List of values.
    Many(Vec<String>),
}

/// Pangolin `config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PangolinConfig {
    /// Pangolin base URL (without `/v1`).
    pub pangolin_url: String,
    /// Organization id.
    pub org_id: String,
    /// Sites to manage.
    #[serde(default)]
    pub sites: Vec<String>,
    /// Single-site form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    /// Suffix for generated aliases.
    #[serde(default = "default_pangolin_suffix")]
    pub default_suffix: String,
    /// Clients associated with every resource.
    #[serde(default)]
    pub default_clients: Vec<String>,
    /// Retry settings.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Pangolin `resources.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourcesFile {
    /// Resource definitions.
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
}

/// One private resource definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Resource name (its identity).
    pub name: String,
    /// Destination address; `ip` is accepted as a legacy name.
    #[serde(alias = "ip")]
    pub destination: String,
    /// DNS alias; defaults to `<name>.<default_suffix>`.
    #[serde(default)]
    pub alias: Option<String>,
    /// TCP port ranges.
    #[serde(default = "default_ports")]
    pub tcp_ports: String,
    /// UDP port ranges.
    #[serde(default = "default_ports")]
    pub udp_ports: String,
    /// Whether ICMP is blocked.
    #[serde(default)]
    pub disable_icmp: bool,
    /// Whether the resource is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_max_attempts() -> u32 {
    crate::gateway::DEFAULT_MAX_ATTEMPTS
}

fn default_base_delay_secs() -> u64 {
    crate::gateway::DEFAULT_BASE_DELAY.as_secs()
}

fn default_controld_url() -> String {
    String::from(DEFAULT_CONTROLD_URL)
}

fn default_pangolin_suffix() -> String {
    String::from(DEFAULT_PANGOLIN_SUFFIX)
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_ports() -> String {
    String::from("*")
}

const fn default_true() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
        }
    }
}

impl RetryConfig {
    /// Converts to a retry policy.
    #[must_use]
    pub const fn to_policy(self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.base_delay_secs))
    }
}

impl ControlDConfig {
    /// Returns the configured profiles as reconciliation targets.
    #[must_use]
    pub fn targets(&self) -> Vec<TargetSpec> {
        self.profiles
            .iter()
            .map(|p| TargetSpec::new(p.name.clone(), Some(p.folder_name.clone())))
            .collect()
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PangolinConfig {
    /// Returns the configured sites as reconciliation targets.
    #[must_use]
    pub fn targets(&self) -> Vec<TargetSpec> {
        self.sites.iter().map(TargetSpec::named).collect()
    }

    /// Returns the per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl OneOrMany {
    /// Returns the values as a list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value.clone()],
            Self::Many(values) => values.clone(),
        }
    }
}
