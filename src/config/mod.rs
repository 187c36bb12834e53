//! Configuration module for the homelab sync system.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing the `config.yaml`, `domains.yaml` and
//!   `resources.yaml` files of both integrations
//! - Validation of configuration values
//! - Building desired resource sets
//! - Loading API credentials
//! - Computing desired-state hashes for change detection

mod credentials;
mod desired;
mod hash;
mod parser;
mod spec;
mod validator;

pub use credentials::CredentialSource;
pub use desired::{controld_desired, expand_hostnames, pangolin_desired, resource_fields};
pub use hash::ConfigHasher;
pub use parser::{find_config_file, find_repo_root, ConfigParser, APP_DIR_NAME, CONFIG_FILE_NAME};
pub use spec::{
    ControlDConfig, DomainEntry, DomainsFile, OneOrMany, PangolinConfig, ProfileConfig,
    ResourceEntry, ResourcesFile, RetryConfig, DEFAULT_CONTROLD_URL, DEFAULT_PANGOLIN_SUFFIX,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult, MAX_BASE_DELAY_SECS};
