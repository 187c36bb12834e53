//! Remote resource gateway abstraction.
//!
//! Each integration supplies a [`ResourceGateway`] adapter. The reconciler
//! is written once against this trait and never sees HTTP details.

mod http;
mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::resource::{Attributes, CurrentResourceSnapshot, NamedResource};

pub use http::{ApiClient, RequestBody, DEFAULT_TIMEOUT_SECS};
pub use retry::{
    Retrier, RetryPolicy, Sleeper, TokioSleeper, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS,
};

/// A named reconciliation target as written in configuration.
///
/// `name` is the profile or site; `container` is the optional folder
/// inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Profile or site name.
    pub name: String,
    /// Folder (or other sub-container) name, if the integration has one.
    #[serde(default)]
    pub container: Option<String>,
}

/// Capability set over a remote CRUD API.
///
/// Every network call made by an implementation is wrapped in the
/// bounded retry policy of its [`Retrier`].
#[async_trait]
pub trait ResourceGateway: Send + Sync {
    /// Resolved scope (remote ids of the profile/folder or site).
    type Scope: Send + Sync + fmt::Display;
    /// Remote handle needed for update and delete.
    type Handle: Clone + Send + Sync + fmt::Debug;

    /// Name of the managed resource kind, used in reports.
    fn resource_kind(&self) -> &'static str;

    /// Returns true if a `--target` entry selects the configured target
    /// name. Exact by default.
    fn target_matches(&self, configured: &str, requested: &str) -> bool {
        configured == requested
    }

    /// Resolves a configured target name to remote identifiers.
    async fn resolve_target(&self, target: &TargetSpec) -> Result<Self::Scope>;

    /// Fetches every resource currently inside the scope.
    async fn list_resources(
        &self,
        scope: &Self::Scope,
    ) -> Result<CurrentResourceSnapshot<Self::Handle>>;

    /// Creates a resource and returns its remote handle.
    async fn create_resource(
        &self,
        scope: &Self::Scope,
        resource: &NamedResource<Self::Handle>,
    ) -> Result<Self::Handle>;

    /// Replaces the attributes of an existing resource.
    async fn update_resource(
        &self,
        scope: &Self::Scope,
        handle: &Self::Handle,
        identity: &str,
        attributes: &Attributes,
    ) -> Result<()>;

    /// Deletes a resource by handle.
    async fn delete_resource(&self, scope: &Self::Scope, handle: &Self::Handle) -> Result<()>;
}

impl TargetSpec {
    /// Creates a target with a folder.
    #[must_use]
    pub fn new(name: impl Into<String>, container: Option<String>) -> Self {
        Self {
            name: name.into(),
            container,
        }
    }

    /// Creates a target without a folder.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.container {
            Some(container) => write!(f, "{}/{container}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
