//! Test doubles shared by unit tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{GatewayError, ReconcileError, Result};
use crate::gateway::{ResourceGateway, Sleeper, TargetSpec};
use crate::resource::{AttributeValue, Attributes, CurrentResourceSnapshot, NamedResource};

/// Sleeper that records requested waits instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// A gateway call as observed by [`FakeGateway`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Call {
    Resolve(String),
    List(String),
    Create(String),
    Update(String),
    Delete(String),
}

impl Call {
    pub const fn is_mutating(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Update(_) | Self::Delete(_))
    }
}

/// In-memory gateway keyed by target name.
///
/// Scopes are target names and handles are identities. Successful
/// mutations are applied to the in-memory state.
#[derive(Debug, Default)]
pub struct FakeGateway {
    targets: Mutex<BTreeMap<String, BTreeMap<String, Attributes>>>,
    failing: BTreeSet<Call>,
    calls: Mutex<Vec<Call>>,
}

pub fn via(ip: &str) -> Attributes {
    Attributes::from([(String::from("via"), AttributeValue::from(ip))])
}

pub fn desired(pairs: &[(&str, &str)]) -> crate::resource::DesiredResourceSet {
    crate::resource::DesiredResourceSet::from_entries(pairs.iter().map(|(k, ip)| (*k, via(ip))))
        .unwrap()
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target holding `resources` as `(identity, via)` pairs.
    pub fn with_target(self, name: &str, resources: &[(&str, &str)]) -> Self {
        self.targets.lock().unwrap().insert(
            name.to_string(),
            resources
                .iter()
                .map(|(id, ip)| ((*id).to_string(), via(ip)))
                .collect(),
        );
        self
    }

    /// Makes the given call fail with a remote rejection.
    pub fn failing(mut self, call: Call) -> Self {
        self.failing.insert(call);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    pub fn resources(&self, target: &str) -> BTreeMap<String, Attributes> {
        self.targets
            .lock()
            .unwrap()
            .get(target)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call.clone());
        if self.failing.contains(&call) {
            return Err(GatewayError::api_error(400, format!("scripted failure: {call:?}")).into());
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceGateway for FakeGateway {
    type Scope = String;
    type Handle = String;

    fn resource_kind(&self) -> &'static str {
        "rule"
    }

    async fn resolve_target(&self, target: &TargetSpec) -> Result<String> {
        self.record(Call::Resolve(target.name.clone()))?;
        let targets = self.targets.lock().unwrap();
        if targets.contains_key(&target.name) {
            Ok(target.name.clone())
        } else {
            Err(ReconcileError::TargetNotFound {
                kind: String::from("profile"),
                name: target.name.clone(),
                available: targets.keys().cloned().collect(),
            }
            .into())
        }
    }

    async fn list_resources(&self, scope: &String) -> Result<CurrentResourceSnapshot<String>> {
        self.record(Call::List(scope.clone()))?;
        let resources = self.resources(scope);
        Ok(CurrentResourceSnapshot::from_resources(
            resources
                .into_iter()
                .map(|(id, attrs)| NamedResource::observed(id.clone(), attrs, id)),
        )?)
    }

    async fn create_resource(
        &self,
        scope: &String,
        resource: &NamedResource<String>,
    ) -> Result<String> {
        self.record(Call::Create(resource.identity.clone()))?;
        if let Some(target) = self.targets.lock().unwrap().get_mut(scope) {
            target.insert(resource.identity.clone(), resource.attributes.clone());
        }
        Ok(resource.identity.clone())
    }

    async fn update_resource(
        &self,
        scope: &String,
        handle: &String,
        identity: &str,
        attributes: &Attributes,
    ) -> Result<()> {
        self.record(Call::Update(identity.to_string()))?;
        if let Some(target) = self.targets.lock().unwrap().get_mut(scope) {
            target.insert(handle.clone(), attributes.clone());
        }
        Ok(())
    }

    async fn delete_resource(&self, scope: &String, handle: &String) -> Result<()> {
        self.record(Call::Delete(handle.clone()))?;
        if let Some(target) = self.targets.lock().unwrap().get_mut(scope) {
            target.remove(handle);
        }
        Ok(())
    }
}
