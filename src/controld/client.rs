//! ControlD gateway implementation.
//!
//! Targets are profiles, optionally narrowed to one rule folder. The
//! managed resources are the custom rules inside that folder, keyed by
//! hostname.

use async_trait::async_trait;
use reqwest::Method;
use std::fmt;
use tracing::{debug, info};

use crate::config::ControlDConfig;
use crate::error::{ReconcileError, Result, SyncError};
use crate::gateway::{ApiClient, RequestBody, ResourceGateway, Retrier, TargetSpec};
use crate::resource::{Attributes, CurrentResourceSnapshot, NamedResource};

use super::types::{
    action_code, decode_body, GroupsBody, Profile, ProfilesBody, RulesBody, ACTION_SPOOF,
    ATTR_ACTION, ATTR_ENABLED, ATTR_VIA,
};

/// Resolved ControlD target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlDScope {
    /// Profile id.
    pub profile_id: String,
    /// Profile name.
    pub profile_name: String,
    /// Folder id; `None` means the profile's root folder.
    pub folder_id: Option<i64>,
    /// Folder name.
    pub folder_name: Option<String>,
}

/// ControlD spoof-rule gateway.
#[derive(Debug, Clone)]
pub struct ControlDGateway {
    api: ApiClient,
}

impl ControlDGateway {
    /// Creates a gateway from configuration and an API token.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ControlDConfig, token: &str) -> Result<Self> {
        let api = ApiClient::new(
            &config.api_base_url,
            token,
            config.timeout(),
            Retrier::new(config.retry.to_policy()),
        )?;
        Ok(Self::with_client(api))
    }

    /// Creates a gateway over an existing API client.
    #[must_use]
    pub const fn with_client(api: ApiClient) -> Self {
        Self { api }
    }

    /// Lists the profiles on the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn profiles(&self) -> Result<Vec<Profile>> {
        let body: ProfilesBody = decode_body(self.api.get("/profiles").await?)?;
        Ok(body.profiles)
    }

    fn rules_path(scope: &ControlDScope) -> String {
        match scope.folder_id {
            Some(folder_id) => format!("/profiles/{}/rules/{folder_id}", scope.profile_id),
            None => format!("/profiles/{}/rules", scope.profile_id),
        }
    }

    /// Builds the form body shared by create and update.
    fn rule_form(
        scope: &ControlDScope,
        hostname: &str,
        attributes: &Attributes,
    ) -> Result<RequestBody> {
        let via = attributes
            .get(ATTR_VIA)
            .and_then(|v| v.as_text())
            .ok_or_else(|| SyncError::internal(format!("rule '{hostname}' has no address")))?;
        let action = attributes
            .get(ATTR_ACTION)
            .and_then(|v| v.as_text())
            .and_then(action_code)
            .unwrap_or(ACTION_SPOOF);
        let enabled = attributes
            .get(ATTR_ENABLED)
            .and_then(|v| v.as_flag())
            .unwrap_or(true);

        let mut pairs = vec![
            (String::from("hostnames[]"), hostname.to_string()),
            (String::from("do"), action.to_string()),
            (String::from("via"), via.to_string()),
            (String::from("status"), String::from(if enabled { "1" } else { "0" })),
        ];
        if let Some(folder_id) = scope.folder_id {
            pairs.push((String::from("group"), folder_id.to_string()));
        }
        Ok(RequestBody::Form(pairs))
    }
}

#[async_trait]
impl ResourceGateway for ControlDGateway {
    type Scope = ControlDScope;
    type Handle = String;

    fn resource_kind(&self) -> &'static str {
        "rule"
    }

    async fn resolve_target(&self, target: &TargetSpec) -> Result<ControlDScope> {
        let profiles = self.profiles().await?;
        let Some(profile) = profiles.iter().find(|p| p.name == target.name) else {
            return Err(ReconcileError::TargetNotFound {
                kind: String::from("profile"),
                name: target.name.clone(),
                available: profiles.into_iter().map(|p| p.name).collect(),
            }
            .into());
        };
        debug!("Resolved profile '{}' to {}", profile.name, profile.pk);

        let Some(folder_name) = &target.container else {
            return Ok(ControlDScope {
                profile_id: profile.pk.clone(),
                profile_name: profile.name.clone(),
                folder_id: None,
                folder_name: None,
            });
        };

        let path = format!("/profiles/{}/groups", profile.pk);
        let groups: GroupsBody = decode_body(self.api.get(&path).await?)?;
        let Some(folder) = groups.groups.iter().find(|g| &g.group == folder_name) else {
            return Err(ReconcileError::TargetNotFound {
                kind: String::from("folder"),
                name: folder_name.clone(),
                available: groups.groups.into_iter().map(|g| g.group).collect(),
            }
            .into());
        };

        Ok(ControlDScope {
            profile_id: profile.pk.clone(),
            profile_name: profile.name.clone(),
            folder_id: Some(folder.pk),
            folder_name: Some(folder.group.clone()),
        })
    }

    async fn list_resources(
        &self,
        scope: &ControlDScope,
    ) -> Result<CurrentResourceSnapshot<String>> {
        let body: RulesBody = decode_body(self.api.get(&Self::rules_path(scope)).await?)?;
        debug!("Fetched {} rules from {scope}", body.rules.len());

        let snapshot = CurrentResourceSnapshot::from_resources(body.rules.into_iter().map(|rule| {
            let attributes = rule.attributes();
            let hostname = rule.hostname;
            NamedResource::observed(hostname.clone(), attributes, hostname)
        }))?;
        Ok(snapshot)
    }

    async fn create_resource(
        &self,
        scope: &ControlDScope,
        resource: &NamedResource<String>,
    ) -> Result<String> {
        let body = Self::rule_form(scope, &resource.identity, &resource.attributes)?;
        let path = format!("/profiles/{}/rules", scope.profile_id);
        self.api.send(Method::POST, &path, &body).await?;
        info!("Created rule {}", resource.identity);
        Ok(resource.identity.clone())
    }

    async fn update_resource(
        &self,
        scope: &ControlDScope,
        handle: &String,
        identity: &str,
        attributes: &Attributes,
    ) -> Result<()> {
        let body = Self::rule_form(scope, handle, attributes)?;
        let path = format!("/profiles/{}/rules", scope.profile_id);
        self.api.send(Method::PUT, &path, &body).await?;
        info!("Updated rule {identity}");
        Ok(())
    }

    async fn delete_resource(&self, scope: &ControlDScope, handle: &String) -> Result<()> {
        let path = format!("/profiles/{}/rules/{handle}", scope.profile_id);
        self.api.send(Method::DELETE, &path, &RequestBody::Empty).await?;
        info!("Deleted rule {handle}");
        Ok(())
    }
}

impl fmt::Display for ControlDScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (PK: {})", self.profile_name, self.profile_id)?;
        match (&self.folder_name, self.folder_id) {
            (Some(name), Some(id)) => write!(f, " / {name} (PK: {id})"),
            _ => write!(f, " / root"),
        }
    }
}
