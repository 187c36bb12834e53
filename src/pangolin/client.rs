//! Pangolin gateway implementation.
//!
//! Targets are sites within one organization. The managed resources are
//! the site's private resources, keyed by name. Client associations are a
//! gateway setting applied to every create and update, not part of the
//! compared attributes.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::PangolinConfig;
use crate::error::{GatewayError, ReconcileError, Result};
use crate::gateway::{ApiClient, RequestBody, ResourceGateway, Retrier, TargetSpec};
use crate::resource::{Attributes, CurrentResourceSnapshot, NamedResource};

use super::types::{
    decode_data, ClientsData, CreatedResourceData, PangolinClient, ResourceFields, Site,
    SiteResourcesData, SitesData,
};

/// Resolved Pangolin target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PangolinScope {
    /// Organization id.
    pub org_id: String,
    /// Site id.
    pub site_id: i64,
    /// Site name.
    pub site_name: String,
    /// Whether the site connector is online.
    pub online: bool,
}

/// Remote handle of a private resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PangolinHandle {
    /// Resource id.
    pub resource_id: i64,
    /// Owning site id.
    pub site_id: i64,
}

/// Outcome of looking up client names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientResolution {
    /// Clients that were found, in request order.
    pub found: Vec<PangolinClient>,
    /// Names with no matching client.
    pub missing: Vec<String>,
}

/// Pangolin private-resource gateway.
#[derive(Debug, Clone)]
pub struct PangolinGateway {
    api: ApiClient,
    org_id: String,
    client_ids: Vec<i64>,
}

impl PangolinGateway {
    /// Creates a gateway from configuration and an API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &PangolinConfig, api_key: &str) -> Result<Self> {
        let base_url = format!("{}/v1", config.pangolin_url.trim_end_matches('/'));
        let api = ApiClient::new(
            &base_url,
            api_key,
            config.timeout(),
            Retrier::new(config.retry.to_policy()),
        )?;
        Ok(Self::with_client(api, &config.org_id))
    }

    /// Creates a gateway over an existing API client.
    #[must_use]
    pub fn with_client(api: ApiClient, org_id: &str) -> Self {
        Self {
            api,
            org_id: org_id.to_string(),
            client_ids: Vec::new(),
        }
    }

    /// Sets the client ids associated with every created or updated resource.
    #[must_use]
    pub fn with_client_ids(mut self, client_ids: Vec<i64>) -> Self {
        self.client_ids = client_ids;
        self
    }

    /// Returns the associated client ids.
    #[must_use]
    pub fn client_ids(&self) -> &[i64] {
        &self.client_ids
    }

    /// Lists the sites of the organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn sites(&self) -> Result<Vec<Site>> {
        let path = format!("/org/{}/sites", self.org_id);
        let data: SitesData = decode_data(self.api.get(&path).await?)?;
        Ok(data.sites)
    }

    /// Lists the clients of the organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_clients(&self) -> Result<Vec<PangolinClient>> {
        let path = format!("/org/{}/clients", self.org_id);
        let data: ClientsData = decode_data(self.api.get(&path).await?)?;
        Ok(data.clients)
    }

    /// Looks up clients by name, case-insensitively.
    ///
    /// Unknown names are reported in `missing` and logged, not treated as
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the client list cannot be fetched.
    pub async fn resolve_clients(&self, names: &[String]) -> Result<ClientResolution> {
        let mut resolution = ClientResolution::default();
        if names.is_empty() {
            return Ok(resolution);
        }

        let clients = self.list_clients().await?;
        for name in names {
            match clients.iter().find(|c| c.name.eq_ignore_ascii_case(name)) {
                Some(client) => {
                    debug!("Client '{name}' resolved to {}", client.client_id);
                    resolution.found.push(client.clone());
                }
                None => {
                    warn!("Client '{name}' not found in Pangolin, skipping");
                    resolution.missing.push(name.clone());
                }
            }
        }
        Ok(resolution)
    }

    fn payload(&self, site_id: i64, name: &str, attributes: &Attributes) -> serde_json::Value {
        let fields = ResourceFields::from_attributes(attributes);
        let mut payload = json!({
            "name": name,
            "siteId": site_id,
            "destination": fields.destination,
            "enabled": fields.enabled,
            "userIds": [],
            "roleIds": [],
            "clientIds": self.client_ids,
            "tcpPortRangeString": fields.tcp_ports,
            "udpPortRangeString": fields.udp_ports,
            "disableIcmp": fields.disable_icmp,
        });
        if !fields.alias.is_empty() {
            payload["alias"] = json!(fields.alias);
        }
        payload
    }
}

/// Merges default and extra client names.
///
/// Default clients come first unless disabled; names from the command
/// line follow. Duplicates keep their first position.
#[must_use]
pub fn requested_clients(defaults: &[String], extra: &[String], use_defaults: bool) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let defaults: &[String] = if use_defaults { defaults } else { &[] };
    for name in defaults.iter().chain(extra) {
        let name = name.trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[async_trait]
impl ResourceGateway for PangolinGateway {
    type Scope = PangolinScope;
    type Handle = PangolinHandle;

    fn resource_kind(&self) -> &'static str {
        "resource"
    }

    fn target_matches(&self, configured: &str, requested: &str) -> bool {
        configured.eq_ignore_ascii_case(requested)
    }

    async fn resolve_target(&self, target: &TargetSpec) -> Result<PangolinScope> {
        let sites = self.sites().await?;
        let Some(site) = sites.iter().find(|s| s.name.eq_ignore_ascii_case(&target.name)) else {
            return Err(ReconcileError::TargetNotFound {
                kind: String::from("site"),
                name: target.name.clone(),
                available: sites.into_iter().map(|s| s.name).collect(),
            }
            .into());
        };

        if !site.online {
            warn!("Site '{}' is offline", site.name);
        }

        Ok(PangolinScope {
            org_id: self.org_id.clone(),
            site_id: site.site_id,
            site_name: site.name.clone(),
            online: site.online,
        })
    }

    async fn list_resources(
        &self,
        scope: &PangolinScope,
    ) -> Result<CurrentResourceSnapshot<PangolinHandle>> {
        let path = format!("/org/{}/site/{}/resources", scope.org_id, scope.site_id);
        let data: SiteResourcesData = decode_data(self.api.get(&path).await?)?;
        debug!("Fetched {} resources from {scope}", data.site_resources.len());

        let snapshot =
            CurrentResourceSnapshot::from_resources(data.site_resources.into_iter().map(|r| {
                let handle = PangolinHandle {
                    resource_id: r.site_resource_id,
                    site_id: r.site_id.unwrap_or(scope.site_id),
                };
                NamedResource::observed(r.name.clone(), r.fields().attributes(), handle)
            }))?;
        Ok(snapshot)
    }

    async fn create_resource(
        &self,
        scope: &PangolinScope,
        resource: &NamedResource<PangolinHandle>,
    ) -> Result<PangolinHandle> {
        let mut payload = self.payload(scope.site_id, &resource.identity, &resource.attributes);
        payload["mode"] = json!("host");

        let path = format!("/org/{}/private-resource", scope.org_id);
        let response = self.api.send(Method::PUT, &path, &RequestBody::Json(payload)).await?;
        let created: CreatedResourceData = decode_data(response)?;

        let resource_id = created.site_resource_id.ok_or_else(|| {
            GatewayError::invalid_response(format!(
                "create of '{}' returned no siteResourceId",
                resource.identity
            ))
        })?;
        info!("Created resource {} (ID: {resource_id})", resource.identity);

        Ok(PangolinHandle {
            resource_id,
            site_id: scope.site_id,
        })
    }

    async fn update_resource(
        &self,
        _scope: &PangolinScope,
        handle: &PangolinHandle,
        identity: &str,
        attributes: &Attributes,
    ) -> Result<()> {
        let payload = self.payload(handle.site_id, identity, attributes);
        let path = format!("/site-resource/{}", handle.resource_id);
        self.api.send(Method::POST, &path, &RequestBody::Json(payload)).await?;
        info!("Updated resource {identity} (ID: {})", handle.resource_id);
        Ok(())
    }

    async fn delete_resource(&self, _scope: &PangolinScope, handle: &PangolinHandle) -> Result<()> {
        let path = format!("/site-resource/{}", handle.resource_id);
        self.api.send(Method::DELETE, &path, &RequestBody::Empty).await?;
        info!("Deleted resource ID {}", handle.resource_id);
        Ok(())
    }
}

impl fmt::Display for PangolinScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.online { "online" } else { "offline" };
        write!(f, "{} (ID: {}, {status})", self.site_name, self.site_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::fanout::TargetRunner;
    use crate::gateway::RetryPolicy;
    use crate::reconciler::{Reconciler, TargetOutcome};
    use crate::resource::DesiredResourceSet;
    use crate::pangolin::ATTR_ALIAS;
    use crate::resource::AttributeValue;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> PangolinGateway {
        let api = ApiClient::new(
            &server.uri(),
            "key",
            Duration::from_secs(5),
            Retrier::new(RetryPolicy::immediate(2)),
        )
        .unwrap();
        PangolinGateway::with_client(api, "home")
    }

    fn scope() -> PangolinScope {
        PangolinScope {
            org_id: String::from("home"),
            site_id: 3,
            site_name: String::from("homelab"),
            online: true,
        }
    }

    fn fields() -> ResourceFields {
        ResourceFields {
            destination: String::from("10.0.0.5"),
            alias: String::from("nas.home.arpa"),
            tcp_ports: String::from("*"),
            udp_ports: String::from("*"),
            disable_icmp: false,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_resolve_site_case_insensitive() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/org/home/sites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"sites": [{"siteId": 3, "name": "HomeLab", "online": true}]}
            })))
            .mount(&server)
            .await;

        let resolved = gateway(&server)
            .resolve_target(&TargetSpec::named("homelab"))
            .await
            .unwrap();

        assert_eq!(resolved.site_id, 3);
        assert_eq!(resolved.to_string(), "HomeLab (ID: 3, online)");
    }

    async fn mount_site(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/org/home/sites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"sites": [{"siteId": 3, "name": "HomeLab", "online": true}]}
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/org/home/site/3/resources"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"siteResources": []}})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_target_filter_ignores_case() {
        let server = MockServer::start().await;
        mount_site(&server).await;
        let gateway = gateway(&server);
        let targets = vec![TargetSpec::named("HomeLab")];

        let listings = TargetRunner::new(&gateway, &targets)
            .with_filter(vec![String::from("homelab")])
            .list()
            .await;

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].target, "HomeLab");
        assert!(listings[0].error.is_none());
    }

    #[tokio::test]
    async fn test_rate_limited_create_is_applied() {
        let server = MockServer::start().await;
        mount_site(&server).await;
        Mock::given(method("PUT"))
            .and(path("/org/home/private-resource"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/org/home/private-resource"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"siteResourceId": 21}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(
            &server.uri(),
            "key",
            Duration::from_secs(5),
            Retrier::new(RetryPolicy::immediate(3)),
        )
        .unwrap();
        let gateway = PangolinGateway::with_client(api, "home");
        let desired = DesiredResourceSet::from_entries([("nas", fields().attributes())]).unwrap();

        let summary = Reconciler::new(&gateway)
            .reconcile(&TargetSpec::named("homelab"), &desired)
            .await;

        assert_eq!(summary.outcome, TargetOutcome::Applied);
        assert_eq!(summary.error_count(), 0);
        assert_eq!(summary.applied(crate::planner::ChangeKind::Add), 1);
    }

    #[tokio::test]
    async fn test_resolve_unknown_site() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/org/home/sites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"sites": [{"siteId": 3, "name": "homelab"}]}
            })))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .resolve_target(&TargetSpec::named("office"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Reconcile(ReconcileError::TargetNotFound { ref kind, .. }) if kind == "site"
        ));
    }

    #[tokio::test]
    async fn test_list_resources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/org/home/site/3/resources"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"siteResources": [{
                    "siteResourceId": 11, "siteId": 3, "name": "nas",
                    "destination": "10.0.0.5", "alias": "nas.home.arpa",
                    "tcpPortRangeString": "*", "udpPortRangeString": "*",
                    "disableIcmp": false, "enabled": true
                }]}
            })))
            .mount(&server)
            .await;

        let snapshot = gateway(&server).list_resources(&scope()).await.unwrap();
        let nas = snapshot.get("nas").unwrap();

        assert_eq!(nas.attributes, fields().attributes());
        assert_eq!(
            nas.remote_handle,
            Some(PangolinHandle {
                resource_id: 11,
                site_id: 3
            })
        );
    }

    #[tokio::test]
    async fn test_create_sends_clients_and_mode() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/org/home/private-resource"))
            .and(body_partial_json(json!({
                "name": "nas",
                "siteId": 3,
                "mode": "host",
                "alias": "nas.home.arpa",
                "clientIds": [5, 8],
                "tcpPortRangeString": "*"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"siteResourceId": 21}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway(&server).with_client_ids(vec![5, 8]);
        let resource = NamedResource::desired("nas", fields().attributes());
        let handle = gateway.create_resource(&scope(), &resource).await.unwrap();

        assert_eq!(handle.resource_id, 21);
    }

    #[tokio::test]
    async fn test_create_without_id_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .mount(&server)
            .await;

        let resource = NamedResource::desired("nas", fields().attributes());
        let err = gateway(&server).create_resource(&scope(), &resource).await.unwrap_err();

        assert!(matches!(err, SyncError::Gateway(GatewayError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn test_update_posts_to_resource() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/site-resource/11"))
            .and(body_partial_json(json!({"siteId": 3, "destination": "10.0.0.6"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut attributes = fields().attributes();
        attributes.insert(String::from("destination"), AttributeValue::from("10.0.0.6"));
        let handle = PangolinHandle {
            resource_id: 11,
            site_id: 3,
        };

        gateway(&server)
            .update_resource(&scope(), &handle, "nas", &attributes)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/site-resource/11"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let handle = PangolinHandle {
            resource_id: 11,
            site_id: 3,
        };
        gateway(&server).delete_resource(&scope(), &handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_clients_skips_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/org/home/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"clients": [
                    {"clientId": 5, "name": "Laptop", "online": true},
                    {"clientId": 8, "name": "phone", "online": false}
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let names = vec![
            String::from("laptop"),
            String::from("tablet"),
            String::from("PHONE"),
        ];
        let resolution = gateway(&server).resolve_clients(&names).await.unwrap();

        let ids: Vec<i64> = resolution.found.iter().map(|c| c.client_id).collect();
        assert_eq!(ids, vec![5, 8]);
        assert_eq!(resolution.missing, vec!["tablet"]);
    }

    #[tokio::test]
    async fn test_resolve_no_clients_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let resolution = gateway(&server).resolve_clients(&[]).await.unwrap();
        assert_eq!(resolution, ClientResolution::default());
    }

    #[test]
    fn test_requested_clients_merges_and_dedups() {
        let defaults = vec![String::from("laptop"), String::from("phone")];
        let extra = vec![String::from("phone"), String::from(" tablet "), String::new()];

        assert_eq!(
            requested_clients(&defaults, &extra, true),
            vec!["laptop", "phone", "tablet"]
        );
        assert_eq!(requested_clients(&defaults, &extra, false), vec!["phone", "tablet"]);
    }

    #[test]
    fn test_payload_omits_empty_alias() {
        let server_less = ApiClient::new(
            "http://localhost",
            "k",
            Duration::from_secs(1),
            Retrier::new(RetryPolicy::immediate(1)),
        )
        .unwrap();
        let gateway = PangolinGateway::with_client(server_less, "home");
        let mut attributes = fields().attributes();
        attributes.insert(String::from(ATTR_ALIAS), AttributeValue::from(""));

        let payload = gateway.payload(3, "nas", &attributes);

        assert!(payload.get("alias").is_none());
        assert_eq!(payload["clientIds"], json!([]));
    }
}
