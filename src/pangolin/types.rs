//! Pangolin API wire types.
//!
//! Every response wraps its payload in a `data` object.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::resource::{AttributeValue, Attributes};

/// Attribute key: destination address.
pub const ATTR_DESTINATION: &str = "destination";
/// Attribute key: DNS alias.
pub const ATTR_ALIAS: &str = "alias";
/// Attribute key: TCP port ranges.
pub const ATTR_TCP_PORTS: &str = "tcp_ports";
/// Attribute key: UDP port ranges.
pub const ATTR_UDP_PORTS: &str = "udp_ports";
/// Attribute key: ICMP blocked flag.
pub const ATTR_DISABLE_ICMP: &str = "disable_icmp";
/// Attribute key: enabled flag.
pub const ATTR_ENABLED: &str = "enabled";

/// Response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    data: T,
}

/// Body of `GET /org/{org}/sites`.
#[derive(Debug, Default, Deserialize)]
pub struct SitesData {
    /// Sites in the organization.
    #[serde(default)]
    pub sites: Vec<Site>,
}

/// A Pangolin site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    /// Site id.
    pub site_id: i64,
    /// Site name.
    #[serde(default)]
    pub name: String,
    /// Whether the site connector is online.
    #[serde(default)]
    pub online: bool,
}

/// Body of `GET /org/{org}/site/{site}/resources`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteResourcesData {
    /// Private resources on the site.
    #[serde(default)]
    pub site_resources: Vec<SiteResource>,
}

/// A private resource as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SiteResource {
    /// Resource id.
    pub site_resource_id: i64,
    /// Owning site id.
    #[serde(default)]
    pub site_id: Option<i64>,
    /// Resource name.
    #[serde(default)]
    pub name: String,
    /// Destination address.
    #[serde(default)]
    pub destination: Option<String>,
    /// DNS alias.
    #[serde(default)]
    pub alias: Option<String>,
    /// TCP port ranges.
    #[serde(default)]
    pub tcp_port_range_string: Option<String>,
    /// UDP port ranges.
    #[serde(default)]
    pub udp_port_range_string: Option<String>,
    /// Whether ICMP is blocked.
    #[serde(default)]
    pub disable_icmp: Option<bool>,
    /// Whether the resource is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Body of a create response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResourceData {
    /// Id assigned to the new resource.
    #[serde(default)]
    pub site_resource_id: Option<i64>,
}

/// Body of `GET /org/{org}/clients`.
#[derive(Debug, Default, Deserialize)]
pub struct ClientsData {
    /// Clients in the organization.
    #[serde(default)]
    pub clients: Vec<PangolinClient>,
}

/// A Pangolin client (a device allowed to reach private resources).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PangolinClient {
    /// Client id.
    pub client_id: i64,
    /// Client name.
    #[serde(default)]
    pub name: String,
    /// Whether the client is connected.
    #[serde(default)]
    pub online: bool,
}

/// The managed settings of one private resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFields {
    /// Destination address.
    pub destination: String,
    /// DNS alias.
    pub alias: String,
    /// TCP port ranges.
    #[serde(rename = "tcpPortRangeString")]
    pub tcp_ports: String,
    /// UDP port ranges.
    #[serde(rename = "udpPortRangeString")]
    pub udp_ports: String,
    /// Whether ICMP is blocked.
    pub disable_icmp: bool,
    /// Whether the resource is enabled.
    pub enabled: bool,
}

/// Decodes the `data` of a response; an empty response yields the default.
///
/// # Errors
///
/// Returns `GatewayError::InvalidResponse` if the body does not match `T`.
pub fn decode_data<T: DeserializeOwned + Default>(value: serde_json::Value) -> Result<T, GatewayError> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value::<Envelope<T>>(value)
        .map(|envelope| envelope.data)
        .map_err(|e| GatewayError::invalid_response(format!("Unexpected Pangolin response: {e}")))
}

impl ResourceFields {
    /// Returns the fields as a comparable attribute bundle.
    #[must_use]
    pub fn attributes(&self) -> Attributes {
        Attributes::from([
            (String::from(ATTR_DESTINATION), AttributeValue::from(self.destination.as_str())),
            (String::from(ATTR_ALIAS), AttributeValue::from(self.alias.as_str())),
            (String::from(ATTR_TCP_PORTS), AttributeValue::from(self.tcp_ports.as_str())),
            (String::from(ATTR_UDP_PORTS), AttributeValue::from(self.udp_ports.as_str())),
            (String::from(ATTR_DISABLE_ICMP), AttributeValue::from(self.disable_icmp)),
            (String::from(ATTR_ENABLED), AttributeValue::from(self.enabled)),
        ])
    }

    /// Rebuilds the fields from an attribute bundle.
    ///
    /// Missing values fall back to the resource defaults: all ports, ICMP
    /// allowed, enabled.
    #[must_use]
    pub fn from_attributes(attributes: &Attributes) -> Self {
        let text = |key: &str, default: &str| {
            attributes
                .get(key)
                .and_then(AttributeValue::as_text)
                .unwrap_or(default)
                .to_string()
        };
        let flag = |key: &str, default: bool| {
            attributes
                .get(key)
                .and_then(AttributeValue::as_flag)
                .unwrap_or(default)
        };

        Self {
            destination: text(ATTR_DESTINATION, ""),
            alias: text(ATTR_ALIAS, ""),
            tcp_ports: text(ATTR_TCP_PORTS, "*"),
            udp_ports: text(ATTR_UDP_PORTS, "*"),
            disable_icmp: flag(ATTR_DISABLE_ICMP, false),
            enabled: flag(ATTR_ENABLED, true),
        }
    }
}

impl SiteResource {
    /// Returns the observed settings of this resource.
    ///
    /// Absent values are read the way the API reports them: empty strings,
    /// ICMP disabled, enabled.
    #[must_use]
    pub fn fields(&self) -> ResourceFields {
        ResourceFields {
            destination: self.destination.clone().unwrap_or_default(),
            alias: self.alias.clone().unwrap_or_default(),
            tcp_ports: self.tcp_port_range_string.clone().unwrap_or_default(),
            udp_ports: self.udp_port_range_string.clone().unwrap_or_default(),
            disable_icmp: self.disable_icmp.unwrap_or(true),
            enabled: self.enabled.unwrap_or(true),
        }
    }
}
