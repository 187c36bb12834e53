//! Pangolin private-resource integration.
//!
//! Each site in `config.yaml` is a reconciliation target; each entry in
//! `resources.yaml` becomes one private resource on every site.

mod client;
mod types;

pub use client::{
    requested_clients, ClientResolution, PangolinGateway, PangolinHandle, PangolinScope,
};
pub use types::{
    PangolinClient, ResourceFields, Site, SiteResource, ATTR_ALIAS, ATTR_DESTINATION,
    ATTR_DISABLE_ICMP, ATTR_ENABLED, ATTR_TCP_PORTS, ATTR_UDP_PORTS,
};
