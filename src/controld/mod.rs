//! ControlD DNS spoof-rule integration.
//!
//! Each profile (and folder) in `config.yaml` is a reconciliation target;
//! each hostname generated from `domains.yaml` becomes one spoof rule.

mod client;
mod types;

pub use client::{ControlDGateway, ControlDScope};
pub use types::{
    action_code, action_name, spoof_attributes, Folder, Profile, Rule, RuleAction, ACTION_SPOOF,
    ATTR_ACTION, ATTR_ENABLED, ATTR_VIA,
};
