//! ControlD API wire types.
//!
//! Every response wraps its payload in a `body` object.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::resource::{AttributeValue, Attributes};

/// Rule action code for a spoof (resolve-to-address) rule.
pub const ACTION_SPOOF: i64 = 2;

/// Attribute key: action kind name.
pub const ATTR_ACTION: &str = "action";
/// Attribute key: spoof target address.
pub const ATTR_VIA: &str = "via";
/// Attribute key: rule enabled flag.
pub const ATTR_ENABLED: &str = "enabled";

/// Response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    body: T,
}

/// Body of `GET /profiles`.
#[derive(Debug, Default, Deserialize)]
pub struct ProfilesBody {
    /// Profiles on the account.
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

/// A ControlD profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Profile id.
    #[serde(rename = "PK")]
    pub pk: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// Body of `GET /profiles/{id}/groups`.
#[derive(Debug, Default, Deserialize)]
pub struct GroupsBody {
    /// Folders in the profile.
    #[serde(default)]
    pub groups: Vec<Folder>,
}

/// A rule folder ("group").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Folder {
    /// Folder id.
    #[serde(rename = "PK")]
    pub pk: i64,
    /// Folder name.
    #[serde(default)]
    pub group: String,
}

/// Body of `GET /profiles/{id}/rules[/{folder}]`.
#[derive(Debug, Default, Deserialize)]
pub struct RulesBody {
    /// Rules in the folder.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A custom rule; its id is the hostname.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    /// Hostname.
    #[serde(rename = "PK")]
    pub hostname: String,
    /// What the rule does.
    #[serde(default)]
    pub action: RuleAction,
}

/// Rule action.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleAction {
    /// Action code (0 block, 1 bypass, 2 spoof, 3 redirect).
    #[serde(rename = "do", default = "unknown_action")]
    pub action: i64,
    /// Spoof target.
    #[serde(default)]
    pub via: Option<String>,
    /// 1 when enabled.
    #[serde(default)]
    pub status: i64,
}

const fn unknown_action() -> i64 {
    -1
}

/// Decodes the `body` of a response; an empty response yields the default.
///
/// # Errors
///
/// Returns `GatewayError::InvalidResponse` if the body does not match `T`.
pub fn decode_body<T: DeserializeOwned + Default>(value: serde_json::Value) -> Result<T, GatewayError> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value::<Envelope<T>>(value)
        .map(|envelope| envelope.body)
        .map_err(|e| GatewayError::invalid_response(format!("Unexpected ControlD response: {e}")))
}

/// Returns the name of an action code.
#[must_use]
pub const fn action_name(code: i64) -> &'static str {
    match code {
        0 => "block",
        1 => "bypass",
        ACTION_SPOOF => "spoof",
        3 => "redirect",
        _ => "unknown",
    }
}

/// Returns the code of an action name.
#[must_use]
pub fn action_code(name: &str) -> Option<i64> {
    match name {
        "block" => Some(0),
        "bypass" => Some(1),
        "spoof" => Some(ACTION_SPOOF),
        "redirect" => Some(3),
        _ => None,
    }
}

/// Attributes of a desired spoof rule.
#[must_use]
pub fn spoof_attributes(ip: &str) -> Attributes {
    Attributes::from([
        (String::from(ATTR_ACTION), AttributeValue::from(action_name(ACTION_SPOOF))),
        (String::from(ATTR_VIA), AttributeValue::from(ip)),
        (String::from(ATTR_ENABLED), AttributeValue::from(true)),
    ])
}

impl Rule {
    /// Returns the observed attributes of this rule.
    #[must_use]
    pub fn attributes(&self) -> Attributes {
        Attributes::from([
            (String::from(ATTR_ACTION), AttributeValue::from(action_name(self.action.action))),
            (
                String::from(ATTR_VIA),
                AttributeValue::from(self.action.via.clone().unwrap_or_default()),
            ),
            (String::from(ATTR_ENABLED), AttributeValue::from(self.action.status == 1)),
        ])
    }
}
