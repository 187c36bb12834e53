//! Named resources and attribute comparison.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Boolean toggle (enabled, ICMP disabled, ...).
    Flag(bool),
    /// Integer value.
    Number(i64),
    /// Free text (addresses, aliases, port ranges).
    Text(String),
}

/// Ordered attribute bundle keyed by attribute name.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// The unit of reconciliation.
///
/// `remote_handle` is only populated for resources read back from the
/// remote system; desired resources may not exist remotely yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedResource<H> {
    /// Natural key within a target scope.
    pub identity: String,
    /// Desired or observed configuration.
    pub attributes: Attributes,
    /// Opaque value needed to update or delete the remote resource.
    pub remote_handle: Option<H>,
}

/// One attribute that differs between two bundles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    /// Attribute name.
    pub field: String,
    /// Value before the change.
    pub old_value: Option<AttributeValue>,
    /// Value after the change.
    pub new_value: Option<AttributeValue>,
}

impl<H> NamedResource<H> {
    /// Creates a desired-side resource without a remote handle.
    #[must_use]
    pub fn desired(identity: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            identity: identity.into(),
            attributes,
            remote_handle: None,
        }
    }

    /// Creates a resource observed on the remote system.
    #[must_use]
    pub fn observed(identity: impl Into<String>, attributes: Attributes, handle: H) -> Self {
        Self {
            identity: identity.into(),
            attributes,
            remote_handle: Some(handle),
        }
    }

    /// Returns true if this resource is in sync with the given attributes.
    #[must_use]
    pub fn matches(&self, attributes: &Attributes) -> bool {
        attributes_equal(&self.attributes, attributes)
    }
}

/// Field-wise comparison over the full attribute set.
///
/// A key present on only one side counts as a difference.
#[must_use]
pub fn attributes_equal(a: &Attributes, b: &Attributes) -> bool {
    a.len() == b.len() && a.iter().all(|(key, value)| b.get(key) == Some(value))
}

/// Lists the fields that differ between `before` and `after`, sorted by name.
#[must_use]
pub fn changed_fields(before: &Attributes, after: &Attributes) -> Vec<FieldChange> {
    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter(|key| before.get(*key) != after.get(*key))
        .map(|key| FieldChange {
            field: key.clone(),
            old_value: before.get(key).cloned(),
            new_value: after.get(key).cloned(),
        })
        .collect()
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl AttributeValue {
    /// Returns the text value, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the flag value, if this is a flag.
    #[must_use]
    pub const fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<AttributeValue>| {
            v.as_ref().map_or_else(|| String::from("-"), ToString::to_string)
        };
        write!(
            f,
            "{}:{}->{}",
            self.field,
            show(&self.old_value),
            show(&self.new_value)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_equal_bundles() {
        let a = attrs(&[("via", "1.1.1.1".into()), ("enabled", true.into())]);
        let b = attrs(&[("enabled", true.into()), ("via", "1.1.1.1".into())]);
        assert!(attributes_equal(&a, &b));
    }

    #[test]
    fn test_any_difference_is_unequal() {
        let a = attrs(&[("via", "1.1.1.1".into()), ("enabled", true.into())]);
        let b = attrs(&[("via", "1.1.1.1".into()), ("enabled", false.into())]);
        assert!(!attributes_equal(&a, &b));
    }

    #[test]
    fn test_missing_key_is_unequal() {
        let a = attrs(&[("via", "1.1.1.1".into())]);
        let b = attrs(&[("via", "1.1.1.1".into()), ("enabled", true.into())]);
        assert!(!attributes_equal(&a, &b));
        assert!(!attributes_equal(&b, &a));
    }

    #[test]
    fn test_changed_fields() {
        let before = attrs(&[("alias", "a.home.arpa".into()), ("destination", "10.0.0.1".into())]);
        let after = attrs(&[("alias", "a.home.arpa".into()), ("destination", "10.0.0.2".into())]);

        let changes = changed_fields(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "destination");
        assert_eq!(changes[0].to_string(), "destination:10.0.0.1->10.0.0.2");
    }

    #[test]
    fn test_resource_matches() {
        let resource = NamedResource::observed("a", attrs(&[("via", "1.1.1.1".into())]), 7_i64);
        assert!(resource.matches(&attrs(&[("via", "1.1.1.1".into())])));
        assert!(!resource.matches(&attrs(&[("via", "9.9.9.9".into())])));
    }
}
