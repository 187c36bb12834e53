//! Desired and current resource collections.

use std::collections::BTreeMap;

use crate::error::{ConfigError, GatewayError};

use super::model::{Attributes, NamedResource};

/// The full target state for one reconciliation target.
///
/// Identities are unique; building a set with a repeated identity fails
/// instead of letting a later entry overwrite an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredResourceSet {
    resources: BTreeMap<String, Attributes>,
}

/// Resources that currently exist remotely, keyed by identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentResourceSnapshot<H> {
    resources: BTreeMap<String, NamedResource<H>>,
}

impl DesiredResourceSet {
    /// Creates an empty desired set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            resources: BTreeMap::new(),
        }
    }

    /// Builds a desired set, rejecting duplicate identities.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateName` on the first repeated identity.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, Attributes)>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for (identity, attributes) in entries {
            set.insert(identity, attributes)?;
        }
        Ok(set)
    }

    /// Adds a resource.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateName` if the identity is already present.
    pub fn insert(
        &mut self,
        identity: impl Into<String>,
        attributes: Attributes,
    ) -> Result<(), ConfigError> {
        let identity = identity.into();
        if self.resources.contains_key(&identity) {
            return Err(ConfigError::DuplicateName {
                resource_type: String::from("resource"),
                name: identity,
            });
        }
        self.resources.insert(identity, attributes);
        Ok(())
    }

    /// Returns the desired attributes for an identity.
    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&Attributes> {
        self.resources.get(identity)
    }

    /// Returns true if the identity is desired.
    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.resources.contains_key(identity)
    }

    /// Iterates identities in sorted order.
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Iterates `(identity, attributes)` in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attributes)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of desired resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if nothing is desired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl<H> CurrentResourceSnapshot<H> {
    /// Creates an empty snapshot.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            resources: BTreeMap::new(),
        }
    }

    /// Builds a snapshot from resources read back from the remote system.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidResponse` if the remote reports the
    /// same identity twice, since the diff could not tell them apart.
    pub fn from_resources<I>(resources: I) -> Result<Self, GatewayError>
    where
        I: IntoIterator<Item = NamedResource<H>>,
    {
        let mut map = BTreeMap::new();
        for resource in resources {
            if map.contains_key(&resource.identity) {
                return Err(GatewayError::invalid_response(format!(
                    "remote reports duplicate identity '{}'",
                    resource.identity
                )));
            }
            map.insert(resource.identity.clone(), resource);
        }
        Ok(Self { resources: map })
    }

    /// Returns the resource for an identity.
    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&NamedResource<H>> {
        self.resources.get(identity)
    }

    /// Returns true if the identity exists remotely.
    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.resources.contains_key(identity)
    }

    /// Iterates identities in sorted order.
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Iterates resources in identity order.
    pub fn resources(&self) -> impl Iterator<Item = &NamedResource<H>> {
        self.resources.values()
    }

    /// Number of current resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if nothing exists remotely.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl<H> Default for CurrentResourceSnapshot<H> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::AttributeValue;

    fn via(ip: &str) -> Attributes {
        Attributes::from([(String::from("via"), AttributeValue::from(ip))])
    }

    #[test]
    fn test_desired_rejects_duplicates() {
        let result = DesiredResourceSet::from_entries([
            ("grafana.home.arpa", via("10.0.0.1")),
            ("grafana.home.arpa", via("10.0.0.2")),
        ]);

        match result {
            Err(ConfigError::DuplicateName { name, .. }) => assert_eq!(name, "grafana.home.arpa"),
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn test_desired_iterates_sorted() {
        let set = DesiredResourceSet::from_entries([
            ("b", via("2.2.2.2")),
            ("a", via("1.1.1.1")),
        ])
        .unwrap();

        assert_eq!(set.identities().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("a"));
    }

    #[test]
    fn test_snapshot_rejects_duplicates() {
        let result = CurrentResourceSnapshot::from_resources([
            NamedResource::observed("a", via("1.1.1.1"), 1_i64),
            NamedResource::observed("a", via("1.1.1.2"), 2_i64),
        ]);
        assert!(matches!(result, Err(GatewayError::InvalidResponse { .. })));
    }

    #[test]
    fn test_snapshot_keeps_handles() {
        let snapshot = CurrentResourceSnapshot::from_resources([
            NamedResource::observed("c", via("3.3.3.3"), 30_i64),
            NamedResource::observed("b", via("9.9.9.9"), 20_i64),
        ])
        .unwrap();

        assert_eq!(snapshot.get("c").and_then(|r| r.remote_handle), Some(30));
        assert_eq!(snapshot.identities().collect::<Vec<_>>(), vec!["b", "c"]);
    }
}
