//! Desired-state fingerprinting.
//!
//! A fingerprint identifies the exact desired set a plan was built from,
//! so two previews can be compared at a glance.

use sha2::{Digest, Sha256};

use crate::resource::{AttributeValue, Attributes, DesiredResourceSet};

/// Hasher for computing desired-state fingerprints.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a whole desired set.
    ///
    /// Entries are visited in identity order, so the result does not
    /// depend on the order resources appear in configuration.
    #[must_use]
    pub fn hash_desired(&self, desired: &DesiredResourceSet) -> String {
        let mut hasher = Sha256::new();

        for (identity, attributes) in desired.iter() {
            hasher.update(identity.as_bytes());
            hasher.update([0u8]);
            hasher.update(self.hash_attributes(attributes).as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes the fingerprint of one attribute map.
    #[must_use]
    pub fn hash_attributes(&self, attributes: &Attributes) -> String {
        let mut hasher = Sha256::new();

        for (key, value) in attributes {
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            match value {
                AttributeValue::Flag(b) => hasher.update([b'b', u8::from(*b)]),
                AttributeValue::Number(n) => {
                    hasher.update([b'n']);
                    hasher.update(n.to_be_bytes());
                }
                AttributeValue::Text(s) => {
                    hasher.update([b's']);
                    hasher.update(s.as_bytes());
                }
            }
            hasher.update([0u8]);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}
