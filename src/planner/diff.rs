//! Diff engine for comparing desired vs current state.
//!
//! Pure and deterministic: no I/O, and every identity list in the result
//! is sorted lexicographically.

use serde::Serialize;
use tracing::debug;

use crate::resource::{attributes_equal, CurrentResourceSnapshot, DesiredResourceSet};

/// How desired and current state are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffMode {
    /// Minimal diff by attribute equality.
    #[default]
    Normal,
    /// Delete everything current, add everything desired.
    Rebuild,
    /// Like `Normal`, but every resource on both sides is updated even
    /// when its attributes already match.
    Refresh,
}

/// Engine for computing diffs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine {
    /// Comparison mode.
    mode: DiffMode,
}

/// Three disjoint identity sets (disjoint except in rebuild mode, where an
/// identity can be both deleted and re-added).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// Desired but not current.
    pub to_add: Vec<String>,
    /// Present on both sides with differing attributes.
    pub to_update: Vec<String>,
    /// Current but not desired.
    pub to_delete: Vec<String>,
    /// Present on both sides and already in sync.
    pub unchanged: usize,
}

impl DiffMode {
    /// Maps the `--force` flag to a mode.
    #[must_use]
    pub const fn from_force(force: bool) -> Self {
        if force { Self::Rebuild } else { Self::Normal }
    }
}

impl DiffEngine {
    /// Creates a diff engine for the given mode.
    #[must_use]
    pub const fn new(mode: DiffMode) -> Self {
        Self { mode }
    }

    /// Creates a diff engine from the `--force` flag.
    #[must_use]
    pub const fn from_force(force: bool) -> Self {
        Self::new(DiffMode::from_force(force))
    }

    /// Returns the comparison mode.
    #[must_use]
    pub const fn mode(&self) -> DiffMode {
        self.mode
    }

    /// Computes the diff between desired and current state.
    #[must_use]
    pub fn compute_diff<H>(
        &self,
        desired: &DesiredResourceSet,
        current: &CurrentResourceSnapshot<H>,
    ) -> DiffResult {
        if self.mode == DiffMode::Rebuild {
            debug!("Rebuild mode: replacing all {} current resources", current.len());
            return DiffResult {
                to_add: desired.identities().map(String::from).collect(),
                to_update: Vec::new(),
                to_delete: current.identities().map(String::from).collect(),
                unchanged: 0,
            };
        }

        let to_add: Vec<String> = desired
            .identities()
            .filter(|id| !current.contains(id))
            .map(String::from)
            .collect();

        let to_delete: Vec<String> = current
            .identities()
            .filter(|id| !desired.contains(id))
            .map(String::from)
            .collect();

        let mut to_update = Vec::new();
        let mut unchanged = 0;

        for (identity, attributes) in desired.iter() {
            let Some(existing) = current.get(identity) else {
                continue;
            };

            let in_sync = attributes_equal(attributes, &existing.attributes);
            if in_sync && self.mode == DiffMode::Normal {
                unchanged += 1;
            } else {
                debug!("{identity} needs update");
                to_update.push(identity.to_string());
            }
        }

        DiffResult {
            to_add,
            to_update,
            to_delete,
            unchanged,
        }
    }
}

impl DiffResult {
    /// Returns true if there are any changes.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.to_add.is_empty() || !self.to_update.is_empty() || !self.to_delete.is_empty()
    }

    /// Returns the total number of changes.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.to_add.len() + self.to_update.len() + self.to_delete.len()
    }
}

impl std::fmt::Display for DiffMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Normal => "normal",
            Self::Rebuild => "rebuild",
            Self::Refresh => "refresh",
        };
        write!(f, "{s}")
    }
}
