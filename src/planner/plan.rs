//! Sync plan types and construction.
//!
//! A plan turns a [`DiffResult`] into concrete changes carrying the
//! attributes and remote handles the executor needs, grouped in apply
//! order: deletes, then adds, then updates.

use serde::Serialize;

use crate::resource::{changed_fields, Attributes, CurrentResourceSnapshot, DesiredResourceSet, FieldChange};

use super::diff::DiffResult;

/// Kinds of change in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Remove a resource that is no longer desired.
    Delete,
    /// Create a missing resource.
    Add,
    /// Replace the attributes of an existing resource.
    Update,
}

/// A single planned change.
#[derive(Debug, Clone)]
pub struct PlannedChange<H> {
    /// Change kind.
    pub kind: ChangeKind,
    /// Resource identity.
    pub identity: String,
    /// Attributes currently on the remote side.
    pub before: Option<Attributes>,
    /// Attributes after the change.
    pub after: Option<Attributes>,
    /// Remote handle for updates and deletes.
    pub handle: Option<H>,
}

/// Handle-free view of a planned change, used for previews and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChangeView {
    /// Change kind.
    pub kind: ChangeKind,
    /// Resource identity.
    pub identity: String,
    /// Attributes after the change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Attributes>,
    /// Per-field changes for updates.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
}

/// A complete sync plan for one target.
#[derive(Debug, Clone)]
pub struct SyncPlan<H> {
    /// Fingerprint of the desired set this plan is based on.
    pub desired_hash: String,
    /// Deletes, applied first.
    pub deletes: Vec<PlannedChange<H>>,
    /// Adds, applied second.
    pub adds: Vec<PlannedChange<H>>,
    /// Updates, applied last.
    pub updates: Vec<PlannedChange<H>>,
    /// Resources already in sync.
    pub unchanged: usize,
}

impl<H: Clone> SyncPlan<H> {
    /// Creates a plan from a diff result.
    #[must_use]
    pub fn from_diff(
        diff: &DiffResult,
        desired: &DesiredResourceSet,
        current: &CurrentResourceSnapshot<H>,
        desired_hash: &str,
    ) -> Self {
        let deletes = diff
            .to_delete
            .iter()
            .map(|identity| {
                let existing = current.get(identity);
                PlannedChange {
                    kind: ChangeKind::Delete,
                    identity: identity.clone(),
                    before: existing.map(|r| r.attributes.clone()),
                    after: None,
                    handle: existing.and_then(|r| r.remote_handle.clone()),
                }
            })
            .collect();

        let adds = diff
            .to_add
            .iter()
            .map(|identity| PlannedChange {
                kind: ChangeKind::Add,
                identity: identity.clone(),
                before: None,
                after: desired.get(identity).cloned(),
                handle: None,
            })
            .collect();

        let updates = diff
            .to_update
            .iter()
            .map(|identity| {
                let existing = current.get(identity);
                PlannedChange {
                    kind: ChangeKind::Update,
                    identity: identity.clone(),
                    before: existing.map(|r| r.attributes.clone()),
                    after: desired.get(identity).cloned(),
                    handle: existing.and_then(|r| r.remote_handle.clone()),
                }
            })
            .collect();

        Self {
            desired_hash: desired_hash.to_string(),
            deletes,
            adds,
            updates,
            unchanged: diff.unchanged,
        }
    }
}

impl<H> SyncPlan<H> {
    /// Returns true if the plan is empty (no changes).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.adds.is_empty() && self.updates.is_empty()
    }

    /// Returns the number of changes.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.deletes.len() + self.adds.len() + self.updates.len()
    }

    /// Returns every change in apply order.
    pub fn changes(&self) -> impl Iterator<Item = &PlannedChange<H>> {
        self.deletes.iter().chain(&self.adds).chain(&self.updates)
    }

    /// Returns the handle-free preview of every change in apply order.
    #[must_use]
    pub fn preview(&self) -> Vec<PlannedChangeView> {
        self.changes().map(PlannedChange::view).collect()
    }
}

impl<H> PlannedChange<H> {
    /// Returns the handle-free view of this change.
    #[must_use]
    pub fn view(&self) -> PlannedChangeView {
        let changes = match (self.kind, &self.before, &self.after) {
            (ChangeKind::Update, Some(before), Some(after)) => changed_fields(before, after),
            _ => Vec::new(),
        };

        PlannedChangeView {
            kind: self.kind,
            identity: self.identity.clone(),
            after: self.after.clone(),
            changes,
        }
    }
}

impl ChangeKind {
    /// Returns the symbol used in previews.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Delete => "-",
            Self::Add => "+",
            Self::Update => "~",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Delete => "delete",
            Self::Add => "add",
            Self::Update => "update",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlannedChangeView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind.symbol(), self.identity)?;
        if !self.changes.is_empty() {
            let fields: Vec<String> = self.changes.iter().map(ToString::to_string).collect();
            write!(f, " ({})", fields.join(", "))?;
        } else if self.kind == ChangeKind::Add
            && let Some(after) = &self.after
        {
            let fields: Vec<String> = after.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, " ({})", fields.join(", "))?;
        }
        Ok(())
    }
}

impl<H> std::fmt::Display for SyncPlan<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Sync Plan ({} changes):", self.change_count())?;
        for change in self.changes() {
            writeln!(f, "  {}", change.view())?;
        }
        Ok(())
    }
}
