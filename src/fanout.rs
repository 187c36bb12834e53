//! Multi-target fan-out.
//!
//! Runs the reconciler once per selected target, strictly one after the
//! other, and folds the per-target summaries into a [`RunSummary`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ReconcileError, Result};
use crate::gateway::{ResourceGateway, TargetSpec};
use crate::planner::DiffMode;
use crate::reconciler::{Reconciler, TargetSummary};
use crate::resource::{Attributes, DesiredResourceSet};

/// Runs commands across the configured targets of one integration.
pub struct TargetRunner<'a, G: ResourceGateway> {
    /// Remote gateway.
    gateway: &'a G,
    /// Every configured target, in configuration order.
    targets: &'a [TargetSpec],
    /// Allow-list of target names; empty means all.
    filter: Vec<String>,
}

/// Options for `sync`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Stop after the preview.
    pub dry_run: bool,
    /// Diff mode.
    pub mode: DiffMode,
}

/// Options for `purge`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurgeOptions {
    /// Stop after the preview.
    pub dry_run: bool,
    /// Operator confirmed the deletion.
    pub confirm: bool,
}

/// Aggregated result of one command across targets.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Unique identifier of this run.
    pub run_id: Uuid,
    /// Command that produced the run.
    pub command: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Whether more than one target is configured.
    pub multi_target: bool,
    /// Per-target summaries in processing order.
    pub targets: Vec<TargetSummary>,
}

/// Current resources of one target, for `list`.
#[derive(Debug, Clone, Serialize)]
pub struct TargetListing {
    /// Target as configured.
    pub target: String,
    /// Resolved scope, if resolution succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Resources sorted by identity.
    pub resources: Vec<ListedResource>,
    /// Error, if the target could not be listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One listed resource.
#[derive(Debug, Clone, Serialize)]
pub struct ListedResource {
    /// Resource identity.
    pub identity: String,
    /// Observed attributes.
    pub attributes: Attributes,
}

/// Splits a comma-separated `--target` value into names.
///
/// Blank entries are dropped; `None` yields an empty filter.
#[must_use]
pub fn parse_target_filter(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

impl<'a, G: ResourceGateway> TargetRunner<'a, G> {
    /// Creates a runner over all configured targets.
    #[must_use]
    pub const fn new(gateway: &'a G, targets: &'a [TargetSpec]) -> Self {
        Self {
            gateway,
            targets,
            filter: Vec::new(),
        }
    }

    /// Restricts the run to the named targets.
    #[must_use]
    pub fn with_filter(mut self, filter: Vec<String>) -> Self {
        self.filter = filter;
        self
    }

    /// Returns the selected targets plus one failed summary for every
    /// filter entry that names no configured target.
    fn select(&self) -> (Vec<&'a TargetSpec>, Vec<TargetSummary>) {
        if self.filter.is_empty() {
            return (self.targets.iter().collect(), Vec::new());
        }

        let configured: Vec<String> = self.targets.iter().map(|t| t.name.clone()).collect();
        let mut unknown = Vec::new();
        for name in &self.filter {
            if !configured.iter().any(|c| self.gateway.target_matches(c, name)) {
                warn!("Target '{name}' is not configured");
                let error = ReconcileError::TargetNotConfigured {
                    name: name.clone(),
                    configured: configured.clone(),
                };
                unknown.push(TargetSummary::failed_before_start(
                    name,
                    self.gateway.resource_kind(),
                    error.to_string(),
                ));
            }
        }

        let selected = self
            .targets
            .iter()
            .filter(|t| {
                self.filter
                    .iter()
                    .any(|name| self.gateway.target_matches(&t.name, name))
            })
            .collect();

        (selected, unknown)
    }

    /// Reconciles every selected target onto `desired`.
    pub async fn sync(&self, desired: &DesiredResourceSet, options: SyncOptions) -> RunSummary {
        let reconciler = Reconciler::new(self.gateway)
            .with_mode(options.mode)
            .with_dry_run(options.dry_run);
        self.run("sync", &reconciler, desired).await
    }

    /// Deletes every resource in every selected target.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::ConfirmationRequired` before contacting the
    /// remote API when neither `confirm` nor `dry_run` is set.
    pub async fn purge(&self, options: PurgeOptions) -> Result<RunSummary> {
        if !options.confirm && !options.dry_run {
            return Err(ReconcileError::ConfirmationRequired {
                command: String::from("purge"),
            }
            .into());
        }

        let reconciler = Reconciler::new(self.gateway).with_dry_run(options.dry_run);
        Ok(self.run("purge", &reconciler, &DesiredResourceSet::new()).await)
    }

    async fn run(
        &self,
        command: &str,
        reconciler: &Reconciler<'_, G>,
        desired: &DesiredResourceSet,
    ) -> RunSummary {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, command, "Starting run");

        let (selected, mut summaries) = self.select();
        if selected.is_empty() {
            warn!("No configured target matched the filter");
        }

        for target in selected {
            summaries.push(reconciler.reconcile(target, desired).await);
        }

        let summary = RunSummary {
            run_id,
            command: command.to_string(),
            started_at,
            finished_at: Utc::now(),
            multi_target: self.targets.len() > 1,
            targets: summaries,
        };

        info!(
            %run_id,
            "{}/{} targets succeeded",
            summary.succeeded(),
            summary.targets.len()
        );
        summary
    }

    /// Lists the current resources of every selected target.
    pub async fn list(&self) -> Vec<TargetListing> {
        let (selected, unknown) = self.select();
        let reconciler = Reconciler::new(self.gateway);

        let mut listings: Vec<TargetListing> = unknown
            .into_iter()
            .map(|summary| TargetListing {
                target: summary.target,
                scope: None,
                resources: Vec::new(),
                error: summary.error,
            })
            .collect();

        for target in selected {
            let listing = match reconciler.observe(target).await {
                Ok((scope, current)) => TargetListing {
                    target: target.to_string(),
                    scope: Some(scope.to_string()),
                    resources: current
                        .resources()
                        .map(|r| ListedResource {
                            identity: r.identity.clone(),
                            attributes: r.attributes.clone(),
                        })
                        .collect(),
                    error: None,
                },
                Err(e) => TargetListing {
                    target: target.to_string(),
                    scope: None,
                    resources: Vec::new(),
                    error: Some(e.to_string()),
                },
            };
            listings.push(listing);
        }

        listings
    }
}

impl RunSummary {
    /// Returns true if every processed target succeeded.
    ///
    /// A run that processed no target at all is not a success.
    #[must_use]
    pub fn success(&self) -> bool {
        !self.targets.is_empty() && self.targets.iter().all(TargetSummary::success)
    }

    /// Number of targets that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.targets.iter().filter(|t| t.success()).count()
    }
}
