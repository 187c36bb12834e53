//! Reconciler for converging one target onto its desired state.
//!
//! Per target the reconciler resolves the scope, fetches a fresh snapshot,
//! computes the diff, and either stops at the preview (converged or
//! dry-run) or applies the plan. Every failure is captured in the returned
//! [`TargetSummary`]; nothing here aborts a sibling target.

use serde::Serialize;
use tracing::{error, info, info_span, Instrument};

use crate::config::ConfigHasher;
use crate::error::Result;
use crate::gateway::{ResourceGateway, TargetSpec};
use crate::planner::{
    ChangeKind, DiffEngine, DiffMode, OperationOutcome, PlanExecutor, PlannedChangeView, SyncPlan,
};
use crate::resource::{CurrentResourceSnapshot, DesiredResourceSet};

/// Reconciler for a single remote API.
pub struct Reconciler<'a, G: ResourceGateway> {
    /// Remote gateway.
    gateway: &'a G,
    /// Desired-state hasher.
    hasher: ConfigHasher,
    /// Diff engine.
    diff_engine: DiffEngine,
    /// Stop after the preview.
    dry_run: bool,
}

/// Terminal state of one target's reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetOutcome {
    /// Nothing to change.
    Converged,
    /// Preview produced, nothing applied.
    DryRunComplete,
    /// Every planned change succeeded.
    Applied,
    /// At least one planned change failed.
    AppliedWithErrors,
    /// The target could not be resolved or listed.
    Failed,
}

/// Result of reconciling one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetSummary {
    /// Target as configured.
    pub target: String,
    /// Managed resource kind.
    pub resource_kind: String,
    /// Terminal state.
    pub outcome: TargetOutcome,
    /// Resolved scope, if resolution succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Diff mode used.
    pub mode: DiffMode,
    /// Number of desired resources.
    pub desired_count: usize,
    /// Number of resources found remotely.
    pub current_count: usize,
    /// Resources already in sync.
    pub unchanged: usize,
    /// Fingerprint of the desired set.
    pub desired_hash: String,
    /// Planned changes in apply order.
    pub plan: Vec<PlannedChangeView>,
    /// Outcome of every applied change.
    pub operations: Vec<OperationOutcome>,
    /// Target-level error, if the target failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a, G: ResourceGateway> Reconciler<'a, G> {
    /// Creates a new reconciler in normal mode.
    #[must_use]
    pub fn new(gateway: &'a G) -> Self {
        Self {
            gateway,
            hasher: ConfigHasher::new(),
            diff_engine: DiffEngine::default(),
            dry_run: false,
        }
    }

    /// Sets the diff mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: DiffMode) -> Self {
        self.diff_engine = DiffEngine::new(mode);
        self
    }

    /// Sets whether to stop after the preview.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reconciles one target.
    ///
    /// Never fails as a whole: resolution and listing errors end in
    /// [`TargetOutcome::Failed`], per-item errors in
    /// [`TargetOutcome::AppliedWithErrors`].
    pub async fn reconcile(&self, target: &TargetSpec, desired: &DesiredResourceSet) -> TargetSummary {
        let span = info_span!("target", name = %target, mode = %self.diff_engine.mode());
        self.reconcile_target(target, desired).instrument(span).await
    }

    async fn reconcile_target(
        &self,
        target: &TargetSpec,
        desired: &DesiredResourceSet,
    ) -> TargetSummary {
        let desired_hash = self.hasher.hash_desired(desired);
        let mut summary = TargetSummary {
            target: target.to_string(),
            resource_kind: self.gateway.resource_kind().to_string(),
            outcome: TargetOutcome::Failed,
            scope: None,
            mode: self.diff_engine.mode(),
            desired_count: desired.len(),
            current_count: 0,
            unchanged: 0,
            desired_hash,
            plan: Vec::new(),
            operations: Vec::new(),
            error: None,
        };

        let (scope, current) = match self.observe(target).await {
            Ok(observed) => observed,
            Err(e) => {
                error!("Target {target} failed: {e}");
                summary.error = Some(e.to_string());
                return summary;
            }
        };

        summary.scope = Some(scope.to_string());
        summary.current_count = current.len();

        let diff = self.diff_engine.compute_diff(desired, &current);
        info!(
            "Diff: {} adds, {} updates, {} deletes, {} unchanged",
            diff.to_add.len(),
            diff.to_update.len(),
            diff.to_delete.len(),
            diff.unchanged
        );

        let plan = SyncPlan::from_diff(&diff, desired, &current, &summary.desired_hash);
        summary.plan = plan.preview();
        summary.unchanged = plan.unchanged;

        if plan.is_empty() {
            info!("No changes required - already in sync");
            summary.outcome = TargetOutcome::Converged;
            return summary;
        }

        if self.dry_run {
            info!("Dry-run mode - {} changes not applied", plan.change_count());
            summary.outcome = TargetOutcome::DryRunComplete;
            return summary;
        }

        summary.operations = PlanExecutor::new(self.gateway, &scope).execute(&plan).await;
        summary.outcome = if summary.operations.iter().all(|o| o.success) {
            TargetOutcome::Applied
        } else {
            TargetOutcome::AppliedWithErrors
        };

        info!("Target {target}: {}", summary.outcome);
        summary
    }

    /// Resolves a target and fetches its current resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be resolved or listed.
    pub async fn observe(
        &self,
        target: &TargetSpec,
    ) -> Result<(G::Scope, CurrentResourceSnapshot<G::Handle>)> {
        let scope = self.gateway.resolve_target(target).await?;
        info!("Resolved {target} to {scope}");

        let current = self.gateway.list_resources(&scope).await?;
        info!("Current state: {} {}s", current.len(), self.gateway.resource_kind());

        Ok((scope, current))
    }
}

impl TargetSummary {
    /// Returns true if the target reached a successful terminal state.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Number of successful operations of a kind.
    #[must_use]
    pub fn applied(&self, kind: ChangeKind) -> usize {
        self.operations
            .iter()
            .filter(|o| o.kind == kind && o.success)
            .count()
    }

    /// Number of failed operations of a kind.
    #[must_use]
    pub fn failed(&self, kind: ChangeKind) -> usize {
        self.operations
            .iter()
            .filter(|o| o.kind == kind && !o.success)
            .count()
    }

    /// Number of planned changes of a kind.
    #[must_use]
    pub fn planned(&self, kind: ChangeKind) -> usize {
        self.plan.iter().filter(|c| c.kind == kind).count()
    }

    /// Number of failed operations across all kinds.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.operations.iter().filter(|o| !o.success).count()
    }

    /// Creates the summary of a target that failed before reconciling.
    #[must_use]
    pub fn failed_before_start(target: &str, resource_kind: &str, error: String) -> Self {
        Self {
            target: target.to_string(),
            resource_kind: resource_kind.to_string(),
            outcome: TargetOutcome::Failed,
            scope: None,
            mode: DiffMode::Normal,
            desired_count: 0,
            current_count: 0,
            unchanged: 0,
            desired_hash: String::new(),
            plan: Vec::new(),
            operations: Vec::new(),
            error: Some(error),
        }
    }
}

impl TargetOutcome {
    /// Returns true for the successful terminal states.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Converged | Self::DryRunComplete | Self::Applied)
    }
}

impl std::fmt::Display for TargetOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Converged => "already in sync",
            Self::DryRunComplete => "dry-run complete",
            Self::Applied => "applied",
            Self::AppliedWithErrors => "applied with errors",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for TargetSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Target {}: {}", self.target, self.outcome)?;

        if let Some(error) = &self.error {
            return writeln!(f, "  Error: {error}");
        }

        for change in &self.plan {
            writeln!(f, "  {change}")?;
        }

        if !self.operations.is_empty() {
            writeln!(
                f,
                "  Added: {}, Updated: {}, Deleted: {}, Errors: {}",
                self.applied(ChangeKind::Add),
                self.applied(ChangeKind::Update),
                self.applied(ChangeKind::Delete),
                self.error_count()
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{desired, via, Call, FakeGateway};

    fn target(name: &str) -> TargetSpec {
        TargetSpec::named(name)
    }

    fn mutating(calls: &[(&str, &str)]) -> Vec<Call> {
        calls
            .iter()
            .map(|(kind, id)| {
                let id = (*id).to_string();
                match *kind {
                    "delete" => Call::Delete(id),
                    "create" => Call::Create(id),
                    _ => Call::Update(id),
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_apply_order_deletes_adds_updates() {
        let gateway = FakeGateway::new().with_target(
            "home",
            &[
                ("y-old", "3.3.3.3"),
                ("x-old", "3.3.3.3"),
                ("n", "9.9.9.9"),
                ("m", "9.9.9.9"),
            ],
        );
        let desired = desired(&[
            ("b", "1.1.1.1"),
            ("a", "1.1.1.1"),
            ("n", "2.2.2.2"),
            ("m", "2.2.2.2"),
        ]);

        let summary = Reconciler::new(&gateway).reconcile(&target("home"), &desired).await;

        assert_eq!(summary.outcome, TargetOutcome::Applied);
        assert_eq!(
            gateway.mutating_calls(),
            mutating(&[
                ("delete", "x-old"),
                ("delete", "y-old"),
                ("create", "a"),
                ("create", "b"),
                ("update", "m"),
                ("update", "n"),
            ])
        );
        assert_eq!(summary.applied(ChangeKind::Delete), 2);
        assert_eq!(summary.applied(ChangeKind::Add), 2);
        assert_eq!(summary.applied(ChangeKind::Update), 2);
    }

    #[tokio::test]
    async fn test_single_failure_is_isolated() {
        let gateway = FakeGateway::new()
            .with_target("home", &[("b", "9.9.9.9"), ("c", "3.3.3.3")])
            .failing(Call::Create(String::from("a")));
        let desired = desired(&[("a", "1.1.1.1"), ("b", "2.2.2.2"), ("d", "4.4.4.4")]);

        let summary = Reconciler::new(&gateway).reconcile(&target("home"), &desired).await;

        assert_eq!(summary.outcome, TargetOutcome::AppliedWithErrors);
        assert!(!summary.success());
        assert_eq!(summary.failed(ChangeKind::Add), 1);
        assert_eq!(summary.applied(ChangeKind::Add), 1);
        assert_eq!(summary.applied(ChangeKind::Update), 1);
        assert_eq!(summary.applied(ChangeKind::Delete), 1);
        assert_eq!(summary.error_count(), 1);

        let resources = gateway.resources("home");
        assert!(!resources.contains_key("a"));
        assert!(!resources.contains_key("c"));
        assert_eq!(resources.get("b"), Some(&via("2.2.2.2")));
        assert_eq!(resources.get("d"), Some(&via("4.4.4.4")));
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_mutations() {
        let gateway = FakeGateway::new().with_target("home", &[("b", "9.9.9.9"), ("c", "3.3.3.3")]);
        let desired = desired(&[("a", "1.1.1.1"), ("b", "2.2.2.2")]);

        let summary = Reconciler::new(&gateway)
            .with_dry_run(true)
            .reconcile(&target("home"), &desired)
            .await;

        assert_eq!(summary.outcome, TargetOutcome::DryRunComplete);
        assert!(summary.success());
        assert!(gateway.mutating_calls().is_empty());
        assert_eq!(summary.plan.len(), 3);
        assert_eq!(summary.planned(ChangeKind::Delete), 1);
        assert_eq!(summary.planned(ChangeKind::Add), 1);
        assert_eq!(summary.planned(ChangeKind::Update), 1);
        assert!(summary.operations.is_empty());
    }

    #[tokio::test]
    async fn test_second_run_is_converged() {
        let gateway = FakeGateway::new().with_target("home", &[("b", "9.9.9.9"), ("c", "3.3.3.3")]);
        let desired = desired(&[("a", "1.1.1.1"), ("b", "2.2.2.2")]);
        let reconciler = Reconciler::new(&gateway);

        let first = reconciler.reconcile(&target("home"), &desired).await;
        assert_eq!(first.outcome, TargetOutcome::Applied);
        let after_first = gateway.mutating_calls().len();

        let second = reconciler.reconcile(&target("home"), &desired).await;

        assert_eq!(second.outcome, TargetOutcome::Converged);
        assert!(second.plan.is_empty());
        assert_eq!(second.unchanged, 2);
        assert_eq!(gateway.mutating_calls().len(), after_first);
    }

    #[tokio::test]
    async fn test_unresolved_target_never_lists() {
        let gateway = FakeGateway::new().with_target("home", &[("a", "1.1.1.1")]);
        let desired = desired(&[("a", "1.1.1.1")]);

        let summary = Reconciler::new(&gateway).reconcile(&target("office"), &desired).await;

        assert_eq!(summary.outcome, TargetOutcome::Failed);
        assert_eq!(gateway.calls(), vec![Call::Resolve(String::from("office"))]);
        let error = summary.error.unwrap_or_default();
        assert!(error.contains("office"));
        assert!(error.contains("home"));
    }

    #[tokio::test]
    async fn test_list_failure_fails_target() {
        let gateway = FakeGateway::new()
            .with_target("home", &[("a", "1.1.1.1")])
            .failing(Call::List(String::from("home")));

        let summary = Reconciler::new(&gateway)
            .reconcile(&target("home"), &desired(&[("a", "1.1.1.1")]))
            .await;

        assert_eq!(summary.outcome, TargetOutcome::Failed);
        assert!(gateway.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_replaces_in_sync_resources() {
        let gateway = FakeGateway::new().with_target("home", &[("a", "1.1.1.1")]);
        let desired = desired(&[("a", "1.1.1.1")]);

        let summary = Reconciler::new(&gateway)
            .with_mode(DiffMode::Rebuild)
            .reconcile(&target("home"), &desired)
            .await;

        assert_eq!(summary.outcome, TargetOutcome::Applied);
        assert_eq!(
            gateway.mutating_calls(),
            mutating(&[("delete", "a"), ("create", "a")])
        );
        assert_eq!(gateway.resources("home").get("a"), Some(&via("1.1.1.1")));
    }

    #[tokio::test]
    async fn test_empty_desired_deletes_everything() {
        let gateway = FakeGateway::new().with_target("home", &[("a", "1.1.1.1"), ("b", "2.2.2.2")]);

        let summary = Reconciler::new(&gateway)
            .reconcile(&target("home"), &DesiredResourceSet::new())
            .await;

        assert_eq!(summary.outcome, TargetOutcome::Applied);
        assert_eq!(summary.applied(ChangeKind::Delete), 2);
        assert!(gateway.resources("home").is_empty());
    }
}
