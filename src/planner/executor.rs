//! Plan executor for applying sync plans.
//!
//! Changes are applied one at a time in plan order. A failed change is
//! recorded and the executor moves on; nothing is rolled back.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::gateway::ResourceGateway;
use crate::resource::NamedResource;

use super::plan::{ChangeKind, PlannedChange, SyncPlan};

/// Executor for sync plans.
pub struct PlanExecutor<'a, G: ResourceGateway> {
    /// Remote gateway.
    gateway: &'a G,
    /// Resolved scope of the target.
    scope: &'a G::Scope,
}

/// Result of applying a single change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    /// Resource identity.
    pub identity: String,
    /// Change kind.
    pub kind: ChangeKind,
    /// Whether the change succeeded.
    pub success: bool,
    /// Error message (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a, G: ResourceGateway> PlanExecutor<'a, G> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(gateway: &'a G, scope: &'a G::Scope) -> Self {
        Self { gateway, scope }
    }

    /// Applies every change in the plan and returns one outcome per change,
    /// in apply order.
    pub async fn execute(&self, plan: &SyncPlan<G::Handle>) -> Vec<OperationOutcome> {
        info!(
            "Applying {} changes to {}",
            plan.change_count(),
            self.scope
        );

        let mut outcomes = Vec::with_capacity(plan.change_count());
        for change in plan.changes() {
            outcomes.push(self.execute_change(change).await);
        }
        outcomes
    }

    /// Applies a single change.
    async fn execute_change(&self, change: &PlannedChange<G::Handle>) -> OperationOutcome {
        debug!("{} {}", change.kind, change.identity);

        let result = match change.kind {
            ChangeKind::Delete => match &change.handle {
                Some(handle) => self.gateway.delete_resource(self.scope, handle).await,
                None => Err(missing_handle()),
            },
            ChangeKind::Add => {
                let resource = NamedResource::desired(
                    change.identity.clone(),
                    change.after.clone().unwrap_or_default(),
                );
                self.gateway
                    .create_resource(self.scope, &resource)
                    .await
                    .map(|_| ())
            }
            ChangeKind::Update => match (&change.handle, &change.after) {
                (Some(handle), Some(after)) => {
                    self.gateway
                        .update_resource(self.scope, handle, &change.identity, after)
                        .await
                }
                _ => Err(missing_handle()),
            },
        };

        match result {
            Ok(()) => {
                info!("  {} {}", change.kind.symbol(), change.identity);
                OperationOutcome {
                    identity: change.identity.clone(),
                    kind: change.kind,
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                warn!("  failed to {} {}: {e}", change.kind, change.identity);
                OperationOutcome {
                    identity: change.identity.clone(),
                    kind: change.kind,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

fn missing_handle() -> crate::error::SyncError {
    crate::error::SyncError::internal("planned change has no remote handle")
}

impl std::fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind.symbol(), self.identity)?;
        if let Some(error) = &self.error {
            write!(f, " FAILED: {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::DiffEngine;
    use crate::testing::{desired, Call, FakeGateway};

    #[tokio::test]
    async fn test_failure_does_not_stop_remaining_changes() {
        let gateway = FakeGateway::new()
            .with_target("home", &[("b", "9.9.9.9"), ("c", "3.3.3.3")])
            .failing(Call::Delete(String::from("c")));
        let scope = String::from("home");
        let desired = desired(&[("a", "1.1.1.1"), ("b", "2.2.2.2")]);
        let current = gateway.list_resources(&scope).await.unwrap();
        let diff = DiffEngine::default().compute_diff(&desired, &current);
        let plan = SyncPlan::from_diff(&diff, &desired, &current, "h");

        let outcomes = PlanExecutor::new(&gateway, &scope).execute(&plan).await;

        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[0].success);
        assert_eq!(outcomes[0].kind, ChangeKind::Delete);
        assert!(outcomes[1].success);
        assert!(outcomes[2].success);
        assert_eq!(
            gateway.mutating_calls(),
            vec![
                Call::Delete(String::from("c")),
                Call::Create(String::from("a")),
                Call::Update(String::from("b")),
            ]
        );
    }

    #[test]
    fn test_outcome_display() {
        let outcome = OperationOutcome {
            identity: String::from("nas.home.arpa"),
            kind: ChangeKind::Add,
            success: false,
            error: Some(String::from("boom")),
        };
        assert_eq!(outcome.to_string(), "+ nas.home.arpa FAILED: boom");
    }
}
