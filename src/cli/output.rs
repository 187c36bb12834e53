//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{ConfigHasher, ValidationResult};
use crate::fanout::{RunSummary, TargetListing};
use crate::pangolin::PangolinClient;
use crate::planner::ChangeKind;
use crate::reconciler::{TargetOutcome, TargetSummary};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// Client row for table display.
#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Status")]
    status: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of a sync or purge run.
    #[must_use]
    pub fn format_run(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Json => to_json(summary),
            OutputFormat::Text => Self::format_run_text(summary),
        }
    }

    /// Formats a run as text.
    fn format_run_text(summary: &RunSummary) -> String {
        let mut output = String::new();

        for target in &summary.targets {
            let text = Self::format_target_text(target);
            if summary.multi_target {
                output.push_str(&prefix_lines(&format!("[{}]", target.target), &text));
                output.push('\n');
            } else {
                output.push_str(&text);
            }
        }

        if summary.multi_target || summary.targets.is_empty() {
            let _ = write!(
                output,
                "\nSummary: {}/{} targets succeeded\n",
                summary.succeeded(),
                summary.targets.len()
            );
            let failed: Vec<&str> = summary
                .targets
                .iter()
                .filter(|t| !t.success())
                .map(|t| t.target.as_str())
                .collect();
            if !failed.is_empty() {
                let _ = writeln!(output, "{} Failed: {}", "✗".red(), failed.join(", "));
            }
        }

        output
    }

    /// Formats one target summary as text.
    fn format_target_text(target: &TargetSummary) -> String {
        let mut output = String::new();

        if let Some(scope) = &target.scope {
            let _ = writeln!(output, "Target: {scope}");
        }

        if let Some(error) = &target.error {
            let _ = writeln!(output, "{} {error}", "✗".red());
            return output;
        }

        let _ = writeln!(
            output,
            "Desired: {} {}s, current: {} (hash {}, mode {})",
            target.desired_count,
            target.resource_kind,
            target.current_count,
            ConfigHasher::new().short_hash(&target.desired_hash),
            target.mode
        );

        if target.plan.is_empty() {
            let _ = writeln!(output, "{} No changes required", "✓".green());
            return output;
        }

        let _ = writeln!(
            output,
            "Plan: {} to add, {} to update, {} to delete, {} unchanged",
            target.planned(ChangeKind::Add).to_string().green(),
            target.planned(ChangeKind::Update).to_string().yellow(),
            target.planned(ChangeKind::Delete).to_string().red(),
            target.unchanged
        );
        for change in &target.plan {
            let line = change.to_string();
            let line = match change.kind {
                ChangeKind::Add => line.green(),
                ChangeKind::Update => line.yellow(),
                ChangeKind::Delete => line.red(),
            };
            let _ = writeln!(output, "  {line}");
        }

        for failure in target.operations.iter().filter(|o| !o.success) {
            let _ = writeln!(output, "  {} {failure}", "✗".red());
        }

        let status = match target.outcome {
            TargetOutcome::AppliedWithErrors | TargetOutcome::Failed => {
                format!("{} {}", "✗".red(), target.outcome)
            }
            TargetOutcome::DryRunComplete => {
                format!("{} {} (no changes applied)", "•".cyan(), target.outcome)
            }
            TargetOutcome::Applied | TargetOutcome::Converged => {
                format!("{} {}", "✓".green(), target.outcome)
            }
        };
        let _ = write!(output, "{status}");
        if !target.operations.is_empty() {
            let _ = write!(
                output,
                " (added {}, updated {}, deleted {}, errors {})",
                target.applied(ChangeKind::Add),
                target.applied(ChangeKind::Update),
                target.applied(ChangeKind::Delete),
                target.error_count()
            );
        }
        output.push('\n');

        output
    }

    /// Formats the current resources of each target.
    #[must_use]
    pub fn format_listings(&self, listings: &[TargetListing]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&listings),
            OutputFormat::Text => {
                let mut output = String::new();
                for listing in listings {
                    let header = listing.scope.as_deref().unwrap_or(&listing.target);
                    let _ = writeln!(output, "\n{}", header.bold());

                    if let Some(error) = &listing.error {
                        let _ = writeln!(output, "{} {error}", "✗".red());
                        continue;
                    }
                    if listing.resources.is_empty() {
                        output.push_str("   No resources.\n");
                        continue;
                    }

                    let rows: Vec<ResourceRow> = listing
                        .resources
                        .iter()
                        .map(|r| ResourceRow {
                            name: r.identity.clone(),
                            details: r
                                .attributes
                                .iter()
                                .map(|(k, v)| format!("{k}={v}"))
                                .collect::<Vec<_>>()
                                .join(" "),
                        })
                        .collect();
                    output.push_str(&Table::new(rows).to_string());
                    let _ = writeln!(output, "\nTotal: {}", listing.resources.len());
                }
                output
            }
        }
    }

    /// Formats the clients of a Pangolin organization.
    #[must_use]
    pub fn format_clients(&self, clients: &[PangolinClient]) -> String {
        let mut clients = clients.to_vec();
        clients.sort_by(|a, b| a.name.cmp(&b.name));

        match self.format {
            OutputFormat::Json => to_json(&clients),
            OutputFormat::Text => {
                if clients.is_empty() {
                    return String::from("No clients found.\n");
                }
                let rows: Vec<ClientRow> = clients
                    .iter()
                    .map(|c| ClientRow {
                        name: c.name.clone(),
                        id: c.client_id,
                        status: if c.online {
                            "online".green().to_string()
                        } else {
                            "offline".dimmed().to_string()
                        },
                    })
                    .collect();
                format!("{}\nTotal: {}\n", Table::new(rows), clients.len())
            }
        }
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, summary: &[(&str, usize)]) -> String {
        match self.format {
            OutputFormat::Json => {
                let counts: serde_json::Map<String, serde_json::Value> = summary
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
                    .collect();
                to_json(&serde_json::json!({
                    "valid": result.errors.is_empty(),
                    "warnings": result.warnings,
                    "summary": counts,
                }))
            }
            OutputFormat::Text => {
                let mut output = format!("{} Configuration is valid\n", "✓".green());
                for (label, count) in summary {
                    let _ = writeln!(output, "   {label}: {count}");
                }
                if !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }
                output
            }
        }
    }
}

/// Prefixes every line of `text`.
fn prefix_lines(prefix: &str, text: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix} {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
