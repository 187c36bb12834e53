// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is flagged
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![cfg_attr(not(test), warn(clippy::unwrap_used))]  // unwrap() warning
#![cfg_attr(not(test), warn(clippy::expect_used))]  // expect() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity
#![allow(clippy::doc_markdown)]       // Product names (ControlD) are not code

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Homelab Sync
//!
//! A declarative, idempotent reconciler for homelab network configuration.
//!
//! ## Overview
//!
//! Homelab Sync keeps remote systems in line with YAML files kept in a
//! repository:
//!
//! - ControlD DNS spoof rules, one per hostname, in a folder of each profile
//! - Pangolin private resources on each site of an organization
//!
//! ## Architecture
//!
//! The system is built around the concept of **desired state reconciliation**:
//!
//! 1. **Desired State**: Built from `domains.yaml` or `resources.yaml`
//! 2. **Current State**: Listed from the remote API through a gateway
//! 3. **Reconciler**: Diffs the two and applies deletes, adds, then updates
//!
//! Each configured target (profile/folder or site) is reconciled
//! independently; one failing target never stops the others.
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing, validation, and credentials
//! - [`resource`]: Named resources and attribute comparison
//! - [`gateway`]: Remote API abstraction, HTTP client, and retry policy
//! - [`planner`]: Diff computation, plans, and plan execution
//! - [`reconciler`]: Per-target reconciliation
//! - [`fanout`]: Multi-target runs and summaries
//! - [`controld`]: ControlD spoof-rule gateway
//! - [`pangolin`]: Pangolin private-resource gateway
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! # controld/config.yaml
//! profiles:
//!   - name: Default
//!     folder_name: home-infra
//! suffixes:
//!   - home.arpa
//!
//! # controld/domains.yaml
//! domains:
//!   - name: nas
//!     ip: 10.0.0.5
//!     aliases: [files]
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod controld;
pub mod error;
pub mod fanout;
pub mod gateway;
pub mod pangolin;
pub mod planner;
pub mod reconciler;
pub mod resource;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigHasher, ConfigParser, ConfigValidator, ControlDConfig, PangolinConfig};
pub use controld::ControlDGateway;
pub use error::{Result, SyncError};
pub use fanout::{RunSummary, TargetRunner};
pub use gateway::{ResourceGateway, TargetSpec};
pub use pangolin::PangolinGateway;
pub use planner::{DiffEngine, DiffMode, PlanExecutor, SyncPlan};
pub use reconciler::{Reconciler, TargetOutcome, TargetSummary};
pub use resource::{CurrentResourceSnapshot, DesiredResourceSet, NamedResource};
