//! CLI module for the homesync tool.
//!
//! This module provides the command-line interface for the ControlD and
//! Pangolin integrations.

mod commands;
mod output;

pub use commands::{
    Cli, Commands, ControlDCommands, ListArgs, LogFormat, OutputFormat, PangolinCommands,
    PurgeArgs, SyncArgs,
};
pub use output::OutputFormatter;
