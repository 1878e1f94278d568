//! Command-line interface for dailyfeedback.
//!
//! This module provides the CLI structure and output formatting for the
//! `dfb` binary.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, ConfigCommand, DeleteCommand, EditCommand, ExportCommand, ImportCommand,
    ListCommand, MembersCommand, OutputFormat, RemoteArgs, ShowCommand, StatusCommand,
    ToggleCommand,
};

/// dfb - Daily feedback log
///
/// Record dated feedback notes about team members, tick off numbered
/// sub-items, and browse shared snapshots read-only.
#[derive(Debug, Parser)]
#[command(name = "dfb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a feedback record
    Add(AddCommand),

    /// Edit a stored record
    Edit(EditCommand),

    /// Delete a stored record
    Delete(DeleteCommand),

    /// List records
    List(ListCommand),

    /// Show one record with its items
    Show(ShowCommand),

    /// Tick or untick a numbered item
    Toggle(ToggleCommand),

    /// List known members
    Members(MembersCommand),

    /// Export records to a JSON file
    Export(ExportCommand),

    /// Append records from a JSON file
    Import(ImportCommand),

    /// Show store statistics
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
