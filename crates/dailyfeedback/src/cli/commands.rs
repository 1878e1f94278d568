//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Remote snapshot selection shared by read commands.
#[derive(Debug, Clone, Default, Args)]
pub struct RemoteArgs {
    /// Read from a remote snapshot instead of the local store
    /// (`--remote=URL`; uses `remote.default_url` when no URL is given)
    #[arg(long, value_name = "URL", num_args = 0..=1, require_equals = true)]
    pub remote: Option<Option<String>>,
}

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Team member the feedback is about
    #[arg(short, long)]
    pub member: String,

    /// Feedback date (YYYY-MM-DD, defaults to today)
    #[arg(short, long)]
    pub date: Option<String>,

    /// Note text
    #[arg(short, long, conflicts_with = "note_file")]
    pub note: Option<String>,

    /// Read the note from a file
    #[arg(long, value_name = "FILE")]
    pub note_file: Option<PathBuf>,

    /// Attach an image (repeatable)
    #[arg(short, long = "image", value_name = "FILE")]
    pub images: Vec<PathBuf>,
}

/// Edit command arguments.
#[derive(Debug, Args)]
pub struct EditCommand {
    /// Record id
    pub id: i64,

    /// New date
    #[arg(short, long)]
    pub date: Option<String>,

    /// New member
    #[arg(short, long)]
    pub member: Option<String>,

    /// New note text
    #[arg(short, long, conflicts_with = "note_file")]
    pub note: Option<String>,

    /// Read the new note from a file
    #[arg(long, value_name = "FILE")]
    pub note_file: Option<PathBuf>,

    /// Attach another image (repeatable)
    #[arg(short, long = "image", value_name = "FILE")]
    pub images: Vec<PathBuf>,

    /// Remove the image at this 1-based position (repeatable)
    #[arg(long = "remove-image", value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub remove_images: Vec<u32>,

    /// Remove all existing images
    #[arg(long, conflicts_with = "remove_images")]
    pub clear_images: bool,
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Record id
    pub id: i64,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only this date (YYYY-MM-DD)
    #[arg(short, long, conflicts_with = "all_dates")]
    pub date: Option<String>,

    /// Show every date, even when `view.default_to_today` is set
    #[arg(short, long)]
    pub all_dates: bool,

    /// Only this member
    #[arg(short, long)]
    pub member: Option<String>,

    /// Remote snapshot selection.
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Record id (1-based position for remote snapshots)
    pub id: i64,

    /// Remote snapshot selection.
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Print the rendered HTML fragment
    #[arg(long)]
    pub html: bool,
}

/// Toggle command arguments.
#[derive(Debug, Args)]
pub struct ToggleCommand {
    /// Record id (1-based position for remote snapshots)
    pub id: i64,

    /// Item number (1-based)
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub item: u32,

    /// Remote snapshot selection.
    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Members command arguments.
#[derive(Debug, Args)]
pub struct MembersCommand {
    /// Remote snapshot selection.
    #[command(flatten)]
    pub remote: RemoteArgs,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Only this date
    #[arg(short, long)]
    pub date: Option<String>,

    /// Only this member
    #[arg(short, long)]
    pub member: Option<String>,

    /// Remote snapshot selection.
    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Output file (defaults to `feedback-<date>-<member>.json` in
    /// `export.output_dir`; `-` writes to stdout)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Export file or JSON array of records
    pub file: PathBuf,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
