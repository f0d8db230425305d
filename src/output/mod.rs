//! Output formatting for update results
//!
//! This module provides:
//! - Text output for human-readable display
//! - JSON output for machine processing
//! - Diff output for showing changes to both files

mod diff;
mod json;
mod text;

pub use diff::{unified_diff, DiffFormatter};
pub use json::JsonFormatter;
pub use text::{TextFormatter, VersionChangeType};

use crate::domain::Dependency;
use crate::error::UpdateError;
use crate::updater::UpdatedFiles;
use std::io::Write;
use std::path::Path;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for machine processing
    Json,
    /// Unified diff format
    Diff,
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Minimal output
    Quiet,
    /// Normal output
    #[default]
    Normal,
    /// Detailed output with additional information
    Verbose,
}

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Output format (text, json, diff)
    pub format: OutputFormat,
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Whether this is a dry-run
    pub dry_run: bool,
    /// Whether to use colors (when supported)
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            verbosity: Verbosity::default(),
            dry_run: false,
            color: true,
        }
    }
}

impl OutputConfig {
    /// Create a new output configuration
    pub fn new(format: OutputFormat, verbosity: Verbosity, dry_run: bool) -> Self {
        Self {
            format,
            verbosity,
            dry_run,
            color: true,
        }
    }

    /// Create configuration from CLI arguments
    pub fn from_cli(json: bool, diff: bool, verbose: bool, quiet: bool, dry_run: bool) -> Self {
        let format = if json {
            OutputFormat::Json
        } else if diff {
            OutputFormat::Diff
        } else {
            OutputFormat::Text
        };

        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };

        Self {
            format,
            verbosity,
            dry_run,
            color: true,
        }
    }

    /// Sets whether colors are used (builder pattern)
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// A finished update together with the files it started from
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    pub dependency: &'a Dependency,
    pub podfile_path: &'a Path,
    pub lockfile_path: &'a Path,
    pub original_podfile: &'a str,
    pub original_lockfile: &'a str,
    pub files: &'a UpdatedFiles,
}

impl Report<'_> {
    pub fn podfile_changed(&self) -> bool {
        self.files.manifest != self.original_podfile
    }

    pub fn lockfile_changed(&self) -> bool {
        self.files.lockfile != self.original_lockfile
    }
}

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format and write the result of a successful update
    fn format(&self, report: &Report<'_>, writer: &mut dyn Write) -> std::io::Result<()>;

    /// Format and write an update failure
    fn format_error(&self, error: &UpdateError, writer: &mut dyn Write) -> std::io::Result<()>;
}

/// Create an output formatter based on configuration
pub fn create_formatter(config: OutputConfig) -> Box<dyn OutputFormatter> {
    match config.format {
        OutputFormat::Text => Box::new(TextFormatter::with_color(
            config.verbosity,
            config.dry_run,
            config.color,
        )),
        OutputFormat::Json => Box::new(JsonFormatter::new(config.dry_run)),
        OutputFormat::Diff => Box::new(DiffFormatter::new(config.dry_run)),
    }
}
