//! Text output formatter for human-readable display
//!
//! This module provides:
//! - The requirement change of the updated dependency
//! - Locked version changes with semantic change type (major/minor/patch)
//! - Which files were rewritten
//! - A one-line summary

use crate::domain::PodVersion;
use crate::error::UpdateError;
use crate::output::{OutputFormatter, Report, Verbosity};
use crate::resolver::LockChange;
use colored::Colorize;
use std::io::Write;

/// Semantic version change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChangeType {
    /// Major version change (breaking)
    Major,
    /// Minor version change (features)
    Minor,
    /// Patch version change (fixes)
    Patch,
    /// Unknown or unparseable
    Unknown,
}

impl VersionChangeType {
    /// Determine the change type between two versions
    pub fn from_versions(old: &str, new: &str) -> Self {
        let (Ok(old), Ok(new)) = (old.parse::<PodVersion>(), new.parse::<PodVersion>()) else {
            return VersionChangeType::Unknown;
        };
        let segment = |v: &PodVersion, i: usize| v.segments().get(i).copied().unwrap_or(0);

        if segment(&old, 0) != segment(&new, 0) {
            VersionChangeType::Major
        } else if segment(&old, 1) != segment(&new, 1) {
            VersionChangeType::Minor
        } else {
            VersionChangeType::Patch
        }
    }

    /// Change type of a lock change; added or removed pods are unknown
    pub fn from_change(change: &LockChange) -> Self {
        match (&change.previous, &change.updated) {
            (Some(old), Some(new)) => Self::from_versions(old, new),
            _ => VersionChangeType::Unknown,
        }
    }

    /// Get the display label with color
    pub fn colored_label(&self) -> String {
        match self {
            VersionChangeType::Major => "major".red().bold().to_string(),
            VersionChangeType::Minor => "minor".yellow().to_string(),
            VersionChangeType::Patch => "patch".green().to_string(),
            VersionChangeType::Unknown => "?".dimmed().to_string(),
        }
    }

    /// Get the plain label
    pub fn label(&self) -> &'static str {
        match self {
            VersionChangeType::Major => "major",
            VersionChangeType::Minor => "minor",
            VersionChangeType::Patch => "patch",
            VersionChangeType::Unknown => "?",
        }
    }
}

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether this is a dry-run
    dry_run: bool,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity, dry_run: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, dry_run: bool, color: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color,
        }
    }

    /// Get the dry-run prefix if applicable
    fn dry_run_prefix(&self) -> String {
        if self.dry_run {
            if self.color {
                format!("{} ", "(dry-run)".cyan())
            } else {
                "(dry-run) ".to_string()
            }
        } else {
            String::new()
        }
    }

    fn arrow(&self) -> String {
        if self.color {
            "→".dimmed().to_string()
        } else {
            "→".to_string()
        }
    }

    fn format_header(&self, report: &Report<'_>, writer: &mut dyn Write) -> std::io::Result<()> {
        let dependency = report.dependency;
        let previous = dependency.previous_requirement.as_deref().unwrap_or("any");
        let current = dependency.requirement.as_deref().unwrap_or("any");

        if self.color {
            writeln!(
                writer,
                "{}{} {} {} {}",
                self.dry_run_prefix(),
                dependency.name.bold(),
                previous.dimmed(),
                self.arrow(),
                current.green()
            )
        } else {
            writeln!(
                writer,
                "{}{} {} {} {}",
                self.dry_run_prefix(),
                dependency.name,
                previous,
                self.arrow(),
                current
            )
        }
    }

    fn format_change_line(
        &self,
        change: &LockChange,
        max_name_len: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let old = change.previous.as_deref().unwrap_or("(none)");
        let new = change.updated.as_deref().unwrap_or("(removed)");
        let change_type = VersionChangeType::from_change(change);

        if self.color {
            writeln!(
                writer,
                "  {:<width$}  {} {} {}  [{}]",
                change.name,
                old.dimmed(),
                self.arrow(),
                new.green(),
                change_type.colored_label(),
                width = max_name_len
            )
        } else {
            writeln!(
                writer,
                "  {:<width$}  {} {} {}  [{}]",
                change.name,
                old,
                self.arrow(),
                new,
                change_type.label(),
                width = max_name_len
            )
        }
    }

    fn format_files(&self, report: &Report<'_>, writer: &mut dyn Write) -> std::io::Result<()> {
        let verb = if self.dry_run { "would update" } else { "updated" };
        let files = [
            (report.podfile_path, report.podfile_changed()),
            (report.lockfile_path, report.lockfile_changed()),
        ];
        for (path, changed) in files {
            if !changed {
                continue;
            }
            if self.color {
                writeln!(writer, "  {} {}", verb.dimmed(), path.display())?;
            } else {
                writeln!(writer, "  {} {}", verb, path.display())?;
            }
        }
        Ok(())
    }

    fn format_summary(&self, report: &Report<'_>, writer: &mut dyn Write) -> std::io::Result<()> {
        let prefix = self.dry_run_prefix();
        let changes = report.files.changes.len();

        if changes == 0 && !report.podfile_changed() && !report.lockfile_changed() {
            if self.color {
                return writeln!(writer, "{}{}", prefix, "No changes".dimmed());
            }
            return writeln!(writer, "{}No changes", prefix);
        }

        if self.color {
            writeln!(
                writer,
                "{}{} pod(s) changed",
                prefix,
                changes.to_string().green()
            )
        } else {
            writeln!(writer, "{}{} pod(s) changed", prefix, changes)
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &Report<'_>, writer: &mut dyn Write) -> std::io::Result<()> {
        // In quiet mode, only show summary
        if self.verbosity == Verbosity::Quiet {
            return self.format_summary(report, writer);
        }

        self.format_header(report, writer)?;

        let changes = &report.files.changes;
        let max_name_len = changes.iter().map(|c| c.name.len()).max().unwrap_or(0);
        for change in changes {
            self.format_change_line(change, max_name_len, writer)?;
        }

        if self.verbosity == Verbosity::Verbose {
            self.format_files(report, writer)?;
        }

        writeln!(writer)?;
        self.format_summary(report, writer)
    }

    fn format_error(&self, error: &UpdateError, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.color {
            writeln!(writer, "{} {}", "Error:".red().bold(), error)
        } else {
            writeln!(writer, "Error: {}", error)
        }
    }
}
