//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of update results
//! - Structured errors with a stable `kind` and transient flag

use crate::error::UpdateError;
use crate::output::{OutputFormatter, Report};
use crate::resolver::LockChange;
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    dry_run: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

/// JSON representation of a successful update
#[derive(Serialize)]
struct JsonOutput<'a> {
    /// Whether this was a dry-run
    dry_run: bool,
    dependency: JsonDependency<'a>,
    files: Vec<JsonFile>,
    /// Root pods whose locked version moved
    changes: &'a [LockChange],
}

#[derive(Serialize)]
struct JsonDependency<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_requirement: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    requirement: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonFile {
    path: String,
    changed: bool,
}

/// JSON representation of a failure
#[derive(Serialize)]
struct JsonError {
    error: JsonErrorBody,
}

#[derive(Serialize)]
struct JsonErrorBody {
    kind: &'static str,
    message: String,
    transient: bool,
}

fn write_json<T: Serialize>(value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    writeln!(writer, "{}", json)
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &Report<'_>, writer: &mut dyn Write) -> std::io::Result<()> {
        let dependency = report.dependency;
        let output = JsonOutput {
            dry_run: self.dry_run,
            dependency: JsonDependency {
                name: &dependency.name,
                previous_requirement: dependency.previous_requirement.as_deref(),
                requirement: dependency.requirement.as_deref(),
            },
            files: vec![
                JsonFile {
                    path: report.podfile_path.display().to_string(),
                    changed: report.podfile_changed(),
                },
                JsonFile {
                    path: report.lockfile_path.display().to_string(),
                    changed: report.lockfile_changed(),
                },
            ],
            changes: &report.files.changes,
        };
        write_json(&output, writer)
    }

    fn format_error(&self, error: &UpdateError, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonError {
            error: JsonErrorBody {
                kind: error.kind(),
                message: error.to_string(),
                transient: error.is_transient(),
            },
        };
        write_json(&output, writer)
    }
}
