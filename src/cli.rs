//! CLI argument parsing module for podup

use crate::domain::Dependency;
use clap::Parser;
use std::path::{Path, PathBuf};

/// CocoaPods Podfile and Podfile.lock updater
#[derive(Parser, Debug, Clone)]
#[command(
    name = "podup",
    version,
    about = "Update one pod's requirement in a Podfile and re-resolve Podfile.lock"
)]
pub struct CliArgs {
    /// Name of the pod whose requirement changes
    #[arg(short, long, value_name = "NAME")]
    pub dependency: String,

    /// New requirement (e.g. "~> 4.0.0"); omit to drop the requirement
    #[arg(short, long, value_name = "REQ")]
    pub requirement: Option<String>,

    /// Requirement currently written in the Podfile
    #[arg(long, value_name = "REQ")]
    pub previous_requirement: Option<String>,

    /// Path to the Podfile
    #[arg(long, default_value = "Podfile")]
    pub podfile: PathBuf,

    /// Path to the Podfile.lock (default: next to the Podfile)
    #[arg(long)]
    pub lockfile: Option<PathBuf>,

    /// JSON file with credentials for private sources
    #[arg(long, value_name = "FILE")]
    pub credentials: Option<PathBuf>,

    /// Configuration file (default: podup.toml next to the Podfile)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    // General options
    /// Dry run mode - show what would be updated without writing files
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,

    // Output options
    /// Output results in JSON format
    #[arg(long, conflicts_with = "diff")]
    pub json: bool,

    /// Show changes in diff format
    #[arg(long)]
    pub diff: bool,
}

impl CliArgs {
    /// The dependency described by the arguments
    pub fn target(&self) -> Dependency {
        Dependency::new(self.dependency.as_str(), self.requirement.as_deref())
            .with_previous_requirement(self.previous_requirement.as_deref())
    }

    /// Directory holding the Podfile
    pub fn project_dir(&self) -> &Path {
        match self.podfile.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Lockfile path, defaulting to `Podfile.lock` beside the Podfile
    pub fn lockfile_path(&self) -> PathBuf {
        self.lockfile
            .clone()
            .unwrap_or_else(|| self.project_dir().join("Podfile.lock"))
    }
}
