//! podup - CocoaPods Podfile and Podfile.lock updater CLI tool
//!
//! Rewrites one pod's requirement in a Podfile, re-resolves the dependency
//! graph against the configured spec repositories and writes a Podfile.lock
//! that differs from the previous one only where the change demands it.
//!
//! Exit codes:
//! - 0: success (including "nothing to change")
//! - 1: the update cannot be performed as requested
//! - 2: a spec index stayed unreachable; retrying later may succeed
//! - 3: internal error

use anyhow::Context;
use clap::Parser;
use podup::cli::CliArgs;
use podup::config::Config;
use podup::domain::Credential;
use podup::error::UpdateError;
use podup::output::{create_formatter, OutputConfig, Report};
use podup::progress::Progress;
use podup::updater::{FileUpdater, UpdateRequest};
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose, args.quiet);

    // Run the main logic and handle errors
    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let lockfile_path = args.lockfile_path();
    log::debug!(
        "podup v{}: {} / {}",
        env!("CARGO_PKG_VERSION"),
        args.podfile.display(),
        lockfile_path.display()
    );

    let original_podfile = read_file(&args.podfile)?;
    let original_lockfile = read_file(&lockfile_path)?;
    let credentials = match &args.credentials {
        Some(path) => load_credentials(path)?,
        None => Vec::new(),
    };
    let config = Config::load(args.config.as_deref(), args.project_dir())?;
    let updater = FileUpdater::new(config, credentials)?;

    let output_config =
        OutputConfig::from_cli(args.json, args.diff, args.verbose, args.quiet, args.dry_run)
            .with_color(io::stdout().is_terminal());
    let formatter = create_formatter(output_config);

    let dependency = args.target();
    let request = UpdateRequest {
        manifest: &original_podfile,
        lockfile: &original_lockfile,
        dependency: &dependency,
    };

    let mut progress = Progress::new(!args.quiet && !args.json && io::stderr().is_terminal());
    progress.spinner(&format!("Resolving {}...", dependency.name));
    let result = updater.update(&request).await;
    progress.finish_and_clear();

    let files = match result {
        Ok(files) => files,
        Err(error) => {
            if args.json {
                let mut stdout = io::stdout().lock();
                formatter.format_error(&error, &mut stdout)?;
                stdout.flush()?;
            } else {
                formatter.format_error(&error, &mut io::stderr().lock())?;
            }
            return Ok(exit_code(&error));
        }
    };

    if !args.dry_run {
        if files.manifest != original_podfile {
            write_file(&args.podfile, &files.manifest)?;
        }
        if files.lockfile != original_lockfile {
            write_file(&lockfile_path, &files.lockfile)?;
        }
    }

    let report = Report {
        dependency: &dependency,
        podfile_path: &args.podfile,
        lockfile_path: &lockfile_path,
        original_podfile: &original_podfile,
        original_lockfile: &original_lockfile,
        files: &files,
    };
    let mut stdout = io::stdout().lock();
    formatter.format(&report, &mut stdout)?;
    stdout.flush()?;

    Ok(ExitCode::SUCCESS)
}

fn exit_code(error: &UpdateError) -> ExitCode {
    if error.is_internal() {
        ExitCode::from(3)
    } else if error.is_transient() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_credentials(path: &Path) -> anyhow::Result<Vec<Credential>> {
    let content = read_file(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse credentials file {}", path.display()))
}

/// Replace `path` through a sibling temporary file so readers never see a partial write
fn write_file(path: &Path, content: &str) -> anyhow::Result<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".podup.tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, content).with_context(|| format!("failed to write {}", temp.display()))?;
    fs::rename(&temp, path).with_context(|| format!("failed to replace {}", path.display()))
}
