//! podup - CocoaPods Podfile and Podfile.lock updater library
//!
//! This library updates a single pod's requirement and re-resolves the
//! lockfile with minimal churn:
//! - Podfile requirement rewriting (`podfile`)
//! - Spec index clients for the CDN trunk and GitHub-hosted spec repos (`index`)
//! - Dependency resolution that keeps unrelated pods locked (`resolver`)
//! - Podfile.lock parsing and generation (`lockfile`)
//! - Credential scrubbing of generated files (`scrub`)

pub mod checksum;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod index;
pub mod lockfile;
pub mod output;
pub mod podfile;
pub mod progress;
pub mod resolver;
pub mod scrub;
pub mod updater;
