//! Podfile.lock reading and generation
//!
//! This module provides:
//! - `Lockfile`, the parsed previous lockfile with raw lines kept per entry
//! - `build`, which serializes a resolution into lockfile text
//! - Section names

mod builder;
pub mod yaml;

pub use builder::build;

use crate::domain::{root_name, PodVersion};
use crate::error::LockfileError;
use regex::Regex;
use std::sync::LazyLock;
use yaml::{Entry, Section};

pub const PODS: &str = "PODS";
pub const DEPENDENCIES: &str = "DEPENDENCIES";
pub const SPEC_REPOS: &str = "SPEC REPOS";
pub const EXTERNAL_SOURCES: &str = "EXTERNAL SOURCES";
pub const CHECKOUT_OPTIONS: &str = "CHECKOUT OPTIONS";
pub const SPEC_CHECKSUMS: &str = "SPEC CHECKSUMS";
pub const PODFILE_CHECKSUM: &str = "PODFILE CHECKSUM";
pub const COCOAPODS: &str = "COCOAPODS";

// Name (details)
static NAME_DETAILS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?) \((.+)\)$").unwrap());

/// One entry under `PODS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodEntry {
    /// Full name, possibly a subspec (`Firebase/Core`)
    pub name: String,
    /// Locked version as written
    pub version: String,
    /// Nested dependency strings (`Bolts (~> 1.0)`)
    pub dependencies: Vec<String>,
    /// Lines this entry was read from; empty for generated entries
    pub raw: Vec<String>,
}

impl PodEntry {
    /// Create a generated entry
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dependencies: Vec::new(),
            raw: Vec::new(),
        }
    }

    /// Sets the nested dependencies (builder pattern)
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn root_name(&self) -> &str {
        root_name(&self.name)
    }

    /// Parsed locked version, if it is a valid version
    pub fn pod_version(&self) -> Option<PodVersion> {
        self.version.parse().ok()
    }

    fn from_entry(entry: &Entry) -> Result<Self, LockfileError> {
        let (name, version) = split_name_details(&entry.key).ok_or_else(|| {
            LockfileError::parse(
                entry.line,
                format!("expected `Name (version)` in PODS, found '{}'", entry.key),
            )
        })?;
        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            dependencies: entry.items().into_iter().map(str::to_string).collect(),
            raw: entry.raw.clone(),
        })
    }
}

/// One entry under `DEPENDENCIES`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub name: String,
    /// Requirement or `from ...` source description
    pub details: Option<String>,
    pub raw: Vec<String>,
}

impl DeclaredDependency {
    /// Returns true for `Name (from ...)` entries
    pub fn is_external(&self) -> bool {
        self.details
            .as_deref()
            .is_some_and(|d| d.starts_with("from "))
    }
}

/// Parsed Podfile.lock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lockfile {
    pub pods: Vec<PodEntry>,
    pub dependencies: Vec<DeclaredDependency>,
    /// `None` when the section is absent (older CocoaPods)
    pub spec_repos: Option<Vec<(String, Vec<String>)>>,
    pub external_sources: Vec<Entry>,
    pub checkout_options: Vec<Entry>,
    pub spec_checksums: Vec<Entry>,
    pub podfile_checksum: Option<String>,
    pub cocoapods: Option<Section>,
    /// Sections podup does not interpret, carried verbatim
    pub other_sections: Vec<Section>,
}

impl Lockfile {
    /// Parse Podfile.lock text
    pub fn parse(text: &str) -> Result<Self, LockfileError> {
        let mut lockfile = Lockfile::default();

        for section in yaml::parse(text)? {
            match section.key.as_str() {
                PODS => {
                    for entry in &section.entries {
                        lockfile.pods.push(PodEntry::from_entry(entry)?);
                    }
                }
                DEPENDENCIES => {
                    lockfile.dependencies = section
                        .entries
                        .iter()
                        .map(|entry| {
                            let (name, details) = match split_name_details(&entry.key) {
                                Some((name, details)) => (name, Some(details.to_string())),
                                None => (entry.key.as_str(), None),
                            };
                            DeclaredDependency {
                                name: name.to_string(),
                                details,
                                raw: entry.raw.clone(),
                            }
                        })
                        .collect();
                }
                SPEC_REPOS => {
                    lockfile.spec_repos = Some(
                        section
                            .entries
                            .iter()
                            .map(|entry| {
                                let pods = entry.items().into_iter().map(str::to_string).collect();
                                (entry.key.clone(), pods)
                            })
                            .collect(),
                    );
                }
                EXTERNAL_SOURCES => lockfile.external_sources = section.entries,
                CHECKOUT_OPTIONS => lockfile.checkout_options = section.entries,
                SPEC_CHECKSUMS => lockfile.spec_checksums = section.entries,
                PODFILE_CHECKSUM => lockfile.podfile_checksum = section.value,
                COCOAPODS => lockfile.cocoapods = Some(section),
                _ => {
                    log::debug!("carrying unknown lockfile section {}", section.key);
                    lockfile.other_sections.push(section);
                }
            }
        }

        Ok(lockfile)
    }

    /// Entries of a root pod and its subspecs
    pub fn pods_for_root(&self, root: &str) -> Vec<&PodEntry> {
        self.pods.iter().filter(|p| p.root_name() == root).collect()
    }

    /// Locked version of a root pod
    pub fn locked_version(&self, root: &str) -> Option<PodVersion> {
        self.pods_for_root(root)
            .first()
            .and_then(|entry| entry.pod_version())
    }

    /// Spec repo key a root pod was installed from
    pub fn spec_repo_of(&self, root: &str) -> Option<&str> {
        self.spec_repos.as_ref().and_then(|repos| {
            repos
                .iter()
                .find(|(_, pods)| pods.iter().any(|p| p == root))
                .map(|(key, _)| key.as_str())
        })
    }

    pub fn external_source(&self, root: &str) -> Option<&Entry> {
        self.external_sources.iter().find(|e| e.key == root)
    }

    pub fn checkout_option(&self, root: &str) -> Option<&Entry> {
        self.checkout_options.iter().find(|e| e.key == root)
    }

    pub fn spec_checksum(&self, root: &str) -> Option<&Entry> {
        self.spec_checksums.iter().find(|e| e.key == root)
    }

    /// Locked git commit of an external pod
    pub fn revision_of(&self, root: &str) -> Option<&str> {
        self.checkout_option(root)
            .and_then(|entry| entry.pair(":commit"))
            .or_else(|| self.external_source(root).and_then(|e| e.pair(":commit")))
    }

    pub fn declared(&self, name: &str) -> Option<&DeclaredDependency> {
        self.dependencies.iter().find(|d| d.name == name)
    }
}

/// Split `Name (details)` into its parts
pub fn split_name_details(text: &str) -> Option<(&str, &str)> {
    let caps = NAME_DETAILS_RE.captures(text)?;
    let name = caps.get(1)?.as_str();
    let details = caps.get(2)?.as_str();
    Some((name, details))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const GIT_LOCK: &str = "PODS:
  - Alamofire (4.3.0)
  - Nimble (3.0.0)

DEPENDENCIES:
  - Alamofire (from `https://github.com/Alamofire/Alamofire.git`, commit `1f72088aff8f6b40828dadd61be2e9a31beca01e`)
  - Nimble (~> 3.0.0)

SPEC REPOS:
  https://github.com/CocoaPods/Specs.git:
    - Nimble

EXTERNAL SOURCES:
  Alamofire:
    :commit: 1f72088aff8f6b40828dadd61be2e9a31beca01e
    :git: https://github.com/Alamofire/Alamofire.git

CHECKOUT OPTIONS:
  Alamofire:
    :commit: 1f72088aff8f6b40828dadd61be2e9a31beca01e
    :git: https://github.com/Alamofire/Alamofire.git

SPEC CHECKSUMS:
  Alamofire: 2e9c6a4ba09e2fa4a4bc4fee9ddb1a94e1e0a2d5
  Nimble: 415e3aa3267e7bc2c96b05fa814ddea7bb686a29

PODFILE CHECKSUM: 45a0ff0e0bba8e3a4d2b4b1c5d2b5a3c6b3e1f23

COCOAPODS: 1.2.1
";

    #[test]
    fn test_parse_pods() {
        let lock = Lockfile::parse(GIT_LOCK).unwrap();
        assert_eq!(lock.pods.len(), 2);
        assert_eq!(lock.pods[0].name, "Alamofire");
        assert_eq!(lock.pods[0].version, "4.3.0");
        assert_eq!(lock.pods[0].raw, vec!["  - Alamofire (4.3.0)".to_string()]);
        assert_eq!(lock.locked_version("Nimble"), Some("3.0.0".parse().unwrap()));
    }

    #[test]
    fn test_parse_dependencies() {
        let lock = Lockfile::parse(GIT_LOCK).unwrap();
        let alamofire = lock.declared("Alamofire").unwrap();
        assert!(alamofire.is_external());
        let nimble = lock.declared("Nimble").unwrap();
        assert_eq!(nimble.details.as_deref(), Some("~> 3.0.0"));
        assert!(!nimble.is_external());
    }

    #[test]
    fn test_parse_external_sources() {
        let lock = Lockfile::parse(GIT_LOCK).unwrap();
        assert_eq!(
            lock.revision_of("Alamofire"),
            Some("1f72088aff8f6b40828dadd61be2e9a31beca01e")
        );
        assert_eq!(
            lock.external_source("Alamofire").unwrap().pair(":git"),
            Some("https://github.com/Alamofire/Alamofire.git")
        );
        assert!(lock.revision_of("Nimble").is_none());
    }

    #[test]
    fn test_parse_spec_repos_and_checksums() {
        let lock = Lockfile::parse(GIT_LOCK).unwrap();
        assert_eq!(
            lock.spec_repo_of("Nimble"),
            Some("https://github.com/CocoaPods/Specs.git")
        );
        assert_eq!(
            lock.spec_checksum("Nimble").unwrap().value.as_deref(),
            Some("415e3aa3267e7bc2c96b05fa814ddea7bb686a29")
        );
        assert_eq!(
            lock.podfile_checksum.as_deref(),
            Some("45a0ff0e0bba8e3a4d2b4b1c5d2b5a3c6b3e1f23")
        );
        assert_eq!(lock.cocoapods.unwrap().value.as_deref(), Some("1.2.1"));
    }

    #[test]
    fn test_subspec_entries_share_root() {
        let lock = Lockfile::parse(
            "PODS:\n  - Firebase/Core (8.0.0):\n    - Firebase/CoreOnly\n  - Firebase/CoreOnly (8.0.0)\n",
        )
        .unwrap();
        assert_eq!(lock.pods_for_root("Firebase").len(), 2);
        assert_eq!(lock.pods[0].dependencies, vec!["Firebase/CoreOnly".to_string()]);
        assert_eq!(lock.locked_version("Firebase"), Some("8.0.0".parse().unwrap()));
    }

    #[test]
    fn test_unknown_sections_are_kept() {
        let lock = Lockfile::parse("PODS:\n  - A (1.0)\n\nPLUGINS:\n  cocoapods-keys:\n    - X\n").unwrap();
        assert_eq!(lock.other_sections.len(), 1);
        assert_eq!(lock.other_sections[0].key, "PLUGINS");
    }

    #[test]
    fn test_malformed_pod_entry() {
        assert!(Lockfile::parse("PODS:\n  - Alamofire\n").is_err());
    }

    #[test]
    fn test_split_name_details() {
        assert_eq!(
            split_name_details("Alamofire (~> 4.0.0)"),
            Some(("Alamofire", "~> 4.0.0"))
        );
        assert_eq!(split_name_details("Alamofire"), None);
    }
}
