//! Resolution result types

use crate::domain::PodVersion;
use crate::lockfile::PodEntry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// How a root pod was pinned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedVersion {
    /// Chosen from a spec index (or kept at its locked version)
    Version(PodVersion),
    /// Git or path pod copied from the previous lockfile
    External { revision: Option<String> },
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedVersion::Version(version) => write!(f, "{}", version),
            ResolvedVersion::External {
                revision: Some(revision),
            } => write!(f, "{}", revision),
            ResolvedVersion::External { revision: None } => f.write_str("external"),
        }
    }
}

/// One root pod in the resolved graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPod {
    pub name: String,
    pub version: ResolvedVersion,
    /// `PODS` entries of the root and its requested subspecs
    pub entries: Vec<PodEntry>,
    /// True when the entries were generated rather than copied
    pub changed: bool,
    /// Spec repo key for `SPEC REPOS`
    pub spec_repo: Option<String>,
    /// Spec checksum of a newly selected version
    pub checksum: Option<String>,
}

impl ResolvedPod {
    /// Version for registry pods
    pub fn pod_version(&self) -> Option<&PodVersion> {
        match &self.version {
            ResolvedVersion::Version(version) => Some(version),
            ResolvedVersion::External { .. } => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self.version, ResolvedVersion::External { .. })
    }
}

/// A locked version that moved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockChange {
    pub name: String,
    /// `None` for pods that were not locked before
    pub previous: Option<String>,
    /// `None` for pods dropped from the graph
    pub updated: Option<String>,
}

/// Pods reachable from the manifest, keyed by root name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub pods: BTreeMap<String, ResolvedPod>,
}

impl Resolution {
    pub fn get(&self, root: &str) -> Option<&ResolvedPod> {
        self.pods.get(root)
    }

    pub fn version_of(&self, root: &str) -> Option<&PodVersion> {
        self.get(root).and_then(ResolvedPod::pod_version)
    }

    /// Every `PODS` entry across all roots
    pub fn entries(&self) -> impl Iterator<Item = (&ResolvedPod, &PodEntry)> {
        self.pods
            .values()
            .flat_map(|pod| pod.entries.iter().map(move |entry| (pod, entry)))
    }

    /// Version moves relative to the previous locked versions, by root name
    pub fn changes(&self, previous: &BTreeMap<String, String>) -> Vec<LockChange> {
        let mut changes = Vec::new();
        for (name, pod) in &self.pods {
            let updated = pod.pod_version().map(|v| v.to_string());
            let before = previous.get(name).cloned();
            if pod.is_external() || before == updated {
                continue;
            }
            changes.push(LockChange {
                name: name.clone(),
                previous: before,
                updated,
            });
        }
        for (name, version) in previous {
            if !self.pods.contains_key(name) {
                changes.push(LockChange {
                    name: name.clone(),
                    previous: Some(version.clone()),
                    updated: None,
                });
            }
        }
        changes.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(name: &str, version: &str) -> ResolvedPod {
        ResolvedPod {
            name: name.to_string(),
            version: ResolvedVersion::Version(version.parse().unwrap()),
            entries: vec![PodEntry::new(name, version)],
            changed: false,
            spec_repo: None,
            checksum: None,
        }
    }

    #[test]
    fn test_changes() {
        let mut resolution = Resolution::default();
        resolution
            .pods
            .insert("Alamofire".to_string(), registry("Alamofire", "4.0.1"));
        resolution
            .pods
            .insert("Nimble".to_string(), registry("Nimble", "2.0.0"));
        resolution
            .pods
            .insert("Bolts".to_string(), registry("Bolts", "1.9.0"));

        let previous: BTreeMap<String, String> = [
            ("Alamofire", "3.0.1"),
            ("Nimble", "2.0.0"),
            ("Old", "1.0"),
        ]
        .iter()
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect();

        let changes = resolution.changes(&previous);
        assert_eq!(
            changes,
            vec![
                LockChange {
                    name: "Alamofire".to_string(),
                    previous: Some("3.0.1".to_string()),
                    updated: Some("4.0.1".to_string()),
                },
                LockChange {
                    name: "Bolts".to_string(),
                    previous: None,
                    updated: Some("1.9.0".to_string()),
                },
                LockChange {
                    name: "Old".to_string(),
                    previous: Some("1.0".to_string()),
                    updated: None,
                },
            ]
        );
    }

    #[test]
    fn test_external_display() {
        let version = ResolvedVersion::External {
            revision: Some("1f72088".to_string()),
        };
        assert_eq!(version.to_string(), "1f72088");
        assert_eq!(
            ResolvedVersion::External { revision: None }.to_string(),
            "external"
        );
    }
}
