//! Dependency information structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which git revision a git-sourced pod is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GitRevision {
    Commit(String),
    Tag(String),
    Branch(String),
    /// Default branch head
    Head,
}

/// Where a pod's code comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DependencySource {
    /// Resolved through a spec repository, optionally pinned with `:source =>`
    Registry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repo: Option<String>,
    },
    /// Bound to a git repository (`:git =>`)
    Git { url: String, revision: GitRevision },
    /// Local path or standalone podspec (`:path =>`, `:podspec =>`)
    Path { path: String },
}

impl DependencySource {
    /// Returns true if versions for this source come from a spec index
    pub fn is_registry(&self) -> bool {
        matches!(self, DependencySource::Registry { .. })
    }
}

impl Default for DependencySource {
    fn default() -> Self {
        DependencySource::Registry { repo: None }
    }
}

/// Represents a pod dependency taking part in one update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Pod name, possibly a subspec (`Firebase/Core`)
    pub name: String,
    /// Current requirement string; `None` means unconstrained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement: Option<String>,
    /// Requirement before the update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_requirement: Option<String>,
    /// Source descriptor
    #[serde(default)]
    pub source: DependencySource,
}

impl Dependency {
    /// Creates a new registry dependency
    pub fn new(name: impl Into<String>, requirement: Option<&str>) -> Self {
        Self {
            name: name.into(),
            requirement: requirement.map(str::to_string),
            previous_requirement: None,
            source: DependencySource::default(),
        }
    }

    /// Sets the previous requirement (builder pattern)
    pub fn with_previous_requirement(mut self, requirement: Option<&str>) -> Self {
        self.previous_requirement = requirement.map(str::to_string);
        self
    }

    /// Sets the source (builder pattern)
    pub fn with_source(mut self, source: DependencySource) -> Self {
        self.source = source;
        self
    }

    /// Name of the root pod (`Firebase` for `Firebase/Core`)
    pub fn root_name(&self) -> &str {
        root_name(&self.name)
    }

    /// Returns true if this dependency is bound to git or a local path
    pub fn is_external(&self) -> bool {
        !self.source.is_registry()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, &self.requirement) {
            (DependencySource::Git { url, .. }, _) => write!(f, "{} (from {})", self.name, url),
            (DependencySource::Path { path }, _) => write!(f, "{} (from {})", self.name, path),
            (_, Some(req)) => write!(f, "{} ({})", self.name, req),
            (_, None) => write!(f, "{}", self.name),
        }
    }
}

/// Root pod of a possibly subspec-qualified name
pub fn root_name(name: &str) -> &str {
    name.split('/').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_new() {
        let dep = Dependency::new("Alamofire", Some("~> 4.0.0"));
        assert_eq!(dep.name, "Alamofire");
        assert_eq!(dep.requirement.as_deref(), Some("~> 4.0.0"));
        assert!(!dep.is_external());
    }

    #[test]
    fn test_root_name() {
        assert_eq!(root_name("Firebase/Core"), "Firebase");
        assert_eq!(root_name("Alamofire"), "Alamofire");
        let dep = Dependency::new("Firebase/Analytics/Core", None);
        assert_eq!(dep.root_name(), "Firebase");
    }

    #[test]
    fn test_external_sources() {
        let git = Dependency::new("Alamofire", None).with_source(DependencySource::Git {
            url: "https://github.com/Alamofire/Alamofire.git".to_string(),
            revision: GitRevision::Commit("1f72088".to_string()),
        });
        assert!(git.is_external());

        let path = Dependency::new("Local", None).with_source(DependencySource::Path {
            path: "../Local".to_string(),
        });
        assert!(path.is_external());
    }

    #[test]
    fn test_display() {
        let dep = Dependency::new("Nimble", Some("~> 2.0.0"));
        assert_eq!(dep.to_string(), "Nimble (~> 2.0.0)");
        assert_eq!(Dependency::new("Nimble", None).to_string(), "Nimble");
    }

    #[test]
    fn test_serde_dependency() {
        let dep = Dependency::new("Alamofire", Some("~> 4.0.0"))
            .with_previous_requirement(Some("~> 3.0.0"));
        let json = serde_json::to_string(&dep).unwrap();
        let parsed: Dependency = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, dep);
    }
}
