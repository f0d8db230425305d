//! Spec records parsed from `*.podspec.json` documents

use crate::checksum::sha1_hex;
use crate::domain::{root_name, PodVersion, Requirement};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A dependency declared by a spec or one of its subspecs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDependency {
    pub name: String,
    pub requirement: Requirement,
}

impl SpecDependency {
    /// Lockfile rendering: `Name (~> 1.0)` or bare `Name`
    pub fn lock_string(&self) -> String {
        if self.requirement.is_any() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.requirement)
        }
    }
}

/// A named part of a pod sharing the root's version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subspec {
    pub name: String,
    pub dependencies: Vec<SpecDependency>,
    pub subspecs: Vec<Subspec>,
    pub default_subspecs: Vec<String>,
}

/// Metadata for one version of a pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRecord {
    pub name: String,
    pub version: PodVersion,
    pub dependencies: Vec<SpecDependency>,
    pub subspecs: Vec<Subspec>,
    pub default_subspecs: Vec<String>,
    pub deprecated: bool,
    /// SHA-1 of the spec document, as written under `SPEC CHECKSUMS`
    pub checksum: String,
}

#[derive(Debug, Deserialize)]
struct RawSpec {
    name: String,
    version: String,
    #[serde(default)]
    dependencies: BTreeMap<String, RawRequirement>,
    #[serde(default)]
    subspecs: Vec<RawSubspec>,
    #[serde(default)]
    default_subspecs: Option<StringOrList>,
    #[serde(default)]
    default_subspec: Option<StringOrList>,
    #[serde(default)]
    deprecated: bool,
    #[serde(default)]
    deprecated_in_favor_of: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSubspec {
    name: String,
    #[serde(default)]
    dependencies: BTreeMap<String, RawRequirement>,
    #[serde(default)]
    subspecs: Vec<RawSubspec>,
    #[serde(default)]
    default_subspecs: Option<StringOrList>,
    #[serde(default)]
    default_subspec: Option<StringOrList>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::One(s) => vec![s],
            StringOrList::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRequirement {
    List(Vec<String>),
    One(String),
}

impl SpecRecord {
    /// Parse a podspec JSON document
    pub fn from_json(body: &[u8]) -> Result<SpecRecord, String> {
        let raw: RawSpec = serde_json::from_slice(body).map_err(|e| e.to_string())?;
        let version: PodVersion = raw.version.parse().map_err(|e| format!("{}", e))?;
        let default_subspecs = raw
            .default_subspecs
            .or(raw.default_subspec)
            .map(StringOrList::into_vec)
            .unwrap_or_default();

        Ok(SpecRecord {
            dependencies: convert_dependencies(raw.dependencies)?,
            subspecs: raw
                .subspecs
                .into_iter()
                .map(convert_subspec)
                .collect::<Result<_, _>>()?,
            default_subspecs,
            deprecated: raw.deprecated || raw.deprecated_in_favor_of.is_some(),
            checksum: sha1_hex(body),
            name: raw.name,
            version,
        })
    }

    /// Returns true if `full_name` (`Root` or `Root/Sub/...`) names this spec
    /// or one of its subspecs
    pub fn has_spec(&self, full_name: &str) -> bool {
        self.subspec_path(full_name).is_some()
    }

    /// Dependencies of the spec or subspec called `full_name`.
    ///
    /// Subspecs inherit the dependencies of every parent. Dependencies on
    /// other parts of the same pod carry no requirement since they share its
    /// version. A spec with subspecs depends on its default subspecs (all of
    /// them when no default is declared).
    pub fn dependencies_for(&self, full_name: &str) -> Vec<SpecDependency> {
        let Some(path) = self.subspec_path(full_name) else {
            return Vec::new();
        };

        let mut deps: Vec<SpecDependency> = self.dependencies.clone();
        let mut prefix = self.name.clone();
        let mut children: &[Subspec] = &self.subspecs;
        let mut defaults: &[String] = &self.default_subspecs;

        for subspec in &path {
            deps.extend(subspec.dependencies.iter().cloned());
            prefix = format!("{}/{}", prefix, subspec.name);
            children = &subspec.subspecs;
            defaults = &subspec.default_subspecs;
        }

        let implied: Vec<&str> = if defaults.is_empty() {
            children.iter().map(|s| s.name.as_str()).collect()
        } else {
            defaults.iter().map(String::as_str).collect()
        };
        for child in implied {
            deps.push(SpecDependency {
                name: format!("{}/{}", prefix, child),
                requirement: Requirement::any(),
            });
        }

        let root = root_name(&self.name);
        for dep in deps.iter_mut() {
            if root_name(&dep.name) == root {
                dep.requirement = Requirement::any();
            }
        }

        deps.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        deps.dedup_by(|a, b| a.name == b.name);
        deps
    }

    fn subspec_path(&self, full_name: &str) -> Option<Vec<&Subspec>> {
        let mut parts = full_name.split('/');
        if parts.next()? != self.name {
            return None;
        }
        let mut path = Vec::new();
        let mut children: &[Subspec] = &self.subspecs;
        for part in parts {
            let subspec = children.iter().find(|s| s.name == part)?;
            path.push(subspec);
            children = &subspec.subspecs;
        }
        Some(path)
    }
}

fn convert_subspec(raw: RawSubspec) -> Result<Subspec, String> {
    Ok(Subspec {
        name: raw.name,
        dependencies: convert_dependencies(raw.dependencies)?,
        subspecs: raw
            .subspecs
            .into_iter()
            .map(convert_subspec)
            .collect::<Result<_, _>>()?,
        default_subspecs: raw
            .default_subspecs
            .or(raw.default_subspec)
            .map(StringOrList::into_vec)
            .unwrap_or_default(),
    })
}

fn convert_dependencies(
    raw: BTreeMap<String, RawRequirement>,
) -> Result<Vec<SpecDependency>, String> {
    raw.into_iter()
        .map(|(name, requirement)| {
            let text = match requirement {
                RawRequirement::List(list) => list.join(", "),
                RawRequirement::One(one) => one,
            };
            let requirement: Requirement = text
                .parse()
                .map_err(|e| format!("dependency {}: {}", name, e))?;
            Ok(SpecDependency { name, requirement })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIREBASE: &str = r#"{
        "name": "Firebase",
        "version": "8.0.0",
        "dependencies": {"GoogleUtilities": ["~> 7.4"]},
        "default_subspecs": "Core",
        "subspecs": [
            {"name": "CoreOnly", "dependencies": {"FirebaseCore": ["8.0.0"]}},
            {"name": "Core", "dependencies": {"Firebase/CoreOnly": [], "FirebaseAnalytics": ["~> 8.0.0"]}},
            {"name": "Analytics", "dependencies": {"Firebase/Core": []}}
        ]
    }"#;

    fn firebase() -> SpecRecord {
        SpecRecord::from_json(FIREBASE.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_simple_spec() {
        let body = br#"{"name": "Alamofire", "version": "4.0.1", "dependencies": {}}"#;
        let spec = SpecRecord::from_json(body).unwrap();
        assert_eq!(spec.name, "Alamofire");
        assert_eq!(spec.version.to_string(), "4.0.1");
        assert!(!spec.deprecated);
        assert_eq!(spec.checksum, sha1_hex(body));
        assert!(spec.dependencies_for("Alamofire").is_empty());
    }

    #[test]
    fn test_deprecated_in_favor_of() {
        let body = br#"{"name": "Old", "version": "1.0", "deprecated_in_favor_of": "New"}"#;
        assert!(SpecRecord::from_json(body).unwrap().deprecated);
    }

    #[test]
    fn test_invalid_spec() {
        assert!(SpecRecord::from_json(b"not json").is_err());
        assert!(SpecRecord::from_json(br#"{"name": "X", "version": "abc"}"#).is_err());
    }

    #[test]
    fn test_root_depends_on_default_subspecs() {
        let deps: Vec<String> = firebase()
            .dependencies_for("Firebase")
            .iter()
            .map(SpecDependency::lock_string)
            .collect();
        assert_eq!(deps, vec!["Firebase/Core", "GoogleUtilities (~> 7.4)"]);
    }

    #[test]
    fn test_subspec_inherits_root_dependencies() {
        let deps: Vec<String> = firebase()
            .dependencies_for("Firebase/Core")
            .iter()
            .map(SpecDependency::lock_string)
            .collect();
        assert_eq!(
            deps,
            vec![
                "Firebase/CoreOnly",
                "FirebaseAnalytics (~> 8.0.0)",
                "GoogleUtilities (~> 7.4)"
            ]
        );
    }

    #[test]
    fn test_unknown_subspec() {
        assert!(!firebase().has_spec("Firebase/Missing"));
        assert!(firebase().has_spec("Firebase/Analytics"));
        assert!(firebase().dependencies_for("Other").is_empty());
    }

    #[test]
    fn test_exact_dependency_renders_with_operator() {
        let deps = firebase().dependencies_for("Firebase/CoreOnly");
        let rendered: Vec<String> = deps.iter().map(SpecDependency::lock_string).collect();
        assert_eq!(
            rendered,
            vec!["FirebaseCore (= 8.0.0)", "GoogleUtilities (~> 7.4)"]
        );
    }
}
