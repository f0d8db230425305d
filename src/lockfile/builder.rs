//! Podfile.lock serialization
//!
//! Sections are written in the order CocoaPods uses, separated by one blank
//! line. Entries the update did not touch are copied from the previous
//! lockfile line for line.

use super::yaml::{quote, Entry};
use super::{
    Lockfile, PodEntry, CHECKOUT_OPTIONS, COCOAPODS, DEPENDENCIES, EXTERNAL_SOURCES,
    PODFILE_CHECKSUM, PODS, SPEC_CHECKSUMS, SPEC_REPOS,
};
use crate::checksum::podfile_checksum;
use crate::config::IndexConfig;
use crate::domain::{Dependency, DependencySource, GitRevision, Requirement};
use crate::index::{SpecRepo, TRUNK_KEY};
use crate::podfile::parse_dependencies;
use crate::resolver::{Resolution, ResolvedPod};
use std::collections::BTreeMap;

/// Serialize `resolution` as lockfile text for `manifest`
pub fn build(resolution: &Resolution, previous: &Lockfile, manifest: &str) -> String {
    let mut sections: Vec<Vec<String>> = Vec::new();

    sections.push(section(PODS, pods_lines(resolution)));
    sections.push(section(DEPENDENCIES, dependency_lines(previous, manifest)));

    if previous.spec_repos.is_some() {
        let lines = spec_repo_lines(resolution, previous);
        if !lines.is_empty() {
            sections.push(section(SPEC_REPOS, lines));
        }
    }

    let external: Vec<&ResolvedPod> = sorted(resolution.pods.values().filter(|p| p.is_external()));
    let external_lines = carried(&external, |root| previous.external_source(root));
    if !external_lines.is_empty() {
        sections.push(section(EXTERNAL_SOURCES, external_lines));
    }
    let checkout_lines = carried(&external, |root| previous.checkout_option(root));
    if !checkout_lines.is_empty() {
        sections.push(section(CHECKOUT_OPTIONS, checkout_lines));
    }

    let checksum_lines = spec_checksum_lines(resolution, previous);
    if !checksum_lines.is_empty() {
        sections.push(section(SPEC_CHECKSUMS, checksum_lines));
    }

    for other in &previous.other_sections {
        sections.push(other.raw.clone());
    }

    sections.push(vec![format!(
        "{}: {}",
        PODFILE_CHECKSUM,
        podfile_checksum(manifest)
    )]);

    if let Some(cocoapods) = &previous.cocoapods {
        sections.push(cocoapods.raw.clone());
    } else {
        log::debug!("previous lockfile has no {} section", COCOAPODS);
    }

    let mut text = sections
        .iter()
        .map(|lines| lines.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n");
    text.push('\n');
    text
}

fn section(key: &str, lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len() + 1);
    out.push(format!("{}:", key));
    out.extend(lines);
    out
}

/// Case-insensitive order used for every list in the lockfile
fn sort_key(name: &str) -> (String, String) {
    (name.to_lowercase(), name.to_string())
}

fn sorted<'a>(pods: impl Iterator<Item = &'a ResolvedPod>) -> Vec<&'a ResolvedPod> {
    let mut pods: Vec<&ResolvedPod> = pods.collect();
    pods.sort_by_key(|p| sort_key(&p.name));
    pods
}

fn pods_lines(resolution: &Resolution) -> Vec<String> {
    let mut entries: Vec<&PodEntry> = resolution.entries().map(|(_, entry)| entry).collect();
    entries.sort_by_key(|e| sort_key(&e.name));
    entries.dedup_by(|a, b| a.name == b.name);
    entries.into_iter().flat_map(pod_entry_lines).collect()
}

fn pod_entry_lines(entry: &PodEntry) -> Vec<String> {
    if !entry.raw.is_empty() {
        return entry.raw.clone();
    }
    let head = quote(&format!("{} ({})", entry.name, entry.version));
    if entry.dependencies.is_empty() {
        return vec![format!("  - {}", head)];
    }
    let mut lines = vec![format!("  - {}:", head)];
    lines.extend(
        entry
            .dependencies
            .iter()
            .map(|dep| format!("    - {}", quote(dep))),
    );
    lines
}

fn dependency_lines(previous: &Lockfile, manifest: &str) -> Vec<String> {
    let mut items: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();

    for dep in parse_dependencies(manifest) {
        let text = declared_text(&dep);
        let lines = match previous.declared(&dep.name) {
            Some(declared) if same_declaration(&dep, declared.details.as_deref()) => {
                declared.raw.clone()
            }
            Some(declared) if dep.is_external() && declared.is_external() => declared.raw.clone(),
            _ => vec![format!("  - {}", quote(&text))],
        };
        items.entry(sort_key(&text)).or_insert(lines);
    }

    items.into_values().flatten().collect()
}

/// `DEPENDENCIES` rendering of a Podfile declaration
fn declared_text(dep: &Dependency) -> String {
    match &dep.source {
        DependencySource::Registry { .. } => {
            let requirement = dep
                .requirement
                .as_deref()
                .and_then(|r| r.parse::<Requirement>().ok())
                .filter(|r| !r.is_any());
            match requirement {
                Some(requirement) => format!("{} ({})", dep.name, requirement),
                None => dep.name.clone(),
            }
        }
        DependencySource::Git { url, revision } => match revision {
            GitRevision::Commit(sha) => format!("{} (from `{}`, commit `{}`)", dep.name, url, sha),
            GitRevision::Tag(tag) => format!("{} (from `{}`, tag `{}`)", dep.name, url, tag),
            GitRevision::Branch(branch) => {
                format!("{} (from `{}`, branch `{}`)", dep.name, url, branch)
            }
            GitRevision::Head => format!("{} (from `{}`)", dep.name, url),
        },
        DependencySource::Path { path } => format!("{} (from `{}`)", dep.name, path),
    }
}

/// Returns true if a registry declaration still means what the previous
/// `DEPENDENCIES` item said
fn same_declaration(dep: &Dependency, previous: Option<&str>) -> bool {
    if dep.is_external() {
        return false;
    }
    let Ok(current) = Requirement::parse_optional(dep.requirement.as_deref()) else {
        return false;
    };
    match previous {
        Some(details) if details.starts_with("from ") => false,
        Some(details) => details.parse::<Requirement>().is_ok_and(|p| p == current),
        None => current.is_any(),
    }
}

fn spec_repo_lines(resolution: &Resolution, previous: &Lockfile) -> Vec<String> {
    let mut repos: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();

    for pod in resolution.pods.values() {
        if pod.is_external() {
            continue;
        }
        let Some(key) = pod.spec_repo.as_deref() else {
            continue;
        };
        let key = previous_trunk_key(previous, key).unwrap_or(key);
        repos
            .entry(sort_key(key))
            .or_default()
            .push(pod.name.clone());
    }

    let mut lines = Vec::new();
    for ((_, key), mut pods) in repos {
        pods.sort_by_key(|name| sort_key(name));
        lines.push(format!("  {}:", quote(&key)));
        lines.extend(pods.iter().map(|name| format!("    - {}", quote(name))));
    }
    lines
}

/// Heading the previous lockfile used for the public index, if it spelled
/// it as a URL
fn previous_trunk_key<'a>(previous: &'a Lockfile, key: &str) -> Option<&'a str> {
    if key != TRUNK_KEY {
        return None;
    }
    let config = IndexConfig::default();
    previous.spec_repos.as_ref()?.iter().find_map(|(existing, _)| {
        (SpecRepo::from_source_url(existing, &config).key() == TRUNK_KEY)
            .then_some(existing.as_str())
    })
}

/// Raw lines of per-pod blocks copied from the previous lockfile
fn carried<'a, F>(pods: &[&ResolvedPod], lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<&'a Entry>,
{
    pods.iter()
        .filter_map(|pod| lookup(&pod.name))
        .flat_map(|entry| entry.raw.clone())
        .collect()
}

fn spec_checksum_lines(resolution: &Resolution, previous: &Lockfile) -> Vec<String> {
    sorted(resolution.pods.values())
        .into_iter()
        .flat_map(|pod| {
            let carried = previous.spec_checksum(&pod.name);
            match (&pod.checksum, carried) {
                (_, Some(entry)) if !pod.changed => entry.raw.clone(),
                (Some(checksum), _) => vec![format!("  {}: {}", quote(&pod.name), checksum)],
                (None, Some(entry)) => entry.raw.clone(),
                (None, None) => Vec::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockfile::tests::GIT_LOCK;
    use crate::resolver::ResolvedVersion;

    const LOCK: &str = "PODS:
  - Alamofire (3.0.1)
  - Nimble (2.0.0)

DEPENDENCIES:
  - Alamofire (~> 3.0.0)
  - Nimble (~> 2.0.0)

SPEC REPOS:
  trunk:
    - Alamofire
    - Nimble

SPEC CHECKSUMS:
  Alamofire: 0a7b2c2e1e9e1a0b8d3f5c6e7a8b9c0d1e2f3a4b
  Nimble: 415e3aa3267e7bc2c96b05fa814ddea7bb686a29

PODFILE CHECKSUM: 0000000000000000000000000000000000000000

COCOAPODS: 1.1.1
";

    const PODFILE: &str =
        "target 'App' do\n  pod 'Alamofire', '~> 4.0.0'\n  pod 'Nimble', '~> 2.0.0'\nend\n";

    fn kept(previous: &Lockfile, root: &str) -> ResolvedPod {
        let entries: Vec<PodEntry> = previous.pods_for_root(root).into_iter().cloned().collect();
        ResolvedPod {
            name: root.to_string(),
            version: ResolvedVersion::Version(previous.locked_version(root).unwrap()),
            entries,
            changed: false,
            spec_repo: previous.spec_repo_of(root).map(str::to_string),
            checksum: None,
        }
    }

    fn fresh(name: &str, version: &str, deps: &[&str], checksum: &str) -> ResolvedPod {
        ResolvedPod {
            name: name.to_string(),
            version: ResolvedVersion::Version(version.parse().unwrap()),
            entries: vec![PodEntry::new(name, version)
                .with_dependencies(deps.iter().map(|d| d.to_string()).collect())],
            changed: true,
            spec_repo: Some(TRUNK_KEY.to_string()),
            checksum: Some(checksum.to_string()),
        }
    }

    fn resolution(pods: Vec<ResolvedPod>) -> Resolution {
        let mut resolution = Resolution::default();
        for pod in pods {
            resolution.pods.insert(pod.name.clone(), pod);
        }
        resolution
    }

    #[test]
    fn test_build_updates_changed_pod_only() {
        let previous = Lockfile::parse(LOCK).unwrap();
        let resolution = resolution(vec![
            fresh("Alamofire", "4.0.1", &[], "aaaa"),
            kept(&previous, "Nimble"),
        ]);

        let text = build(&resolution, &previous, PODFILE);
        let expected = format!(
            "PODS:
  - Alamofire (4.0.1)
  - Nimble (2.0.0)

DEPENDENCIES:
  - Alamofire (~> 4.0.0)
  - Nimble (~> 2.0.0)

SPEC REPOS:
  trunk:
    - Alamofire
    - Nimble

SPEC CHECKSUMS:
  Alamofire: aaaa
  Nimble: 415e3aa3267e7bc2c96b05fa814ddea7bb686a29

PODFILE CHECKSUM: {}

COCOAPODS: 1.1.1
",
            podfile_checksum(PODFILE)
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_unchanged_resolution_reproduces_lockfile() {
        let previous = Lockfile::parse(LOCK).unwrap();
        let podfile =
            "target 'App' do\n  pod 'Alamofire', '~> 3.0.0'\n  pod 'Nimble', '~> 2.0.0'\nend\n";
        let resolution = resolution(vec![kept(&previous, "Alamofire"), kept(&previous, "Nimble")]);

        let text = build(&resolution, &previous, podfile);
        let expected = LOCK.replace(
            "0000000000000000000000000000000000000000",
            &podfile_checksum(podfile),
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_nested_dependencies_and_sorting() {
        let previous = Lockfile::parse("PODS:\n  - zlib (1.0)\n\nCOCOAPODS: 1.11.3\n").unwrap();
        let resolution = resolution(vec![
            kept(&previous, "zlib"),
            fresh("Moya", "8.0.0", &["Alamofire (~> 4.1)", "Result (~> 3.0)"], "bbbb"),
            fresh("Alamofire", "4.3.0", &[], "cccc"),
        ]);
        let podfile = "pod 'Moya', '~> 8.0'\npod 'zlib'\n";

        let text = build(&resolution, &previous, podfile);
        assert!(text.starts_with(
            "PODS:
  - Alamofire (4.3.0)
  - Moya (8.0.0):
    - Alamofire (~> 4.1)
    - Result (~> 3.0)
  - zlib (1.0)

DEPENDENCIES:
  - Moya (~> 8.0)
  - zlib

SPEC CHECKSUMS:
  Alamofire: cccc
  Moya: bbbb
"
        ));
        assert!(!text.contains("SPEC REPOS"));
        assert!(text.ends_with("COCOAPODS: 1.11.3\n"));
    }

    #[test]
    fn test_external_sources_are_carried() {
        let previous = Lockfile::parse(GIT_LOCK).unwrap();
        let mut alamofire = kept(&previous, "Alamofire");
        alamofire.version = ResolvedVersion::External {
            revision: previous.revision_of("Alamofire").map(str::to_string),
        };
        alamofire.spec_repo = None;
        let resolution = resolution(vec![
            alamofire,
            fresh("Nimble", "6.0.1", &[], "dddd"),
        ]);
        let podfile = "pod 'Alamofire', :git => 'https://github.com/Alamofire/Alamofire.git', :commit => '1f72088aff8f6b40828dadd61be2e9a31beca01e'\npod 'Nimble', '~> 6.0.0'\n";

        let text = build(&resolution, &previous, podfile);
        assert!(text.contains(
            "DEPENDENCIES:
  - Alamofire (from `https://github.com/Alamofire/Alamofire.git`, commit `1f72088aff8f6b40828dadd61be2e9a31beca01e`)
  - Nimble (~> 6.0.0)
"
        ));
        assert!(text.contains(
            "SPEC REPOS:
  https://github.com/CocoaPods/Specs.git:
    - Nimble
"
        ));
        assert!(text.contains(
            "CHECKOUT OPTIONS:
  Alamofire:
    :commit: 1f72088aff8f6b40828dadd61be2e9a31beca01e
    :git: https://github.com/Alamofire/Alamofire.git
"
        ));
        assert!(text.contains("  Alamofire: 2e9c6a4ba09e2fa4a4bc4fee9ddb1a94e1e0a2d5\n"));
        assert!(text.contains("  Nimble: dddd\n"));
    }

    #[test]
    fn test_requirement_spelling_is_preserved_when_equivalent() {
        let previous =
            Lockfile::parse("PODS:\n  - Alamofire (4.0.1)\n\nDEPENDENCIES:\n  - Alamofire (~> 4.0)\n")
                .unwrap();
        let resolution = resolution(vec![kept(&previous, "Alamofire")]);

        let text = build(&resolution, &previous, "pod 'Alamofire', '~>4.0'\n");
        assert!(text.contains("DEPENDENCIES:\n  - Alamofire (~> 4.0)\n"));

        let text = build(&resolution, &previous, "pod 'Alamofire', '4.0.1'\n");
        assert!(text.contains("DEPENDENCIES:\n  - Alamofire (= 4.0.1)\n"));
    }

    #[test]
    fn test_generated_scalars_are_quoted_when_needed() {
        let entry = PodEntry::new("Weird: Name", "1.0");
        assert_eq!(pod_entry_lines(&entry), vec!["  - \"Weird: Name (1.0)\"".to_string()]);
    }
}
