//! Podfile parsing and rewriting
//!
//! This module provides:
//! - Declaration parsing for `pod` lines (requirements and source options)
//! - `source` line collection, in declaration order
//! - In-place requirement rewriting for a single dependency

mod declaration;
mod rewriter;

pub use declaration::{comment_start, Declaration, StringToken};
pub use rewriter::rewrite;

use crate::domain::{Dependency, DependencySource, GitRevision};
use regex::Regex;
use std::sync::LazyLock;

// source 'https://cdn.cocoapods.org/'
static SOURCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*source\s*\(?\s*(['"])([^'"]+)(['"])"#).unwrap());

/// Parse every `pod` declaration into a dependency
pub fn parse_dependencies(text: &str) -> Vec<Dependency> {
    text.lines()
        .filter_map(Declaration::parse)
        .map(|decl| {
            let source = declaration_source(&decl);
            let requirement = decl.requirement();
            Dependency::new(decl.name.value.clone(), requirement.as_deref()).with_source(source)
        })
        .collect()
}

/// Spec repository URLs from `source` lines, in order of appearance
pub fn parse_sources(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let code = &line[..comment_start(line)];
            let caps = SOURCE_RE.captures(code)?;
            if caps[1] != caps[3] {
                return None;
            }
            Some(caps[2].to_string())
        })
        .collect()
}

fn declaration_source(decl: &Declaration) -> DependencySource {
    if let Some(url) = decl.option("git") {
        let revision = if let Some(commit) = decl.option("commit") {
            GitRevision::Commit(commit.to_string())
        } else if let Some(tag) = decl.option("tag") {
            GitRevision::Tag(tag.to_string())
        } else if let Some(branch) = decl.option("branch") {
            GitRevision::Branch(branch.to_string())
        } else {
            GitRevision::Head
        };
        return DependencySource::Git {
            url: url.to_string(),
            revision,
        };
    }

    if let Some(path) = decl.option("path").or_else(|| decl.option("podspec")) {
        return DependencySource::Path {
            path: path.to_string(),
        };
    }

    DependencySource::Registry {
        repo: decl.option("source").map(str::to_string),
    }
}
