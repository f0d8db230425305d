//! Spec repository locations
//!
//! Maps a Podfile `source` URL onto one of the layouts podup can read:
//! - the CocoaPods CDN (and any host serving the same layout)
//! - a GitHub-hosted spec repository, read through the REST API

use crate::config::IndexConfig;
use regex::Regex;
use std::sync::LazyLock;

/// `SPEC REPOS` key of the public CocoaPods index
pub const TRUNK_KEY: &str = "trunk";

/// Default branch of a GitHub spec repository
const DEFAULT_BRANCH: &str = "master";

// https://github.com/<owner>/<repo>(.git)(/)
static GITHUB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?|git)://(?:www\.)?github\.com/([^/\s]+)/([^/\s]+?)(?:\.git)?/?$").unwrap()
});

// scheme://user:secret@
static USERINFO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z][a-zA-Z0-9+.-]*://)[^/@\s]*@").unwrap());

/// Where and how a spec repository is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecRepo {
    /// CDN layout: sharded version files plus `Specs/a/b/c/...` documents
    Cdn { base_url: String, key: String },
    /// GitHub repository with the flat `<name>/<version>/` layout
    GitHub {
        api_url: String,
        owner: String,
        repo: String,
        branch: String,
        key: String,
    },
}

impl SpecRepo {
    /// The public CocoaPods CDN
    pub fn trunk(config: &IndexConfig) -> Self {
        SpecRepo::Cdn {
            base_url: config.cdn_url.trim_end_matches('/').to_string(),
            key: TRUNK_KEY.to_string(),
        }
    }

    /// Interpret a `source` URL from a Podfile
    pub fn from_source_url(url: &str, config: &IndexConfig) -> Self {
        let clean = strip_userinfo(url.trim());
        let lowered = clean.trim_end_matches('/').to_ascii_lowercase();

        if lowered == TRUNK_KEY
            || lowered == config.cdn_url.trim_end_matches('/').to_ascii_lowercase()
            || lowered == "https://cdn.cocoapods.org"
        {
            return Self::trunk(config);
        }

        if let Some(caps) = GITHUB_RE.captures(&clean) {
            let owner = caps[1].to_string();
            let repo = caps[2].to_string();
            if owner.eq_ignore_ascii_case("CocoaPods") && repo.eq_ignore_ascii_case("Specs") {
                return Self::trunk(config);
            }
            return SpecRepo::GitHub {
                api_url: config.github_api_url.trim_end_matches('/').to_string(),
                owner,
                repo,
                branch: DEFAULT_BRANCH.to_string(),
                key: clean,
            };
        }

        SpecRepo::Cdn {
            base_url: clean.trim_end_matches('/').to_string(),
            key: clean,
        }
    }

    /// Key written under `SPEC REPOS`; never contains credentials
    pub fn key(&self) -> &str {
        match self {
            SpecRepo::Cdn { key, .. } | SpecRepo::GitHub { key, .. } => key,
        }
    }
}

/// Remove `user:secret@` from a URL
pub fn strip_userinfo(url: &str) -> String {
    USERINFO_RE.replace(url, "$1").into_owned()
}
