//! Pod version numbers
//!
//! CocoaPods versions are dot-separated numeric segments with an optional
//! pre-release tag, written either semver-style (`1.0.0-beta.1`) or
//! RubyGems-style (`1.0.0.beta.1`). Missing trailing segments compare as
//! zero, so `4.0` and `4.0.0` are the same version.

use semver::Prerelease;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A parsed pod version that remembers how it was written
#[derive(Debug, Clone)]
pub struct PodVersion {
    raw: String,
    segments: Vec<u64>,
    prerelease: Option<Prerelease>,
}

/// Error returned when a version string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParseError {
    /// The offending input
    pub input: String,
    /// What was wrong with it
    pub message: String,
}

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version '{}': {}", self.input, self.message)
    }
}

impl std::error::Error for VersionParseError {}

impl PodVersion {
    /// Numeric release segments
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// Returns true if this version carries a pre-release tag
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// The version as it was written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Upper bound used by the pessimistic operator.
    ///
    /// Follows the RubyGems rule: drop the last segment (unless only one is
    /// left) and increment the new last one. `~> 4.0.0` therefore stops below
    /// `4.1`, while `~> 4` and `~> 4.0` both stop below `5`.
    pub fn bump(&self) -> PodVersion {
        let mut segments = self.segments.clone();
        if segments.len() > 1 {
            segments.pop();
        }
        if let Some(last) = segments.last_mut() {
            *last += 1;
        }
        let raw = segments
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(".");
        PodVersion {
            raw,
            segments,
            prerelease: None,
        }
    }

    /// Segments with trailing zeros removed, used for equality and hashing
    fn significant_segments(&self) -> &[u64] {
        let len = self
            .segments
            .iter()
            .rposition(|s| *s != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.segments[..len]
    }
}

impl FromStr for PodVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let error = |message: &str| VersionParseError {
            input: s.to_string(),
            message: message.to_string(),
        };

        if trimmed.is_empty() {
            return Err(error("empty version"));
        }

        let (release, mut pre) = match trimmed.split_once('-') {
            Some((release, pre)) => (release, Some(pre.to_string())),
            None => (trimmed, None),
        };

        let mut segments = Vec::new();
        let mut parts = release.split('.');
        while let Some(part) = parts.next() {
            match part.parse::<u64>() {
                Ok(n) => segments.push(n),
                Err(_) => {
                    // RubyGems-style tag: everything from here on is pre-release
                    let rest: Vec<&str> = std::iter::once(part).chain(&mut parts).collect();
                    let tag = rest.join(".");
                    pre = Some(match pre {
                        Some(existing) => format!("{}-{}", tag, existing),
                        None => tag,
                    });
                    break;
                }
            }
        }

        if segments.is_empty() {
            return Err(error("version must start with a number"));
        }

        let prerelease = match pre {
            Some(tag) if tag.is_empty() => return Err(error("empty pre-release tag")),
            Some(tag) => {
                Some(Prerelease::new(&tag).map_err(|e| error(&format!("pre-release tag: {}", e)))?)
            }
            None => None,
        };

        Ok(PodVersion {
            raw: trimmed.to_string(),
            segments,
            prerelease,
        })
    }
}

impl Ord for PodVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }

        match (&self.prerelease, &other.prerelease) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for PodVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PodVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PodVersion {}

impl Hash for PodVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_segments().hash(state);
        self.prerelease.as_ref().map(|p| p.as_str()).hash(state);
    }
}

impl fmt::Display for PodVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
