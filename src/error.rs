//! Application error types using thiserror
//!
//! Error hierarchy:
//! - UpdateError: anything that aborts an update (no output is produced)
//! - IndexError: Issues with spec index communication
//! - LockfileError: Issues with Podfile.lock parsing
//! - ConfigError: Issues with the configuration file

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a single update invocation
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Zero or several `pod` lines declare the target dependency
    #[error("expected exactly one declaration of '{name}' in the Podfile, found {matches}")]
    AmbiguousDeclaration { name: String, matches: usize },

    /// No non-deprecated version satisfies the requirement
    #[error("no viable version of '{name}' satisfies '{requirement}'")]
    NoViableVersion { name: String, requirement: String },

    /// Two requirements on the same pod cannot both hold
    #[error(
        "version conflict on '{pod}': {requirer} requires '{requirement}' \
         but {other_requirer} requires '{other_requirement}'"
    )]
    VersionConflict {
        pod: String,
        requirer: String,
        requirement: String,
        other_requirer: String,
        other_requirement: String,
    },

    /// The spec index stayed unreachable after retrying
    #[error("spec index unavailable at {url} after {attempts} attempt(s): {message}")]
    SpecIndexUnavailable {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Lockfile checksum does not match the manifest it was built from
    #[error("internal error: PODFILE CHECKSUM {actual} does not match expected {expected}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The pod is not present in any configured spec source
    #[error("pod '{name}' not found in any spec source")]
    PodNotFound { name: String },

    /// A requirement string could not be parsed
    #[error("invalid requirement '{requirement}': {message}")]
    InvalidRequirement {
        requirement: String,
        message: String,
    },

    /// A git or path pod has no entry in the previous lockfile
    #[error("'{name}' is bound to an external source but is not locked in Podfile.lock")]
    UnlockedExternalSource { name: String },

    /// Non-transient spec index failure
    #[error(transparent)]
    Index(IndexError),

    /// Previous lockfile could not be parsed
    #[error(transparent)]
    Lockfile(#[from] LockfileError),
}

/// Errors related to spec index communication
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Retries exhausted on a transient failure
    #[error("failed to fetch {url} after {attempts} attempt(s): {message}")]
    Unavailable {
        url: String,
        attempts: u32,
        message: String,
    },

    /// Resource does not exist (HTTP 404)
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Non-retryable HTTP status
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    /// Response body could not be interpreted
    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },
}

/// Errors related to Podfile.lock parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockfileError {
    #[error("failed to parse Podfile.lock at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A setting has an unusable value
    #[error("invalid config value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

impl UpdateError {
    /// Creates a new AmbiguousDeclaration error
    pub fn ambiguous(name: impl Into<String>, matches: usize) -> Self {
        UpdateError::AmbiguousDeclaration {
            name: name.into(),
            matches,
        }
    }

    /// Creates a new NoViableVersion error
    pub fn no_viable_version(name: impl Into<String>, requirement: impl Into<String>) -> Self {
        UpdateError::NoViableVersion {
            name: name.into(),
            requirement: requirement.into(),
        }
    }

    /// Creates a new InvalidRequirement error
    pub fn invalid_requirement(requirement: impl Into<String>, message: impl Into<String>) -> Self {
        UpdateError::InvalidRequirement {
            requirement: requirement.into(),
            message: message.into(),
        }
    }

    /// Returns true if retrying the whole update later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, UpdateError::SpecIndexUnavailable { .. })
    }

    /// Returns true if this error signals a bug rather than bad input
    pub fn is_internal(&self) -> bool {
        matches!(self, UpdateError::ChecksumMismatch { .. })
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateError::AmbiguousDeclaration { .. } => "ambiguous_declaration",
            UpdateError::NoViableVersion { .. } => "no_viable_version",
            UpdateError::VersionConflict { .. } => "version_conflict",
            UpdateError::SpecIndexUnavailable { .. } => "spec_index_unavailable",
            UpdateError::ChecksumMismatch { .. } => "checksum_mismatch",
            UpdateError::PodNotFound { .. } => "pod_not_found",
            UpdateError::InvalidRequirement { .. } => "invalid_requirement",
            UpdateError::UnlockedExternalSource { .. } => "unlocked_external_source",
            UpdateError::Index(_) => "index",
            UpdateError::Lockfile(_) => "lockfile",
        }
    }
}

impl From<IndexError> for UpdateError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Unavailable {
                url,
                attempts,
                message,
            } => UpdateError::SpecIndexUnavailable {
                url,
                attempts,
                message,
            },
            other => UpdateError::Index(other),
        }
    }
}

impl IndexError {
    /// Creates a new InvalidResponse error
    pub fn invalid_response(url: impl Into<String>, message: impl Into<String>) -> Self {
        IndexError::InvalidResponse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns true for a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::NotFound { .. })
    }
}

impl LockfileError {
    /// Creates a new Parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        LockfileError::Parse {
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_declaration_message() {
        let err = UpdateError::ambiguous("Alamofire", 2);
        let msg = format!("{}", err);
        assert!(msg.contains("exactly one declaration"));
        assert!(msg.contains("Alamofire"));
        assert!(msg.contains("found 2"));
    }

    #[test]
    fn test_no_viable_version_message() {
        let err = UpdateError::no_viable_version("Alamofire", "~> 9.0");
        let msg = format!("{}", err);
        assert!(msg.contains("no viable version"));
        assert!(msg.contains("~> 9.0"));
    }

    #[test]
    fn test_version_conflict_names_both_sides() {
        let err = UpdateError::VersionConflict {
            pod: "Result".to_string(),
            requirer: "Alamofire".to_string(),
            requirement: "~> 3.0".to_string(),
            other_requirer: "Moya".to_string(),
            other_requirement: "~> 4.0".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Alamofire"));
        assert!(msg.contains("Moya"));
        assert!(msg.contains("~> 3.0"));
        assert!(msg.contains("~> 4.0"));
    }

    #[test]
    fn test_unavailable_index_error_becomes_transient() {
        let err: UpdateError = IndexError::Unavailable {
            url: "https://cdn.cocoapods.org/all_pods.txt".to_string(),
            attempts: 3,
            message: "timed out".to_string(),
        }
        .into();
        assert!(err.is_transient());
        assert!(!err.is_internal());
        assert!(matches!(err, UpdateError::SpecIndexUnavailable { .. }));
    }

    #[test]
    fn test_other_index_errors_are_not_transient() {
        let err: UpdateError = IndexError::NotFound {
            url: "https://cdn.cocoapods.org/x".to_string(),
        }
        .into();
        assert!(!err.is_transient());
        assert!(matches!(err, UpdateError::Index(_)));
    }

    #[test]
    fn test_checksum_mismatch_is_internal() {
        let err = UpdateError::ChecksumMismatch {
            expected: "a".to_string(),
            actual: "b".to_string(),
        };
        assert!(err.is_internal());
        assert!(format!("{}", err).contains("internal error"));
    }

    #[test]
    fn test_lockfile_error_from() {
        let err: UpdateError = LockfileError::parse(3, "bad indentation").into();
        let msg = format!("{}", err);
        assert!(msg.contains("line 3"));
    }

    #[test]
    fn test_config_error_invalid() {
        let err = ConfigError::Invalid {
            key: "retry.max_attempts".to_string(),
            message: "must be at least 1".to_string(),
        };
        assert!(format!("{}", err).contains("retry.max_attempts"));
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(UpdateError::ambiguous("A", 0).kind(), "ambiguous_declaration");
        assert_eq!(
            UpdateError::no_viable_version("A", "~> 1.0").kind(),
            "no_viable_version"
        );
        let err: UpdateError = LockfileError::parse(1, "x").into();
        assert_eq!(err.kind(), "lockfile");
    }
}
