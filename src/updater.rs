//! Update pipeline for one Podfile and Podfile.lock pair
//!
//! This module provides:
//! - `FileUpdater`: rewrite → resolve → build → scrub → checksum self-check
//! - `UpdateRequest` / `UpdatedFiles`: in-memory inputs and outputs
//!
//! Every update builds its own spec index clients, so nothing fetched for one
//! update is visible to the next. Any error aborts the update and neither
//! output is produced.

use crate::checksum::podfile_checksum;
use crate::config::Config;
use crate::domain::{Credential, Dependency, DependencySource};
use crate::error::UpdateError;
use crate::index::{
    HttpClient, ReqwestTransport, RetryPolicy, Sleeper, SourceSet, TokioSleeper, Transport,
    TransportError,
};
use crate::lockfile::{self, Lockfile};
use crate::podfile;
use crate::resolver::{LockChange, Resolver};
use crate::scrub::scrub;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Inputs of one update
#[derive(Debug, Clone, Copy)]
pub struct UpdateRequest<'a> {
    /// Podfile text
    pub manifest: &'a str,
    /// Podfile.lock text
    pub lockfile: &'a str,
    /// The dependency whose requirement changed
    pub dependency: &'a Dependency,
}

/// Outputs of one update, already scrubbed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedFiles {
    pub manifest: String,
    pub lockfile: String,
    /// Root pods whose locked version moved
    pub changes: Vec<LockChange>,
}

impl UpdatedFiles {
    /// Returns true if either file differs from the given originals
    pub fn differs_from(&self, manifest: &str, lockfile: &str) -> bool {
        self.manifest != manifest || self.lockfile != lockfile
    }
}

/// Updates a Podfile and its lockfile for one changed dependency
pub struct FileUpdater {
    config: Config,
    credentials: Vec<Credential>,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
}

impl FileUpdater {
    /// Create an updater that talks to spec indices over HTTPS
    pub fn new(config: Config, credentials: Vec<Credential>) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config.index.user_agent, config.index.timeout())?;
        Ok(Self::with_transport(config, credentials, Arc::new(transport)))
    }

    /// Create an updater over a custom transport
    pub fn with_transport(
        config: Config,
        credentials: Vec<Credential>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            credentials,
            transport,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Set the sleeper used between retries
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Run one update
    pub async fn update(&self, request: &UpdateRequest<'_>) -> Result<UpdatedFiles, UpdateError> {
        let dependency = request.dependency;
        log::info!(
            "updating {} from '{}' to '{}'",
            dependency.name,
            dependency.previous_requirement.as_deref().unwrap_or("any"),
            dependency.requirement.as_deref().unwrap_or("any")
        );

        let rewritten = podfile::rewrite(
            request.manifest,
            &dependency.name,
            dependency.previous_requirement.as_deref(),
            dependency.requirement.as_deref(),
        )?;
        let manifest = scrub(&rewritten, &self.credentials);
        let previous = Lockfile::parse(request.lockfile)?;

        let dependencies = podfile::parse_dependencies(&manifest);
        let sources = podfile::parse_sources(&manifest);
        let overrides: Vec<String> = dependencies
            .iter()
            .filter_map(|dep| match &dep.source {
                DependencySource::Registry { repo: Some(repo) } => Some(repo.clone()),
                _ => None,
            })
            .collect();
        log::debug!(
            "{} declaration(s), {} source(s), {} override(s)",
            dependencies.len(),
            sources.len(),
            overrides.len()
        );

        let source_set =
            SourceSet::from_podfile(&sources, &overrides, &self.config.index, self.http_client());
        let resolver = Resolver::new(source_set, self.config.index.concurrency);
        let resolution = resolver
            .resolve(&dependencies, &previous, &dependency.name)
            .await?;

        let built = lockfile::build(&resolution, &previous, &manifest);
        let lockfile = scrub(&built, &self.credentials);
        verify_checksum(&lockfile, &manifest)?;

        let mut previous_versions: BTreeMap<String, String> = BTreeMap::new();
        for entry in &previous.pods {
            previous_versions
                .entry(entry.root_name().to_string())
                .or_insert_with(|| entry.version.clone());
        }
        let changes = resolution.changes(&previous_versions);
        for change in &changes {
            log::info!(
                "{}: {} -> {}",
                change.name,
                change.previous.as_deref().unwrap_or("(none)"),
                change.updated.as_deref().unwrap_or("(removed)")
            );
        }

        Ok(UpdatedFiles {
            manifest,
            lockfile,
            changes,
        })
    }

    /// Fresh client for one update
    fn http_client(&self) -> Arc<HttpClient> {
        Arc::new(
            HttpClient::new(Arc::clone(&self.transport))
                .with_policy(RetryPolicy::from(&self.config.retry))
                .with_sleeper(Arc::clone(&self.sleeper))
                .with_timeout(self.config.index.timeout())
                .with_credentials(self.credentials.clone()),
        )
    }
}

/// The written `PODFILE CHECKSUM` must be the SHA-1 of the final manifest
fn verify_checksum(lockfile: &str, manifest: &str) -> Result<(), UpdateError> {
    let expected = podfile_checksum(manifest);
    let actual = Lockfile::parse(lockfile)?.podfile_checksum.unwrap_or_default();
    if actual != expected {
        return Err(UpdateError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{HttpRequest, HttpResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that counts requests and never answers
    #[derive(Default)]
    struct Offline {
        requests: AtomicUsize,
    }

    #[async_trait]
    impl Transport for Offline {
        async fn send(&self, _: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Connect("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_ambiguous_declaration_aborts_before_network() {
        let transport = Arc::new(Offline::default());
        let updater = FileUpdater::with_transport(
            Config::default(),
            Vec::new(),
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        let dependency = Dependency::new("Alamofire", Some("~> 4.0.0"));
        let request = UpdateRequest {
            manifest: "pod 'Alamofire', '~> 3.0'\npod 'Alamofire', '~> 3.1'\n",
            lockfile: "PODS:\n  - Alamofire (3.0.1)\n",
            dependency: &dependency,
        };

        let err = updater.update(&request).await.unwrap_err();
        assert!(matches!(
            err,
            UpdateError::AmbiguousDeclaration { matches: 2, .. }
        ));
        assert_eq!(transport.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_lockfile_aborts() {
        let updater =
            FileUpdater::with_transport(Config::default(), Vec::new(), Arc::new(Offline::default()));
        let dependency = Dependency::new("Alamofire", Some("~> 4.0.0"));
        let request = UpdateRequest {
            manifest: "pod 'Alamofire', '~> 3.0'\n",
            lockfile: "PODS:\n   - Alamofire (3.0.1)\n",
            dependency: &dependency,
        };
        let err = updater.update(&request).await.unwrap_err();
        assert!(matches!(err, UpdateError::Lockfile(_)));
    }

    #[test]
    fn test_verify_checksum() {
        let manifest = "pod 'Alamofire'\n";
        let good = format!("PODFILE CHECKSUM: {}\n", podfile_checksum(manifest));
        assert!(verify_checksum(&good, manifest).is_ok());

        let err = verify_checksum("PODFILE CHECKSUM: abc\n", manifest).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_differs_from() {
        let files = UpdatedFiles {
            manifest: "a".to_string(),
            lockfile: "b".to_string(),
            changes: Vec::new(),
        };
        assert!(!files.differs_from("a", "b"));
        assert!(files.differs_from("a", "c"));
    }
}
