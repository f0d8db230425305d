//! Spec index access
//!
//! This module provides:
//! - The `SpecIndex` trait implemented once per spec repository
//! - HTTP transport seam, retry policy and per-fetch timeout
//! - Single-flight caches scoped to one update invocation
//! - `SourceSet`, the ordered list of indices a Podfile resolves against

mod cache;
mod client;
mod repo;
mod retry;
mod source;
mod spec;
mod transport;

pub use cache::SingleFlight;
pub use client::HttpClient;
pub use repo::{strip_userinfo, SpecRepo, TRUNK_KEY};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper, DEFAULT_MAX_ATTEMPTS};
pub use source::SpecIndexClient;
pub use spec::{SpecDependency, SpecRecord, Subspec};
pub use transport::{
    HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError, GITHUB_RAW,
};

use crate::config::IndexConfig;
use crate::domain::PodVersion;
use crate::error::IndexError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Read access to one spec repository
#[async_trait]
pub trait SpecIndex: Send + Sync {
    /// Key written under `SPEC REPOS`
    fn repo_key(&self) -> &str;

    /// Name as known to the index (exact match first, then case-insensitive)
    async fn canonical_name(&self, name: &str) -> Result<Option<String>, IndexError>;

    /// All published versions, newest first
    async fn list_versions(&self, name: &str) -> Result<Vec<PodVersion>, IndexError>;

    /// Spec document for one version
    async fn fetch_spec(
        &self,
        name: &str,
        version: &PodVersion,
    ) -> Result<Arc<SpecRecord>, IndexError>;

    /// Returns true if this version is listed as deprecated
    async fn is_deprecated(&self, name: &str, version: &PodVersion) -> Result<bool, IndexError>;

    /// Returns true if every published version is deprecated
    async fn is_pod_deprecated(&self, name: &str) -> Result<bool, IndexError> {
        let versions = self.list_versions(name).await?;
        if versions.is_empty() {
            return Ok(false);
        }
        for version in &versions {
            if !self.is_deprecated(name, version).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// A pod found in a spec index
#[derive(Clone)]
pub struct Located {
    pub index: Arc<dyn SpecIndex>,
    /// Name as spelled by the index
    pub name: String,
}

/// Spec indices available to one Podfile
#[derive(Clone, Default)]
pub struct SourceSet {
    searchable: Vec<Arc<dyn SpecIndex>>,
    by_url: HashMap<String, Arc<dyn SpecIndex>>,
}

impl SourceSet {
    /// Indices searched in order for pods without a `:source` override
    pub fn new(searchable: Vec<Arc<dyn SpecIndex>>) -> Self {
        let mut set = Self::default();
        for index in searchable {
            set.by_url.insert(index.repo_key().to_string(), Arc::clone(&index));
            set.searchable.push(index);
        }
        set
    }

    /// Register an index reachable only through `:source => url`
    pub fn with_override(mut self, url: &str, index: Arc<dyn SpecIndex>) -> Self {
        self.by_url.insert(strip_userinfo(url.trim()), index);
        self
    }

    /// Build fresh clients for the Podfile's `source` lines and per-pod
    /// overrides. The CDN is used when no source is declared.
    pub fn from_podfile(
        sources: &[String],
        overrides: &[String],
        config: &IndexConfig,
        http: Arc<HttpClient>,
    ) -> Self {
        let mut by_key: HashMap<String, Arc<dyn SpecIndex>> = HashMap::new();
        let mut client_for = |url: &str| -> Arc<dyn SpecIndex> {
            let repo = SpecRepo::from_source_url(url, config);
            Arc::clone(by_key.entry(repo.key().to_string()).or_insert_with(|| {
                Arc::new(SpecIndexClient::new(repo, Arc::clone(&http))) as Arc<dyn SpecIndex>
            }))
        };

        let searchable: Vec<Arc<dyn SpecIndex>> = if sources.is_empty() {
            vec![client_for(TRUNK_KEY)]
        } else {
            let mut list: Vec<Arc<dyn SpecIndex>> = Vec::new();
            for url in sources {
                let index = client_for(url);
                if !list.iter().any(|i| i.repo_key() == index.repo_key()) {
                    list.push(index);
                }
            }
            list
        };

        let mut set = Self::new(searchable);
        for url in sources.iter().chain(overrides) {
            let index = client_for(url);
            set = set.with_override(url, index);
        }
        set
    }

    pub fn searchable(&self) -> &[Arc<dyn SpecIndex>] {
        &self.searchable
    }

    /// Index registered for a source URL or repo key
    pub fn for_url(&self, url: &str) -> Option<Arc<dyn SpecIndex>> {
        self.by_url.get(&strip_userinfo(url.trim())).cloned()
    }

    /// Find the index that serves `name`: the override when given, otherwise
    /// the first searchable index whose catalog contains it
    pub async fn locate(
        &self,
        name: &str,
        repo: Option<&str>,
    ) -> Result<Option<Located>, IndexError> {
        if let Some(index) = repo.and_then(|url| self.for_url(url)) {
            return Ok(index
                .canonical_name(name)
                .await?
                .map(|name| Located { index, name }));
        }

        for index in &self.searchable {
            if let Some(canonical) = index.canonical_name(name).await? {
                if canonical != name {
                    log::info!("{} is published as {}", name, canonical);
                }
                return Ok(Some(Located {
                    index: Arc::clone(index),
                    name: canonical,
                }));
            }
        }
        Ok(None)
    }
}
