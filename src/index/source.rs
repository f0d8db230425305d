//! Spec index client for one spec repository
//!
//! CDN endpoints (relative to the base URL):
//! - `all_pods.txt`: one pod name per line
//! - `all_pods_versions_<a>_<b>_<c>.txt`: `Name/1.0.0/1.0.1` per line
//! - `deprecated_podspecs.txt`: `Specs/a/b/c/Name/1.0.0/Name.podspec.json`
//! - `Specs/<a>/<b>/<c>/<name>/<version>/<name>.podspec.json`
//!
//! GitHub repositories are read through the REST API after a staleness check
//! on the branch head (`304 Not Modified` keeps the branch ref).

use super::cache::SingleFlight;
use super::client::HttpClient;
use super::repo::SpecRepo;
use super::spec::SpecRecord;
use super::transport::{HttpRequest, GITHUB_RAW};
use super::SpecIndex;
use crate::checksum::shard_prefix;
use crate::domain::PodVersion;
use crate::error::IndexError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Pod names known to a CDN index
#[derive(Debug, Default)]
struct Catalog {
    names: HashSet<String>,
    by_lowercase: HashMap<String, String>,
}

impl Catalog {
    fn parse(text: &str) -> Self {
        let mut catalog = Catalog::default();
        for name in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            catalog
                .by_lowercase
                .entry(name.to_lowercase())
                .or_insert_with(|| name.to_string());
            catalog.names.insert(name.to_string());
        }
        catalog
    }

    fn canonical(&self, name: &str) -> Option<String> {
        if self.names.contains(name) {
            return Some(name.to_string());
        }
        self.by_lowercase.get(&name.to_lowercase()).cloned()
    }
}

/// `(name, version)` pairs flagged in `deprecated_podspecs.txt`
type DeprecatedTable = HashSet<(String, String)>;

/// Version lists of one CDN shard, keyed by pod name
type Shard = HashMap<String, Vec<String>>;

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
}

/// Spec index over one `SpecRepo` with invocation-scoped caches
pub struct SpecIndexClient {
    repo: SpecRepo,
    http: Arc<HttpClient>,
    catalog: OnceCell<Arc<Catalog>>,
    deprecated: OnceCell<Arc<DeprecatedTable>>,
    git_ref: OnceCell<String>,
    shards: SingleFlight<String, Arc<Shard>>,
    versions: SingleFlight<String, Arc<Vec<PodVersion>>>,
    specs: SingleFlight<(String, String), Arc<SpecRecord>>,
}

impl SpecIndexClient {
    /// Create a client with empty caches
    pub fn new(repo: SpecRepo, http: Arc<HttpClient>) -> Self {
        Self {
            repo,
            http,
            catalog: OnceCell::new(),
            deprecated: OnceCell::new(),
            git_ref: OnceCell::new(),
            shards: SingleFlight::new(),
            versions: SingleFlight::new(),
            specs: SingleFlight::new(),
        }
    }

    async fn catalog(&self, base_url: &str) -> Result<Arc<Catalog>, IndexError> {
        self.catalog
            .get_or_try_init(|| async {
                let text = self.http.get_text(&format!("{}/all_pods.txt", base_url)).await?;
                let catalog = Catalog::parse(&text);
                log::debug!("{}: {} pods in catalog", self.repo.key(), catalog.names.len());
                Ok::<_, IndexError>(Arc::new(catalog))
            })
            .await
            .cloned()
    }

    async fn deprecated_table(&self) -> Result<Arc<DeprecatedTable>, IndexError> {
        self.deprecated
            .get_or_try_init(|| async {
                let table = match &self.repo {
                    SpecRepo::Cdn { base_url, .. } => {
                        let url = format!("{}/deprecated_podspecs.txt", base_url);
                        match self.http.get_text(&url).await {
                            Ok(text) => parse_deprecated(&text),
                            Err(e) if e.is_not_found() => DeprecatedTable::new(),
                            Err(e) => return Err(e),
                        }
                    }
                    // Deprecation is only known from each spec document
                    SpecRepo::GitHub { .. } => DeprecatedTable::new(),
                };
                Ok::<_, IndexError>(Arc::new(table))
            })
            .await
            .cloned()
    }

    async fn shard(&self, base_url: &str, name: &str) -> Result<Arc<Shard>, IndexError> {
        let [a, b, c] = shard_prefix(name);
        let key = format!("{}_{}_{}", a, b, c);
        self.shards
            .get_or_try_fetch(&key, || async {
                let url = format!("{}/all_pods_versions_{}.txt", base_url, key);
                let text = self.http.get_text(&url).await?;
                Ok::<_, IndexError>(Arc::new(parse_shard(&text)))
            })
            .await
    }

    /// Commit or branch that GitHub content requests are pinned to
    async fn github_ref(&self) -> Result<String, IndexError> {
        let SpecRepo::GitHub {
            api_url,
            owner,
            repo,
            branch,
            ..
        } = &self.repo
        else {
            return Ok(String::new());
        };

        self.git_ref
            .get_or_try_init(|| async {
                let url = format!("{}/repos/{}/{}/commits/{}", api_url, owner, repo, branch);
                let response = self.http.fetch(HttpRequest::get(&url)).await?;
                if response.status == 304 {
                    log::debug!("{}/{}: {} is up to date", owner, repo, branch);
                    return Ok(branch.clone());
                }
                let commit: CommitResponse = serde_json::from_slice(&response.body)
                    .map_err(|e| IndexError::invalid_response(&url, e.to_string()))?;
                log::debug!("{}/{}: pinned {} to {}", owner, repo, branch, commit.sha);
                Ok::<_, IndexError>(commit.sha)
            })
            .await
            .cloned()
    }

    async fn github_versions(&self, name: &str) -> Result<Vec<PodVersion>, IndexError> {
        let SpecRepo::GitHub {
            api_url,
            owner,
            repo,
            ..
        } = &self.repo
        else {
            return Ok(Vec::new());
        };
        let git_ref = self.github_ref().await?;
        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            api_url, owner, repo, name, git_ref
        );
        let response = match self.http.fetch(HttpRequest::get(&url)).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let entries: Vec<ContentEntry> = serde_json::from_slice(&response.body)
            .map_err(|e| IndexError::invalid_response(&url, e.to_string()))?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.kind == "dir")
            .filter_map(|entry| entry.name.parse().ok())
            .collect())
    }

    fn spec_url(&self, name: &str, version: &str, git_ref: &str) -> String {
        match &self.repo {
            SpecRepo::Cdn { base_url, .. } => {
                let [a, b, c] = shard_prefix(name);
                format!(
                    "{}/Specs/{}/{}/{}/{}/{}/{}.podspec.json",
                    base_url, a, b, c, name, version, name
                )
            }
            SpecRepo::GitHub {
                api_url,
                owner,
                repo,
                ..
            } => format!(
                "{}/repos/{}/{}/contents/{}/{}/{}.podspec.json?ref={}",
                api_url, owner, repo, name, version, name, git_ref
            ),
        }
    }
}

#[async_trait]
impl SpecIndex for SpecIndexClient {
    fn repo_key(&self) -> &str {
        self.repo.key()
    }

    async fn canonical_name(&self, name: &str) -> Result<Option<String>, IndexError> {
        match &self.repo {
            SpecRepo::Cdn { base_url, .. } => Ok(self.catalog(base_url).await?.canonical(name)),
            SpecRepo::GitHub { .. } => {
                let found = !self.list_versions(name).await?.is_empty();
                Ok(found.then(|| name.to_string()))
            }
        }
    }

    async fn list_versions(&self, name: &str) -> Result<Vec<PodVersion>, IndexError> {
        let versions = self
            .versions
            .get_or_try_fetch(&name.to_string(), || async {
                let mut versions: Vec<PodVersion> = match &self.repo {
                    SpecRepo::Cdn { base_url, .. } => self
                        .shard(base_url, name)
                        .await?
                        .get(name)
                        .map(|list| list.iter().filter_map(|v| v.parse().ok()).collect())
                        .unwrap_or_default(),
                    SpecRepo::GitHub { .. } => self.github_versions(name).await?,
                };
                versions.sort_by(|a, b| b.cmp(a));
                Ok::<_, IndexError>(Arc::new(versions))
            })
            .await?;
        Ok(versions.as_ref().clone())
    }

    async fn fetch_spec(
        &self,
        name: &str,
        version: &PodVersion,
    ) -> Result<Arc<SpecRecord>, IndexError> {
        let key = (name.to_string(), version.to_string());
        self.specs
            .get_or_try_fetch(&key, || async {
                let git_ref = self.github_ref().await?;
                let url = self.spec_url(name, version.as_str(), &git_ref);
                let mut request = HttpRequest::get(&url);
                if matches!(self.repo, SpecRepo::GitHub { .. }) {
                    request = request.with_accept(GITHUB_RAW);
                }
                let response = self.http.fetch(request).await?;
                let spec = SpecRecord::from_json(&response.body)
                    .map_err(|message| IndexError::invalid_response(&url, message))?;
                log::debug!("fetched spec {} {}", spec.name, spec.version);
                Ok::<_, IndexError>(Arc::new(spec))
            })
            .await
    }

    async fn is_deprecated(&self, name: &str, version: &PodVersion) -> Result<bool, IndexError> {
        let table = self.deprecated_table().await?;
        Ok(table.contains(&(name.to_string(), version.to_string())))
    }
}

fn parse_shard(text: &str) -> Shard {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.trim().split('/');
            let name = parts.next().filter(|n| !n.is_empty())?;
            Some((name.to_string(), parts.map(str::to_string).collect()))
        })
        .collect()
}

fn parse_deprecated(text: &str) -> DeprecatedTable {
    text.lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.trim().split('/').collect();
            if parts.len() < 3 {
                return None;
            }
            let name = parts[parts.len() - 3];
            let version = parts[parts.len() - 2];
            Some((name.to_string(), version.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_canonical_name() {
        let catalog = Catalog::parse("Alamofire\nNimble\n\nQuick\n");
        assert_eq!(catalog.canonical("Alamofire").as_deref(), Some("Alamofire"));
        assert_eq!(catalog.canonical("alamofire").as_deref(), Some("Alamofire"));
        assert_eq!(catalog.canonical("Missing"), None);
    }

    #[test]
    fn test_parse_shard() {
        let shard = parse_shard("Alamofire/3.0.0/4.0.0/4.0.1\nAlamofireImage/1.0.0\n");
        assert_eq!(shard["Alamofire"], vec!["3.0.0", "4.0.0", "4.0.1"]);
        assert_eq!(shard["AlamofireImage"], vec!["1.0.0"]);
    }

    #[test]
    fn test_parse_deprecated() {
        let table =
            parse_deprecated("Specs/d/a/2/Alamofire/4.0.1/Alamofire.podspec.json\nbogus\n");
        assert!(table.contains(&("Alamofire".to_string(), "4.0.1".to_string())));
        assert_eq!(table.len(), 1);
    }
}
