//! Dependency resolution against spec indices
//!
//! Pods keep their locked version unless the update forces them to move:
//! - the target dependency is always re-selected
//! - pods missing from the lockfile are selected fresh
//! - a locked version that fails a requirement placed on it is re-selected
//!
//! Resolution runs in passes. A pass walks the graph from the Podfile's
//! declarations using the current selections, then re-selects every pod whose
//! version fails the requirements gathered on the way. Resolution ends with
//! the first pass that changes nothing, and only pods reached by that pass are
//! part of the result.

mod resolution;

pub use resolution::{LockChange, Resolution, ResolvedPod, ResolvedVersion};

use crate::domain::{root_name, Dependency, DependencySource, PodVersion, Requirement};
use crate::error::{IndexError, UpdateError};
use crate::index::{SourceSet, SpecDependency, SpecRecord};
use crate::lockfile::{split_name_details, Lockfile, PodEntry};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default number of concurrent prefetches
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Upper bound on re-selection passes
const MAX_PASSES: usize = 32;

/// Requirer name for constraints written in the Podfile
const PODFILE: &str = "Podfile";

/// A requirement placed on a pod and who placed it
#[derive(Debug, Clone)]
struct Requirer {
    from: String,
    requirement: Requirement,
}

/// Everything asked of one root pod during a pass
#[derive(Debug, Default)]
struct Demand {
    /// Full names (root or subspecs) that must have entries
    requested: BTreeSet<String>,
    requirers: Vec<Requirer>,
}

impl Demand {
    fn accepts(&self, version: &PodVersion) -> bool {
        self.requirers
            .iter()
            .all(|r| r.requirement.matches(version))
    }

    fn allows_prerelease(&self) -> bool {
        self.requirers
            .iter()
            .any(|r| r.requirement.mentions_prerelease())
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self
            .requirers
            .iter()
            .filter(|r| !r.requirement.is_any())
            .map(|r| r.requirement.to_string())
            .collect();
        if parts.is_empty() {
            ">= 0".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Current choice for one root pod
#[derive(Clone)]
enum Selection {
    /// Kept at the previous lockfile's version
    Locked(PodVersion),
    /// Chosen from a spec index
    Fresh {
        spec: Arc<SpecRecord>,
        repo_key: String,
    },
    /// Git or path pod, copied from the previous lockfile
    External,
}

impl Selection {
    fn version(&self) -> Option<&PodVersion> {
        match self {
            Selection::Locked(version) => Some(version),
            Selection::Fresh { spec, .. } => Some(&spec.version),
            Selection::External => None,
        }
    }
}

/// Result of one walk over the graph
#[derive(Default)]
struct Walk {
    demands: BTreeMap<String, Demand>,
    /// Roots whose selection lacks a requested subspec
    incomplete: BTreeSet<String>,
}

impl Walk {
    fn demand(&mut self, full_name: &str, from: &str, requirement: Requirement) {
        let demand = self
            .demands
            .entry(root_name(full_name).to_string())
            .or_default();
        demand.requested.insert(full_name.to_string());
        demand.requirers.push(Requirer {
            from: from.to_string(),
            requirement,
        });
    }
}

/// Inputs shared by every pass
struct Context<'a> {
    dependencies: &'a [Dependency],
    lockfile: &'a Lockfile,
    target: &'a str,
    /// Source of each declared root pod
    sources: HashMap<String, DependencySource>,
}

impl<'a> Context<'a> {
    fn new(dependencies: &'a [Dependency], lockfile: &'a Lockfile, target: &'a str) -> Self {
        let mut sources: HashMap<String, DependencySource> = HashMap::new();
        for dep in dependencies {
            let root = dep.root_name().to_string();
            match sources.get(&root) {
                Some(existing) if !existing.is_registry() => {}
                Some(DependencySource::Registry { repo: Some(_) }) if dep.source.is_registry() => {}
                _ => {
                    sources.insert(root, dep.source.clone());
                }
            }
        }
        Self {
            dependencies,
            lockfile,
            target: root_name(target),
            sources,
        }
    }

    fn is_external(&self, root: &str) -> bool {
        self.sources.get(root).is_some_and(|s| !s.is_registry())
    }

    /// `:source =>` override of a registry pod
    fn repo_override(&self, root: &str) -> Option<&str> {
        match self.sources.get(root) {
            Some(DependencySource::Registry { repo }) => repo.as_deref(),
            _ => None,
        }
    }
}

/// Computes the locked-version set for one update
pub struct Resolver {
    sources: SourceSet,
    concurrency: usize,
}

impl Resolver {
    pub fn new(sources: SourceSet, concurrency: usize) -> Self {
        Self {
            sources,
            concurrency: concurrency.max(1),
        }
    }

    /// Resolve the Podfile's dependencies, moving as few locked pods as
    /// possible. `target` names the dependency whose requirement changed.
    pub async fn resolve(
        &self,
        dependencies: &[Dependency],
        lockfile: &Lockfile,
        target: &str,
    ) -> Result<Resolution, UpdateError> {
        let ctx = Context::new(dependencies, lockfile, target);
        self.prefetch(&ctx).await?;

        let mut selections: HashMap<String, Selection> = HashMap::new();
        let mut deferred: Option<UpdateError> = None;

        for pass in 1..=MAX_PASSES {
            let walk = self.walk(&ctx, &mut selections).await?;

            let mut moved = false;
            let mut failures: Vec<(String, UpdateError)> = Vec::new();
            for (root, demand) in &walk.demands {
                let Some(version) = selections.get(root).and_then(Selection::version) else {
                    continue;
                };
                if demand.accepts(version) && !walk.incomplete.contains(root) {
                    continue;
                }
                log::debug!(
                    "pass {}: re-selecting {} {} against '{}'",
                    pass,
                    root,
                    version,
                    demand.describe()
                );
                match self.select(&ctx, root, demand).await {
                    Ok(selection) => {
                        selections.insert(root.clone(), selection);
                        moved = true;
                    }
                    Err(e @ (UpdateError::NoViableVersion { .. }
                    | UpdateError::VersionConflict { .. })) => {
                        failures.push((root.clone(), e));
                    }
                    Err(e) => return Err(e),
                }
            }

            if !failures.is_empty() {
                if !moved {
                    return Err(failures.swap_remove(0).1);
                }
                // Requirements from pods that just moved may be stale
                for (root, error) in failures {
                    log::debug!("pass {}: deferring {}", pass, error);
                    selections.remove(&root);
                    deferred = Some(error);
                }
                continue;
            }

            if !moved {
                log::debug!("resolution settled after {} pass(es)", pass);
                return self.assemble(&ctx, walk, &selections);
            }
        }

        Err(deferred.unwrap_or_else(|| {
            UpdateError::no_viable_version(ctx.target, "resolution did not settle")
        }))
    }

    /// Walk the graph from the Podfile's declarations, selecting pods on
    /// first sight
    async fn walk(
        &self,
        ctx: &Context<'_>,
        selections: &mut HashMap<String, Selection>,
    ) -> Result<Walk, UpdateError> {
        let mut walk = Walk::default();
        let mut queue: VecDeque<String> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();

        for dep in ctx.dependencies {
            let requirement = parse_requirement(dep.requirement.as_deref())?;
            walk.demand(&dep.name, PODFILE, requirement);
            queue.push_back(dep.name.clone());
        }

        while let Some(full_name) = queue.pop_front() {
            if !visited.insert(full_name.clone()) {
                continue;
            }
            let root = root_name(&full_name).to_string();

            if !selections.contains_key(&root) {
                let demand = walk.demands.get(&root).ok_or_else(|| {
                    UpdateError::no_viable_version(root.clone(), "pod was never requested")
                })?;
                let selection = self.initial_selection(ctx, &root, demand).await?;
                selections.insert(root.clone(), selection);
            }

            let Some(nested) = self.nested(ctx, &full_name, &root, selections).await? else {
                walk.incomplete.insert(root);
                continue;
            };
            for (name, requirement) in nested {
                walk.demand(&name, &full_name, requirement);
                if !visited.contains(&name) {
                    queue.push_back(name);
                }
            }
        }

        Ok(walk)
    }

    async fn initial_selection(
        &self,
        ctx: &Context<'_>,
        root: &str,
        demand: &Demand,
    ) -> Result<Selection, UpdateError> {
        if ctx.is_external(root) {
            return Ok(Selection::External);
        }
        if root != ctx.target {
            if let Some(locked) = ctx.lockfile.locked_version(root) {
                if demand.accepts(&locked) {
                    return Ok(Selection::Locked(locked));
                }
                log::info!(
                    "{} {} no longer satisfies '{}'",
                    root,
                    locked,
                    demand.describe()
                );
            }
        }
        self.select(ctx, root, demand).await
    }

    /// Dependencies of one visited name under its root's selection.
    ///
    /// Returns `None` when the selected version has no such subspec.
    async fn nested(
        &self,
        ctx: &Context<'_>,
        full_name: &str,
        root: &str,
        selections: &mut HashMap<String, Selection>,
    ) -> Result<Option<Vec<(String, Requirement)>>, UpdateError> {
        let Some(selection) = selections.get(root).cloned() else {
            return Ok(Some(Vec::new()));
        };
        let previous = ctx.lockfile.pods.iter().find(|p| p.name == full_name);

        match selection {
            Selection::External => {
                let entry = previous.ok_or_else(|| UpdateError::UnlockedExternalSource {
                    name: full_name.to_string(),
                })?;
                lock_dependencies(entry).map(Some)
            }
            Selection::Locked(version) => {
                if let Some(entry) = previous {
                    return lock_dependencies(entry).map(Some);
                }
                // A subspec the lockfile never had: read it from the locked version
                log::debug!("{} is new; reading {} {}", full_name, root, version);
                let selection = self.fetch_selection(ctx, root, &version).await?;
                let nested = match &selection {
                    Selection::Fresh { spec, .. } => spec_dependencies(spec, full_name, root),
                    _ => None,
                };
                selections.insert(root.to_string(), selection);
                Ok(nested)
            }
            Selection::Fresh { spec, .. } => Ok(spec_dependencies(&spec, full_name, root)),
        }
    }

    /// Pick the greatest eligible version accepted by every requirer
    async fn select(
        &self,
        ctx: &Context<'_>,
        root: &str,
        demand: &Demand,
    ) -> Result<Selection, UpdateError> {
        let located = self
            .sources
            .locate(root, ctx.repo_override(root))
            .await?
            .ok_or_else(|| UpdateError::PodNotFound {
                name: root.to_string(),
            })?;
        let index = &located.index;
        let allow_prerelease = demand.allows_prerelease();

        let mut eligible = Vec::new();
        for version in index.list_versions(&located.name).await? {
            if version.is_prerelease() && !allow_prerelease {
                continue;
            }
            if index.is_deprecated(&located.name, &version).await? {
                log::debug!("skipping deprecated {} {}", located.name, version);
                continue;
            }
            eligible.push(version);
        }

        for version in eligible.iter().filter(|v| demand.accepts(v)) {
            let spec = index.fetch_spec(&located.name, version).await?;
            if spec.deprecated {
                log::debug!("skipping deprecated spec {} {}", spec.name, version);
                continue;
            }
            if let Some(missing) = demand
                .requested
                .iter()
                .find(|name| !spec.has_spec(&respell(name, &spec.name)))
            {
                log::debug!("{} {} has no {}", spec.name, version, missing);
                continue;
            }
            log::info!("selected {} {} from {}", root, version, index.repo_key());
            return Ok(Selection::Fresh {
                spec,
                repo_key: index.repo_key().to_string(),
            });
        }

        Err(explain_failure(root, demand, &eligible))
    }

    /// Spec of an already chosen version
    async fn fetch_selection(
        &self,
        ctx: &Context<'_>,
        root: &str,
        version: &PodVersion,
    ) -> Result<Selection, UpdateError> {
        let located = self
            .sources
            .locate(root, ctx.repo_override(root))
            .await?
            .ok_or_else(|| UpdateError::PodNotFound {
                name: root.to_string(),
            })?;
        let spec = located.index.fetch_spec(&located.name, version).await?;
        Ok(Selection::Fresh {
            spec,
            repo_key: located.index.repo_key().to_string(),
        })
    }

    /// Warm the caches for pods that are going to need a selection
    async fn prefetch(&self, ctx: &Context<'_>) -> Result<(), UpdateError> {
        let mut pending: Vec<(String, Option<String>)> = Vec::new();
        for dep in ctx.dependencies {
            let root = dep.root_name();
            if ctx.is_external(root) || pending.iter().any(|(r, _)| r == root) {
                continue;
            }
            let requirement = parse_requirement(dep.requirement.as_deref())?;
            let keep = root != ctx.target
                && ctx
                    .lockfile
                    .locked_version(root)
                    .is_some_and(|v| requirement.matches(&v));
            if !keep {
                pending.push((root.to_string(), ctx.repo_override(root).map(str::to_string)));
            }
        }
        if pending.is_empty() {
            return Ok(());
        }
        log::debug!("prefetching {} pod(s)", pending.len());

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        for (root, repo) in pending {
            let sources = self.sources.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Ok(());
                };
                let Some(located) = sources.locate(&root, repo.as_deref()).await? else {
                    return Ok(());
                };
                let versions = located.index.list_versions(&located.name).await?;
                if let Some(newest) = versions.first() {
                    located.index.is_deprecated(&located.name, newest).await?;
                }
                Ok::<_, IndexError>(())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => result?,
                Err(e) => log::warn!("prefetch task failed: {}", e),
            }
        }
        Ok(())
    }

    /// Build the result from a settled walk
    fn assemble(
        &self,
        ctx: &Context<'_>,
        walk: Walk,
        selections: &HashMap<String, Selection>,
    ) -> Result<Resolution, UpdateError> {
        let mut resolution = Resolution::default();

        for (root, demand) in walk.demands {
            let Some(selection) = selections.get(&root) else {
                continue;
            };
            let previous: Vec<&PodEntry> = ctx
                .lockfile
                .pods
                .iter()
                .filter(|p| demand.requested.contains(&p.name))
                .collect();

            let pod = match selection {
                Selection::External => ResolvedPod {
                    name: root.clone(),
                    version: ResolvedVersion::External {
                        revision: ctx.lockfile.revision_of(&root).map(str::to_string),
                    },
                    entries: previous.into_iter().cloned().collect(),
                    changed: false,
                    spec_repo: None,
                    checksum: None,
                },
                Selection::Locked(version) => ResolvedPod {
                    name: root.clone(),
                    version: ResolvedVersion::Version(version.clone()),
                    entries: previous.into_iter().cloned().collect(),
                    changed: false,
                    spec_repo: ctx.lockfile.spec_repo_of(&root).map(str::to_string),
                    checksum: None,
                },
                Selection::Fresh { spec, repo_key } => {
                    let generated = generated_entries(spec, &demand.requested);
                    let reused: Option<Vec<PodEntry>> = generated
                        .iter()
                        .map(|entry| {
                            ctx.lockfile
                                .pods
                                .iter()
                                .find(|p| {
                                    p.name == entry.name
                                        && p.version == entry.version
                                        && p.dependencies == entry.dependencies
                                })
                                .cloned()
                        })
                        .collect();
                    let changed = reused.is_none();
                    ResolvedPod {
                        name: spec.name.clone(),
                        version: ResolvedVersion::Version(spec.version.clone()),
                        entries: reused.unwrap_or(generated),
                        changed,
                        spec_repo: Some(repo_key.clone()),
                        checksum: Some(spec.checksum.clone()),
                    }
                }
            };
            resolution.pods.insert(root, pod);
        }

        for root in ctx.lockfile.pods.iter().map(PodEntry::root_name) {
            if !resolution.pods.contains_key(root) {
                log::debug!("{} is no longer reachable", root);
            }
        }
        Ok(resolution)
    }
}

/// Requirement failure with the most specific explanation available
fn explain_failure(root: &str, demand: &Demand, eligible: &[PodVersion]) -> UpdateError {
    if eligible.is_empty() {
        return UpdateError::no_viable_version(root, demand.describe());
    }

    for requirer in &demand.requirers {
        if !eligible.iter().any(|v| requirer.requirement.matches(v)) {
            return UpdateError::no_viable_version(root, requirer.requirement.to_string());
        }
    }

    for (i, first) in demand.requirers.iter().enumerate() {
        for second in &demand.requirers[i + 1..] {
            let joint = eligible
                .iter()
                .any(|v| first.requirement.matches(v) && second.requirement.matches(v));
            if !joint {
                return UpdateError::VersionConflict {
                    pod: root.to_string(),
                    requirer: first.from.clone(),
                    requirement: first.requirement.to_string(),
                    other_requirer: second.from.clone(),
                    other_requirement: second.requirement.to_string(),
                };
            }
        }
    }

    UpdateError::no_viable_version(root, demand.describe())
}

fn parse_requirement(text: Option<&str>) -> Result<Requirement, UpdateError> {
    Requirement::parse_optional(text).map_err(|e| {
        UpdateError::invalid_requirement(text.unwrap_or_default(), e.message)
    })
}

/// Nested dependency strings of a lock entry (`Bolts (~> 1.0)` or `Bolts`)
fn lock_dependencies(entry: &PodEntry) -> Result<Vec<(String, Requirement)>, UpdateError> {
    entry
        .dependencies
        .iter()
        .map(|text| match split_name_details(text) {
            Some((name, requirement)) => {
                Ok((name.to_string(), parse_requirement(Some(requirement))?))
            }
            None => Ok((text.clone(), Requirement::any())),
        })
        .collect()
}

/// Dependencies of `full_name` in a spec, with the root spelled as `root`
fn spec_dependencies(
    spec: &SpecRecord,
    full_name: &str,
    root: &str,
) -> Option<Vec<(String, Requirement)>> {
    let name = respell(full_name, &spec.name);
    if !spec.has_spec(&name) {
        return None;
    }
    Some(
        spec.dependencies_for(&name)
            .into_iter()
            .map(|dep| {
                let dep_name = if root_name(&dep.name) == spec.name {
                    respell(&dep.name, root)
                } else {
                    dep.name
                };
                (dep_name, dep.requirement)
            })
            .collect(),
    )
}

/// Lock entries for the requested names of a freshly selected spec
fn generated_entries(spec: &SpecRecord, requested: &BTreeSet<String>) -> Vec<PodEntry> {
    requested
        .iter()
        .map(|name| {
            let name = respell(name, &spec.name);
            let dependencies = spec
                .dependencies_for(&name)
                .iter()
                .map(SpecDependency::lock_string)
                .collect();
            PodEntry::new(name, spec.version.to_string()).with_dependencies(dependencies)
        })
        .collect()
}

/// `name` with its root segment replaced by `root`
fn respell(name: &str, root: &str) -> String {
    match name.split_once('/') {
        Some((_, rest)) => format!("{}/{}", root, rest),
        None => root.to_string(),
    }
}
