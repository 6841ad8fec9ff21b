//! # Repository Router
//!
//! All sub-builds are staged together for a single publish step, so every
//! configured repository is reachable from the same process. The router makes
//! sure that reachability never turns into cross-publishing: each publication
//! is routed to the repository it is bound to and nowhere else.
//!
//! The result is a [`PublishPlan`] with one [`Route`] per distinct
//! repository. [`PublishPlan::permits`] answers the inverse question for an
//! executor that iterates "all publications × all repositories": any pair not
//! present in the plan is denied.
//!
//! A plan that routes a publication to a foreign repository is a programming
//! error. [`PublishPlan::verify`] checks for it and [`route`] refuses to
//! return such a plan.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;
use url::Url;

use crate::aggregator::Publication;
use crate::config::CombinerConfig;
use crate::error::{Error, Result};
use crate::metadata::validate_repository_name;
use crate::naming::PublicationKey;

/// A destination repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySink {
    pub name: String,
    pub destination_url: Url,
}

/// Maps repository names to destination URLs.
///
/// An explicit override wins; otherwise the destination is the repository
/// name appended to the base URL as a single path segment.
#[derive(Debug, Clone)]
pub struct SinkResolver {
    base: Url,
    overrides: BTreeMap<String, Url>,
}

impl SinkResolver {
    pub fn new(mut base: Url, overrides: BTreeMap<String, Url>) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base, overrides }
    }

    pub fn from_config(config: &CombinerConfig) -> Result<Self> {
        let base = config.resolved_maven_repo_url()?;
        let overrides = config
            .repositories
            .iter()
            .map(|(name, url)| Ok((name.clone(), Url::parse(url)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(Self::new(base, overrides))
    }

    pub fn resolve(&self, name: &str) -> Result<RepositorySink> {
        let destination_url = match self.overrides.get(name) {
            Some(url) => url.clone(),
            None => self.append_segment(name)?,
        };
        Ok(RepositorySink {
            name: name.to_string(),
            destination_url,
        })
    }

    fn append_segment(&self, name: &str) -> Result<Url> {
        validate_repository_name(name).map_err(|reason| Error::InvalidRepositoryName {
            name: name.to_string(),
            reason: reason.to_string(),
        })?;
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::UnsupportedDestination {
                url: self.base.to_string(),
            })?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }
}

/// The part of a destination that decides where files land.
fn destination_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.set_query(None);
    url.as_str().trim_end_matches('/').to_string()
}

/// Publications destined for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub sink: RepositorySink,
    pub publications: Vec<Publication>,
}

impl Route {
    fn contains(&self, key: &PublicationKey) -> bool {
        self.publications.iter().any(|p| &p.key() == key)
    }
}

/// Where each publication goes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishPlan {
    routes: BTreeMap<String, Route>,
}

impl PublishPlan {
    /// Routes in repository-name order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn route_for(&self, repository: &str) -> Option<&Route> {
        self.routes.get(repository)
    }

    pub fn repositories(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn publication_count(&self) -> usize {
        self.routes.values().map(|r| r.publications.len()).sum()
    }

    pub fn into_routes(self) -> Vec<Route> {
        self.routes.into_values().collect()
    }

    /// Whether `publication` may be uploaded to `repository`.
    pub fn permits(&self, repository: &str, publication: &Publication) -> bool {
        publication.bound_repository == repository
            && self
                .routes
                .get(repository)
                .is_some_and(|route| route.contains(&publication.key()))
    }

    /// Every `(repository, publication)` combination an executor must skip.
    pub fn denied(&self) -> Vec<(String, PublicationKey)> {
        let mut denied = Vec::new();
        for repository in self.routes.keys() {
            for route in self.routes.values() {
                if &route.sink.name == repository {
                    continue;
                }
                for publication in &route.publications {
                    denied.push((repository.clone(), publication.key()));
                }
            }
        }
        denied
    }

    /// Reject the plan if any publication sits under a repository it is not
    /// bound to, or if two repositories share one destination.
    pub fn verify(&self) -> Result<()> {
        let mut owners: BTreeMap<String, &str> = BTreeMap::new();
        for (repository, route) in &self.routes {
            if &route.sink.name != repository {
                return Err(Error::RoutingViolation {
                    repository: repository.clone(),
                    publication: format!("<sink {}>", route.sink.name),
                    bound: route.sink.name.clone(),
                });
            }
            if let Some(stray) = route
                .publications
                .iter()
                .find(|p| &p.bound_repository != repository)
            {
                return Err(Error::RoutingViolation {
                    repository: repository.clone(),
                    publication: stray.coordinates(),
                    bound: stray.bound_repository.clone(),
                });
            }
            let destination = destination_key(&route.sink.destination_url);
            if let Some(owner) = owners.get(&destination) {
                return Err(Error::RoutingViolation {
                    repository: owner.to_string(),
                    publication: route
                        .publications
                        .first()
                        .map(Publication::coordinates)
                        .unwrap_or_else(|| format!("<sink {}>", repository)),
                    bound: repository.clone(),
                });
            }
            owners.insert(destination, repository);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn insert_route_for_test(&mut self, repository: &str, route: Route) {
        self.routes.insert(repository.to_string(), route);
    }
}

/// Partition `publications` by bound repository.
///
/// Sinks are resolved lazily, the first time a repository name is seen.
pub fn route(publications: &[Publication], resolver: &SinkResolver) -> Result<PublishPlan> {
    let mut routes: BTreeMap<String, Route> = BTreeMap::new();

    for publication in publications {
        let repository = &publication.bound_repository;
        if !routes.contains_key(repository) {
            let sink = resolver.resolve(repository)?;
            debug!("Repository '{}' -> {}", sink.name, sink.destination_url);
            routes.insert(
                repository.clone(),
                Route {
                    sink,
                    publications: Vec::new(),
                },
            );
        }
        if let Some(route) = routes.get_mut(repository) {
            route.publications.push(publication.clone());
        }
    }

    let plan = PublishPlan { routes };
    plan.verify()?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::metadata::SubBuildMetadata;
    use crate::scanner::{CandidateFile, ScanEntry};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn entry(file_name: &str, repository: &str) -> ScanEntry {
        ScanEntry {
            file: CandidateFile {
                path: PathBuf::from(format!("/products/{}/{}", repository, file_name)),
                file_name: file_name.to_string(),
            },
            metadata: Arc::new(SubBuildMetadata::new("1.0", repository)),
            sub_build: repository.to_string(),
        }
    }

    fn publications() -> Vec<Publication> {
        Aggregator::new()
            .unwrap()
            .aggregate(vec![
                entry("_GROUP_com_foo_ID_bar-cpp_CLS-headers.zip", "r1"),
                entry("_GROUP_com_foo_ID_bar-java_CLS.jar", "r2"),
                entry("_GROUP_com_foo_ID_baz_CLS.zip", "r1"),
            ])
            .publications
    }

    fn resolver() -> SinkResolver {
        SinkResolver::new(Url::parse("file:///srv/repos").unwrap(), BTreeMap::new())
    }

    #[test]
    fn test_route_partitions_by_bound_repository() {
        let plan = route(&publications(), &resolver()).unwrap();

        assert_eq!(plan.repositories().collect::<Vec<_>>(), vec!["r1", "r2"]);
        assert_eq!(plan.publication_count(), 3);

        let r1 = plan.route_for("r1").unwrap();
        assert_eq!(r1.sink.destination_url.as_str(), "file:///srv/repos/r1");
        let keys: Vec<_> = r1.publications.iter().map(|p| p.key().to_string()).collect();
        assert_eq!(keys, vec!["com.foo:bar-cpp", "com.foo:baz"]);

        let r2 = plan.route_for("r2").unwrap();
        assert_eq!(r2.publications.len(), 1);
        assert_eq!(r2.publications[0].artifact_id, "bar-java");
    }

    #[test]
    fn test_route_never_crosses_repositories() {
        let publications = publications();
        let plan = route(&publications, &resolver()).unwrap();

        for route in plan.routes() {
            for publication in &route.publications {
                assert_eq!(publication.bound_repository, route.sink.name);
            }
        }
        for repository in ["r1", "r2", "r3"] {
            for publication in &publications {
                assert_eq!(
                    plan.permits(repository, publication),
                    publication.bound_repository == repository
                );
            }
        }
    }

    #[test]
    fn test_denied_lists_every_foreign_pair() {
        let plan = route(&publications(), &resolver()).unwrap();
        let denied = plan.denied();
        assert_eq!(denied.len(), 3);
        assert!(denied.contains(&("r1".to_string(), PublicationKey::new("com.foo", "bar-java"))));
        assert!(denied.contains(&("r2".to_string(), PublicationKey::new("com.foo", "baz"))));
        assert!(denied.contains(&("r2".to_string(), PublicationKey::new("com.foo", "bar-cpp"))));
    }

    #[test]
    fn test_verify_rejects_foreign_publication() {
        let publications = publications();
        let stray = publications
            .iter()
            .find(|p| p.bound_repository == "r2")
            .unwrap()
            .clone();

        let mut plan = route(&publications, &resolver()).unwrap();
        let mut r1 = plan.route_for("r1").unwrap().clone();
        r1.publications.push(stray);
        plan.insert_route_for_test("r1", r1);

        match plan.verify().unwrap_err() {
            Error::RoutingViolation {
                repository, bound, ..
            } => {
                assert_eq!(repository, "r1");
                assert_eq!(bound, "r2");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_resolver_override_wins() {
        let mut overrides = BTreeMap::new();
        overrides.insert("r2".to_string(), Url::parse("file:///mnt/special").unwrap());
        let resolver = SinkResolver::new(Url::parse("file:///srv/repos/").unwrap(), overrides);

        assert_eq!(
            resolver.resolve("r1").unwrap().destination_url.as_str(),
            "file:///srv/repos/r1"
        );
        assert_eq!(
            resolver.resolve("r2").unwrap().destination_url.as_str(),
            "file:///mnt/special"
        );
    }

    #[test]
    fn test_resolver_rejects_names_that_alias_other_directories() {
        let resolver = resolver();
        for name in ["r1#nightly", "r1?tag", "r2/../r1", "../outside", ".."] {
            assert!(
                matches!(
                    resolver.resolve(name),
                    Err(Error::InvalidRepositoryName { .. })
                ),
                "{} resolved",
                name
            );
        }
    }

    #[test]
    fn test_route_rejects_repositories_sharing_a_destination() {
        let mut overrides = BTreeMap::new();
        overrides.insert("r2".to_string(), Url::parse("file:///srv/repos/r1/").unwrap());
        let resolver = SinkResolver::new(Url::parse("file:///srv/repos").unwrap(), overrides);

        match route(&publications(), &resolver).unwrap_err() {
            Error::RoutingViolation {
                repository,
                publication,
                bound,
            } => {
                assert_eq!(repository, "r1");
                assert_eq!(bound, "r2");
                assert_eq!(publication, "com.foo:bar-java:1.0");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_resolver_keeps_name_with_colon_relative() {
        let sink = resolver().resolve("vendor:nightly").unwrap();
        assert!(sink.destination_url.as_str().starts_with("file:///srv/repos/"));
    }

    #[test]
    fn test_empty_plan() {
        let plan = route(&[], &resolver()).unwrap();
        assert!(plan.is_empty());
        assert!(plan.denied().is_empty());
        assert!(plan.verify().is_ok());
    }
}
