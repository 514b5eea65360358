use super::builtin::{identity_loader, null_loader};
use super::context::{empty_config, LoaderContext};
use super::pipeline::parse_pipeline;
use super::registry::LoaderRegistry;
use super::{Loader, Transformed};
use crate::config::BundlerConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{trace, warn};

/// How a rule names its loaders.
#[derive(Clone)]
pub enum LoaderSpec {
    /// A single executable loader.
    Single(Arc<dyn Loader>),
    /// Loaders in declaration order (the last one runs first).
    List(Vec<Arc<dyn Loader>>),
    /// `name[?query]!name[?query]...`, resolved through a [`LoaderRegistry`].
    Pipeline(String),
}

impl fmt::Debug for LoaderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(loader) => f.debug_tuple("Single").field(&loader.name()).finish(),
            Self::List(loaders) => f
                .debug_tuple("List")
                .field(&loaders.iter().map(|l| l.name()).collect::<Vec<_>>())
                .finish(),
            Self::Pipeline(pipeline) => f.debug_tuple("Pipeline").field(pipeline).finish(),
        }
    }
}

impl From<&str> for LoaderSpec {
    fn from(pipeline: &str) -> Self {
        Self::Pipeline(pipeline.to_string())
    }
}

impl From<String> for LoaderSpec {
    fn from(pipeline: String) -> Self {
        Self::Pipeline(pipeline)
    }
}

impl From<Arc<dyn Loader>> for LoaderSpec {
    fn from(loader: Arc<dyn Loader>) -> Self {
        Self::Single(loader)
    }
}

impl From<Vec<Arc<dyn Loader>>> for LoaderSpec {
    fn from(loaders: Vec<Arc<dyn Loader>>) -> Self {
        Self::List(loaders)
    }
}

/// Name filters applied to pipeline entries when a chain is built.
///
/// An entry matches when it lists either the name as written or the name it
/// resolves under, so `raw` and `raw-loader` both filter `raw!...`; bundler
/// configs usually compare only the `-loader` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderFilters {
    /// Allow-list. When set, any other loader is replaced by `null-loader`.
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub allow: Option<Vec<String>>,
    /// Loaders replaced by `identity-loader`. Takes precedence over `allow`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identity: Vec<String>,
}

impl LoaderFilters {
    /// Restrict pipelines to the given loader names.
    #[must_use]
    pub fn allow<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Force the given loader names to pass source through unchanged.
    #[must_use]
    pub fn identity<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identity = names.into_iter().map(Into::into).collect();
        self
    }

    /// A name matches when either the name as written or its canonical
    /// (`-loader` suffixed) form is listed.
    fn listed(list: &[String], written: &str, canonical: &str) -> bool {
        list.iter().any(|n| n == written || n == canonical)
    }

    fn is_identity(&self, written: &str, canonical: &str) -> bool {
        Self::listed(&self.identity, written, canonical)
    }

    fn is_disallowed(&self, written: &str, canonical: &str) -> bool {
        self.allow
            .as_deref()
            .is_some_and(|allow| !Self::listed(allow, written, canonical))
    }
}

struct ChainEntry {
    query: String,
    loader: Arc<dyn Loader>,
}

/// A composed loader chain, built once per rule.
pub struct LoaderChain {
    names: Vec<String>,
    entries: Vec<ChainEntry>,
}

impl fmt::Debug for LoaderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderChain")
            .field("loaders", &self.names)
            .finish()
    }
}

impl LoaderChain {
    /// Normalize a loader spec into a chain.
    ///
    /// Pipeline names are resolved against `registry` (direct, then with the
    /// `-loader` suffix). Filters are applied here, once: an identity-listed
    /// name becomes `identity-loader`, a name missing from the allow-list
    /// becomes `null-loader`. Filtered names need not be resolvable.
    ///
    /// # Errors
    /// `Error::InvalidPipeline` for malformed strings and
    /// `Error::LoaderNotFound` for unresolvable names.
    pub fn build(
        spec: &LoaderSpec,
        registry: &LoaderRegistry,
        filters: &LoaderFilters,
    ) -> Result<Self> {
        let entries: Vec<(String, ChainEntry)> = match spec {
            LoaderSpec::Single(loader) => vec![Self::direct(loader)],
            LoaderSpec::List(loaders) => loaders.iter().map(Self::direct).collect(),
            LoaderSpec::Pipeline(pipeline) => parse_pipeline(pipeline)?
                .into_iter()
                .map(|request| -> Result<(String, ChainEntry)> {
                    let canonical = registry.canonical_name(&request.name);
                    let (name, loader) = if filters.is_identity(&request.name, &canonical) {
                        (canonical, identity_loader())
                    } else if filters.is_disallowed(&request.name, &canonical) {
                        (canonical, null_loader())
                    } else {
                        registry
                            .resolve(&request.name)
                            .ok_or_else(|| Error::LoaderNotFound {
                                name: request.name.clone(),
                            })?
                    };
                    Ok((
                        name,
                        ChainEntry {
                            query: request.query,
                            loader,
                        },
                    ))
                })
                .collect::<Result<Vec<_>>>()?,
        };

        let (names, entries) = entries.into_iter().unzip();
        Ok(Self { names, entries })
    }

    fn direct(loader: &Arc<dyn Loader>) -> (String, ChainEntry) {
        (
            loader.name().to_string(),
            ChainEntry {
                query: String::new(),
                loader: Arc::clone(loader),
            },
        )
    }

    /// Loader names in declaration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the chain over `source`, outside any engine.
    pub fn run(&self, source: &str) -> Result<String> {
        self.run_for(source, None, empty_config())
    }

    /// Run the chain over the contents of `resource`, with `config` visible
    /// to every loader through [`LoaderContext::config`].
    ///
    /// Loaders execute right-to-left: the output of entry `i` is the input
    /// of entry `i - 1`, and the leftmost loader's output is the result.
    ///
    /// # Errors
    /// `Error::Transform` when a loader fails, either by returning `Err` or
    /// by committing an error through its callback. The chain stops there.
    pub fn run_for(
        &self,
        source: &str,
        resource: Option<&Path>,
        config: &Arc<BundlerConfig>,
    ) -> Result<String> {
        let mut current = source.to_string();

        for (index, entry) in self.entries.iter().enumerate().rev() {
            let name = &self.names[index];
            let fail = |source| Error::Transform {
                loader: name.clone(),
                index,
                source,
            };

            let mut ctx = LoaderContext::new(&self.names, index, &entry.query, resource, config);
            let returned = entry.loader.apply(&current, &mut ctx).map_err(fail)?;

            current = match (ctx.finish(), returned) {
                (Some(committed), _) => committed.map_err(fail)?,
                (None, Transformed::Code(code)) => code,
                (None, Transformed::Deferred(_)) => {
                    warn!(
                        loader = %name,
                        index,
                        "deferred loader did not commit before returning; its output is lost"
                    );
                    String::new()
                }
                (None, Transformed::Committed) => {
                    warn!(
                        loader = %name,
                        index,
                        "loader reported a committed result but never called the callback"
                    );
                    String::new()
                }
            };

            trace!(loader = %name, index, bytes = current.len(), "loader step complete");
        }

        Ok(current)
    }
}
