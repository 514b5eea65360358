//! The interception engine.
//!
//! A [`Mimic`] owns one configuration. Installing it into an
//! [`InterceptionRegistry`] puts two hooks in place:
//!
//! - a require handler that rewrites aliased specifiers and delegates to
//!   whichever handler was active before;
//! - an extension handler, registered for `.js` and every configured
//!   extension, that runs the first matching rule's loader chain over the
//!   file and compiles the result.
//!
//! Several engines may be installed at once. Each captures what it replaced
//! and puts it back on uninstall, so uninstalling must happen in reverse
//! install order. Doing otherwise is reported, not prevented.

use crate::alias::AliasMap;
use crate::config::{BundlerConfig, MimicOptions};
use crate::dom::{inject_dom_globals, GlobalEnvironment};
use crate::error::{Error, Result};
use crate::host::{LoadedModule, ModuleRequest};
use crate::loader::{LoaderChain, LoaderFilters, LoaderRegistry};
use crate::registry::{
    same_handler, ExtensionHandler, InterceptionRegistry, RequireHandler, PRIMARY_EXTENSION,
};
use crate::rules::{match_rule, Rule};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A rule paired with the chain built for it.
pub struct CompiledRule {
    rule: Rule,
    chain: LoaderChain,
}

impl CompiledRule {
    #[must_use]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    #[must_use]
    pub fn chain(&self) -> &LoaderChain {
        &self.chain
    }
}

impl AsRef<Rule> for CompiledRule {
    fn as_ref(&self) -> &Rule {
        &self.rule
    }
}

/// Immutable engine configuration shared with the installed hooks.
struct Shared {
    config: Arc<BundlerConfig>,
    aliases: AliasMap,
    extensions: Vec<String>,
    roots: Vec<PathBuf>,
    rules: Vec<CompiledRule>,
}

/// What an install replaced.
struct InstallState {
    registry: InterceptionRegistry,
    installed_require: Arc<dyn RequireHandler>,
    previous_require: Arc<dyn RequireHandler>,
    previous_extensions: Vec<(String, Option<Arc<dyn ExtensionHandler>>)>,
    previous_search_paths: Option<Vec<PathBuf>>,
}

/// Builder for [`Mimic`].
pub struct MimicBuilder {
    options: MimicOptions,
    rules: Vec<Rule>,
    environment: Option<Arc<dyn GlobalEnvironment>>,
    base_dir: Option<PathBuf>,
}

impl MimicBuilder {
    /// Append a rule after the configured ones.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Environment used when `domSupport` is enabled.
    #[must_use]
    pub fn environment(mut self, environment: Arc<dyn GlobalEnvironment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Directory relative `resolve.root` entries are resolved against
    /// (defaults to the current directory).
    #[must_use]
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Build every rule's chain.
    ///
    /// # Errors
    /// Any configuration error: an invalid pattern, a malformed pipeline, an
    /// unresolvable loader name, or `domSupport` without an environment.
    pub fn build(self, loaders: &LoaderRegistry) -> Result<Mimic> {
        if self.options.dom_support && self.environment.is_none() {
            return Err(Error::MissingEnvironment);
        }

        let filters: &LoaderFilters = &self.options.loaders;
        let rules = self
            .options
            .rules()?
            .into_iter()
            .chain(self.rules)
            .map(|rule| {
                let chain = LoaderChain::build(rule.loader(), loaders, filters)?;
                debug!(pattern = rule.pattern(), loaders = ?chain.names(), "built loader chain");
                Ok(CompiledRule { rule, chain })
            })
            .collect::<Result<Vec<_>>>()?;

        let base_dir = match self.base_dir {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };

        Ok(Mimic {
            shared: Arc::new(Shared {
                config: Arc::new(self.options.webpack_config.clone()),
                aliases: self.options.aliases(),
                extensions: self.options.extensions().to_vec(),
                roots: self.options.roots(&base_dir),
                rules,
            }),
            dom_support: self.options.dom_support,
            environment: self.environment,
            installed: None,
        })
    }
}

/// The interception engine.
pub struct Mimic {
    shared: Arc<Shared>,
    dom_support: bool,
    environment: Option<Arc<dyn GlobalEnvironment>>,
    installed: Option<InstallState>,
}

impl std::fmt::Debug for Mimic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mimic")
            .field("aliases", &self.shared.aliases)
            .field("extensions", &self.shared.extensions)
            .field("rules", &self.shared.rules.len())
            .field("installed", &self.is_installed())
            .finish_non_exhaustive()
    }
}

impl Mimic {
    /// Start building an engine from options.
    #[must_use]
    pub fn builder(options: MimicOptions) -> MimicBuilder {
        MimicBuilder {
            options,
            rules: Vec::new(),
            environment: None,
            base_dir: None,
        }
    }

    /// Build an engine from options alone.
    pub fn new(options: MimicOptions, loaders: &LoaderRegistry) -> Result<Self> {
        Self::builder(options).build(loaders)
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.is_some()
    }

    /// The bundler configuration loaders see through
    /// [`crate::loader::LoaderContext::config`].
    #[must_use]
    pub fn config(&self) -> &Arc<BundlerConfig> {
        &self.shared.config
    }

    /// Compiled rules, in match order.
    #[must_use]
    pub fn rules(&self) -> &[CompiledRule] {
        &self.shared.rules
    }

    /// Rewrite a specifier with this engine's aliases.
    #[must_use]
    pub fn resolve_alias(&self, specifier: &str) -> String {
        self.shared.aliases.resolve(specifier)
    }

    /// First rule matching a resolved path.
    #[must_use]
    pub fn match_rule(&self, path: &Path) -> Option<&CompiledRule> {
        match_rule(path, &self.shared.rules)
    }

    /// Run the matching rule's chain over `source`.
    ///
    /// Returns `None` when no rule matches, meaning the source is used as is.
    pub fn transform(&self, path: &Path, source: &str) -> Result<Option<String>> {
        self.match_rule(path)
            .map(|compiled| {
                compiled
                    .chain
                    .run_for(source, Some(path), &self.shared.config)
            })
            .transpose()
    }

    /// Install the hooks into `registry`.
    ///
    /// Installing an already installed engine is not supported.
    pub fn install(&mut self, registry: &InterceptionRegistry) -> &mut Self {
        let installed_require: Arc<dyn RequireHandler> = Arc::new(AliasRequire {
            shared: Arc::clone(&self.shared),
            registry_previous: registry.require_handler(),
        });
        let previous_require = registry.set_require_handler(Arc::clone(&installed_require));

        let previous_primary = registry.extension_handler(PRIMARY_EXTENSION);
        let mut previous_extensions = vec![(
            PRIMARY_EXTENSION.to_string(),
            registry.set_extension_handler(
                PRIMARY_EXTENSION,
                Arc::new(LoaderExtension {
                    shared: Arc::clone(&self.shared),
                    fallback: previous_primary.clone(),
                    primary: previous_primary.clone(),
                }),
            ),
        )];

        // Every configured extension goes through the same rule path.
        for ext in &self.shared.extensions {
            if previous_extensions.iter().any(|(seen, _)| seen == ext) {
                continue;
            }
            let previous = registry.extension_handler(ext);
            registry.set_extension_handler(
                ext,
                Arc::new(LoaderExtension {
                    shared: Arc::clone(&self.shared),
                    fallback: previous.clone(),
                    primary: previous_primary.clone(),
                }),
            );
            previous_extensions.push((ext.clone(), previous));
        }

        if self.dom_support {
            if let Some(env) = &self.environment {
                let injected = inject_dom_globals(registry, env.as_ref());
                debug!(injected, "injected DOM globals");
            }
        }

        let previous_search_paths = if self.shared.roots.is_empty() {
            None
        } else {
            let previous = registry.search_paths();
            let mut paths = previous.clone();
            paths.extend(self.shared.roots.iter().cloned());
            registry.set_search_paths(paths);
            Some(previous)
        };

        debug!(
            extensions = ?self.shared.extensions,
            rules = self.shared.rules.len(),
            "mimic installed"
        );

        self.installed = Some(InstallState {
            registry: registry.clone(),
            installed_require,
            previous_require,
            previous_extensions,
            previous_search_paths,
        });
        self
    }

    /// Remove the hooks, restoring what [`Self::install`] replaced.
    ///
    /// Never installed: warns and does nothing. If another handler has been
    /// installed on top of this one, warns and restores anyway.
    pub fn uninstall(&mut self) -> &mut Self {
        let Some(state) = self.installed.take() else {
            warn!("mimic was never installed");
            return self;
        };
        let registry = &state.registry;

        if !same_handler(&registry.require_handler(), &state.installed_require) {
            warn!("mimic is restoring an overridden require handler that it did not install");
        }
        registry.set_require_handler(state.previous_require);

        for (ext, previous) in state.previous_extensions {
            match previous {
                Some(handler) => {
                    registry.set_extension_handler(&ext, handler);
                }
                None => {
                    registry.remove_extension_handler(&ext);
                }
            }
        }

        if let Some(paths) = state.previous_search_paths {
            registry.set_search_paths(paths);
        }

        debug!("mimic uninstalled");
        self
    }

    /// Require `request.specifier` as seen from `request.parent`, with
    /// aliases applied, through the handler this engine replaced.
    ///
    /// # Errors
    /// `Error::NotInstalled` if the engine is not installed, or any
    /// resolution/load error.
    pub fn require_with_context(&self, request: &ModuleRequest) -> Result<LoadedModule> {
        let state = self.installed.as_ref().ok_or(Error::NotInstalled)?;
        let rewritten = request.with_specifier(self.resolve_alias(&request.specifier));
        state.previous_require.require(&state.registry, &rewritten)
    }
}

/// Require hook: alias, then delegate.
struct AliasRequire {
    shared: Arc<Shared>,
    registry_previous: Arc<dyn RequireHandler>,
}

impl RequireHandler for AliasRequire {
    fn require(
        &self,
        registry: &InterceptionRegistry,
        request: &ModuleRequest,
    ) -> Result<LoadedModule> {
        let specifier = self.shared.aliases.resolve(&request.specifier);
        if specifier != request.specifier {
            debug!(from = %request.specifier, to = %specifier, "alias applied");
        }
        self.registry_previous
            .require(registry, &request.with_specifier(specifier))
    }
}

/// Extension hook: match a rule, transform, compile.
struct LoaderExtension {
    shared: Arc<Shared>,
    /// Handler this extension had before install.
    fallback: Option<Arc<dyn ExtensionHandler>>,
    /// Handler `.js` had before install.
    primary: Option<Arc<dyn ExtensionHandler>>,
}

impl ExtensionHandler for LoaderExtension {
    fn load(&self, registry: &InterceptionRegistry, path: &Path) -> Result<LoadedModule> {
        if let Some(compiled) = match_rule(path, &self.shared.rules) {
            debug!(
                path = %path.display(),
                pattern = compiled.rule.pattern(),
                "applying loader chain"
            );
            let host = registry.host();
            let source = host.read_source(path)?;
            let output = compiled
                .chain
                .run_for(&source, Some(path), &self.shared.config)?;
            return host.compile(output, path);
        }

        match self.fallback.as_ref().or(self.primary.as_ref()) {
            Some(handler) => handler.load(registry, path),
            None => Err(Error::other(format!(
                "no default handler to load {}",
                path.display()
            ))),
        }
    }
}
