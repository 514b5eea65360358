use super::builtin::{
    BannerLoader, IdentityLoader, JsonLoader, NullLoader, RawLoader, ReplaceLoader,
};
use super::Loader;
use std::collections::HashMap;
use std::sync::Arc;

/// Conventional suffix retried when a loader name does not resolve directly.
pub const LOADER_SUFFIX: &str = "-loader";

/// Named loaders available to string pipelines.
///
/// Lookup mirrors bundler conventions: `babel` resolves to a loader
/// registered as `babel`, or failing that, `babel-loader`.
#[derive(Clone, Default)]
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn Loader>>,
}

impl LoaderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in loaders.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(IdentityLoader));
        registry.register(Arc::new(NullLoader));
        registry.register(Arc::new(RawLoader));
        registry.register(Arc::new(JsonLoader));
        registry.register(Arc::new(BannerLoader));
        registry.register(Arc::new(ReplaceLoader));
        registry
    }

    /// Register a loader under its own name.
    pub fn register(&mut self, loader: Arc<dyn Loader>) -> &mut Self {
        let name = loader.name().to_string();
        self.register_as(name, loader)
    }

    /// Register a loader under an explicit name (e.g. a path like `./local/foo`).
    pub fn register_as(&mut self, name: impl Into<String>, loader: Arc<dyn Loader>) -> &mut Self {
        self.loaders.insert(name.into(), loader);
        self
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, loader: Arc<dyn Loader>) -> Self {
        self.register_as(name, loader);
        self
    }

    /// Exact lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Loader>> {
        self.loaders.get(name)
    }

    /// Returns true if `name` resolves exactly.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.loaders.contains_key(name)
    }

    /// Name a pipeline entry resolves under: `name` itself when registered,
    /// else `name-loader` when that is registered, else `name` unchanged.
    #[must_use]
    pub fn canonical_name(&self, name: &str) -> String {
        if !self.contains(name) {
            let suffixed = format!("{name}{LOADER_SUFFIX}");
            if self.contains(&suffixed) {
                return suffixed;
            }
        }
        name.to_string()
    }

    /// Resolve a name by direct lookup, then with the `-loader` suffix.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<(String, Arc<dyn Loader>)> {
        let canonical = self.canonical_name(name);
        self.get(&canonical)
            .map(|loader| (canonical.clone(), Arc::clone(loader)))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("loaders", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::map_fn;

    #[test]
    fn test_direct_lookup_wins() {
        let registry = LoaderRegistry::new()
            .with("css", map_fn("css", |s| format!("css:{s}")))
            .with("css-loader", map_fn("css-loader", |s| format!("css-loader:{s}")));
        let (name, _) = registry.resolve("css").unwrap();
        assert_eq!(name, "css");
    }

    #[test]
    fn test_suffix_retry() {
        let registry =
            LoaderRegistry::new().with("css-loader", map_fn("css-loader", str::to_string));
        let (name, _) = registry.resolve("css").unwrap();
        assert_eq!(name, "css-loader");
        assert_eq!(registry.canonical_name("css"), "css-loader");
    }

    #[test]
    fn test_unresolvable() {
        let registry = LoaderRegistry::new();
        assert!(registry.resolve("missing").is_none());
        assert_eq!(registry.canonical_name("missing"), "missing");
    }

    #[test]
    fn test_builtins_registered() {
        let registry = LoaderRegistry::with_builtins();
        assert!(registry.resolve("identity").is_some());
        assert!(registry.resolve("null").is_some());
        assert!(registry.resolve("raw").is_some());
        assert!(registry.resolve("json").is_some());
        assert!(registry.resolve("banner").is_some());
        assert!(registry.resolve("replace").is_some());
        assert_eq!(registry.len(), 6);
    }
}
