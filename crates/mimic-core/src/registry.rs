//! Process-wide module interception registry.
//!
//! Holds the live dispatch state a host consults on every load: the active
//! require handler, the per-extension handler table, module search paths and
//! injected globals. Engines swap entries in and out on install/uninstall.
//!
//! Handlers are cloned out of the registry before they are called, so a
//! handler may re-enter the registry (nested requires) without deadlocking.

use crate::dom::GlobalValue;
use crate::error::{Error, Result};
use crate::host::{FsModuleHost, LoadedModule, ModuleHost, ModuleRequest};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Extension every unknown file type falls back to.
pub const PRIMARY_EXTENSION: &str = ".js";

/// Handles `require(specifier)`.
pub trait RequireHandler: Send + Sync {
    fn require(&self, registry: &InterceptionRegistry, request: &ModuleRequest)
        -> Result<LoadedModule>;
}

/// Handles loading a resolved file of a given extension.
pub trait ExtensionHandler: Send + Sync {
    fn load(&self, registry: &InterceptionRegistry, path: &Path) -> Result<LoadedModule>;
}

/// The host's own require: resolve, consult the module cache, dispatch by extension.
pub struct HostRequire;

impl RequireHandler for HostRequire {
    fn require(
        &self,
        registry: &InterceptionRegistry,
        request: &ModuleRequest,
    ) -> Result<LoadedModule> {
        let host = registry.host();
        let path = host.resolve(request, &registry.extensions(), &registry.search_paths())?;
        if let Some(module) = host.cached(&path) {
            return Ok(module);
        }
        registry.handler_for_path(&path)?.load(registry, &path)
    }
}

/// Default handler for source files: compile the raw text.
pub struct SourceHandler;

impl ExtensionHandler for SourceHandler {
    fn load(&self, registry: &InterceptionRegistry, path: &Path) -> Result<LoadedModule> {
        let host = registry.host();
        let source = host.read_source(path)?;
        host.compile(source, path)
    }
}

/// Default handler for `.json`: validate, then compile the raw text.
pub struct JsonHandler;

impl ExtensionHandler for JsonHandler {
    fn load(&self, registry: &InterceptionRegistry, path: &Path) -> Result<LoadedModule> {
        let host = registry.host();
        let source = host.read_source(path)?;
        serde_json::from_str::<serde_json::Value>(&source).map_err(|e| Error::Compile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        host.compile(source, path)
    }
}

#[derive(Clone)]
struct DispatchState {
    require: Arc<dyn RequireHandler>,
    extensions: Vec<(String, Arc<dyn ExtensionHandler>)>,
    search_paths: Vec<PathBuf>,
}

impl DispatchState {
    fn baseline() -> Self {
        Self {
            require: Arc::new(HostRequire),
            extensions: vec![
                (
                    PRIMARY_EXTENSION.to_string(),
                    Arc::new(SourceHandler) as Arc<dyn ExtensionHandler>,
                ),
                (
                    ".json".to_string(),
                    Arc::new(JsonHandler) as Arc<dyn ExtensionHandler>,
                ),
            ],
            search_paths: Vec::new(),
        }
    }
}

struct Inner {
    host: Arc<dyn ModuleHost>,
    baseline: DispatchState,
    state: RwLock<DispatchState>,
    globals: RwLock<BTreeMap<String, GlobalValue>>,
}

/// Shared handle to the live interception state.
#[derive(Clone)]
pub struct InterceptionRegistry {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for InterceptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptionRegistry")
            .field("extensions", &self.extensions())
            .field("search_paths", &self.search_paths())
            .finish_non_exhaustive()
    }
}

impl InterceptionRegistry {
    /// Create a registry over `host` with the default dispatch table
    /// (`.js` and `.json`) and no search paths.
    pub fn new(host: Arc<dyn ModuleHost>) -> Self {
        Self::with_search_paths(host, Vec::new())
    }

    /// Create a registry whose baseline includes `search_paths`.
    pub fn with_search_paths(host: Arc<dyn ModuleHost>, search_paths: Vec<PathBuf>) -> Self {
        let baseline = DispatchState {
            search_paths,
            ..DispatchState::baseline()
        };
        Self {
            inner: Arc::new(Inner {
                host,
                state: RwLock::new(baseline.clone()),
                baseline,
                globals: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    /// The process-wide registry, backed by [`FsModuleHost`].
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<InterceptionRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| Self::new(Arc::new(FsModuleHost::new())))
    }

    fn read(&self) -> RwLockReadGuard<'_, DispatchState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DispatchState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The host module system.
    #[must_use]
    pub fn host(&self) -> &dyn ModuleHost {
        self.inner.host.as_ref()
    }

    /// Load a module through the active require handler.
    pub fn require(&self, request: &ModuleRequest) -> Result<LoadedModule> {
        let handler = self.require_handler();
        handler.require(self, request)
    }

    /// The active require handler.
    #[must_use]
    pub fn require_handler(&self) -> Arc<dyn RequireHandler> {
        Arc::clone(&self.read().require)
    }

    /// Replace the active require handler, returning the previous one.
    pub fn set_require_handler(&self, handler: Arc<dyn RequireHandler>) -> Arc<dyn RequireHandler> {
        std::mem::replace(&mut self.write().require, handler)
    }

    /// Registered extensions, in registration order.
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        self.read()
            .extensions
            .iter()
            .map(|(ext, _)| ext.clone())
            .collect()
    }

    /// Handler registered for `ext`.
    #[must_use]
    pub fn extension_handler(&self, ext: &str) -> Option<Arc<dyn ExtensionHandler>> {
        self.read()
            .extensions
            .iter()
            .find(|(registered, _)| registered == ext)
            .map(|(_, handler)| Arc::clone(handler))
    }

    /// Register a handler for `ext`, returning the one it replaces.
    pub fn set_extension_handler(
        &self,
        ext: &str,
        handler: Arc<dyn ExtensionHandler>,
    ) -> Option<Arc<dyn ExtensionHandler>> {
        let mut state = self.write();
        if let Some((_, slot)) = state.extensions.iter_mut().find(|(e, _)| e == ext) {
            return Some(std::mem::replace(slot, handler));
        }
        state.extensions.push((ext.to_string(), handler));
        None
    }

    /// Unregister `ext`, returning its handler.
    pub fn remove_extension_handler(&self, ext: &str) -> Option<Arc<dyn ExtensionHandler>> {
        let mut state = self.write();
        let index = state.extensions.iter().position(|(e, _)| e == ext)?;
        Some(state.extensions.remove(index).1)
    }

    /// Handler for a resolved file.
    ///
    /// Tries the longest registered multi-dot extension of the file name
    /// first (`.test.js` before `.js`), then falls back to `.js`.
    pub fn handler_for_path(&self, path: &Path) -> Result<Arc<dyn ExtensionHandler>> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let state = self.read();
        let lookup = |ext: &str| {
            state
                .extensions
                .iter()
                .find(|(registered, _)| registered == ext)
                .map(|(_, handler)| Arc::clone(handler))
        };

        let candidates = name
            .char_indices()
            .filter(|&(idx, ch)| ch == '.' && idx > 0)
            .map(|(idx, _)| &name[idx..]);
        for ext in candidates {
            if let Some(handler) = lookup(ext) {
                return Ok(handler);
            }
        }
        lookup(PRIMARY_EXTENSION).ok_or_else(|| {
            Error::other(format!(
                "no handler registered for {} (and no {PRIMARY_EXTENSION} fallback)",
                path.display()
            ))
        })
    }

    /// Current module search paths.
    #[must_use]
    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.read().search_paths.clone()
    }

    /// Replace the search paths, returning the previous list.
    pub fn set_search_paths(&self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        std::mem::replace(&mut self.write().search_paths, paths)
    }

    /// Set a global value.
    pub fn set_global(&self, name: &str, value: GlobalValue) {
        self.inner
            .globals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value);
    }

    /// Read a global value.
    #[must_use]
    pub fn global_value(&self, name: &str) -> Option<GlobalValue> {
        self.inner
            .globals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names of every injected global.
    #[must_use]
    pub fn global_names(&self) -> Vec<String> {
        self.inner
            .globals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Reset require handler, extension table and search paths to the
    /// baseline captured at construction, regardless of what is installed.
    /// Globals are left alone.
    pub fn restore(&self) {
        *self.write() = self.inner.baseline.clone();
        debug!("interception registry restored to baseline");
    }
}

/// Thin-pointer identity of a require handler.
pub(crate) fn same_handler(a: &Arc<dyn RequireHandler>, b: &Arc<dyn RequireHandler>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Fixed(&'static str);

    impl ExtensionHandler for Fixed {
        fn load(&self, _registry: &InterceptionRegistry, path: &Path) -> Result<LoadedModule> {
            Ok(LoadedModule {
                path: path.to_path_buf(),
                source: self.0.to_string(),
            })
        }
    }

    fn registry() -> InterceptionRegistry {
        InterceptionRegistry::new(Arc::new(FsModuleHost::new()))
    }

    #[test]
    fn test_baseline_extensions() {
        let registry = registry();
        assert_eq!(registry.extensions(), vec![".js", ".json"]);
        assert!(registry.search_paths().is_empty());
    }

    #[test]
    fn test_set_and_remove_extension_handler() {
        let registry = registry();
        assert!(registry
            .set_extension_handler(".bar", Arc::new(Fixed("bar")))
            .is_none());
        assert_eq!(registry.extensions(), vec![".js", ".json", ".bar"]);
        assert!(registry
            .set_extension_handler(".bar", Arc::new(Fixed("bar2")))
            .is_some());
        assert!(registry.remove_extension_handler(".bar").is_some());
        assert!(registry.remove_extension_handler(".bar").is_none());
    }

    #[test]
    fn test_handler_for_path_prefers_longest_extension() {
        let registry = registry();
        registry.set_extension_handler(".test.js", Arc::new(Fixed("test")));
        let handler = registry
            .handler_for_path(Path::new("/p/a.test.js"))
            .unwrap();
        let module = handler.load(&registry, Path::new("/p/a.test.js")).unwrap();
        assert_eq!(module.source, "test");

        // unknown extension falls back to .js
        registry.set_extension_handler(".js", Arc::new(Fixed("js")));
        let handler = registry.handler_for_path(Path::new("/p/a.weird")).unwrap();
        let module = handler.load(&registry, Path::new("/p/a.weird")).unwrap();
        assert_eq!(module.source, "js");
    }

    #[test]
    fn test_host_require_loads_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "module.exports = 1;").unwrap();
        let registry = registry();

        let request = ModuleRequest::new("./a", dir.path());
        let module = registry.require(&request).unwrap();
        assert_eq!(module.source, "module.exports = 1;");

        fs::write(dir.path().join("a.js"), "changed").unwrap();
        assert_eq!(registry.require(&request).unwrap().source, "module.exports = 1;");
    }

    #[test]
    fn test_json_handler_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{ nope").unwrap();
        let registry = registry();
        let err = registry
            .require(&ModuleRequest::new("./bad.json", dir.path()))
            .unwrap_err();
        assert!(matches!(err, Error::Compile { .. }));
    }

    #[test]
    fn test_restore_resets_dispatch_state() {
        let registry = registry();
        let original = registry.require_handler();
        registry.set_require_handler(Arc::new(HostRequire));
        registry.set_extension_handler(".bar", Arc::new(Fixed("bar")));
        registry.set_search_paths(vec![PathBuf::from("/roots")]);

        registry.restore();
        assert!(same_handler(&registry.require_handler(), &original));
        assert_eq!(registry.extensions(), vec![".js", ".json"]);
        assert!(registry.search_paths().is_empty());
    }

    #[test]
    fn test_same_handler_identity() {
        let a: Arc<dyn RequireHandler> = Arc::new(HostRequire);
        let b: Arc<dyn RequireHandler> = Arc::new(HostRequire);
        assert!(same_handler(&a, &Arc::clone(&a)));
        assert!(!same_handler(&a, &b));
    }
}
