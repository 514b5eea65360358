//! Browser-like global injection (`domSupport`).
//!
//! The engine does not build a DOM. It copies a fixed set of names from a
//! caller-provided environment into the registry's globals, once, on
//! install. Uninstall does not remove them.

use crate::registry::InterceptionRegistry;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Globals copied from the environment.
pub const DOM_GLOBALS: [&str; 5] = ["CustomEvent", "document", "window", "Element", "HTMLElement"];

/// An opaque global value.
pub type GlobalValue = Arc<dyn Any + Send + Sync>;

/// Source of browser-like globals.
pub trait GlobalEnvironment: Send + Sync {
    /// Value of the named global, if the environment provides it.
    fn property(&self, name: &str) -> Option<GlobalValue>;
}

/// An environment backed by a map.
#[derive(Default, Clone)]
pub struct MapEnvironment {
    properties: HashMap<String, GlobalValue>,
}

impl MapEnvironment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.properties.insert(name.into(), Arc::new(value));
        self
    }
}

impl GlobalEnvironment for MapEnvironment {
    fn property(&self, name: &str) -> Option<GlobalValue> {
        self.properties.get(name).cloned()
    }
}

/// Copy [`DOM_GLOBALS`] from `env` into `registry`. Returns how many were set.
pub fn inject_dom_globals(registry: &InterceptionRegistry, env: &dyn GlobalEnvironment) -> usize {
    let mut injected = 0;
    for name in DOM_GLOBALS {
        match env.property(name) {
            Some(value) => {
                registry.set_global(name, value);
                injected += 1;
            }
            None => debug!(global = name, "environment does not provide global; skipping"),
        }
    }
    injected
}
