//! Engine configuration.
//!
//! Mirrors the shape of a bundler config so existing settings can be reused:
//!
//! ```json
//! {
//!   "loaders": { "use": ["babel-loader"], "identity": ["css-loader"] },
//!   "domSupport": false,
//!   "webpackConfig": {
//!     "resolve": {
//!       "alias": { "components": "./src/components" },
//!       "extensions": [".jsx", ".reverse"],
//!       "root": ["./src"]
//!     },
//!     "module": {
//!       "loaders": [{ "test": "\\.reverse$", "loader": "reverse!banner?banner=//x" }]
//!     }
//!   }
//! }
//! ```

use crate::alias::AliasMap;
use crate::error::{Error, Result};
use crate::loader::LoaderFilters;
use crate::rules::Rule;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default config file name looked up by the CLI.
pub const CONFIG_FILE: &str = "mimic.json";

/// Top-level engine options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MimicOptions {
    /// Loader name filters.
    pub loaders: LoaderFilters,
    /// Inject browser-like globals on install.
    pub dom_support: bool,
    /// Bundler configuration.
    pub webpack_config: BundlerConfig,
}

/// The subset of a bundler config the engine understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    pub resolve: ResolveOptions,
    pub module: ModuleOptions,
}

/// `resolve` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Leading-segment aliases.
    pub alias: HashMap<String, String>,
    /// Extra extensions dispatched through the loader rules.
    pub extensions: Vec<String>,
    /// Extra module search roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<OneOrMany<PathBuf>>,
}

/// `module` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleOptions {
    /// Transform rules in priority order.
    pub loaders: Vec<RuleConfig>,
}

/// A rule as written in config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Regex tested against the resolved file path.
    pub test: String,
    /// Pipeline string, or a list of loader names.
    pub loader: OneOrMany<String>,
}

/// A value that may be given as a single item or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    /// Flatten into a list.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item.clone()],
            Self::Many(items) => items.clone(),
        }
    }
}

impl RuleConfig {
    /// Compile into a [`Rule`]. A list of names becomes one `!`-joined pipeline.
    pub fn to_rule(&self) -> Result<Rule> {
        let pipeline = match &self.loader {
            OneOrMany::One(pipeline) => pipeline.clone(),
            OneOrMany::Many(names) => names.join("!"),
        };
        Rule::new(&self.test, pipeline)
    }
}

impl MimicOptions {
    /// Parse options from JSON text.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Set the bundler config.
    #[must_use]
    pub fn with_bundler_config(mut self, config: BundlerConfig) -> Self {
        self.webpack_config = config;
        self
    }

    /// Set loader filters.
    #[must_use]
    pub fn with_filters(mut self, filters: LoaderFilters) -> Self {
        self.loaders = filters;
        self
    }

    /// Enable or disable DOM global injection.
    #[must_use]
    pub fn with_dom_support(mut self, enabled: bool) -> Self {
        self.dom_support = enabled;
        self
    }

    #[must_use]
    pub fn aliases(&self) -> AliasMap {
        AliasMap::from(self.webpack_config.resolve.alias.clone())
    }

    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.webpack_config.resolve.extensions
    }

    /// Search roots, relative ones resolved against `base`.
    #[must_use]
    pub fn roots(&self, base: &Path) -> Vec<PathBuf> {
        self.webpack_config
            .resolve
            .root
            .as_ref()
            .map(OneOrMany::to_vec)
            .unwrap_or_default()
            .into_iter()
            .map(|root| if root.is_absolute() { root } else { base.join(root) })
            .collect()
    }

    /// Compile every configured rule.
    pub fn rules(&self) -> Result<Vec<Rule>> {
        self.webpack_config
            .module
            .loaders
            .iter()
            .map(RuleConfig::to_rule)
            .collect()
    }
}

/// Load options from a JSON file.
pub fn load_options(path: &Path) -> Result<MimicOptions> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    MimicOptions::from_json(&text).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Find `mimic.json` in `root`.
#[must_use]
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    let path = root.join(CONFIG_FILE);
    path.is_file().then_some(path)
}
