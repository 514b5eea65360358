pub mod check;
pub mod require;
pub mod resolve;
pub mod transform;
pub mod version;

use miette::{IntoDiagnostic, Result};
use mimic_core::config::{find_config_file, load_options};
use mimic_core::{LoaderRegistry, MapEnvironment, Mimic, MimicOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Options loaded for a command, with where they came from.
pub struct Project {
    pub cwd: PathBuf,
    pub config_path: Option<PathBuf>,
    pub options: MimicOptions,
}

impl Project {
    /// Load `config` (relative to `cwd`), or `mimic.json` in `cwd` if present,
    /// or defaults.
    pub fn load(cwd: &Path, config: Option<&Path>) -> Result<Self> {
        let config_path = match config {
            Some(path) if path.is_absolute() => Some(path.to_path_buf()),
            Some(path) => Some(cwd.join(path)),
            None => find_config_file(cwd),
        };

        let options = match &config_path {
            Some(path) => {
                debug!(config = %path.display(), "loading config");
                load_options(path).into_diagnostic()?
            }
            None => {
                debug!("no config file; using defaults");
                MimicOptions::default()
            }
        };

        Ok(Self {
            cwd: cwd.to_path_buf(),
            config_path,
            options,
        })
    }

    /// Relative `resolve.root` entries are taken from the config's directory.
    pub fn base_dir(&self) -> &Path {
        self.config_path
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(&self.cwd)
    }

    /// Build an engine with the built-in loaders.
    pub fn engine(&self) -> Result<Mimic> {
        let mut builder = Mimic::builder(self.options.clone()).base_dir(self.base_dir());
        if self.options.dom_support {
            warn!("domSupport is enabled but the CLI has no DOM; no globals will be injected");
            builder = builder.environment(Arc::new(MapEnvironment::new()));
        }
        builder
            .build(&LoaderRegistry::with_builtins())
            .into_diagnostic()
    }

    /// Resolve a user-supplied path against the working directory.
    pub fn path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Print a serializable value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}
