#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Bundler-style module interception for a Node-like host.
//!
//! A [`Mimic`] engine is built from [`MimicOptions`] and a [`LoaderRegistry`],
//! then installed into an [`InterceptionRegistry`]. While installed, every
//! require is aliased, and every file matching a rule is run through that
//! rule's [`LoaderChain`] before the host compiles it.

pub mod alias;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod host;
pub mod loader;
pub mod registry;
pub mod rules;
pub mod version;

pub use alias::{resolve_alias, AliasMap};
pub use config::{load_options, BundlerConfig, MimicOptions, CONFIG_FILE};
pub use dom::{GlobalEnvironment, MapEnvironment, DOM_GLOBALS};
pub use engine::{CompiledRule, Mimic, MimicBuilder};
pub use error::{Error, Result};
pub use host::{FsModuleHost, LoadedModule, ModuleHost, ModuleRequest};
pub use loader::{
    loader_fn, map_fn, Loader, LoaderChain, LoaderContext, LoaderError, LoaderFilters,
    LoaderRegistry, LoaderSpec, Transformed,
};
pub use registry::{ExtensionHandler, InterceptionRegistry, RequireHandler};
pub use rules::{match_rule, Rule};
pub use version::VERSION;
