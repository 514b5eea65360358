//! Loader (source transform) model.
//!
//! A loader maps source text to source text. Loaders are composed into a
//! [`LoaderChain`] that runs right-to-left, the way a bundler applies
//! `a!b!c`: `c` sees the raw file, `a` produces the final module text.
//!
//! ## Example
//!
//! ```ignore
//! use mimic_core::loader::{loader_fn, LoaderChain, LoaderSpec, Transformed};
//!
//! let upper = loader_fn("upper", |source, _ctx| Ok(Transformed::Code(source.to_uppercase())));
//! let chain = LoaderChain::build(&LoaderSpec::Single(upper), &Default::default(), &Default::default())?;
//! assert_eq!(chain.run("abc")?, "ABC");
//! ```
//!
//! A loader may also hand its result to [`LoaderContext::callback`] instead of
//! returning it, or call [`LoaderContext::defer`] to get a [`DeferredToken`].
//! Deferred results are only observed when committed before `apply` returns;
//! the engine never suspends a chain.

mod builtin;
mod chain;
mod context;
mod pipeline;
mod registry;

pub use builtin::{
    identity_loader, null_loader, BannerLoader, IdentityLoader, JsonLoader, NullLoader, RawLoader,
    ReplaceLoader,
};
pub use chain::{LoaderChain, LoaderFilters, LoaderSpec};
pub use context::{DeferredError, DeferredToken, LoaderContext};
pub use pipeline::{parse_pipeline, LoaderRequest};
pub use registry::{LoaderRegistry, LOADER_SUFFIX};

use std::fmt;
use std::sync::Arc;

/// Result type for loader hooks.
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Error raised by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderError {
    message: String,
}

impl LoaderError {
    /// Create a loader error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LoaderError {}

impl From<String> for LoaderError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for LoaderError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// What a loader hands back from [`Loader::apply`].
#[derive(Debug)]
pub enum Transformed {
    /// The transformed source, returned directly.
    Code(String),
    /// The result was already passed to [`LoaderContext::callback`].
    Committed,
    /// The loader called [`LoaderContext::defer`] and will commit through the token.
    Deferred(DeferredToken),
}

impl From<String> for Transformed {
    fn from(code: String) -> Self {
        Self::Code(code)
    }
}

impl From<&str> for Transformed {
    fn from(code: &str) -> Self {
        Self::Code(code.to_string())
    }
}

/// A source transform.
///
/// Implementations must be `Send + Sync`: a chain is built once per rule and
/// shared by every load that matches it.
pub trait Loader: Send + Sync {
    /// Loader name for diagnostics.
    fn name(&self) -> &str;

    /// Transform `source`.
    fn apply(&self, source: &str, ctx: &mut LoaderContext<'_>) -> LoaderResult<Transformed>;
}

/// A loader backed by a closure.
pub struct FnLoader<F> {
    name: String,
    f: F,
}

impl<F> Loader for FnLoader<F>
where
    F: Fn(&str, &mut LoaderContext<'_>) -> LoaderResult<Transformed> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, source: &str, ctx: &mut LoaderContext<'_>) -> LoaderResult<Transformed> {
        (self.f)(source, ctx)
    }
}

/// Wrap a closure that sees the loader context.
pub fn loader_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn Loader>
where
    F: Fn(&str, &mut LoaderContext<'_>) -> LoaderResult<Transformed> + Send + Sync + 'static,
{
    Arc::new(FnLoader {
        name: name.into(),
        f,
    })
}

/// Wrap a pure, infallible text function.
pub fn map_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn Loader>
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    loader_fn(name, move |source: &str, _ctx: &mut LoaderContext<'_>| {
        Ok(Transformed::Code(f(source)))
    })
}
