use super::{LoaderError, LoaderResult, Transformed};
use crate::config::BundlerConfig;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use thiserror::Error;
use tracing::warn;

/// One-shot result slot shared between a step and its deferred token.
#[derive(Debug, Default)]
enum SlotState {
    #[default]
    Empty,
    Filled(LoaderResult<String>),
    /// The step has finished; late commits are rejected.
    Closed,
}

type Slot = Arc<Mutex<SlotState>>;

fn lock(slot: &Slot) -> MutexGuard<'_, SlotState> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Why a deferred commit was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeferredError {
    #[error("the chain step already finished; deferred results must be committed before the loader returns")]
    Expired,

    #[error("a result was already committed for this step")]
    AlreadyCommitted,
}

/// Per-step execution context handed to [`super::Loader::apply`].
///
/// Created fresh for every loader invocation and discarded afterwards.
pub struct LoaderContext<'a> {
    loaders: &'a [String],
    index: usize,
    query: &'a str,
    resource: Option<&'a Path>,
    config: &'a Arc<BundlerConfig>,
    slot: Slot,
}

/// Config seen by chains run outside an engine.
pub(crate) fn empty_config() -> &'static Arc<BundlerConfig> {
    static EMPTY: OnceLock<Arc<BundlerConfig>> = OnceLock::new();
    EMPTY.get_or_init(Arc::default)
}

impl<'a> LoaderContext<'a> {
    pub(crate) fn new(
        loaders: &'a [String],
        index: usize,
        query: &'a str,
        resource: Option<&'a Path>,
        config: &'a Arc<BundlerConfig>,
    ) -> Self {
        Self {
            loaders,
            index,
            query,
            resource,
            config,
            slot: Slot::default(),
        }
    }

    /// Cacheability hint. Results are never cached, so this does nothing.
    pub fn cacheable(&mut self, _flag: bool) {}

    /// Names of every loader in the chain, in declaration order.
    #[must_use]
    pub fn loaders(&self) -> &[String] {
        self.loaders
    }

    /// Position of the running loader within [`Self::loaders`].
    #[must_use]
    pub fn loader_index(&self) -> usize {
        self.index
    }

    /// The file being transformed, when the chain runs for a module load.
    #[must_use]
    pub fn resource(&self) -> Option<&Path> {
        self.resource
    }

    /// Raw query given after `?` in a pipeline string (empty when absent).
    #[must_use]
    pub fn query(&self) -> &str {
        self.query
    }

    /// Query parsed into an object.
    ///
    /// `?{"a":1}` is read as JSON. Otherwise the query is form-encoded:
    /// `key=value` yields a string, a bare `flag` yields `true`, `-flag` yields
    /// `false` and `+flag` yields `true`.
    #[must_use]
    pub fn query_options(&self) -> Map<String, Value> {
        parse_query(self.query)
    }

    /// The bundler configuration of the engine running this chain.
    ///
    /// Shared by every loader; empty when the chain runs on its own.
    #[must_use]
    pub fn config(&self) -> &Arc<BundlerConfig> {
        self.config
    }

    /// Commit the step's result through the one-shot callback.
    ///
    /// Returns [`Transformed::Committed`] so a loader can write
    /// `return Ok(ctx.callback(Ok(code)))`. A committed value takes
    /// precedence over whatever `apply` returns.
    pub fn callback(&mut self, result: LoaderResult<String>) -> Transformed {
        let mut state = lock(&self.slot);
        match *state {
            SlotState::Empty => *state = SlotState::Filled(result),
            _ => warn!(
                loader_index = self.index,
                "loader committed more than once; keeping the first result"
            ),
        }
        Transformed::Committed
    }

    /// Signal that the result will be committed later through the returned token.
    ///
    /// Deferred loaders are not scheduled: the chain does not wait. Only a
    /// commit made before `apply` returns is observed.
    pub fn defer(&mut self) -> DeferredToken {
        warn!(
            loader_index = self.index,
            loader = self.loaders.get(self.index).map_or("", String::as_str),
            "mimic does not support deferred loaders; only a result committed before the loader returns is used"
        );
        DeferredToken {
            slot: Arc::clone(&self.slot),
        }
    }

    /// Close the slot and take whatever was committed.
    pub(crate) fn finish(self) -> Option<LoaderResult<String>> {
        let mut state = lock(&self.slot);
        match std::mem::replace(&mut *state, SlotState::Closed) {
            SlotState::Filled(result) => Some(result),
            SlotState::Empty | SlotState::Closed => None,
        }
    }
}

/// Handle for committing a deferred loader result.
#[derive(Debug)]
pub struct DeferredToken {
    slot: Slot,
}

impl DeferredToken {
    /// Commit the deferred result.
    ///
    /// Fails with [`DeferredError::Expired`] when the step has already
    /// finished; the result is then dropped and a warning is logged.
    pub fn commit(self, result: LoaderResult<String>) -> Result<(), DeferredError> {
        let mut state = lock(&self.slot);
        match *state {
            SlotState::Empty => {
                *state = SlotState::Filled(result);
                Ok(())
            }
            SlotState::Filled(_) => Err(DeferredError::AlreadyCommitted),
            SlotState::Closed => {
                warn!("deferred loader result arrived after its chain step finished; dropping it");
                Err(DeferredError::Expired)
            }
        }
    }

    /// Commit a successful result.
    pub fn resolve(self, code: impl Into<String>) -> Result<(), DeferredError> {
        self.commit(Ok(code.into()))
    }

    /// Commit a failure.
    pub fn reject(self, error: impl Into<LoaderError>) -> Result<(), DeferredError> {
        self.commit(Err(error.into()))
    }
}

fn parse_query(query: &str) -> Map<String, Value> {
    let query = query.trim_start_matches('?');
    if query.starts_with('{') {
        if let Ok(Value::Object(map)) = serde_json::from_str(query) {
            return map;
        }
    }

    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        if value.is_empty() {
            if let Some(flag) = key.strip_prefix('-') {
                map.insert(flag.to_string(), Value::Bool(false));
            } else {
                // a literal `+` arrives form-decoded as a space
                let flag = key.trim_start_matches([' ', '+']);
                map.insert(flag.to_string(), Value::Bool(true));
            }
        } else {
            map.insert(key.into_owned(), Value::String(value.into_owned()));
        }
    }
    map
}
