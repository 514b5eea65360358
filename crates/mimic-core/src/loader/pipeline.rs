//! Parser for string-encoded loader pipelines.
//!
//! Grammar:
//!
//! ```text
//! pipeline := request ( "!" request )*
//! request  := name ( "?" query )?
//! ```
//!
//! Names are trimmed; an empty name anywhere in the pipeline is an error.
//! The query is everything after the first `?` of a request, so queries may
//! themselves contain `?` or `=`, but never `!`.

use crate::error::{Error, Result};

/// One `name?query` element of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderRequest {
    /// Loader name as written (before `-loader` suffix resolution).
    pub name: String,
    /// Query string without the leading `?`.
    pub query: String,
}

impl LoaderRequest {
    /// Create a request without a query.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: String::new(),
        }
    }

    /// Set the query.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }
}

/// Parse `name[?query]!name[?query]...` into its requests, in declaration order.
pub fn parse_pipeline(pipeline: &str) -> Result<Vec<LoaderRequest>> {
    let invalid = |reason: String| Error::InvalidPipeline {
        pipeline: pipeline.to_string(),
        reason,
    };

    if pipeline.trim().is_empty() {
        return Err(invalid("pipeline is empty".to_string()));
    }

    pipeline
        .split('!')
        .enumerate()
        .map(|(position, token)| {
            let (name, query) = match token.split_once('?') {
                Some((name, query)) => (name.trim(), query),
                None => (token.trim(), ""),
            };
            if name.is_empty() {
                return Err(invalid(format!("empty loader name at position {position}")));
            }
            Ok(LoaderRequest::new(name).with_query(query))
        })
        .collect()
}
