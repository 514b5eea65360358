//! Built-in loaders.
//!
//! `identity-loader` and `null-loader` back the identity and allow-list
//! filters. The rest cover the common "turn this file into a module" cases so
//! that a configuration can be exercised without custom loaders.

use super::{Loader, LoaderContext, LoaderError, LoaderResult, Transformed};
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Passes source through unchanged.
pub struct IdentityLoader;

impl Loader for IdentityLoader {
    fn name(&self) -> &str {
        "identity-loader"
    }

    fn apply(&self, source: &str, _ctx: &mut LoaderContext<'_>) -> LoaderResult<Transformed> {
        Ok(Transformed::Code(source.to_string()))
    }
}

/// Discards source, producing an empty module.
pub struct NullLoader;

impl Loader for NullLoader {
    fn name(&self) -> &str {
        "null-loader"
    }

    fn apply(&self, _source: &str, _ctx: &mut LoaderContext<'_>) -> LoaderResult<Transformed> {
        Ok(Transformed::Code(String::new()))
    }
}

/// Shared identity loader instance.
pub fn identity_loader() -> Arc<dyn Loader> {
    static LOADER: OnceLock<Arc<dyn Loader>> = OnceLock::new();
    Arc::clone(LOADER.get_or_init(|| Arc::new(IdentityLoader)))
}

/// Shared null loader instance.
pub fn null_loader() -> Arc<dyn Loader> {
    static LOADER: OnceLock<Arc<dyn Loader>> = OnceLock::new();
    Arc::clone(LOADER.get_or_init(|| Arc::new(NullLoader)))
}

/// Exports the source text as a string.
pub struct RawLoader;

impl Loader for RawLoader {
    fn name(&self) -> &str {
        "raw-loader"
    }

    fn apply(&self, source: &str, _ctx: &mut LoaderContext<'_>) -> LoaderResult<Transformed> {
        let literal = Value::String(source.to_string()).to_string();
        Ok(Transformed::Code(format!("module.exports = {literal};")))
    }
}

/// Validates JSON and exports it as a value.
pub struct JsonLoader;

impl Loader for JsonLoader {
    fn name(&self) -> &str {
        "json-loader"
    }

    fn apply(&self, source: &str, _ctx: &mut LoaderContext<'_>) -> LoaderResult<Transformed> {
        let value: Value = serde_json::from_str(source)
            .map_err(|e| LoaderError::new(format!("invalid JSON: {e}")))?;
        Ok(Transformed::Code(format!("module.exports = {value};")))
    }
}

/// Wraps source with a banner and/or footer.
///
/// Options: `banner`, `footer` (`?banner=/*%20x%20*/`).
pub struct BannerLoader;

impl Loader for BannerLoader {
    fn name(&self) -> &str {
        "banner-loader"
    }

    fn apply(&self, source: &str, ctx: &mut LoaderContext<'_>) -> LoaderResult<Transformed> {
        let options = ctx.query_options();
        let banner = options.get("banner").and_then(Value::as_str);
        let footer = options.get("footer").and_then(Value::as_str);

        let mut result = String::with_capacity(source.len());
        if let Some(banner) = banner {
            result.push_str(banner);
            result.push('\n');
        }
        result.push_str(source);
        if let Some(footer) = footer {
            result.push('\n');
            result.push_str(footer);
        }
        Ok(Transformed::Code(result))
    }
}

/// Replaces literal text.
///
/// Either `?search=FOO&replace=BAR`, or a JSON map of replacements
/// (`?{"__DEV__":"false"}`). Non-string JSON values are inserted as written.
pub struct ReplaceLoader;

impl Loader for ReplaceLoader {
    fn name(&self) -> &str {
        "replace-loader"
    }

    fn apply(&self, source: &str, ctx: &mut LoaderContext<'_>) -> LoaderResult<Transformed> {
        let options = ctx.query_options();
        let mut replacements: Vec<(String, String)> = Vec::new();

        if let Some(search) = options.get("search").and_then(Value::as_str) {
            let replace = options
                .get("replace")
                .and_then(Value::as_str)
                .ok_or_else(|| LoaderError::new("`search` given without `replace`"))?;
            replacements.push((search.to_string(), replace.to_string()));
        } else {
            for (from, to) in &options {
                let to = match to {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                replacements.push((from.clone(), to));
            }
        }

        let mut result = source.to_string();
        for (from, to) in &replacements {
            if !from.is_empty() && result.contains(from.as_str()) {
                result = result.replace(from.as_str(), to);
            }
        }
        Ok(Transformed::Code(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::context::empty_config;

    fn run(loader: &dyn Loader, source: &str, query: &str) -> LoaderResult<String> {
        let names = vec![loader.name().to_string()];
        let mut ctx = LoaderContext::new(&names, 0, query, None, empty_config());
        match loader.apply(source, &mut ctx)? {
            Transformed::Code(code) => Ok(code),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_identity_and_null() {
        assert_eq!(run(&IdentityLoader, "abc", "").unwrap(), "abc");
        assert_eq!(run(&NullLoader, "abc", "").unwrap(), "");
    }

    #[test]
    fn test_raw_loader_escapes() {
        let code = run(&RawLoader, "say \"hi\"\n", "").unwrap();
        assert_eq!(code, r#"module.exports = "say \"hi\"\n";"#);
    }

    #[test]
    fn test_json_loader() {
        let code = run(&JsonLoader, r#"{ "key": "value" }"#, "").unwrap();
        assert_eq!(code, r#"module.exports = {"key":"value"};"#);

        let err = run(&JsonLoader, "{ nope", "").unwrap_err();
        assert!(err.message().starts_with("invalid JSON"));
    }

    #[test]
    fn test_banner_loader() {
        let code = run(
            &BannerLoader,
            "const x = 1;",
            "banner=%2F*%20Copyright%202024%20*%2F&footer=%2F*%20end%20*%2F",
        )
        .unwrap();
        assert!(code.starts_with("/* Copyright 2024 */\n"));
        assert!(code.ends_with("\n/* end */"));
    }

    #[test]
    fn test_banner_loader_no_options() {
        assert_eq!(run(&BannerLoader, "x", "").unwrap(), "x");
    }

    #[test]
    fn test_replace_loader_search() {
        let code = run(&ReplaceLoader, "if (__DEV__) {}", "search=__DEV__&replace=false").unwrap();
        assert_eq!(code, "if (false) {}");
    }

    #[test]
    fn test_replace_loader_json_map() {
        let code = run(
            &ReplaceLoader,
            "const env = process.env.NODE_ENV; const n = LIMIT;",
            r#"{"process.env.NODE_ENV":"\"production\"","LIMIT":10}"#,
        )
        .unwrap();
        assert_eq!(code, r#"const env = "production"; const n = 10;"#);
    }

    #[test]
    fn test_replace_loader_missing_replace() {
        assert!(run(&ReplaceLoader, "x", "search=x").is_err());
    }
}
