//! Specifier aliasing (`resolve.alias`).
//!
//! An alias rewrites the first `/`-separated segment of a specifier:
//!
//! - `{ foo: "bar" }`: `foo` → `bar`, `foo/fizz` → `bar/fizz`
//! - `{ foo: "bar.js" }`: `foo` and `foo/fizz` → `bar.js` (a target with an
//!   extension is a complete file, remaining segments are dropped)

use mimic_util::path::{has_extension, SEPARATOR};
use std::collections::HashMap;

/// Alias map: leading segment → replacement path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: HashMap<String, String>,
}

impl AliasMap {
    /// Create an empty alias map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an alias.
    #[must_use]
    pub fn alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.entries.insert(from.into(), to.into());
        self
    }

    /// Target for a leading segment, if aliased.
    #[must_use]
    pub fn get(&self, segment: &str) -> Option<&str> {
        self.entries.get(segment).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Rewrite `specifier` if its first segment is aliased.
    #[must_use]
    pub fn resolve(&self, specifier: &str) -> String {
        resolve_alias(specifier, self)
    }
}

impl From<HashMap<String, String>> for AliasMap {
    fn from(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AliasMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Rewrite `specifier` using `aliases`.
///
/// Absence of the first segment in the map is the only "no match" case; the
/// specifier is then returned unchanged.
#[must_use]
pub fn resolve_alias(specifier: &str, aliases: &AliasMap) -> String {
    let (first, rest) = match specifier.split_once(SEPARATOR) {
        Some((first, rest)) => (first, Some(rest)),
        None => (specifier, None),
    };

    let Some(target) = aliases.get(first) else {
        return specifier.to_string();
    };

    match rest {
        Some(rest) if !has_extension(target) => format!("{target}{SEPARATOR}{rest}"),
        _ => target.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name_alias() {
        let aliases = AliasMap::new().alias("foo", "bar");
        assert_eq!(aliases.resolve("foo"), "bar");
        assert_eq!(aliases.resolve("foo/fizz"), "bar/fizz");
        assert_eq!(aliases.resolve("foo/fizz/buzz.js"), "bar/fizz/buzz.js");
    }

    #[test]
    fn test_file_alias_drops_subpath() {
        let aliases = AliasMap::new().alias("foo", "bar.js");
        assert_eq!(aliases.resolve("foo"), "bar.js");
        assert_eq!(aliases.resolve("foo/fizz"), "bar.js");
    }

    #[test]
    fn test_directory_target() {
        let aliases = AliasMap::new().alias("@", "./src");
        assert_eq!(aliases.resolve("@/components/Button"), "./src/components/Button");
    }

    #[test]
    fn test_unaliased_is_unchanged() {
        let aliases = AliasMap::new().alias("foo", "bar");
        for spec in ["lodash", "./foo", "foobar/x", "fo", "", "/abs/foo"] {
            let once = aliases.resolve(spec);
            assert_eq!(once, spec);
            assert_eq!(aliases.resolve(&once), once);
        }
    }

    #[test]
    fn test_only_first_segment_is_looked_up() {
        let aliases = AliasMap::new().alias("foo", "bar");
        assert_eq!(aliases.resolve("lib/foo"), "lib/foo");
    }

    #[test]
    fn test_from_iter() {
        let aliases: AliasMap = [("a", "b")].into_iter().collect();
        assert_eq!(aliases.get("a"), Some("b"));
        assert_eq!(aliases.len(), 1);
    }
}
