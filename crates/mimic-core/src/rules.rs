//! Transform rules and first-match rule lookup.

use crate::error::{Error, Result};
use crate::loader::LoaderSpec;
use regex_lite::Regex;
use std::path::Path;

/// A `(test, loader)` pair: files whose resolved path matches `test` are
/// transformed by `loader`.
#[derive(Debug, Clone)]
pub struct Rule {
    test: Regex,
    loader: LoaderSpec,
}

impl Rule {
    /// Create a rule from a regex pattern.
    ///
    /// # Errors
    /// `Error::InvalidPattern` if the pattern does not compile.
    pub fn new(pattern: &str, loader: impl Into<LoaderSpec>) -> Result<Self> {
        let test = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self::with_regex(test, loader))
    }

    /// Create a rule from an already compiled regex.
    pub fn with_regex(test: Regex, loader: impl Into<LoaderSpec>) -> Self {
        Self {
            test,
            loader: loader.into(),
        }
    }

    /// The rule's pattern source.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.test.as_str()
    }

    #[must_use]
    pub fn loader(&self) -> &LoaderSpec {
        &self.loader
    }

    /// Test a resolved file path against this rule.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        self.test.is_match(&path.to_string_lossy())
    }
}

impl AsRef<Rule> for Rule {
    fn as_ref(&self) -> &Rule {
        self
    }
}

/// First rule whose pattern matches `path`, in configured order.
///
/// `None` means the host's default handling applies.
pub fn match_rule<'r, R: AsRef<Rule>>(path: &Path, rules: &'r [R]) -> Option<&'r R> {
    rules.iter().find(|rule| rule.as_ref().matches(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<Rule> {
        vec![
            Rule::new(r"\.reverse$", "reverse").unwrap(),
            Rule::new(r"\.(txt|md)$", "raw").unwrap(),
            Rule::new(r"\.txt$", "never").unwrap(),
        ]
    }

    #[test]
    fn test_first_match_wins() {
        let rules = rules();
        let rule = match_rule(Path::new("/p/notes.txt"), &rules).unwrap();
        assert_eq!(rule.pattern(), r"\.(txt|md)$");
    }

    #[test]
    fn test_no_match() {
        let rules = rules();
        assert!(match_rule(Path::new("/p/index.js"), &rules).is_none());
        assert!(match_rule(Path::new("/p/x.js"), &Vec::<Rule>::new()).is_none());
    }

    #[test]
    fn test_unanchored_pattern_matches_anywhere() {
        let rule = Rule::new(".reverse", "reverse").unwrap();
        assert!(rule.matches(Path::new("/tmp/baz.reverse")));
        assert!(rule.matches(Path::new("/tmp/xreverse/a.js")));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Rule::new("(unclosed", "raw").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }
}
