//! Specifier and path string helpers.
//!
//! These work on `/`-separated specifier strings rather than `std::path::Path`
//! so that results are identical on every platform.

/// Separator used in module specifiers.
pub const SEPARATOR: char = '/';

/// Return the extension of the last segment of `spec`, including the dot.
///
/// Follows the usual "extname" rules: a leading dot does not start an
/// extension (`.eslintrc` has none), and a trailing dot is an extension of
/// its own (`index.` yields `"."`).
#[must_use]
pub fn extname(spec: &str) -> &str {
    let base = spec.rsplit(SEPARATOR).next().unwrap_or(spec);
    let trimmed = base.trim_start_matches('.');
    let leading = base.len() - trimmed.len();
    match trimmed.rfind('.') {
        Some(idx) => &base[leading + idx..],
        None => "",
    }
}

/// Returns true if the last segment of `spec` carries a file extension.
#[must_use]
pub fn has_extension(spec: &str) -> bool {
    !extname(spec).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extname_simple() {
        assert_eq!(extname("bar.js"), ".js");
        assert_eq!(extname("lib/bar.reverse"), ".reverse");
        assert_eq!(extname("a/b.c/d.tar.gz"), ".gz");
    }

    #[test]
    fn test_extname_none() {
        assert_eq!(extname("bar"), "");
        assert_eq!(extname("a.b/bar"), "");
        assert_eq!(extname(".eslintrc"), "");
        assert_eq!(extname(""), "");
    }

    #[test]
    fn test_extname_trailing_dot() {
        assert_eq!(extname("index."), ".");
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("bar.js"));
        assert!(!has_extension("./src/components"));
    }
}
