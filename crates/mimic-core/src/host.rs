//! Host module system interface and a filesystem-backed reference host.
//!
//! The host owns resolution of (already aliased) specifiers to files, raw
//! file reading, and the "compile this text as the module at this path"
//! primitive. The engine never touches the filesystem except through it.

use crate::error::{Error, Result};
use mimic_util::fs::{is_file, read_source};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::trace;

/// A module load request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequest {
    /// The specifier as requested.
    pub specifier: String,
    /// File (or directory) of the requesting module.
    pub parent: PathBuf,
}

impl ModuleRequest {
    /// Create a request from a requesting module's path.
    pub fn new(specifier: impl Into<String>, parent: impl Into<PathBuf>) -> Self {
        Self {
            specifier: specifier.into(),
            parent: parent.into(),
        }
    }

    /// Same requester, different specifier.
    #[must_use]
    pub fn with_specifier(&self, specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            parent: self.parent.clone(),
        }
    }

    /// Directory relative specifiers resolve against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        if self.parent.is_dir() {
            &self.parent
        } else {
            self.parent.parent().unwrap_or(Path::new("."))
        }
    }
}

/// A compiled module as handed back to the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
    /// Resolved file path.
    pub path: PathBuf,
    /// Final executable source text.
    pub source: String,
}

/// The host module system the engine plugs into.
pub trait ModuleHost: Send + Sync {
    /// Resolve a request to a file, probing `extensions` in order and
    /// searching `search_paths` for bare specifiers.
    fn resolve(
        &self,
        request: &ModuleRequest,
        extensions: &[String],
        search_paths: &[PathBuf],
    ) -> Result<PathBuf>;

    /// Read a file's raw text.
    fn read_source(&self, path: &Path) -> Result<String>;

    /// Compile text as the module at `path`.
    fn compile(&self, source: String, path: &Path) -> Result<LoadedModule>;

    /// Previously compiled module for `path`.
    fn cached(&self, _path: &Path) -> Option<LoadedModule> {
        None
    }
}

/// Minimal package.json structure for directory resolution.
#[derive(Debug, Deserialize, Default)]
struct PackageJson {
    main: Option<String>,
}

/// Filesystem host.
///
/// Supports relative, absolute and bare specifiers (`node_modules` lookup
/// walking up from the requester, then the search paths), extension probing,
/// `index.*` and `package.json` `main`. Compiled modules are cached by path.
#[derive(Debug, Default)]
pub struct FsModuleHost {
    cache: RwLock<HashMap<PathBuf, LoadedModule>>,
}

impl FsModuleHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a compiled module from the cache. Returns true if it was cached.
    pub fn evict(&self, path: &Path) -> bool {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some()
    }

    /// Drop every compiled module.
    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn is_relative(spec: &str) -> bool {
        spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../")
    }

    /// Try `path` as a file, then with each extension appended.
    fn find_file(path: &Path, extensions: &[String]) -> Option<PathBuf> {
        if is_file(path) {
            return Some(path.to_path_buf());
        }
        extensions.iter().find_map(|ext| {
            let mut appended = path.as_os_str().to_owned();
            appended.push(ext);
            let candidate = PathBuf::from(appended);
            is_file(&candidate).then_some(candidate)
        })
    }

    /// Try `dir/package.json` main, then `dir/index.*`.
    fn find_in_directory(dir: &Path, extensions: &[String]) -> Option<PathBuf> {
        if !dir.is_dir() {
            return None;
        }
        let main = std::fs::read_to_string(dir.join("package.json"))
            .ok()
            .and_then(|text| serde_json::from_str::<PackageJson>(&text).ok())
            .and_then(|pkg| pkg.main);
        if let Some(main) = main {
            let target = dir.join(main);
            if let Some(found) = Self::find_file(&target, extensions)
                .or_else(|| Self::find_file(&target.join("index"), extensions))
            {
                return Some(found);
            }
        }
        Self::find_file(&dir.join("index"), extensions)
    }

    fn find(path: &Path, extensions: &[String]) -> Option<PathBuf> {
        Self::find_file(path, extensions).or_else(|| Self::find_in_directory(path, extensions))
    }

    fn canonical(path: PathBuf) -> PathBuf {
        dunce::canonicalize(&path).unwrap_or(path)
    }
}

impl ModuleHost for FsModuleHost {
    fn resolve(
        &self,
        request: &ModuleRequest,
        extensions: &[String],
        search_paths: &[PathBuf],
    ) -> Result<PathBuf> {
        let spec = request.specifier.as_str();
        let not_found = || Error::ModuleNotFound {
            specifier: spec.to_string(),
            parent: request.parent.clone(),
        };
        if spec.is_empty() {
            return Err(not_found());
        }

        let found = if Self::is_relative(spec) {
            Self::find(&request.base_dir().join(spec), extensions)
        } else if Path::new(spec).is_absolute() {
            Self::find(Path::new(spec), extensions)
        } else {
            request
                .base_dir()
                .ancestors()
                .map(|dir| dir.join("node_modules"))
                .chain(search_paths.iter().cloned())
                .find_map(|dir| Self::find(&dir.join(spec), extensions))
        };

        let path = found.map(Self::canonical).ok_or_else(not_found)?;
        trace!(specifier = spec, path = %path.display(), "resolved module");
        Ok(path)
    }

    fn read_source(&self, path: &Path) -> Result<String> {
        Ok(read_source(path)?)
    }

    fn compile(&self, source: String, path: &Path) -> Result<LoadedModule> {
        let module = LoadedModule {
            path: path.to_path_buf(),
            source,
        };
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(module.path.clone(), module.clone());
        Ok(module)
    }

    fn cached(&self, path: &Path) -> Option<LoadedModule> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn canonical(path: &Path) -> PathBuf {
        dunce::canonicalize(path).unwrap()
    }

    #[test]
    fn test_relative_extension_probing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("foo.bar"), "x").unwrap();

        let host = FsModuleHost::new();
        let request = ModuleRequest::new("./foo", dir.path());
        assert!(host.resolve(&request, &exts(&[".js"]), &[]).is_err());

        let path = host
            .resolve(&request, &exts(&[".js", ".bar"]), &[])
            .unwrap();
        assert_eq!(path, canonical(&dir.path().join("foo.bar")));
    }

    #[test]
    fn test_parent_file_uses_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::write(dir.path().join("b.js"), "").unwrap();

        let host = FsModuleHost::new();
        let request = ModuleRequest::new("./b", dir.path().join("a.js"));
        let path = host.resolve(&request, &exts(&[".js"]), &[]).unwrap();
        assert_eq!(path, canonical(&dir.path().join("b.js")));
    }

    #[test]
    fn test_directory_index_and_main() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/index.js"), "").unwrap();
        fs::create_dir_all(dir.path().join("pkg/dist")).unwrap();
        fs::write(dir.path().join("pkg/package.json"), r#"{"main":"dist/entry"}"#).unwrap();
        fs::write(dir.path().join("pkg/dist/entry.js"), "").unwrap();

        let host = FsModuleHost::new();
        let js = exts(&[".js"]);
        let lib = host
            .resolve(&ModuleRequest::new("./lib", dir.path()), &js, &[])
            .unwrap();
        assert_eq!(lib, canonical(&dir.path().join("lib/index.js")));
        let pkg = host
            .resolve(&ModuleRequest::new("./pkg", dir.path()), &js, &[])
            .unwrap();
        assert_eq!(pkg, canonical(&dir.path().join("pkg/dist/entry.js")));
    }

    #[test]
    fn test_bare_specifier_node_modules_then_search_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/dep")).unwrap();
        fs::write(dir.path().join("node_modules/dep/index.js"), "").unwrap();
        fs::create_dir_all(dir.path().join("roots/shared")).unwrap();
        fs::write(dir.path().join("roots/shared/util.js"), "").unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();

        let host = FsModuleHost::new();
        let js = exts(&[".js"]);
        let from = dir.path().join("src");

        let dep = host
            .resolve(&ModuleRequest::new("dep", &from), &js, &[])
            .unwrap();
        assert_eq!(dep, canonical(&dir.path().join("node_modules/dep/index.js")));

        let request = ModuleRequest::new("shared/util", &from);
        assert!(host.resolve(&request, &js, &[]).is_err());
        let util = host
            .resolve(&request, &js, &[dir.path().join("roots")])
            .unwrap();
        assert_eq!(util, canonical(&dir.path().join("roots/shared/util.js")));
    }

    #[test]
    fn test_not_found_error() {
        let host = FsModuleHost::new();
        let err = host
            .resolve(&ModuleRequest::new("nope", "/"), &exts(&[".js"]), &[])
            .unwrap_err();
        assert!(matches!(err, Error::ModuleNotFound { ref specifier, .. } if specifier == "nope"));
    }

    #[test]
    fn test_compile_caches_and_evicts() {
        let host = FsModuleHost::new();
        let path = Path::new("/virtual/a.js");
        assert!(host.cached(path).is_none());

        let module = host.compile("x".to_string(), path).unwrap();
        assert_eq!(host.cached(path), Some(module));
        assert!(host.evict(path));
        assert!(host.cached(path).is_none());
        assert!(!host.evict(path));
    }
}
