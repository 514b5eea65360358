use super::{print_json, Project};
use miette::{IntoDiagnostic, Result};
use mimic_core::{InterceptionRegistry, ModuleRequest};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct RequireReport {
    specifier: String,
    path: PathBuf,
    source: String,
}

/// Full round trip: install, require, uninstall.
pub fn run(
    cwd: &Path,
    config: Option<&Path>,
    specifier: &str,
    from: Option<&Path>,
    json: bool,
) -> Result<()> {
    let project = Project::load(cwd, config)?;
    let mut mimic = project.engine()?;
    let parent = from.map_or_else(|| project.cwd.clone(), |p| project.path(p));

    let registry = InterceptionRegistry::global();
    mimic.install(registry);
    let loaded = registry.require(&ModuleRequest::new(specifier, parent));
    mimic.uninstall();
    let module = loaded.into_diagnostic()?;

    if json {
        return print_json(&RequireReport {
            specifier: specifier.to_string(),
            path: module.path,
            source: module.source,
        });
    }
    print!("{}", module.source);
    if !module.source.ends_with('\n') {
        println!();
    }
    Ok(())
}
