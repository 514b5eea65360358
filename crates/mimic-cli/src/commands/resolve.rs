use super::{print_json, Project};
use miette::{IntoDiagnostic, Result};
use mimic_core::{InterceptionRegistry, ModuleRequest};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct ResolveReport {
    specifier: String,
    aliased: String,
    path: PathBuf,
}

/// Alias, then resolve with the engine's extensions and roots in effect.
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

    let aliased = mimic.resolve_alias(specifier);
    let request = ModuleRequest::new(aliased.clone(), parent);
    let resolved = registry.host().resolve(
        &request,
        &registry.extensions(),
        &registry.search_paths(),
    );
    mimic.uninstall();
    let path = resolved.into_diagnostic()?;

    let report = ResolveReport {
        specifier: specifier.to_string(),
        aliased,
        path,
    };
    if json {
        return print_json(&report);
    }
    if report.aliased != report.specifier {
        println!("{} -> {}", report.specifier, report.aliased);
    }
    println!("{}", report.path.display());
    Ok(())
}
