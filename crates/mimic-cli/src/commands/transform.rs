use super::{print_json, Project};
use miette::{IntoDiagnostic, Result};
use mimic_util::fs::read_source;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize)]
struct TransformReport {
    path: PathBuf,
    rule: Option<String>,
    loaders: Vec<String>,
    output: String,
}

/// Run the first matching rule's chain over `file`.
///
/// A file no rule matches is printed unchanged.
pub fn run(cwd: &Path, config: Option<&Path>, file: &Path, json: bool) -> Result<()> {
    let project = Project::load(cwd, config)?;
    let mimic = project.engine()?;

    let path = project.path(file);
    let source = read_source(&path).into_diagnostic()?;

    let compiled = mimic.match_rule(&path);
    let output = match compiled {
        Some(compiled) => compiled
            .chain()
            .run_for(&source, Some(&path), mimic.config())
            .into_diagnostic()?,
        None => {
            info!(path = %path.display(), "no rule matches; output is the source as is");
            source
        }
    };

    if json {
        return print_json(&TransformReport {
            rule: compiled.map(|c| c.rule().pattern().to_string()),
            loaders: compiled
                .map(|c| c.chain().names().to_vec())
                .unwrap_or_default(),
            path,
            output,
        });
    }
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
