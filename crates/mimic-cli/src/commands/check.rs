use super::{print_json, Project};
use miette::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct CheckReport {
    ok: bool,
    config: Option<PathBuf>,
    extensions: Vec<String>,
    aliases: usize,
    rules: Vec<RuleReport>,
}

#[derive(Serialize)]
struct RuleReport {
    test: String,
    loaders: Vec<String>,
}

/// Build every chain. Any configuration error fails the command.
pub fn run(cwd: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let project = Project::load(cwd, config)?;
    let mimic = project.engine()?;

    let report = CheckReport {
        ok: true,
        config: project.config_path.clone(),
        extensions: project.options.extensions().to_vec(),
        aliases: project.options.aliases().len(),
        rules: mimic
            .rules()
            .iter()
            .map(|compiled| RuleReport {
                test: compiled.rule().pattern().to_string(),
                loaders: compiled.chain().names().to_vec(),
            })
            .collect(),
    };

    if json {
        return print_json(&report);
    }

    match &report.config {
        Some(path) => println!("config: {}", path.display()),
        None => println!("config: (defaults)"),
    }
    println!("aliases: {}", report.aliases);
    if !report.extensions.is_empty() {
        println!("extensions: {}", report.extensions.join(" "));
    }
    if report.rules.is_empty() {
        println!("rules: none");
    }
    for rule in &report.rules {
        println!("  /{}/ -> {}", rule.test, rule.loaders.join(" ! "));
    }
    Ok(())
}
