#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mimic")]
#[command(author, version, about = "Bundler-style module interception for Node-like hosts", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Config file (defaults to mimic.json in the working directory)
    #[arg(long, global = true, value_name = "FILE", env = "MIMIC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Validate the config and build every rule's loader chain
    Check,

    /// Apply aliases and resolve a specifier to a file
    Resolve {
        /// Module specifier
        specifier: String,

        /// Requesting file or directory (defaults to the working directory)
        #[arg(long, value_name = "PATH")]
        from: Option<PathBuf>,
    },

    /// Run the matching loader chain over a file and print the result
    Transform {
        /// File to transform
        file: PathBuf,
    },

    /// Install, require a module, print its compiled source, uninstall
    Require {
        /// Module specifier
        specifier: String,

        /// Requesting file or directory (defaults to the working directory)
        #[arg(long, value_name = "PATH")]
        from: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    logging::init(cli.verbose, cli.json);

    let config = cli.config.as_deref();
    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Check) => commands::check::run(&cwd, config, cli.json),
        Some(Commands::Resolve { specifier, from }) => {
            commands::resolve::run(&cwd, config, &specifier, from.as_deref(), cli.json)
        }
        Some(Commands::Transform { file }) => {
            commands::transform::run(&cwd, config, &file, cli.json)
        }
        Some(Commands::Require { specifier, from }) => {
            commands::require::run(&cwd, config, &specifier, from.as_deref(), cli.json)
        }
    }
}
