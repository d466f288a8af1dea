use anyhow::{Context, Result};
use changelog_keeper::{
    ChangeCategory, Changelog, ChangelogKeeper, KeeperConfig, Operation, Request,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clkpr")]
#[command(version, about = "command line utility for keeping your changelog tidy", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// path to the CHANGELOG file read and written by the operation
    /// (defaults to the configured file name, CHANGELOG.md)
    #[arg(short, long, global = true, value_name = "PATH")]
    file: Option<PathBuf>,

    /// output format (json or human)
    #[arg(long, default_value = "human", global = true)]
    format: OutputFormat,

    /// print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Json,
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!(
                "invalid output format: {}, use 'json' or 'human'",
                s
            )),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// generate a new CHANGELOG file
    Create,

    /// add a new entry to the unreleased version
    Add {
        /// case insensitive: added, changed, deprecated, fixed, removed, security
        #[arg(value_name = "CATEGORY")]
        category: ChangeCategory,

        /// message to be inserted, line breaks make a multi-line entry
        #[arg(value_name = "ENTRY")]
        entry: String,
    },

    /// validate the CHANGELOG file and fix displaced entries
    Check,

    /// release the unreleased version
    Release {
        /// version name to be released, must not be present in the changelog yet
        #[arg(value_name = "VERSION")]
        version: String,

        /// reference URL in the repository, makes the version heading a link
        #[arg(short, long = "ref", alias = "reference", value_name = "REFNAME")]
        reference: Option<String>,
    },

    /// yank an already released version
    Yank {
        /// version name or reference to be yanked
        #[arg(value_name = "VERSION")]
        version: String,
    },
}

impl From<Commands> for Operation {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Create => Operation::Create,
            Commands::Add { category, entry } => Operation::Add { category, entry },
            Commands::Check => Operation::Check,
            Commands::Release { version, reference } => Operation::Release { version, reference },
            Commands::Yank { version } => Operation::Yank { version },
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "operation failed");
            let code = err
                .downcast_ref::<changelog_keeper::Error>()
                .map(|e| e.exit_code())
                .unwrap_or(1);
            eprintln!("ERROR: {}", err);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = KeeperConfig::load_or_default(".")?;
    init_logging(cli.verbose, config.log_filter.as_deref());

    let file = cli
        .file
        .clone()
        .unwrap_or_else(|| config.changelog.default_path());
    let request = Request::new(Operation::from(cli.command), file);

    let keeper = ChangelogKeeper::new(config.changelog);
    let changelog = keeper.run(&request)?;

    print_summary(&request, &changelog, &cli.format)
}

fn init_logging(verbose: bool, configured: Option<&str>) {
    let fallback = if verbose {
        "debug"
    } else {
        configured.unwrap_or("warn")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_summary(request: &Request, changelog: &Changelog, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "operation": request.operation.to_string(),
                "file": request.file,
                "changelog": changelog.summary(),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("failed to encode summary")?
            );
        }
        OutputFormat::Human => {
            println!("{}: {}", request.operation, request.file.display());
            for version in changelog.summary().versions {
                let date = version
                    .release_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let entries: usize = version.entries.values().sum();
                println!(
                    "  {} [{}] {} ({} entries)",
                    version.name, version.phase, date, entries
                );
            }
        }
    }
    Ok(())
}
