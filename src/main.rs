mod aspect;
mod display;
mod error;
mod files;
mod header;
mod processor;
mod scanner;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use aspect::AspectRatio;
use display::{write_json, write_summary};
use files::collect_files;
use processor::{process_files, FileFailure, Options, RunReport};

#[derive(Parser, Debug)]
#[command(name = "aspectfix")]
#[command(version, about = "Rewrite the aspect ratio of 720x576 MPEG video sequence headers")]
pub struct Cli {
    /// File, directory (searched recursively) or <dir>/<regex> of file names
    pub target: PathBuf,

    /// Aspect ratio to write: 1:1, 4:3 or 16:9
    pub ratio: String,

    /// Report what would change without writing
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging and show changed header bytes
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validate the ratio, then patch every file the target resolves to.
///
/// Per-file progress lines go to `progress`; entries that could not be read
/// while resolving the target are reported as failures.
fn run(cli: &Cli, progress: &mut dyn Write) -> error::Result<RunReport> {
    let ratio: AspectRatio = cli.ratio.parse()?;
    let found = collect_files(&cli.target)?;
    tracing::info!(
        "Setting aspect ratio {} on {} files{}",
        ratio,
        found.files.len(),
        if cli.dry_run { " (dry run)" } else { "" }
    );

    let options = Options {
        ratio,
        dry_run: cli.dry_run,
        show_headers: cli.verbose && !cli.json,
    };
    let mut report = process_files(&found.files, &options, progress);
    report
        .failures
        .extend(found.errors.iter().map(FileFailure::from_error));
    Ok(report)
}

/// Where per-file progress lines go: nowhere when stdout carries JSON
fn progress_writer<'a, W: Write>(cli: &Cli, stdout: &'a mut W) -> Box<dyn Write + 'a> {
    if cli.json {
        Box::new(io::sink())
    } else {
        Box::new(stdout)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the level
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "aspectfix=trace".to_string()
        } else {
            "aspectfix=info".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_writer(std::io::stderr)
        .init();

    let mut stdout = io::stdout();
    let result = run(&cli, &mut progress_writer(&cli, &mut stdout));
    let report = match result {
        Ok(report) => report,
        Err(e) if e.is_configuration() => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("cannot process {}", cli.target.display()))
        }
    };

    if cli.json {
        write_json(&mut stdout, &report).context("failed to write report")?;
    } else {
        write_summary(&mut stdout, &report).context("failed to write summary")?;
    }

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
