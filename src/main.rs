use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tarp::cli::{self, ReportOptions, ResolverKind, Style};

/// tarp: interactive HTML coverage reports for Go coverage profiles.
#[derive(Parser)]
#[command(name = "tarp", version, about)]
struct Cli {
    /// Coverage profiles to merge into one report.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// The generated coverage report.
    #[arg(short, long, default_value = "./coverage.html")]
    output: PathBuf,

    /// Output style; `text` prints the package tree instead of writing HTML.
    #[arg(long, value_enum, default_value_t = Style::Html)]
    format: Style,

    /// How units are mapped to packages and source files.
    #[arg(long, value_enum, default_value_t = ResolverKind::Go)]
    resolver: ResolverKind,

    /// Source root for the `path` resolver.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Module prefix stripped from units by the `path` resolver.
    #[arg(long)]
    module: Option<String>,

    /// Log progress to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("tarp=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let opts = ReportOptions {
        inputs: cli.files,
        output: cli.output,
        style: cli.format,
        resolver: cli.resolver,
        root: cli.root,
        module: cli.module,
    };
    print!("{}", cli::cmd_report(&opts)?);
    Ok(())
}
