//! Command handler for the tarp CLI.
//!
//! The handler returns its output as a `String`, making it easy to test
//! without capturing stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::assemble::ReportAssembler;
use crate::funcs::GoFuncExtractor;
use crate::ingest;
use crate::report::{HtmlFormatter, ReportFormatter, TextFormatter};
use crate::resolve::{GoListResolver, PathResolver, Resolver};
use crate::source::DiskReader;

/// Output style for the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Style {
    Html,
    Text,
}

/// How coverage units are mapped to packages and source files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ResolverKind {
    /// Ask the Go toolchain (`go list`).
    Go,
    /// Strip `--module` and look under `--root`.
    Path,
}

#[derive(Clone, Debug)]
pub struct ReportOptions {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub style: Style,
    pub resolver: ResolverKind,
    pub root: PathBuf,
    pub module: Option<String>,
}

pub fn cmd_report(opts: &ReportOptions) -> Result<String> {
    let profiles = ingest::read_profiles(&opts.inputs).context("Open and merge")?;

    let resolver: Box<dyn Resolver> = match opts.resolver {
        ResolverKind::Go => Box::new(
            GoListResolver::load(profiles.iter().map(|p| p.file_name.as_str()))
                .context("Find packages")?,
        ),
        ResolverKind::Path => Box::new(PathResolver::new(&opts.root, opts.module.clone())),
    };

    let report = ReportAssembler::new(resolver.as_ref(), &GoFuncExtractor, &DiskReader)
        .assemble(&profiles)
        .context("Build report")?;

    match opts.style {
        Style::Text => Ok(TextFormatter.format(&report)),
        Style::Html => {
            let html = HtmlFormatter.format(&report);
            std::fs::write(&opts.output, html)
                .with_context(|| format!("Failed to write {}", opts.output.display()))?;
            Ok(format!(
                "Wrote {} ({:.1}% of statements covered)\n",
                opts.output.display(),
                report.coverage_percent()
            ))
        }
    }
}
