//! Building the coverage tree from merged profiles.
//!
//! Assembly is all-or-nothing: the first resolution, read, or annotation
//! failure aborts the whole report.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::annotate::{annotate, boundaries};
use crate::error::{Result, TarpError};
use crate::funcs::FunctionExtractor;
use crate::model::{Mode, Profile};
use crate::resolve::Resolver;
use crate::source::SourceReader;
use crate::tree::CoverageTree;

/// A finished, simplified coverage tree. Only shared access is handed out,
/// so the tree is read-only from here on.
#[derive(Debug, Clone)]
pub struct Report {
    tree: CoverageTree,
    generated_at: DateTime<Utc>,
}

impl Report {
    pub fn tree(&self) -> &CoverageTree {
        &self.tree
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Overall coverage percentage across every file.
    pub fn coverage_percent(&self) -> f64 {
        self.tree.node(self.tree.root()).coverage_percent()
    }
}

pub struct ReportAssembler<'a> {
    resolver: &'a dyn Resolver,
    extractor: &'a dyn FunctionExtractor,
    reader: &'a dyn SourceReader,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(
        resolver: &'a dyn Resolver,
        extractor: &'a dyn FunctionExtractor,
        reader: &'a dyn SourceReader,
    ) -> Self {
        Self {
            resolver,
            extractor,
            reader,
        }
    }

    pub fn assemble(&self, profiles: &[Profile]) -> Result<Report> {
        let mut tree = CoverageTree::new();

        let mut packages = BTreeSet::new();
        for profile in profiles {
            packages.insert(self.resolver.resolve_unit(&profile.file_name)?);
        }
        for pkg in &packages {
            let node = tree.make_node(pkg);
            tree.mark_package(node);
        }
        tracing::debug!(packages = packages.len(), "marked package nodes");

        for profile in profiles {
            self.add_file(&mut tree, profile)?;
        }

        tree.simplify();
        let report = Report {
            tree,
            generated_at: Utc::now(),
        };
        tracing::info!(
            files = profiles.len(),
            coverage = report.coverage_percent(),
            "assembled coverage report"
        );
        Ok(report)
    }

    fn add_file(&self, tree: &mut CoverageTree, profile: &Profile) -> Result<()> {
        let unit = &profile.file_name;
        let file = self.resolver.find_file(unit)?;
        let src = self.reader.read(&file)?;
        if let Err(e) = std::str::from_utf8(&src) {
            return Err(TarpError::Encoding {
                path: file,
                offset: e.valid_up_to(),
            });
        }
        let funcs = self.extractor.extract_functions(&file, &src)?;

        let node = tree.make_node(unit);
        tree.mark_file(node, profile.mode == Mode::Set);
        for func in &funcs {
            let (covered, total) = func.coverage(profile);
            tree.fold(node, covered, total);
        }

        let body = annotate(&src, &boundaries(profile, &src)).map_err(|e| match e {
            TarpError::AnnotationConsistency(msg) => {
                TarpError::AnnotationConsistency(format!("{unit}: {msg}"))
            }
            other => other,
        })?;
        tree.set_body(node, body);

        let n = tree.node(node);
        tracing::debug!(
            unit = %unit,
            funcs = funcs.len(),
            covered = n.covered(),
            total = n.total(),
            "annotated file"
        );
        Ok(())
    }
}
