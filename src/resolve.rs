//! Mapping coverage units (import-path style file names) to their package
//! and to a file on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::error::{Result, TarpError};

pub trait Resolver {
    /// Slash-joined identifier of the package that owns `unit`.
    fn resolve_unit(&self, unit: &str) -> Result<String>;

    /// Location of the source file backing `unit`.
    fn find_file(&self, unit: &str) -> Result<PathBuf>;
}

fn resolution_error(unit: &str, message: impl Into<String>) -> TarpError {
    TarpError::Resolution {
        unit: unit.to_string(),
        message: message.into(),
    }
}

/// Directory part of a slash path, `.` when there is none.
fn package_dir(unit: &str) -> &str {
    match unit.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((dir, _)) => dir,
        None => ".",
    }
}

fn base_name(unit: &str) -> &str {
    unit.rsplit_once('/').map_or(unit, |(_, base)| base)
}

/// Units written as file paths rather than import paths.
fn is_local(unit: &str) -> bool {
    unit.starts_with("./") || unit.starts_with("../") || Path::new(unit).is_absolute()
}

/// One entry of `go list -json` output.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GoPackage {
    pub import_path: String,
    #[serde(default)]
    pub dir: String,
    #[serde(default)]
    pub error: Option<GoPackageError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GoPackageError {
    pub err: String,
}

/// Resolves units through the Go toolchain by running `go list -e -json`
/// once for every package directory named by the profiles.
#[derive(Debug, Default)]
pub struct GoListResolver {
    packages: HashMap<String, GoPackage>,
}

impl GoListResolver {
    /// Run `go list` for the packages owning `units`.
    pub fn load<'a>(units: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut dirs: Vec<&str> = units
            .into_iter()
            .filter(|u| !is_local(u))
            .map(package_dir)
            .collect();
        dirs.sort_unstable();
        dirs.dedup();
        if dirs.is_empty() {
            return Ok(Self::default());
        }

        let output = Command::new("go")
            .args(["list", "-e", "-json"])
            .args(&dirs)
            .output()
            .map_err(|e| resolution_error("go list", format!("failed to run go: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(resolution_error(
                dirs.join(" ").as_str(),
                format!("go list failed: {}", stderr.trim()),
            ));
        }

        let resolver = Self::from_go_list(&output.stdout)?;
        tracing::info!(packages = resolver.packages.len(), "resolved packages with go list");
        Ok(resolver)
    }

    /// Build from the concatenated JSON objects `go list -json` prints.
    pub fn from_go_list(json: &[u8]) -> Result<Self> {
        let mut packages = HashMap::new();
        for pkg in serde_json::Deserializer::from_slice(json).into_iter::<GoPackage>() {
            let pkg = pkg.map_err(|e| resolution_error("go list", e.to_string()))?;
            packages.insert(pkg.import_path.clone(), pkg);
        }
        Ok(Self { packages })
    }

    fn package(&self, unit: &str) -> Result<&GoPackage> {
        let pkg = self.packages.get(package_dir(unit)).ok_or_else(|| {
            resolution_error(unit, format!("did not find package {}", package_dir(unit)))
        })?;
        if let Some(err) = &pkg.error {
            return Err(resolution_error(unit, err.err.clone()));
        }
        Ok(pkg)
    }
}

impl Resolver for GoListResolver {
    fn resolve_unit(&self, unit: &str) -> Result<String> {
        if is_local(unit) {
            return Ok(package_dir(unit).to_string());
        }
        Ok(self.package(unit)?.import_path.clone())
    }

    fn find_file(&self, unit: &str) -> Result<PathBuf> {
        if is_local(unit) {
            return Ok(PathBuf::from(unit));
        }
        let pkg = self.package(unit)?;
        Ok(Path::new(&pkg.dir).join(base_name(unit)))
    }
}

/// Resolves units by path alone: the package is the unit's directory and the
/// file is found under `root` after stripping an optional module prefix.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    module: Option<String>,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>, module: Option<String>) -> Self {
        Self {
            root: root.into(),
            module: module.map(|m| m.trim_end_matches('/').to_string()),
        }
    }

    fn relative<'u>(&self, unit: &'u str) -> &'u str {
        let Some(module) = self.module.as_deref() else {
            return unit;
        };
        match unit.strip_prefix(module) {
            Some(rest) if rest.is_empty() => "",
            Some(rest) => rest.strip_prefix('/').unwrap_or(unit),
            None => unit,
        }
    }
}

impl Resolver for PathResolver {
    fn resolve_unit(&self, unit: &str) -> Result<String> {
        if unit.is_empty() {
            return Err(resolution_error(unit, "empty unit name"));
        }
        Ok(package_dir(unit).to_string())
    }

    fn find_file(&self, unit: &str) -> Result<PathBuf> {
        if Path::new(unit).is_absolute() {
            return Ok(PathBuf::from(unit));
        }
        let rel = self.relative(unit);
        if rel.is_empty() {
            return Err(resolution_error(unit, "unit names the module itself"));
        }
        Ok(self.root.join(rel))
    }
}
