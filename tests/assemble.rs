mod common;

use std::path::{Path, PathBuf};

use common::{MemorySources, WholeFile};
use tarp::assemble::ReportAssembler;
use tarp::error::{Result, TarpError};
use tarp::funcs::GoFuncExtractor;
use tarp::parsers::gocover;
use tarp::report::{HtmlFormatter, ReportFormatter, TextFormatter};
use tarp::resolve::{PathResolver, Resolver};

const A_GO: &str = "package p

func A(x int) int {
\tif x > 0 {
\t\treturn 1
\t}
\treturn 0
}
";

const B_GO: &str = "package p

func B() {}
";

const C_GO: &str = "package q

func C() int {
\treturn 3
}
";

const PROFILE: &str = "mode: count
m/p/a.go:3.19,4.11 1 1
m/p/a.go:4.11,6.3 1 0
m/p/a.go:7.2,7.10 1 1
m/p/b.go:3.10,3.12 0 0
m/q/c.go:3.14,5.2 1 2
";

fn sources() -> MemorySources {
    MemorySources::default()
        .with("/src/p/a.go", A_GO)
        .with("/src/p/b.go", B_GO)
        .with("/src/q/c.go", C_GO)
}

fn resolver() -> PathResolver {
    PathResolver::new("/src", Some("m".to_string()))
}

#[test]
fn merged_inputs_fold_into_one_file_node() {
    let (_dir, paths) = common::write_files(&[
        ("a.out", "mode: count\npkg/a.go:1.1,1.1 1 1\n"),
        ("b.out", "mode: count\npkg/a.go:1.1,1.1 1 1\n"),
    ]);
    let profiles = tarp::ingest::read_profiles(&paths).unwrap();
    assert_eq!(profiles[0].blocks[0].count, 2);

    let sources = MemorySources::default().with("/src/pkg/a.go", "package a\n");
    let resolver = PathResolver::new("/src", None);
    let report = ReportAssembler::new(&resolver, &WholeFile, &sources)
        .assemble(&profiles)
        .unwrap();

    let tree = report.tree();
    let file = tree.find("pkg/a.go").unwrap();
    let node = tree.node(file);
    assert!(node.is_file());
    assert!(node.is_package());
    assert_eq!(node.total(), 1);
    assert_eq!(node.covered(), 1);
    assert_eq!(node.coverage_percent(), 100.0);
    assert_eq!(report.coverage_percent(), 100.0);
    assert_eq!(
        node.body(),
        Some("<span class=\"cov10\" title=\"2\"></span>package a\n")
    );
}

#[test]
fn packages_and_totals() {
    let profiles = gocover::parse("profile", PROFILE.as_bytes()).unwrap();
    let sources = sources();
    let resolver = resolver();
    let report = ReportAssembler::new(&resolver, &GoFuncExtractor, &sources)
        .assemble(&profiles)
        .unwrap();
    let tree = report.tree();

    let root = tree.node(tree.root());
    assert_eq!(root.total(), 4);
    assert_eq!(root.covered(), 3);

    assert_eq!(tree.packages(), ["m/p", "m/q/c.go"]);
    assert_eq!(tree.files("m/p"), ["m/p/a.go", "m/p/b.go"]);
    assert_eq!(tree.files("m/q/c.go"), ["m/q/c.go"]);

    let a = tree.node(tree.find("m/p/a.go").unwrap());
    assert_eq!((a.covered(), a.total()), (2, 3));
    assert!(a.body().unwrap().contains("x &gt; 0"));

    let b = tree.node(tree.find("m/p/b.go").unwrap());
    assert_eq!(b.total(), 0);
    assert_eq!(b.coverage_percent(), 0.0);

    let p = tree.find("m/p").unwrap();
    assert_eq!(tree.path(p), "m/p");
    assert_eq!(tree.node(p).coverage_str(), "66.67");
}

#[test]
fn text_report_draws_tree() {
    let profiles = gocover::parse("profile", PROFILE.as_bytes()).unwrap();
    let sources = sources();
    let resolver = resolver();
    let report = ReportAssembler::new(&resolver, &GoFuncExtractor, &sources)
        .assemble(&profiles)
        .unwrap();

    let expected = "\
m (75.00%)
├─p (P) (66.67%)
│ ├─a.go (F) (66.67%)
│ └─b.go (F) (0.00%)
└─q/c.go (P) (F) (100.00%)

Total: 3/4 statements (75.00%)
";
    assert_eq!(TextFormatter.format(&report), expected);
}

#[test]
fn html_report_lists_files_and_bodies() {
    let profiles = gocover::parse("profile", PROFILE.as_bytes()).unwrap();
    let sources = sources();
    let resolver = resolver();
    let report = ReportAssembler::new(&resolver, &GoFuncExtractor, &sources)
        .assemble(&profiles)
        .unwrap();

    let html = HtmlFormatter.format(&report);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains(r#"<option value="file0">m/p/a.go (66.67%)</option>"#));
    assert!(html.contains(r#"<option value="file2">m/q/c.go (100.00%)</option>"#));
    assert!(html.contains(
        "<optgroup label=\"m/p\">\n\
         <option value=\"file0\">m/p/a.go (66.67%)</option>\n\
         <option value=\"file1\">m/p/b.go (0.00%)</option>\n\
         </optgroup>\n"
    ));
    assert!(html.contains(r#"<optgroup label="m/q/c.go">"#));
    assert_eq!(html.matches("<option ").count(), 3);
    assert!(html.contains(r#"data-file="file1""#));
    assert!(html.contains(r#"<pre class="file" id="file0">package p"#));
    assert!(html.contains("high coverage"));
    assert_eq!(html.matches("<pre class=\"file\"").count(), 3);
}

#[test]
fn set_mode_files_are_flagged() {
    let profiles = gocover::parse("profile", b"mode: set\nm/q/c.go:3.14,5.2 1 1\n").unwrap();
    let sources = sources();
    let resolver = resolver();
    let report = ReportAssembler::new(&resolver, &GoFuncExtractor, &sources)
        .assemble(&profiles)
        .unwrap();

    let tree = report.tree();
    assert!(tree.node(tree.find("m/q/c.go").unwrap()).is_set_mode());
    let html = HtmlFormatter.format(&report);
    assert!(html.contains(r#"<span class="cov0">not covered</span>"#));
}

#[test]
fn non_utf8_source_aborts_with_path() {
    let profiles = gocover::parse("profile", b"mode: set\nm/q/c.go:3.14,5.2 1 1\n").unwrap();
    let mut sources = sources();
    sources
        .0
        .insert(PathBuf::from("/src/q/c.go"), b"package q\n// caf\xe9\n".to_vec());
    let resolver = resolver();
    let err = ReportAssembler::new(&resolver, &GoFuncExtractor, &sources)
        .assemble(&profiles)
        .unwrap_err();
    match err {
        TarpError::Encoding { path, offset } => {
            assert_eq!(path, PathBuf::from("/src/q/c.go"));
            assert_eq!(offset, 16);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_source_aborts() {
    let profiles = gocover::parse("profile", PROFILE.as_bytes()).unwrap();
    let sources = MemorySources::default().with("/src/p/a.go", A_GO);
    let resolver = resolver();
    let err = ReportAssembler::new(&resolver, &GoFuncExtractor, &sources)
        .assemble(&profiles)
        .unwrap_err();
    match err {
        TarpError::Read { path, .. } => assert_eq!(path, PathBuf::from("/src/p/b.go")),
        other => panic!("unexpected error: {other}"),
    }
}

struct FailingResolver;

impl Resolver for FailingResolver {
    fn resolve_unit(&self, unit: &str) -> Result<String> {
        Err(TarpError::Resolution {
            unit: unit.to_string(),
            message: "not in any module".to_string(),
        })
    }

    fn find_file(&self, unit: &str) -> Result<PathBuf> {
        Ok(Path::new("/src").join(unit))
    }
}

#[test]
fn resolution_failure_aborts() {
    let profiles = gocover::parse("profile", PROFILE.as_bytes()).unwrap();
    let sources = sources();
    let err = ReportAssembler::new(&FailingResolver, &GoFuncExtractor, &sources)
        .assemble(&profiles)
        .unwrap_err();
    assert!(matches!(err, TarpError::Resolution { ref unit, .. } if unit == "m/p/a.go"));
}

#[test]
fn empty_profile_list_builds_empty_report() {
    let sources = sources();
    let resolver = resolver();
    let report = ReportAssembler::new(&resolver, &GoFuncExtractor, &sources)
        .assemble(&[])
        .unwrap();
    assert_eq!(report.coverage_percent(), 0.0);
    assert!(report.tree().packages().is_empty());
    assert_eq!(TextFormatter.format(&report), "No coverage data.\n");
}
