//! Output formatting for assembled coverage reports.

use std::fmt::Write;

use crate::annotate::escape_html;
use crate::assemble::Report;
use crate::tree::{CoverageTree, NodeId};

/// Trait for formatting coverage reports.
pub trait ReportFormatter {
    /// Format the report to a string.
    fn format(&self, report: &Report) -> String;
}

/// Plain text formatter: the package tree with per-node percentages.
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &Report) -> String {
        let tree = report.tree();
        if tree.file_nodes().is_empty() {
            return "No coverage data.\n".to_string();
        }

        let mut out = tree.to_string();
        let root = tree.node(tree.root());
        writeln!(
            out,
            "\nTotal: {}/{} statements ({}%)",
            root.covered(),
            root.total(),
            root.coverage_str()
        )
        .unwrap();
        out
    }
}

/// Heat colour for a coverage tier, red for uncovered then grey to green.
fn tier_color(tier: u8) -> (u8, u8, u8) {
    if tier == 0 {
        return (192, 0, 0);
    }
    let step = tier.min(10) - 1;
    (128 - 12 * step, 128 + 12 * step, 128 + 3 * step)
}

fn colors() -> String {
    let mut css = String::new();
    for tier in 0..=10u8 {
        let (r, g, b) = tier_color(tier);
        writeln!(css, "  .cov{tier} {{ color: rgb({r}, {g}, {b}); }}").unwrap();
    }
    css
}

const STYLE: &str = r#"  body { background: black; color: rgb(80, 80, 80); margin: 0; font-family: Menlo, monospace; }
  #topbar { background: black; position: fixed; top: 0; left: 0; right: 0; height: 42px; border-bottom: 1px solid rgb(80, 80, 80); padding: 0 1em; }
  #topbar select, #legend { display: inline-block; margin-top: 10px; }
  #legend span { margin: 0 5px; }
  #nav { position: fixed; top: 43px; bottom: 0; left: 0; width: 24em; overflow: auto; border-right: 1px solid rgb(80, 80, 80); }
  #nav ul { list-style: none; padding-left: 1em; margin: 0; }
  #nav a { text-decoration: none; cursor: pointer; }
  #content { margin: 60px 0 0 25em; }
  pre { font-family: Menlo, monospace; font-weight: bold; tab-size: 4; }
  pre.file { display: none; }
  footer { margin: 1em 0 1em 25em; font-size: small; }
"#;

const SCRIPT: &str = r#"  (function() {
    var files = document.getElementById('files');
    var visible;
    function select(id) {
      if (visible) { visible.style.display = 'none'; }
      visible = document.getElementById(id);
      if (!visible) { return; }
      files.value = id;
      visible.style.display = 'block';
      window.scrollTo(0, 0);
      if (window.history.replaceState) { window.history.replaceState(null, '', '#' + id); }
    }
    files.addEventListener('change', function() { select(files.value); });
    document.querySelectorAll('#nav a[data-file]').forEach(function(a) {
      a.addEventListener('click', function() { select(a.getAttribute('data-file')); });
    });
    select(location.hash ? location.hash.substr(1) : files.value);
  })();
"#;

/// HTML document with a file selector, a collapsible package tree, and
/// one annotated listing per file.
pub struct HtmlFormatter;

impl HtmlFormatter {
    fn write_nav(
        out: &mut String,
        tree: &CoverageTree,
        id: NodeId,
        ids: &[(String, NodeId)],
    ) {
        let children = tree.children(id);
        if children.is_empty() {
            return;
        }
        out.push_str("<ul>\n");
        for (key, child) in children {
            let node = tree.node(child);
            let label = format!("{} ({}%)", escape_html(key), node.coverage_str());
            let marker = if node.is_package() { " [P]" } else { "" };
            match ids.iter().position(|(_, n)| *n == child) {
                Some(index) if node.is_file() => writeln!(
                    out,
                    r#"<li><a class="{}" data-file="file{index}">{label}</a>{marker}"#,
                    node.cov_class()
                )
                .unwrap(),
                _ => writeln!(out, r#"<li><span class="{}">{label}</span>{marker}"#, node.cov_class())
                    .unwrap(),
            }
            Self::write_nav(out, tree, child, ids);
            out.push_str("</li>\n");
        }
        out.push_str("</ul>\n");
    }

    /// File selector with one option group per package. Files outside every
    /// package follow the groups ungrouped.
    fn write_selector(out: &mut String, tree: &CoverageTree, files: &[(String, NodeId)]) {
        let option = |out: &mut String, index: usize| {
            let (path, id) = &files[index];
            writeln!(
                out,
                r#"<option value="file{index}">{} ({}%)</option>"#,
                escape_html(path),
                tree.node(*id).coverage_str()
            )
            .unwrap();
        };

        let mut listed = vec![false; files.len()];
        out.push_str("<select id=\"files\">\n");
        for pkg in tree.packages() {
            let members: Vec<usize> = tree
                .files(&pkg)
                .iter()
                .filter_map(|path| files.iter().position(|(p, _)| p == path))
                .collect();
            if members.is_empty() {
                continue;
            }
            writeln!(out, r#"<optgroup label="{}">"#, escape_html(&pkg)).unwrap();
            for index in members {
                listed[index] = true;
                option(out, index);
            }
            out.push_str("</optgroup>\n");
        }
        for index in (0..files.len()).filter(|&i| !listed[i]) {
            option(out, index);
        }
        out.push_str("</select>\n");
    }

    fn write_legend(out: &mut String, set_mode: bool) {
        out.push_str(r#"<div id="legend"><span>not tracked</span>"#);
        if set_mode {
            out.push_str(r#"<span class="cov0">not covered</span><span class="cov8">covered</span>"#);
        } else {
            out.push_str(r#"<span class="cov0">no coverage</span><span class="cov1">low coverage</span>"#);
            for tier in 2..=9 {
                write!(out, r#"<span class="cov{tier}">*</span>"#).unwrap();
            }
            out.push_str(r#"<span class="cov10">high coverage</span>"#);
        }
        out.push_str("</div>\n");
    }
}

impl ReportFormatter for HtmlFormatter {
    fn format(&self, report: &Report) -> String {
        let tree = report.tree();
        let files = tree.file_nodes();
        let set_mode = !files.is_empty() && files.iter().all(|(_, id)| tree.node(*id).is_set_mode());

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        writeln!(
            html,
            "<title>Coverage Report ({}%)</title>",
            tree.node(tree.root()).coverage_str()
        )
        .unwrap();
        html.push_str("<style>\n");
        html.push_str(STYLE);
        html.push_str(&colors());
        html.push_str("</style>\n</head>\n<body>\n");

        html.push_str("<div id=\"topbar\">\n");
        Self::write_selector(&mut html, tree, &files);
        Self::write_legend(&mut html, set_mode);
        html.push_str("</div>\n");

        html.push_str("<div id=\"nav\">\n");
        Self::write_nav(&mut html, tree, tree.root(), &files);
        html.push_str("</div>\n");

        html.push_str("<div id=\"content\">\n");
        for (i, (_, id)) in files.iter().enumerate() {
            let body = tree.node(*id).body().unwrap_or_default();
            writeln!(html, r#"<pre class="file" id="file{i}">{body}</pre>"#).unwrap();
        }
        html.push_str("</div>\n");

        writeln!(
            html,
            "<footer>Generated {}</footer>",
            report.generated_at().format("%Y-%m-%d %H:%M:%S UTC")
        )
        .unwrap();
        html.push_str("<script>\n");
        html.push_str(SCRIPT);
        html.push_str("</script>\n</body>\n</html>\n");
        html
    }
}
