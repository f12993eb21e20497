//! Hierarchical coverage keyed by slash-separated paths.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Each node
//! keeps a map from path segment to child and a non-owning back-reference to
//! its parent, which is only used to fold counts upward and to rebuild a
//! node's path. After [`CoverageTree::simplify`] an edge may span several
//! segments (`a/b/c`).

use std::collections::HashMap;
use std::fmt;

use crate::model::percent;

/// Handle to a node inside a [`CoverageTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One path segment in the tree. A node may be a package, a file, both, or
/// neither (a purely structural directory).
#[derive(Debug, Default, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
    is_package: bool,
    is_file: bool,
    set_mode: bool,
    covered: u64,
    total: u64,
    body: Option<String>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_package(&self) -> bool {
        self.is_package
    }

    pub fn is_file(&self) -> bool {
        self.is_file
    }

    /// The file was profiled in `set` mode, so counts are hit/not-hit only.
    pub fn is_set_mode(&self) -> bool {
        self.set_mode
    }

    pub fn covered(&self) -> u64 {
        self.covered
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Annotated source markup, present on file nodes.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    #[must_use]
    pub fn coverage_percent(&self) -> f64 {
        percent(self.covered, self.total)
    }

    #[must_use]
    pub fn coverage_str(&self) -> String {
        format!("{:.2}", self.coverage_percent())
    }

    /// CSS class bucketing the coverage into tens, `cov0` through `cov10`.
    #[must_use]
    pub fn cov_class(&self) -> String {
        format!("cov{}", (self.coverage_percent() / 10.0) as u32)
    }
}

#[derive(Debug, Clone)]
pub struct CoverageTree {
    nodes: Vec<Node>,
}

impl Default for CoverageTree {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Return the node for `path`, creating it and any missing intermediate
    /// segments. Empty segments are kept as literal `""` keys.
    pub fn make_node(&mut self, path: &str) -> NodeId {
        let mut tree = self.root();
        for part in path.split('/') {
            tree = match self.node(tree).children.get(part) {
                Some(&child) => child,
                None => {
                    let child = NodeId(self.nodes.len());
                    self.nodes.push(Node {
                        parent: Some(tree),
                        ..Node::default()
                    });
                    self.node_mut(tree).children.insert(part.to_string(), child);
                    child
                }
            };
        }
        tree
    }

    pub fn mark_package(&mut self, id: NodeId) {
        self.node_mut(id).is_package = true;
    }

    pub fn mark_file(&mut self, id: NodeId, set_mode: bool) {
        let node = self.node_mut(id);
        node.is_file = true;
        node.set_mode |= set_mode;
    }

    pub fn set_body(&mut self, id: NodeId, body: String) {
        self.node_mut(id).body = Some(body);
    }

    /// Add a (covered, total) delta to `id` and every ancestor up to the root.
    pub fn fold(&mut self, id: NodeId, covered: u64, total: u64) {
        debug_assert!(covered <= total, "covered {covered} exceeds total {total}");
        let mut cur = Some(id);
        while let Some(n) = cur {
            let node = self.node_mut(n);
            node.covered = node.covered.saturating_add(covered);
            node.total = node.total.saturating_add(total);
            cur = node.parent;
        }
    }

    /// Collapse every chain of single-child nodes into one edge. Children are
    /// simplified before their parent looks at them, so one pass is enough
    /// and a second pass changes nothing.
    pub fn simplify(&mut self) {
        self.simplify_at(self.root());
        tracing::debug!(nodes = self.reachable_count(), "simplified coverage tree");
    }

    fn simplify_at(&mut self, id: NodeId) {
        for key in self.keys(id) {
            let Some(&child) = self.node(id).children.get(&key) else {
                continue;
            };
            self.simplify_at(child);

            if self.node(child).children.len() != 1 {
                continue;
            }
            let (grand_key, grand) = match self.node_mut(child).children.drain().next() {
                Some(entry) => entry,
                None => continue,
            };

            let spliced = std::mem::take(self.node_mut(child));
            let parent = self.node_mut(id);
            parent.children.remove(&key);
            parent.children.insert(format!("{key}/{grand_key}"), grand);

            let g = self.node_mut(grand);
            g.is_file |= spliced.is_file;
            g.is_package |= spliced.is_package;
            g.set_mode |= spliced.set_mode;
            if g.body.is_none() {
                g.body = spliced.body;
            }
            g.parent = Some(id);
        }
    }

    fn reachable_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            count += 1;
            stack.extend(self.node(id).children.values().copied());
        }
        count
    }

    /// Child segment names of `id`, sorted.
    pub fn keys(&self, id: NodeId) -> Vec<String> {
        let mut keys: Vec<String> = self.node(id).children.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Children of `id` with their edge labels, sorted by label.
    pub fn children(&self, id: NodeId) -> Vec<(&str, NodeId)> {
        let mut children: Vec<(&str, NodeId)> = self
            .node(id)
            .children
            .iter()
            .map(|(k, &v)| (k.as_str(), v))
            .collect();
        children.sort_by(|a, b| a.0.cmp(b.0));
        children
    }

    pub fn child(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.node(id).children.get(key).copied()
    }

    /// Rebuild the path from the root to `id` by finding, at every ancestor,
    /// the edge that points at the node below it.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.node(cur).parent {
            if let Some((key, _)) = self
                .node(parent)
                .children
                .iter()
                .find(|(_, &child)| child == cur)
            {
                parts.push(key);
            }
            cur = parent;
        }
        parts.reverse();
        parts.join("/")
    }

    /// Find the node for `path`, following multi-segment edges.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let mut tree = self.root();
        let mut rest = path;
        loop {
            let (next, remaining) = self.node(tree).children.iter().find_map(move |(k, &v)| {
                if rest == k.as_str() {
                    Some((v, None))
                } else {
                    rest.strip_prefix(k.as_str())
                        .and_then(|r| r.strip_prefix('/'))
                        .map(|r| (v, Some(r)))
                }
            })?;
            tree = next;
            match remaining {
                Some(r) => rest = r,
                None => return Some(tree),
            }
        }
    }

    /// Paths of every package node, sorted.
    pub fn packages(&self) -> Vec<String> {
        let mut pkgs = Vec::new();
        self.collect_packages(self.root(), "", &mut pkgs);
        pkgs.sort();
        pkgs
    }

    fn collect_packages(&self, id: NodeId, prefix: &str, out: &mut Vec<String>) {
        for (key, child) in self.children(id) {
            let path = join(prefix, key);
            if self.node(child).is_package {
                out.push(path.clone());
            }
            self.collect_packages(child, &path, out);
        }
    }

    /// Paths of the files belonging to package `pkg`, sorted.
    ///
    /// These are the file nodes directly below it, or `pkg` itself when
    /// simplify spliced a single-file package onto its file.
    pub fn files(&self, pkg: &str) -> Vec<String> {
        let Some(id) = self.find(pkg) else {
            return Vec::new();
        };
        if self.node(id).is_file {
            return vec![pkg.to_string()];
        }
        self.children(id)
            .into_iter()
            .filter(|(_, child)| self.node(*child).is_file)
            .map(|(key, _)| join(pkg, key))
            .collect()
    }

    /// Every file node with its full path, in path order.
    pub fn file_nodes(&self) -> Vec<(String, NodeId)> {
        let mut files = Vec::new();
        self.collect_files(self.root(), "", &mut files);
        files
    }

    fn collect_files(&self, id: NodeId, prefix: &str, out: &mut Vec<(String, NodeId)>) {
        for (key, child) in self.children(id) {
            let path = join(prefix, key);
            if self.node(child).is_file {
                out.push((path.clone(), child));
            }
            self.collect_files(child, &path, out);
        }
    }

    fn write_level(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: NodeId,
        level: usize,
        last: &mut Vec<bool>,
    ) -> fmt::Result {
        let children = self.children(id);
        let n = children.len();
        for (i, (key, child)) in children.into_iter().enumerate() {
            let is_last = i + 1 == n;
            last.truncate(level);
            last.push(is_last);

            for &done in &last[level.min(1)..level] {
                f.write_str(if done { "  " } else { "│ " })?;
            }
            if level != 0 {
                f.write_str(if is_last { "└─" } else { "├─" })?;
            }

            let node = self.node(child);
            f.write_str(key)?;
            if node.is_package {
                f.write_str(" (P)")?;
            }
            if node.is_file {
                f.write_str(" (F)")?;
            }
            writeln!(f, " ({}%)", node.coverage_str())?;

            self.write_level(f, child, level + 1, last)?;
        }
        Ok(())
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}/{key}")
    }
}

impl fmt::Display for CoverageTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_level(f, self.root(), 0, &mut Vec::new())
    }
}
