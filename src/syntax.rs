//! Access to the concrete syntax tree produced by `verible-verilog-syntax`.
//!
//! The parser binary is invoked once per source file with `-export_json` and
//! the exported tree is lowered into an owned [`Node`] tree. Token text is
//! sliced out of the source by byte span, so expression text survives
//! verbatim (including parametrized widths like `WIDTH-1`).

use eyre::{bail, eyre, Result, WrapErr};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One node of the concrete syntax tree.
///
/// Tokens are nodes without children. The `text` of an interior node is the
/// verbatim source slice spanning its first and last token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    /// Grammar tag, e.g. `kModuleDeclaration` or `SymbolIdentifier`.
    pub tag: String,
    text: String,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Node {
    /// Creates a node with an explicit source text.
    pub fn new(tag: impl Into<String>, text: impl Into<String>, children: Vec<Node>) -> Self {
        Self { tag: tag.into(), text: text.into(), children }
    }

    /// Creates a childless token node.
    pub fn leaf(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(tag, text, Vec::new())
    }

    /// The source text covered by this node.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Collects pre-order matches of `tags`, without descending into a
    /// matched subtree.
    pub fn find_all<'a>(&'a self, tags: &[&str]) -> Vec<&'a Node> {
        let mut matches = Vec::new();
        self.collect(tags, &mut matches);
        matches
    }

    /// The first pre-order match of `tags`, if any.
    pub fn find<'a>(&'a self, tags: &[&str]) -> Option<&'a Node> {
        if tags.contains(&self.tag.as_str()) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(tags))
    }

    /// Like [`Node::find_all`], but limited to `depth` levels below this
    /// node (depth 1 inspects only direct children).
    pub fn find_all_within<'a>(&'a self, tags: &[&str], depth: usize) -> Vec<&'a Node> {
        let mut matches = Vec::new();
        self.collect_within(tags, depth, &mut matches);
        matches
    }

    fn collect<'a>(&'a self, tags: &[&str], matches: &mut Vec<&'a Node>) {
        if tags.contains(&self.tag.as_str()) {
            matches.push(self);
            return;
        }
        for child in &self.children {
            child.collect(tags, matches);
        }
    }

    fn collect_within<'a>(&'a self, tags: &[&str], depth: usize, matches: &mut Vec<&'a Node>) {
        if tags.contains(&self.tag.as_str()) {
            matches.push(self);
            return;
        }
        if depth == 0 {
            return;
        }
        for child in &self.children {
            child.collect_within(tags, depth - 1, matches);
        }
    }
}

/// Handle for the external `verible-verilog-syntax` binary.
pub struct VeribleParser {
    executable: PathBuf,
}

impl VeribleParser {
    /// Creates a parser invoking the binary at `executable`.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self { executable: executable.into() }
    }

    /// Parses a single source file into a syntax tree.
    pub fn parse_file(&self, path: &Path) -> Result<Node> {
        let source = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let output = Command::new(&self.executable)
            .arg("-export_json")
            .arg("-printtree")
            .arg(path)
            .output()
            .wrap_err_with(|| format!("failed to run {}", self.executable.display()))?;
        if !output.status.success() {
            bail!("{} exited with {} for {}", self.executable.display(), output.status, path.display());
        }
        let export: HashMap<String, FileExport> = serde_json::from_slice(&output.stdout)
            .wrap_err_with(|| format!("malformed syntax export for {}", path.display()))?;
        let file = export
            .into_values()
            .next()
            .ok_or_else(|| eyre!("empty syntax export for {}", path.display()))?;
        if !file.errors.is_empty() {
            bail!("{} syntax error(s) in {}", file.errors.len(), path.display());
        }
        let tree =
            file.tree.ok_or_else(|| eyre!("no syntax tree exported for {}", path.display()))?;
        Ok(lower(tree, &source).0)
    }
}

#[derive(Deserialize)]
struct FileExport {
    tree: Option<RawNode>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNode {
    Node { tag: String, children: Vec<Option<RawNode>> },
    Token { tag: String, start: usize, end: usize },
}

fn lower(raw: RawNode, source: &str) -> (Node, Option<(usize, usize)>) {
    match raw {
        RawNode::Token { tag, start, end } => {
            let text = source.get(start..end).unwrap_or_default().to_owned();
            (Node { tag, text, children: Vec::new() }, Some((start, end)))
        }
        RawNode::Node { tag, children } => {
            let mut span: Option<(usize, usize)> = None;
            let mut lowered = Vec::new();
            for child in children.into_iter().flatten() {
                let (node, child_span) = lower(child, source);
                if let Some((start, end)) = child_span {
                    span = Some(match span {
                        Some((first, last)) => (first.min(start), last.max(end)),
                        None => (start, end),
                    });
                }
                lowered.push(node);
            }
            let text =
                span.and_then(|(start, end)| source.get(start..end)).unwrap_or_default().to_owned();
            (Node { tag, text, children: lowered }, span)
        }
    }
}
