//! Schema documents and node addressing.
//!
//! A [`SchemaDocument`] owns the root [`SchemaNode`] of a field tree that has passed
//! load-time validation. Nodes are addressed two ways:
//! - [`NodeId`]: the index path from the root. Unique even when names repeat, so it is what
//!   expand state and edit events are keyed by.
//! - [`NodePath`]: the names from the root down to a node. Used for display and, optionally,
//!   for path-qualified state keys.

mod node;
mod wire;

pub use node::{InputKind, LeafSpec, NodeKind, SchemaNode};

use crate::config::UnknownInputPolicy;
use crate::constants::PATH_DISPLAY_SEPARATOR;
use crate::error::{EngineError, EngineResult};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Position of a node as child indices from the root. The root is the empty path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Vec<usize>);

impl NodeId {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

impl FromStr for NodeId {
    type Err = EngineError;

    /// Parses `/`, `/0/2` or `0/2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        trimmed
            .split('/')
            .map(|part| {
                part.parse::<usize>().map_err(|_| {
                    EngineError::InvalidInput(format!("invalid node id {s:?}: {part:?} is not an index"))
                })
            })
            .collect::<EngineResult<Vec<_>>>()
            .map(Self)
    }
}

/// Names from the root down to (and including) a node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut names = self.0.clone();
        names.push(name.into());
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(PATH_DISPLAY_SEPARATOR))
    }
}

/// A node together with where it sits in its document.
#[derive(Clone, Debug)]
pub struct LocatedNode<'a> {
    pub id: NodeId,
    pub path: NodePath,
    pub node: &'a SchemaNode,
}

/// A validated field tree. The root is always a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaDocument {
    root: SchemaNode,
}

impl SchemaDocument {
    /// Wraps an already-built tree.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SchemaViolation` if `root` is a leaf.
    pub fn from_root(root: SchemaNode) -> EngineResult<Self> {
        if !root.is_group() {
            return Err(EngineError::SchemaViolation {
                path: root.name().to_string(),
                reason: "the document root must be a group".into(),
            });
        }
        Ok(Self { root })
    }

    /// Parses and validates a JSON schema document.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SchemaParse` when the text does not match the document shape,
    /// `EngineError::SchemaViolation` when a node breaks a tree invariant, and
    /// `EngineError::UnknownInputKind` when `policy` is `Reject` and a leaf names an unknown
    /// input type.
    pub fn from_json_str(text: &str, policy: UnknownInputPolicy) -> EngineResult<Self> {
        let wire = wire::parse_json(text)?;
        Self::from_root(wire::wire_to_domain(wire, policy)?)
    }

    /// Parses and validates a YAML schema document. Errors as for [`Self::from_json_str`].
    pub fn from_yaml_str(text: &str, policy: UnknownInputPolicy) -> EngineResult<Self> {
        let wire = wire::parse_yaml(text)?;
        Self::from_root(wire::wire_to_domain(wire, policy)?)
    }

    /// Reads a schema document from disk, choosing the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnsupportedFormat` for extensions other than `json`, `yaml` and
    /// `yml`, `EngineError::FileRead` if the file cannot be read, and otherwise the errors of
    /// the matching `from_*_str` function.
    pub fn load(path: &Path, policy: UnknownInputPolicy) -> EngineResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let parse: fn(&str, UnknownInputPolicy) -> EngineResult<Self> = match extension.as_str() {
            "json" => Self::from_json_str,
            "yaml" | "yml" => Self::from_yaml_str,
            _ => return Err(EngineError::UnsupportedFormat(path.display().to_string())),
        };

        let text = std::fs::read_to_string(path).map_err(EngineError::FileRead)?;
        let document = parse(&text, policy)?;
        tracing::debug!("loaded schema document {}", path.display());
        Ok(document)
    }

    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    pub fn node(&self, id: &NodeId) -> Option<&SchemaNode> {
        self.locate(id).map(|located| located.node)
    }

    /// Resolves an id to its node and name path.
    pub fn locate(&self, id: &NodeId) -> Option<LocatedNode<'_>> {
        let mut node = &self.root;
        let mut path = NodePath::root(node.name().as_str());
        for &index in id.indices() {
            node = node.children().get(index)?;
            path = path.child(node.name().as_str());
        }
        Some(LocatedNode {
            id: id.clone(),
            path,
            node,
        })
    }

    /// Every node, depth-first pre-order, regardless of expand state.
    pub fn nodes(&self) -> Vec<LocatedNode<'_>> {
        let mut out = Vec::new();
        collect(
            &self.root,
            NodeId::root(),
            NodePath::root(self.root.name().as_str()),
            &mut out,
        );
        out
    }

    pub fn leaves(&self) -> Vec<LocatedNode<'_>> {
        self.nodes().into_iter().filter(|n| n.node.is_leaf()).collect()
    }

    pub fn groups(&self) -> Vec<LocatedNode<'_>> {
        self.nodes().into_iter().filter(|n| n.node.is_group()).collect()
    }
}

fn collect<'a>(node: &'a SchemaNode, id: NodeId, path: NodePath, out: &mut Vec<LocatedNode<'a>>) {
    let children = node.children();
    out.push(LocatedNode {
        id: id.clone(),
        path: path.clone(),
        node,
    });
    for (index, child) in children.iter().enumerate() {
        collect(child, id.child(index), path.child(child.name().as_str()), out);
    }
}
