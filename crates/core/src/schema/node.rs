//! Schema node domain model.
//!
//! A node is either a *group* (one or more children) or a *leaf* (solicits a value). The
//! distinction is carried by [`NodeBody`] so that leaf-only attributes cannot appear on groups.

use crate::error::{EngineError, EngineResult};
use htable_types::NonEmptyText;
use serde::{Deserialize, Serialize};

/// The closed set of input kinds a leaf can declare.
///
/// Documents that name anything else are handled by [`crate::config::UnknownInputPolicy`]
/// when the document is loaded; once a [`SchemaNode`] exists its kind is always one of these.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    #[default]
    Text,
    Date,
    Range,
    Number,
    Boolean,
    Select,
}

impl InputKind {
    pub const ALL: [InputKind; 6] = [
        InputKind::Text,
        InputKind::Date,
        InputKind::Range,
        InputKind::Number,
        InputKind::Boolean,
        InputKind::Select,
    ];

    /// Returns the tag used for this kind in schema documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Text => "text",
            InputKind::Date => "date",
            InputKind::Range => "range",
            InputKind::Number => "number",
            InputKind::Boolean => "boolean",
            InputKind::Select => "select",
        }
    }

    /// Looks up a kind by its document tag. Tags are case-sensitive.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Composite kinds own a `-start`/`-end` key pair instead of a single key.
    pub fn is_composite(&self) -> bool {
        matches!(self, InputKind::Date | InputKind::Range)
    }
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a node is a group or a leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Leaf,
}

/// Attributes that only make sense on a leaf.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeafSpec {
    pub input_kind: InputKind,

    /// When present the leaf is display-only and owns no form-state key.
    pub fixed_value: Option<String>,

    /// Recognised options for `select` leaves, in document order.
    pub values: Vec<String>,
}

impl LeafSpec {
    pub fn new(input_kind: InputKind) -> Self {
        Self {
            input_kind,
            ..Self::default()
        }
    }

    pub fn with_fixed_value(mut self, value: impl Into<String>) -> Self {
        self.fixed_value = Some(value.into());
        self
    }

    pub fn with_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum NodeBody {
    Group(Vec<SchemaNode>),
    Leaf(LeafSpec),
}

/// One entry of the declarative field tree. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaNode {
    name: NonEmptyText,
    help_text: Option<String>,
    body: NodeBody,
}

impl SchemaNode {
    /// Builds a leaf node.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SchemaViolation` if `name` is blank.
    pub fn leaf(name: &str, spec: LeafSpec) -> EngineResult<Self> {
        Ok(Self {
            name: node_name(name)?,
            help_text: None,
            body: NodeBody::Leaf(spec),
        })
    }

    /// Builds a group node.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SchemaViolation` if `name` is blank or `children` is empty.
    pub fn group(name: &str, children: Vec<SchemaNode>) -> EngineResult<Self> {
        let name = node_name(name)?;
        if children.is_empty() {
            return Err(EngineError::SchemaViolation {
                path: name.to_string(),
                reason: "a group needs at least one child".into(),
            });
        }
        Ok(Self {
            name,
            help_text: None,
            body: NodeBody::Group(children),
        })
    }

    pub(crate) fn from_group_parts(
        name: NonEmptyText,
        help_text: Option<String>,
        children: Vec<SchemaNode>,
    ) -> Self {
        Self {
            name,
            help_text,
            body: NodeBody::Group(children),
        }
    }

    pub(crate) fn from_leaf_parts(
        name: NonEmptyText,
        help_text: Option<String>,
        spec: LeafSpec,
    ) -> Self {
        Self {
            name,
            help_text,
            body: NodeBody::Leaf(spec),
        }
    }

    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    pub fn name(&self) -> &NonEmptyText {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::Group(_) => NodeKind::Group,
            NodeBody::Leaf(_) => NodeKind::Leaf,
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind() == NodeKind::Group
    }

    pub fn is_leaf(&self) -> bool {
        self.kind() == NodeKind::Leaf
    }

    /// Child nodes in document order; empty for leaves.
    pub fn children(&self) -> &[SchemaNode] {
        match &self.body {
            NodeBody::Group(children) => children,
            NodeBody::Leaf(_) => &[],
        }
    }

    pub fn leaf_spec(&self) -> Option<&LeafSpec> {
        match &self.body {
            NodeBody::Leaf(spec) => Some(spec),
            NodeBody::Group(_) => None,
        }
    }

    pub fn input_kind(&self) -> Option<InputKind> {
        self.leaf_spec().map(|spec| spec.input_kind)
    }

    pub fn fixed_value(&self) -> Option<&str> {
        self.leaf_spec().and_then(|spec| spec.fixed_value.as_deref())
    }

    pub fn values(&self) -> &[String] {
        self.leaf_spec().map_or(&[], |spec| spec.values.as_slice())
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help_text.as_deref()
    }
}

/// The error path is the rejected name itself, quoted.
fn node_name(name: &str) -> EngineResult<NonEmptyText> {
    NonEmptyText::new(name).map_err(|_| EngineError::SchemaViolation {
        path: format!("{name:?}"),
        reason: "node name cannot be empty".into(),
    })
}
