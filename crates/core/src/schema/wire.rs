//! Schema document wire model and translation into [`SchemaNode`]s.
//!
//! The wire struct mirrors the document attributes one-to-one and is deliberately strict
//! (`deny_unknown_fields`). Invariants that serde cannot express are checked during
//! translation so that errors can name the offending node by its ancestor path.

use super::node::{InputKind, LeafSpec, SchemaNode};
use crate::config::UnknownInputPolicy;
use crate::constants::{PATH_DISPLAY_SEPARATOR, ROOT_PATH_LABEL};
use crate::error::{EngineError, EngineResult};
use htable_types::NonEmptyText;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct SchemaNodeWire {
    name: String,

    #[serde(default)]
    children: Option<Vec<SchemaNodeWire>>,

    #[serde(default)]
    input_type: Option<String>,

    #[serde(default)]
    fixed_value: Option<String>,

    #[serde(default)]
    values: Option<Vec<String>>,

    #[serde(default)]
    help_text: Option<String>,
}

/// Parse a schema document from JSON text.
///
/// Uses `serde_path_to_error` so that a mismatch reports where in the document it happened,
/// for example `children[2].inputType`.
pub(crate) fn parse_json(text: &str) -> EngineResult<SchemaNodeWire> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let wire = serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        schema_parse_error(path, err.into_inner().to_string())
    })?;
    deserializer
        .end()
        .map_err(|err| schema_parse_error(String::new(), err.to_string()))?;
    Ok(wire)
}

/// Parse a schema document from YAML text using the same attribute names as JSON.
pub(crate) fn parse_yaml(text: &str) -> EngineResult<SchemaNodeWire> {
    let deserializer = serde_yaml::Deserializer::from_str(text);
    serde_path_to_error::deserialize(deserializer).map_err(|err| {
        let path = err.path().to_string();
        schema_parse_error(path, err.into_inner().to_string())
    })
}

fn schema_parse_error(path: String, reason: String) -> EngineError {
    let path = if path.is_empty() || path == "." {
        ROOT_PATH_LABEL.to_string()
    } else {
        path
    };
    EngineError::SchemaParse { path, reason }
}

/// Translate a parsed document into the domain tree, enforcing node invariants.
pub(crate) fn wire_to_domain(
    wire: SchemaNodeWire,
    policy: UnknownInputPolicy,
) -> EngineResult<SchemaNode> {
    translate(wire, &[], None, policy)
}

fn translate(
    wire: SchemaNodeWire,
    ancestors: &[String],
    index: Option<usize>,
    policy: UnknownInputPolicy,
) -> EngineResult<SchemaNode> {
    let label = match (wire.name.trim(), index) {
        ("", Some(i)) => format!("#{i}"),
        ("", None) => ROOT_PATH_LABEL.to_string(),
        (name, _) => name.to_string(),
    };
    let mut path = ancestors.to_vec();
    path.push(label);

    let violation = |reason: &str| EngineError::SchemaViolation {
        path: path.join(PATH_DISPLAY_SEPARATOR),
        reason: reason.to_string(),
    };

    let name = NonEmptyText::new(&wire.name).map_err(|_| violation("node name cannot be empty"))?;
    let children = wire.children.unwrap_or_default();

    if !children.is_empty() {
        if wire.input_type.is_some() {
            return Err(violation("a group cannot declare inputType"));
        }
        if wire.fixed_value.is_some() {
            return Err(violation("a group cannot declare fixedValue"));
        }
        if wire.values.is_some() {
            return Err(violation("a group cannot declare values"));
        }

        let children = children
            .into_iter()
            .enumerate()
            .map(|(i, child)| translate(child, &path, Some(i), policy))
            .collect::<EngineResult<Vec<_>>>()?;

        return Ok(SchemaNode::from_group_parts(name, wire.help_text, children));
    }

    let input_kind = match wire.input_type.as_deref() {
        None => InputKind::Text,
        Some(tag) => match (InputKind::from_tag(tag), policy) {
            (Some(kind), _) => kind,
            (None, UnknownInputPolicy::FallBackToText) => {
                tracing::warn!(
                    "unknown inputType {:?} at {}, falling back to text",
                    tag,
                    path.join(PATH_DISPLAY_SEPARATOR)
                );
                InputKind::Text
            }
            (None, UnknownInputPolicy::Reject) => {
                return Err(EngineError::UnknownInputKind {
                    path: path.join(PATH_DISPLAY_SEPARATOR),
                    value: tag.to_string(),
                });
            }
        },
    };

    let spec = LeafSpec {
        input_kind,
        fixed_value: wire.fixed_value,
        values: wire.values.unwrap_or_default(),
    };

    Ok(SchemaNode::from_leaf_parts(name, wire.help_text, spec))
}
