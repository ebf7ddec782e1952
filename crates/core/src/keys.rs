//! State-key derivation.
//!
//! Every editable leaf writes to one key (or, for date and range leaves, a `-start`/`-end`
//! pair). Keys are derived by a [`KeyStrategy`]; the same strategy instance must be used for
//! the initial declaration of form state and for the tree walk, otherwise a leaf can end up
//! writing to a key that was never declared.

use crate::constants::{END_SUFFIX, START_SUFFIX};
use crate::error::EngineError;
use crate::schema::{LeafSpec, NodePath, SchemaDocument, SchemaNode};
use std::str::FromStr;

/// Case canonicalisation applied to every derived key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyCase {
    /// Use node names exactly as written in the document.
    #[default]
    Preserve,
    /// Lower-case the whole key.
    Lowercase,
}

impl KeyCase {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            KeyCase::Preserve => raw.to_string(),
            KeyCase::Lowercase => raw.to_lowercase(),
        }
    }
}

impl FromStr for KeyCase {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(KeyCase::Preserve),
            "lowercase" | "lower" => Ok(KeyCase::Lowercase),
            other => Err(EngineError::InvalidInput(format!(
                "unknown key case {other:?} (expected preserve or lowercase)"
            ))),
        }
    }
}

/// Which part of a node's position feeds its key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum KeyScope {
    /// The node's own name. Two leaves with the same name share a key.
    #[default]
    Name,
    /// Every name from the root to the node, joined with `separator`.
    Path { separator: String },
}

/// Maps a leaf to the base of its state key(s).
pub trait KeyStrategy {
    /// `path` runs from the document root to the leaf itself, so `path.last()` is `name`.
    fn base_key(&self, name: &str, path: &NodePath) -> String;
}

/// The built-in strategy: a scope followed by a case rule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyDeriver {
    case: KeyCase,
    scope: KeyScope,
}

impl KeyDeriver {
    pub fn new(case: KeyCase, scope: KeyScope) -> Self {
        Self { case, scope }
    }

    pub fn case(&self) -> KeyCase {
        self.case
    }

    pub fn scope(&self) -> &KeyScope {
        &self.scope
    }
}

impl KeyStrategy for KeyDeriver {
    fn base_key(&self, name: &str, path: &NodePath) -> String {
        match &self.scope {
            KeyScope::Name => self.case.apply(name),
            KeyScope::Path { separator } => self.case.apply(&path.names().join(separator)),
        }
    }
}

/// The state keys owned by one node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKeys {
    /// Groups and fixed-value leaves own nothing.
    None,
    Single(String),
    Composite { start: String, end: String },
}

impl FieldKeys {
    pub fn keys(&self) -> Vec<&str> {
        match self {
            FieldKeys::None => Vec::new(),
            FieldKeys::Single(key) => vec![key.as_str()],
            FieldKeys::Composite { start, end } => vec![start.as_str(), end.as_str()],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldKeys::None)
    }
}

fn composite_keys(base: &str) -> (String, String) {
    (format!("{base}{START_SUFFIX}"), format!("{base}{END_SUFFIX}"))
}

/// Derives the keys a node writes to.
pub fn derive_keys(node: &SchemaNode, path: &NodePath, strategy: &dyn KeyStrategy) -> FieldKeys {
    match node.leaf_spec() {
        Some(spec) => leaf_keys(node.name().as_str(), spec, path, strategy),
        None => FieldKeys::None,
    }
}

/// Derives the keys of a leaf from its name and attributes.
pub fn leaf_keys(
    name: &str,
    spec: &LeafSpec,
    path: &NodePath,
    strategy: &dyn KeyStrategy,
) -> FieldKeys {
    if spec.fixed_value.is_some() {
        return FieldKeys::None;
    }

    let base = strategy.base_key(name, path);
    if spec.input_kind.is_composite() {
        let (start, end) = composite_keys(&base);
        FieldKeys::Composite { start, end }
    } else {
        FieldKeys::Single(base)
    }
}

/// Every key the document declares, in pre-order, ignoring expand state.
///
/// Keys shared by several leaves appear once, at their first position.
pub fn declare_keys(document: &SchemaDocument, strategy: &dyn KeyStrategy) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for leaf in document.leaves() {
        for key in derive_keys(leaf.node, &leaf.path, strategy).keys() {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnknownInputPolicy;
    use crate::schema::InputKind;

    fn leaf(name: &str, kind: InputKind) -> SchemaNode {
        SchemaNode::leaf(name, LeafSpec::new(kind)).unwrap()
    }

    fn path_to(name: &str) -> NodePath {
        NodePath::root("Encounter").child(name)
    }

    #[test]
    fn test_composite_kinds_own_start_and_end() {
        let deriver = KeyDeriver::default();
        for kind in [InputKind::Date, InputKind::Range] {
            let keys = derive_keys(&leaf("issue date", kind), &path_to("issue date"), &deriver);
            assert_eq!(
                keys,
                FieldKeys::Composite {
                    start: "issue date-start".into(),
                    end: "issue date-end".into(),
                }
            );
        }
    }

    #[test]
    fn test_scalar_kinds_own_one_key() {
        let deriver = KeyDeriver::default();
        for kind in [
            InputKind::Text,
            InputKind::Number,
            InputKind::Boolean,
            InputKind::Select,
        ] {
            let keys = derive_keys(&leaf("problem", kind), &path_to("problem"), &deriver);
            assert_eq!(keys, FieldKeys::Single("problem".into()));
        }
    }

    #[test]
    fn test_fixed_value_owns_no_key() {
        let node = SchemaNode::leaf(
            "unit",
            LeafSpec::new(InputKind::Date).with_fixed_value("oncology"),
        )
        .unwrap();
        let keys = derive_keys(&node, &path_to("unit"), &KeyDeriver::default());
        assert!(keys.is_empty());
        assert!(keys.keys().is_empty());
    }

    #[test]
    fn test_groups_own_no_key() {
        let group = SchemaNode::group("Discharge", vec![leaf("reason", InputKind::Text)]).unwrap();
        assert_eq!(
            derive_keys(&group, &path_to("Discharge"), &KeyDeriver::default()),
            FieldKeys::None
        );
    }

    #[test]
    fn test_key_case_policy() {
        let preserve = KeyDeriver::new(KeyCase::Preserve, KeyScope::Name);
        let lower = KeyDeriver::new(KeyCase::Lowercase, KeyScope::Name);
        let node = leaf("Issue Date", InputKind::Date);

        assert_eq!(
            derive_keys(&node, &path_to("Issue Date"), &preserve).keys(),
            ["Issue Date-start", "Issue Date-end"]
        );
        assert_eq!(
            derive_keys(&node, &path_to("Issue Date"), &lower).keys(),
            ["issue date-start", "issue date-end"]
        );
    }

    #[test]
    fn test_path_scope_qualifies_keys() {
        let deriver = KeyDeriver::new(
            KeyCase::Lowercase,
            KeyScope::Path {
                separator: ".".into(),
            },
        );
        let path = NodePath::root("Encounter").child("Discharge").child("Date");
        let keys = derive_keys(&leaf("Date", InputKind::Date), &path, &deriver);
        assert_eq!(
            keys.keys(),
            ["encounter.discharge.date-start", "encounter.discharge.date-end"]
        );
    }

    #[test]
    fn test_key_case_parses_from_text() {
        assert_eq!("Lowercase".parse::<KeyCase>().unwrap(), KeyCase::Lowercase);
        assert_eq!(" preserve ".parse::<KeyCase>().unwrap(), KeyCase::Preserve);
        assert!("upper".parse::<KeyCase>().is_err());
    }

    #[test]
    fn test_declare_keys_matches_walk_and_deduplicates() {
        let doc = SchemaDocument::from_json_str(
            r#"{ "name": "Root", "children": [
                { "name": "date", "inputType": "date" },
                { "name": "Admission", "children": [ { "name": "date", "inputType": "date" } ] },
                { "name": "unit", "fixedValue": "icu" },
                { "name": "inpatient", "inputType": "boolean" }
            ] }"#,
            UnknownInputPolicy::default(),
        )
        .unwrap();

        let name_only = declare_keys(&doc, &KeyDeriver::default());
        assert_eq!(name_only, ["date-start", "date-end", "inpatient"]);

        let qualified = declare_keys(
            &doc,
            &KeyDeriver::new(
                KeyCase::Preserve,
                KeyScope::Path {
                    separator: "/".into(),
                },
            ),
        );
        assert_eq!(
            qualified,
            [
                "Root/date-start",
                "Root/date-end",
                "Root/Admission/date-start",
                "Root/Admission/date-end",
                "Root/inpatient",
            ]
        );
    }

    struct Shouting;

    impl KeyStrategy for Shouting {
        fn base_key(&self, name: &str, _path: &NodePath) -> String {
            name.to_uppercase()
        }
    }

    #[test]
    fn test_custom_strategy_plugs_in() {
        let keys = derive_keys(&leaf("age", InputKind::Range), &path_to("age"), &Shouting);
        assert_eq!(keys.keys(), ["AGE-start", "AGE-end"]);
    }
}
