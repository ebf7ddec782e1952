//! Per-group expand/collapse state.
//!
//! Visibility is tracked separately from form values: nothing here reads or writes form
//! state, and form edits never change what is expanded.

use crate::error::EngineError;
use crate::schema::{NodeId, SchemaDocument, SchemaNode};
use std::collections::HashMap;
use std::str::FromStr;

/// The state a group starts in before anyone toggles it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expansion {
    Collapsed,
    Expanded,
}

impl Expansion {
    pub fn is_expanded(self) -> bool {
        self == Expansion::Expanded
    }
}

impl FromStr for Expansion {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "collapsed" => Ok(Expansion::Collapsed),
            "expanded" => Ok(Expansion::Expanded),
            other => Err(EngineError::InvalidInput(format!(
                "unknown expansion {other:?} (expected collapsed or expanded)"
            ))),
        }
    }
}

/// Expanded/collapsed flags for the groups of one view.
///
/// Only groups that differ from the default are stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpandState {
    default: Expansion,
    overrides: HashMap<NodeId, bool>,
}

impl ExpandState {
    pub fn new(default: Expansion) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn default_expansion(&self) -> Expansion {
        self.default
    }

    pub fn is_expanded(&self, id: &NodeId) -> bool {
        self.overrides
            .get(id)
            .copied()
            .unwrap_or(self.default.is_expanded())
    }

    /// Flips a group between expanded and collapsed and returns the new state.
    ///
    /// Leaves have no expand affordance: toggling one changes nothing and returns `None`.
    pub fn toggle(&mut self, node: &SchemaNode, id: &NodeId) -> Option<bool> {
        if !node.is_group() {
            return None;
        }
        let expanded = !self.is_expanded(id);
        self.store(id, expanded);
        tracing::debug!("toggled group {} to expanded={}", id, expanded);
        Some(expanded)
    }

    /// Sets a group's state directly. Returns `false` (and does nothing) for leaves.
    pub fn set_expanded(&mut self, node: &SchemaNode, id: &NodeId, expanded: bool) -> bool {
        if !node.is_group() {
            return false;
        }
        self.store(id, expanded);
        true
    }

    pub fn expand_all(&mut self, document: &SchemaDocument) {
        self.set_all(document, true);
    }

    pub fn collapse_all(&mut self, document: &SchemaDocument) {
        self.set_all(document, false);
    }

    fn set_all(&mut self, document: &SchemaDocument, expanded: bool) {
        self.overrides.clear();
        if self.default.is_expanded() == expanded {
            return;
        }
        for group in document.groups() {
            self.overrides.insert(group.id, expanded);
        }
    }

    fn store(&mut self, id: &NodeId, expanded: bool) {
        if expanded == self.default.is_expanded() {
            self.overrides.remove(id);
        } else {
            self.overrides.insert(id.clone(), expanded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnknownInputPolicy;

    fn document() -> SchemaDocument {
        SchemaDocument::from_json_str(
            r#"{ "name": "Root", "children": [
                { "name": "A", "children": [ { "name": "a1" } ] },
                { "name": "B", "children": [ { "name": "b1" } ] },
                { "name": "leaf" }
            ] }"#,
            UnknownInputPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_default_policy_is_configurable() {
        let id = NodeId::root().child(0);
        assert!(!ExpandState::new(Expansion::Collapsed).is_expanded(&id));
        assert!(ExpandState::new(Expansion::Expanded).is_expanded(&id));
    }

    #[test]
    fn test_toggle_twice_restores_original() {
        let doc = document();
        for default in [Expansion::Collapsed, Expansion::Expanded] {
            let mut state = ExpandState::new(default);
            let id = NodeId::root().child(0);
            let node = doc.node(&id).unwrap();

            let before = state.is_expanded(&id);
            assert_eq!(state.toggle(node, &id), Some(!before));
            assert_eq!(state.toggle(node, &id), Some(before));
            assert_eq!(state, ExpandState::new(default));
        }
    }

    #[test]
    fn test_toggling_a_leaf_is_a_no_op() {
        let doc = document();
        let mut state = ExpandState::new(Expansion::Collapsed);
        let id = NodeId::root().child(2);

        assert_eq!(state.toggle(doc.node(&id).unwrap(), &id), None);
        assert_eq!(state, ExpandState::new(Expansion::Collapsed));
    }

    #[test]
    fn test_siblings_toggle_independently() {
        let doc = document();
        let mut state = ExpandState::new(Expansion::Collapsed);
        let a = NodeId::root().child(0);
        let b = NodeId::root().child(1);

        state.toggle(doc.node(&a).unwrap(), &a);
        assert!(state.is_expanded(&a));
        assert!(!state.is_expanded(&b));
    }

    #[test]
    fn test_expand_and_collapse_all() {
        let doc = document();
        let mut state = ExpandState::new(Expansion::Collapsed);

        state.expand_all(&doc);
        assert!(doc.groups().iter().all(|g| state.is_expanded(&g.id)));

        state.collapse_all(&doc);
        assert_eq!(state, ExpandState::new(Expansion::Collapsed));
    }

    #[test]
    fn test_expansion_parses_from_text() {
        assert_eq!("Expanded".parse::<Expansion>().unwrap(), Expansion::Expanded);
        assert!("open".parse::<Expansion>().is_err());
    }
}
