//! One live view over a schema document.
//!
//! A [`FormSession`] ties together the document, the key strategy, the form-state reducer
//! and the expand state of a single view instance. It is single-threaded: every method runs
//! to completion synchronously and none of them perform I/O.

use crate::config::EngineConfig;
use crate::dispatch::{bind, Control, EditTarget, RawInput};
use crate::error::{EngineError, EngineResult};
use crate::expand::ExpandState;
use crate::form_state::{FormState, FormStateReducer};
use crate::keys::{declare_keys, KeyStrategy};
use crate::schema::{LocatedNode, NodeId, SchemaDocument};
use crate::walker::{OutlineNode, TreeWalker, ViewNode};
use htable_types::FormSnapshot;
use std::collections::HashMap;
use std::sync::Arc;

/// The leaf, and side of it, that writes to a given key.
#[derive(Clone, Debug, PartialEq, Eq)]
struct KeyOwner {
    node: NodeId,
    target: EditTarget,
}

pub struct FormSession {
    document: Arc<SchemaDocument>,
    config: EngineConfig,
    strategy: Box<dyn KeyStrategy>,
    key_index: HashMap<String, Vec<KeyOwner>>,
    reducer: FormStateReducer,
    expand: ExpandState,
}

impl FormSession {
    /// Starts a session using the key strategy described by `config`.
    pub fn new(document: Arc<SchemaDocument>, config: EngineConfig) -> Self {
        let strategy = Box::new(config.key_deriver());
        Self::with_strategy(document, config, strategy)
    }

    /// Starts a session with a caller-supplied key strategy.
    ///
    /// Every declared key starts unset and every group starts in the configured default
    /// expansion.
    pub fn with_strategy(
        document: Arc<SchemaDocument>,
        config: EngineConfig,
        strategy: Box<dyn KeyStrategy>,
    ) -> Self {
        let key_index = index_keys(&document, strategy.as_ref());
        for (key, owners) in &key_index {
            if owners.len() > 1 {
                let nodes: Vec<String> = owners.iter().map(|o| o.node.to_string()).collect();
                tracing::warn!(
                    "state key {:?} is shared by {} fields ({}); their edits overwrite each other",
                    key,
                    owners.len(),
                    nodes.join(", ")
                );
            }
        }

        let initial = FormState::declare(declare_keys(&document, strategy.as_ref()));
        tracing::debug!(
            "starting form session over {:?} with {} keys",
            document.root().name().as_str(),
            initial.len()
        );

        Self {
            expand: ExpandState::new(config.default_expansion()),
            reducer: FormStateReducer::new(initial),
            document,
            config,
            strategy,
            key_index,
        }
    }

    pub fn document(&self) -> &SchemaDocument {
        &self.document
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The data-entry view as it stands now.
    pub fn view(&self) -> ViewNode {
        TreeWalker::new(self.strategy.as_ref()).render(
            &self.document,
            self.reducer.state(),
            &self.expand,
        )
    }

    /// The browse-only tree as it stands now.
    pub fn outline(&self) -> OutlineNode {
        TreeWalker::new(self.strategy.as_ref()).outline(&self.document, &self.expand)
    }

    /// Flips a group's expand state. Returns the new state, or `None` if `id` is a leaf.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownNode` if `id` does not name a node.
    pub fn toggle(&mut self, id: &NodeId) -> EngineResult<Option<bool>> {
        let node = self
            .document
            .node(id)
            .ok_or_else(|| EngineError::UnknownNode(id.to_string()))?;
        Ok(self.expand.toggle(node, id))
    }

    /// Sets a group's expand state directly. Returns `false` if `id` is a leaf.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownNode` if `id` does not name a node.
    pub fn set_expanded(&mut self, id: &NodeId, expanded: bool) -> EngineResult<bool> {
        let node = self
            .document
            .node(id)
            .ok_or_else(|| EngineError::UnknownNode(id.to_string()))?;
        Ok(self.expand.set_expanded(node, id, expanded))
    }

    pub fn expand_all(&mut self) {
        self.expand.expand_all(&self.document);
    }

    pub fn collapse_all(&mut self) {
        self.expand.collapse_all(&self.document);
    }

    /// Applies one edit event to the leaf at `id`.
    ///
    /// Returns the key that changed, or `None` when the leaf is read-only. Leaves inside
    /// collapsed groups can still be edited.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownNode` for an unknown id or a group, and the errors of
    /// [`Control::extract`] when the edit does not fit the leaf's control.
    pub fn edit(
        &mut self,
        id: &NodeId,
        target: EditTarget,
        input: RawInput,
    ) -> EngineResult<Option<String>> {
        let control = self.control_at(id)?;
        let Some(edit) = control.extract(target, input, self.config.strict_dates())? else {
            return Ok(None);
        };
        self.reducer.apply(&edit.key, edit.value);
        Ok(Some(edit.key))
    }

    /// Applies an edit addressed by state key rather than node id.
    ///
    /// When several leaves share the key, the first in document order receives the edit.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownKey` if no leaf writes to `key`, otherwise as for
    /// [`FormSession::edit`].
    pub fn edit_key(&mut self, key: &str, input: RawInput) -> EngineResult<()> {
        let owner = self
            .key_index
            .get(key)
            .and_then(|owners| owners.first())
            .cloned()
            .ok_or_else(|| EngineError::UnknownKey(key.to_string()))?;
        self.edit(&owner.node, owner.target, input)?;
        Ok(())
    }

    /// Registers the observer told about every edit, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl FnMut(FormSnapshot) + 'static) {
        self.reducer.set_observer(observer);
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.reducer.state().snapshot()
    }

    pub fn state(&self) -> &FormState {
        self.reducer.state()
    }

    pub fn expand_state(&self) -> &ExpandState {
        &self.expand
    }

    /// Every declared key, in document order.
    pub fn declared_keys(&self) -> Vec<String> {
        declare_keys(&self.document, self.strategy.as_ref())
    }

    fn control_at(&self, id: &NodeId) -> EngineResult<Control> {
        let LocatedNode { path, node, .. } = self
            .document
            .locate(id)
            .ok_or_else(|| EngineError::UnknownNode(id.to_string()))?;
        let spec = node
            .leaf_spec()
            .ok_or_else(|| EngineError::UnknownNode(format!("{id} is a group, not a field")))?;
        Ok(bind(node.name().as_str(), spec, &path, self.strategy.as_ref()))
    }
}

impl std::fmt::Debug for FormSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSession")
            .field("root", &self.document.root().name().as_str())
            .field("config", &self.config)
            .field("reducer", &self.reducer)
            .field("expand", &self.expand)
            .finish()
    }
}

fn index_keys(
    document: &SchemaDocument,
    strategy: &dyn KeyStrategy,
) -> HashMap<String, Vec<KeyOwner>> {
    let mut index: HashMap<String, Vec<KeyOwner>> = HashMap::new();
    for leaf in document.leaves() {
        let Some(spec) = leaf.node.leaf_spec() else {
            continue;
        };
        let owned = match bind(leaf.node.name().as_str(), spec, &leaf.path, strategy) {
            Control::ReadOnly { .. } => Vec::new(),
            Control::DateRange { start, end } | Control::NumericRange { start, end } => {
                vec![(start, EditTarget::Start), (end, EditTarget::End)]
            }
            Control::Number { key }
            | Control::Boolean { key }
            | Control::Select { key, .. }
            | Control::FreeText { key } => vec![(key, EditTarget::Value)],
        };
        for (key, target) in owned {
            index.entry(key).or_default().push(KeyOwner {
                node: leaf.id.clone(),
                target,
            });
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{path_scope, UnknownInputPolicy};
    use crate::dispatch::CurrentValue;
    use crate::expand::Expansion;
    use htable_types::FieldValue;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn load(json: &str) -> Arc<SchemaDocument> {
        Arc::new(SchemaDocument::from_json_str(json, UnknownInputPolicy::default()).unwrap())
    }

    fn encounter() -> Arc<SchemaDocument> {
        load(r#"{ "name": "Encounter", "children": [ { "name": "issue date", "inputType": "date" } ] }"#)
    }

    #[test]
    fn test_issue_date_scenario() {
        let mut session = FormSession::new(encounter(), EngineConfig::form());

        let initial = session.snapshot();
        assert_eq!(initial.len(), 2);
        assert!(initial.contains_key("issue date-start"));
        assert!(initial.get("issue date-start").is_none());
        assert!(initial.get("issue date-end").is_none());

        let seen: Rc<RefCell<Vec<FormSnapshot>>> = Rc::default();
        let sink = Rc::clone(&seen);
        session.set_observer(move |snapshot| sink.borrow_mut().push(snapshot));

        let changed = session
            .edit(
                &"/0".parse().unwrap(),
                EditTarget::Start,
                RawInput::text("2024-01-05"),
            )
            .unwrap();
        assert_eq!(changed.as_deref(), Some("issue date-start"));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            serde_json::to_value(&seen[0]).unwrap(),
            serde_json::json!({ "issue date-start": "2024-01-05", "issue date-end": null })
        );
        assert_eq!(seen[0], session.snapshot());
    }

    #[test]
    fn test_select_then_clear_returns_to_empty() {
        let mut session = FormSession::new(
            load(r#"{ "name": "Root", "children": [ { "name": "state", "inputType": "select", "values": ["A", "B"] } ] }"#),
            EngineConfig::form(),
        );
        assert!(session.state().get("state").is_none());

        session.edit_key("state", RawInput::text("B")).unwrap();
        assert_eq!(session.state().text("state"), Some("B"));

        session.edit_key("state", RawInput::text("")).unwrap();
        assert!(session.state().get("state").is_none());
        assert!(session.snapshot().contains_key("state"));
    }

    #[test]
    fn test_read_only_leaf_edit_is_a_no_op() {
        let mut session = FormSession::new(
            load(r#"{ "name": "Root", "children": [ { "name": "unit", "fixedValue": "icu" } ] }"#),
            EngineConfig::form(),
        );
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        session.set_observer(move |_| *counter.borrow_mut() += 1);

        let changed = session
            .edit(&"/0".parse().unwrap(), EditTarget::Value, RawInput::text("ward"))
            .unwrap();
        assert_eq!(changed, None);
        assert_eq!(*calls.borrow(), 0);
        assert!(session.snapshot().is_empty());
        assert!(matches!(
            session.edit_key("unit", RawInput::text("ward")),
            Err(EngineError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_unknown_ids_and_groups() {
        let mut session = FormSession::new(encounter(), EngineConfig::form());
        assert!(matches!(
            session.toggle(&"/9".parse().unwrap()),
            Err(EngineError::UnknownNode(_))
        ));
        assert!(matches!(
            session.edit(&NodeId::root(), EditTarget::Value, RawInput::text("x")),
            Err(EngineError::UnknownNode(_))
        ));
        assert_eq!(session.toggle(&"/0".parse().unwrap()).unwrap(), None);
    }

    #[test]
    fn test_edits_inside_collapsed_group_are_accepted() {
        let mut session = FormSession::new(
            load(r#"{ "name": "Root", "children": [
                { "name": "Vitals", "children": [ { "name": "pulse", "inputType": "range" } ] }
            ] }"#),
            EngineConfig::browse(),
        );
        assert!(session.view().visible_keys().is_empty());

        session.edit_key("pulse-end", RawInput::text("120")).unwrap();
        assert_eq!(session.state().text("pulse-end"), Some("120"));

        session.expand_all();
        let view = session.view();
        let pulse = view.fields()[0];
        assert_eq!(
            pulse.current,
            CurrentValue::Range {
                start: None,
                end: Some(FieldValue::from("120")),
            }
        );

        session.collapse_all();
        assert_eq!(session.expand_state(), &ExpandState::new(Expansion::Collapsed));
        assert_eq!(session.state().text("pulse-end"), Some("120"));
    }

    #[test]
    fn test_path_scope_separates_same_named_leaves() {
        let json = r#"{ "name": "Root", "children": [
            { "name": "Admission", "children": [ { "name": "date", "inputType": "date" } ] },
            { "name": "Discharge", "children": [ { "name": "date", "inputType": "date" } ] }
        ] }"#;

        let shared = FormSession::new(load(json), EngineConfig::form());
        assert_eq!(shared.declared_keys(), ["date-start", "date-end"]);

        let config = EngineConfig::form().with_key_scope(path_scope()).unwrap();
        let mut qualified = FormSession::new(load(json), config);
        assert_eq!(qualified.declared_keys().len(), 4);

        qualified
            .edit_key("Root.Discharge.date-start", RawInput::text("2024-03-01"))
            .unwrap();
        assert!(qualified.state().get("Root.Admission.date-start").is_none());
    }

    #[test]
    fn test_strict_dates_reject_malformed_input() {
        let mut session = FormSession::new(encounter(), EngineConfig::form().with_strict_dates(true));
        let err = session
            .edit_key("issue date-end", RawInput::text("2024-13-40"))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidDate { .. }));
        assert!(session.state().get("issue date-end").is_none());
    }

    #[test]
    fn test_lowercase_policy_applies_to_declaration_and_walk() {
        let config = EngineConfig::form().with_key_case(crate::keys::KeyCase::Lowercase);
        let session = FormSession::new(
            load(r#"{ "name": "Root", "children": [ { "name": "Issue Date", "inputType": "date" } ] }"#),
            config,
        );
        assert_eq!(session.declared_keys(), session.view().visible_keys());
        assert_eq!(session.declared_keys(), ["issue date-start", "issue date-end"]);
    }
}
