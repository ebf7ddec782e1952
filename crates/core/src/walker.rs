//! Recursive descent over a schema document.
//!
//! Both walks are depth-first pre-order and stop at collapsed groups: the children of a
//! collapsed group are never visited, so no keys are derived and no controls are bound for
//! them. Their values stay in form state untouched.

use crate::dispatch::{bind, Control, CurrentValue};
use crate::expand::ExpandState;
use crate::form_state::FormState;
use crate::keys::KeyStrategy;
use crate::schema::{NodeId, NodePath, SchemaDocument, SchemaNode};

/// A group in the data-entry view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupView {
    pub id: NodeId,
    pub name: String,
    pub depth: usize,
    pub path: NodePath,
    pub help_text: Option<String>,
    pub expanded: bool,
    /// Empty when the group is collapsed.
    pub children: Vec<ViewNode>,
}

/// A leaf in the data-entry view, bound to its control and current value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldView {
    pub id: NodeId,
    pub name: String,
    pub depth: usize,
    pub path: NodePath,
    pub help_text: Option<String>,
    pub control: Control,
    pub current: CurrentValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewNode {
    Group(GroupView),
    Field(FieldView),
}

impl ViewNode {
    pub fn id(&self) -> &NodeId {
        match self {
            ViewNode::Group(group) => &group.id,
            ViewNode::Field(field) => &field.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ViewNode::Group(group) => &group.name,
            ViewNode::Field(field) => &field.name,
        }
    }

    /// Every rendered field, pre-order.
    pub fn fields(&self) -> Vec<&FieldView> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldView>) {
        match self {
            ViewNode::Field(field) => out.push(field),
            ViewNode::Group(group) => {
                for child in &group.children {
                    child.collect_fields(out);
                }
            }
        }
    }

    /// Keys bound by the rendered controls, pre-order.
    pub fn visible_keys(&self) -> Vec<String> {
        self.fields()
            .into_iter()
            .flat_map(|field| field.control.keys())
            .map(str::to_string)
            .collect()
    }

    pub fn visible_leaf_count(&self) -> usize {
        self.fields().len()
    }

    /// The rendered node with `id`, if it was visited.
    pub fn find(&self, id: &NodeId) -> Option<&ViewNode> {
        if self.id() == id {
            return Some(self);
        }
        match self {
            ViewNode::Group(group) => group.children.iter().find_map(|child| child.find(id)),
            ViewNode::Field(_) => None,
        }
    }
}

/// A row of the browse-only tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlineNode {
    pub id: NodeId,
    pub name: String,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    /// Rows in display order.
    pub fn rows(&self) -> Vec<&OutlineNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.rows());
        }
        out
    }

    pub fn visible_leaf_count(&self) -> usize {
        self.rows().iter().filter(|row| !row.has_children).count()
    }
}

/// Walks a document with one key strategy.
pub struct TreeWalker<'a> {
    strategy: &'a dyn KeyStrategy,
}

impl<'a> TreeWalker<'a> {
    pub fn new(strategy: &'a dyn KeyStrategy) -> Self {
        Self { strategy }
    }

    /// Builds the data-entry view of `document` against the current form and expand state.
    pub fn render(
        &self,
        document: &SchemaDocument,
        form: &FormState,
        expand: &ExpandState,
    ) -> ViewNode {
        let root = document.root();
        self.render_node(
            root,
            NodeId::root(),
            NodePath::root(root.name().as_str()),
            form,
            expand,
        )
    }

    fn render_node(
        &self,
        node: &SchemaNode,
        id: NodeId,
        path: NodePath,
        form: &FormState,
        expand: &ExpandState,
    ) -> ViewNode {
        let name = node.name().to_string();
        let help_text = node.help_text().map(str::to_string);
        let depth = id.depth();

        let Some(spec) = node.leaf_spec() else {
            let expanded = expand.is_expanded(&id);
            let children = if expanded {
                node.children()
                    .iter()
                    .enumerate()
                    .map(|(index, child)| {
                        self.render_node(
                            child,
                            id.child(index),
                            path.child(child.name().as_str()),
                            form,
                            expand,
                        )
                    })
                    .collect()
            } else {
                Vec::new()
            };
            return ViewNode::Group(GroupView {
                id,
                name,
                depth,
                path,
                help_text,
                expanded,
                children,
            });
        };

        let control = bind(&name, spec, &path, self.strategy);
        let current = control.current(form);
        ViewNode::Field(FieldView {
            id,
            name,
            depth,
            path,
            help_text,
            control,
            current,
        })
    }

    /// Builds the browse-only tree. Form state plays no part in it.
    pub fn outline(&self, document: &SchemaDocument, expand: &ExpandState) -> OutlineNode {
        outline_node(document.root(), NodeId::root(), expand)
    }
}

fn outline_node(node: &SchemaNode, id: NodeId, expand: &ExpandState) -> OutlineNode {
    let has_children = !node.children().is_empty();
    let expanded = has_children && expand.is_expanded(&id);
    let children = if expanded {
        node.children()
            .iter()
            .enumerate()
            .map(|(index, child)| outline_node(child, id.child(index), expand))
            .collect()
    } else {
        Vec::new()
    };

    OutlineNode {
        name: node.name().to_string(),
        depth: id.depth(),
        id,
        has_children,
        expanded,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnknownInputPolicy;
    use crate::expand::Expansion;
    use crate::keys::{declare_keys, KeyDeriver};
    use htable_types::FieldValue;

    fn document() -> SchemaDocument {
        SchemaDocument::from_json_str(
            r#"{ "name": "Encounter", "children": [
                { "name": "issue date", "inputType": "date" },
                { "name": "Discharge", "helpText": "Discharge details", "children": [
                    { "name": "reason", "inputType": "select", "values": ["home", "transfer"] },
                    { "name": "unit", "fixedValue": "oncology" }
                ]},
                { "name": "inpatient", "inputType": "boolean" }
            ] }"#,
            UnknownInputPolicy::default(),
        )
        .unwrap()
    }

    fn fresh_form(doc: &SchemaDocument) -> FormState {
        FormState::declare(declare_keys(doc, &KeyDeriver::default()))
    }

    #[test]
    fn test_render_binds_every_leaf_when_expanded() {
        let doc = document();
        let deriver = KeyDeriver::default();
        let view = TreeWalker::new(&deriver).render(
            &doc,
            &fresh_form(&doc),
            &ExpandState::new(Expansion::Expanded),
        );

        assert_eq!(view.visible_leaf_count(), 4);
        assert_eq!(
            view.visible_keys(),
            ["issue date-start", "issue date-end", "reason", "inpatient"]
        );

        let Some(ViewNode::Group(discharge)) = view.find(&"/1".parse().unwrap()) else {
            panic!("Discharge should render as a group");
        };
        assert_eq!(discharge.depth, 1);
        assert_eq!(discharge.help_text.as_deref(), Some("Discharge details"));

        let Some(ViewNode::Field(unit)) = view.find(&"/1/1".parse().unwrap()) else {
            panic!("unit should render as a field");
        };
        assert_eq!(unit.current, CurrentValue::Fixed("oncology".into()));
        assert_eq!(unit.path.to_string(), "Encounter / Discharge / unit");
    }

    #[test]
    fn test_collapsed_group_is_not_visited_but_keeps_values() {
        let doc = document();
        let deriver = KeyDeriver::default();
        let walker = TreeWalker::new(&deriver);
        let form = fresh_form(&doc).apply("reason", Some(FieldValue::from("home")));

        let mut expand = ExpandState::new(Expansion::Expanded);
        let discharge = "/1".parse().unwrap();
        expand.toggle(doc.node(&discharge).unwrap(), &discharge);

        let collapsed = walker.render(&doc, &form, &expand);
        assert!(!collapsed.visible_keys().contains(&"reason".to_string()));
        assert_eq!(form.text("reason"), Some("home"));

        expand.toggle(doc.node(&discharge).unwrap(), &discharge);
        let reopened = walker.render(&doc, &form, &expand);
        let Some(ViewNode::Field(reason)) = reopened.find(&"/1/0".parse().unwrap()) else {
            panic!("reason should be visible again");
        };
        assert_eq!(
            reason.current,
            CurrentValue::Single(Some(FieldValue::from("home")))
        );
    }

    #[test]
    fn test_collapsed_root_renders_nothing_below_it() {
        let doc = document();
        let deriver = KeyDeriver::default();
        let view = TreeWalker::new(&deriver).render(
            &doc,
            &fresh_form(&doc),
            &ExpandState::new(Expansion::Collapsed),
        );
        assert!(matches!(&view, ViewNode::Group(root) if !root.expanded && root.children.is_empty()));
        assert!(view.visible_keys().is_empty());
    }

    #[test]
    fn test_outline_defaults_and_pruning() {
        let doc = document();
        let deriver = KeyDeriver::default();
        let walker = TreeWalker::new(&deriver);

        let mut expand = ExpandState::new(Expansion::Collapsed);
        assert_eq!(walker.outline(&doc, &expand).rows().len(), 1);

        expand.toggle(doc.root(), &NodeId::root());
        let outline = walker.outline(&doc, &expand);
        let names: Vec<_> = outline.rows().iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, ["Encounter", "issue date", "Discharge", "inpatient"]);
        assert!(outline.children[1].has_children);
        assert!(!outline.children[1].expanded);
        assert!(!outline.children[0].has_children);
        assert_eq!(outline.visible_leaf_count(), 2);
    }
}
