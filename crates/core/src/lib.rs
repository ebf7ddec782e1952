//! # htable core
//!
//! Schema-driven form and browse-tree engine for clinical record filters.
//!
//! This crate turns a declarative field tree into:
//! - a flat, observable form state (one key per editable leaf, two for date and range leaves)
//! - a data-entry view that binds each visible leaf to the right control
//! - a browse-only outline with per-group expand/collapse state
//!
//! **No I/O beyond reading schema files**: posting form state to the query service belongs in
//! `htable-query`, and anything process-level (flags, environment, logging setup) belongs in
//! the `htable` binary.

pub mod config;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod expand;
pub mod form_state;
pub mod keys;
pub mod schema;
pub mod session;
pub mod walker;

pub use config::{EngineConfig, UnknownInputPolicy};
pub use dispatch::{choose_control, Control, ControlKind, CurrentValue, EditTarget, RawInput};
pub use error::{EngineError, EngineResult};
pub use expand::{ExpandState, Expansion};
pub use form_state::{FormState, FormStateReducer};
pub use keys::{
    declare_keys, derive_keys, leaf_keys, FieldKeys, KeyCase, KeyDeriver, KeyScope, KeyStrategy,
};
pub use schema::{InputKind, NodeId, NodePath, SchemaDocument, SchemaNode};
pub use session::FormSession;
pub use walker::{OutlineNode, TreeWalker, ViewNode};

pub use htable_types::{FieldValue, FormSnapshot, NonEmptyText};
