//! Aggregate form state and the reducer that folds edits into it.
//!
//! [`FormState`] is a value: [`FormState::apply`] returns a new state and leaves the old one
//! untouched. [`FormStateReducer`] owns the current state of one view and tells an optional
//! observer about every change, passing a by-value [`FormSnapshot`] so the observer cannot
//! reach back into the reducer.

use htable_types::{FieldValue, FormSnapshot};
use std::collections::BTreeMap;
use std::fmt;

/// Flat key → value mapping. `None` means the key is declared but undefined.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormState {
    values: BTreeMap<String, Option<FieldValue>>,
}

impl FormState {
    /// A state with every key in `keys` declared and undefined.
    pub fn declare<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: keys.into_iter().map(|k| (k.into(), None)).collect(),
        }
    }

    /// Returns a new state equal to this one except that `key` maps to `value`.
    pub fn apply(&self, key: &str, value: Option<FieldValue>) -> FormState {
        let mut values = self.values.clone();
        values.insert(key.to_string(), value);
        FormState { values }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key).and_then(Option::as_ref)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    /// Reads a boolean field. Absent, undefined and non-flag values all read as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(FieldValue::as_flag).unwrap_or(false)
    }

    pub fn is_declared(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot::new(self.values.clone())
    }
}

type Observer = Box<dyn FnMut(FormSnapshot)>;

/// Owns the current form state of one view and notifies an observer after every edit.
///
/// Edits are applied one at a time, in the order they are received; there is no batching.
pub struct FormStateReducer {
    state: FormState,
    observer: Option<Observer>,
}

impl FormStateReducer {
    pub fn new(initial: FormState) -> Self {
        Self {
            state: initial,
            observer: None,
        }
    }

    /// Registers the observer, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl FnMut(FormSnapshot) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Folds one edit into the state, then notifies the observer with the full new state.
    pub fn apply(&mut self, key: &str, value: Option<FieldValue>) -> &FormState {
        if !self.state.is_declared(key) {
            tracing::warn!("edit writes undeclared key {:?}", key);
        }
        self.state = self.state.apply(key, value);
        tracing::debug!("applied edit to {:?}", key);

        if let Some(observer) = self.observer.as_mut() {
            observer(self.state.snapshot());
        }
        &self.state
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }
}

impl fmt::Debug for FormStateReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormStateReducer")
            .field("state", &self.state)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
