//! Input dispatch: choosing a control for each leaf and turning raw edits into state changes.
//!
//! Control selection is an exhaustive match over [`InputKind`]; unknown document tags are
//! resolved to `Text` when the document is loaded, so nothing here deals with strings.

use crate::constants::ISO_DATE_FORMAT;
use crate::error::{EngineError, EngineResult};
use crate::form_state::FormState;
use crate::keys::{leaf_keys, FieldKeys, KeyStrategy};
use crate::schema::{InputKind, LeafSpec, NodePath};
use chrono::NaiveDate;
use htable_types::FieldValue;

/// The control behaviours a leaf can be rendered with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKind {
    ReadOnly,
    DateRange,
    NumericRange,
    Number,
    Boolean,
    Select,
    FreeText,
}

impl ControlKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlKind::ReadOnly => "read-only",
            ControlKind::DateRange => "date range",
            ControlKind::NumericRange => "numeric range",
            ControlKind::Number => "number",
            ControlKind::Boolean => "boolean",
            ControlKind::Select => "select",
            ControlKind::FreeText => "free text",
        }
    }
}

/// Picks the control for a leaf. A fixed value wins over any declared input type.
pub fn choose_control(spec: &LeafSpec) -> ControlKind {
    if spec.fixed_value.is_some() {
        return ControlKind::ReadOnly;
    }
    match spec.input_kind {
        InputKind::Date => ControlKind::DateRange,
        InputKind::Range => ControlKind::NumericRange,
        InputKind::Number => ControlKind::Number,
        InputKind::Boolean => ControlKind::Boolean,
        InputKind::Select => ControlKind::Select,
        InputKind::Text => ControlKind::FreeText,
    }
}

/// A control bound to the state key(s) it reads and writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Control {
    ReadOnly { value: String },
    DateRange { start: String, end: String },
    NumericRange { start: String, end: String },
    Number { key: String },
    Boolean { key: String },
    Select { key: String, options: Vec<String> },
    FreeText { key: String },
}

/// Binds a leaf to its control. Keys come from [`leaf_keys`], the same derivation used to
/// declare form state.
pub fn bind(name: &str, spec: &LeafSpec, path: &NodePath, strategy: &dyn KeyStrategy) -> Control {
    match leaf_keys(name, spec, path, strategy) {
        FieldKeys::None => Control::ReadOnly {
            value: spec.fixed_value.clone().unwrap_or_default(),
        },
        FieldKeys::Composite { start, end } => match spec.input_kind {
            InputKind::Date => Control::DateRange { start, end },
            _ => Control::NumericRange { start, end },
        },
        FieldKeys::Single(key) => match spec.input_kind {
            InputKind::Number => Control::Number { key },
            InputKind::Boolean => Control::Boolean { key },
            InputKind::Select => Control::Select {
                key,
                options: spec.values.clone(),
            },
            _ => Control::FreeText { key },
        },
    }
}

/// True for a zero-padded `YYYY-MM-DD` calendar date.
fn is_iso_date(text: &str) -> bool {
    NaiveDate::parse_from_str(text, ISO_DATE_FORMAT)
        .map(|date| date.format(ISO_DATE_FORMAT).to_string() == text)
        .unwrap_or(false)
}

/// Which part of a control an edit is aimed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EditTarget {
    /// The single value of a scalar control.
    Value,
    /// The first half of a date or numeric range.
    Start,
    /// The second half of a date or numeric range.
    End,
}

/// A value as it arrives from the input element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawInput {
    Text(String),
    Flag(bool),
}

impl RawInput {
    pub fn text(value: impl Into<String>) -> Self {
        RawInput::Text(value.into())
    }
}

/// The state change produced by one edit event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    pub key: String,
    pub value: Option<FieldValue>,
}

/// What a control currently shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CurrentValue {
    Fixed(String),
    Single(Option<FieldValue>),
    Flag(bool),
    Range {
        start: Option<FieldValue>,
        end: Option<FieldValue>,
    },
}

impl Control {
    pub fn kind(&self) -> ControlKind {
        match self {
            Control::ReadOnly { .. } => ControlKind::ReadOnly,
            Control::DateRange { .. } => ControlKind::DateRange,
            Control::NumericRange { .. } => ControlKind::NumericRange,
            Control::Number { .. } => ControlKind::Number,
            Control::Boolean { .. } => ControlKind::Boolean,
            Control::Select { .. } => ControlKind::Select,
            Control::FreeText { .. } => ControlKind::FreeText,
        }
    }

    /// State keys this control is bound to; empty for read-only controls.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Control::ReadOnly { .. } => Vec::new(),
            Control::DateRange { start, end } | Control::NumericRange { start, end } => {
                vec![start.as_str(), end.as_str()]
            }
            Control::Number { key }
            | Control::Boolean { key }
            | Control::Select { key, .. }
            | Control::FreeText { key } => vec![key.as_str()],
        }
    }

    /// Reads the bound value(s) out of `form`.
    pub fn current(&self, form: &FormState) -> CurrentValue {
        match self {
            Control::ReadOnly { value } => CurrentValue::Fixed(value.clone()),
            Control::DateRange { start, end } | Control::NumericRange { start, end } => {
                CurrentValue::Range {
                    start: form.get(start).cloned(),
                    end: form.get(end).cloned(),
                }
            }
            Control::Boolean { key } => CurrentValue::Flag(form.flag(key)),
            Control::Number { key } | Control::Select { key, .. } | Control::FreeText { key } => {
                CurrentValue::Single(form.get(key).cloned())
            }
        }
    }

    /// Turns a raw edit into the `(key, value)` pair to fold into form state.
    ///
    /// Returns `Ok(None)` for read-only controls: they never produce edits. Values are passed
    /// through as captured except that an empty date or select means "unset"; with
    /// `strict_dates` a non-empty date must also be a `YYYY-MM-DD` calendar date.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::EditMismatch` when the target or input shape does not fit the
    /// control, and `EngineError::InvalidDate` for malformed dates under `strict_dates`.
    pub fn extract(
        &self,
        target: EditTarget,
        input: RawInput,
        strict_dates: bool,
    ) -> EngineResult<Option<Edit>> {
        let edit = match self {
            Control::ReadOnly { value } => {
                tracing::debug!("ignoring edit of read-only field showing {:?}", value);
                return Ok(None);
            }
            Control::DateRange { start, end } => {
                let key = self.side(start, end, target)?;
                let text = self.expect_text(input)?;
                let value = if text.is_empty() {
                    None
                } else {
                    if strict_dates && !is_iso_date(&text) {
                        return Err(EngineError::InvalidDate {
                            key: key.to_string(),
                            value: text,
                        });
                    }
                    Some(FieldValue::Text(text))
                };
                Edit {
                    key: key.to_string(),
                    value,
                }
            }
            Control::NumericRange { start, end } => {
                let key = self.side(start, end, target)?;
                Edit {
                    key: key.to_string(),
                    value: Some(FieldValue::Text(self.expect_text(input)?)),
                }
            }
            Control::Number { key } | Control::FreeText { key } => {
                self.expect_value_target(target)?;
                Edit {
                    key: key.clone(),
                    value: Some(FieldValue::Text(self.expect_text(input)?)),
                }
            }
            Control::Boolean { key } => {
                self.expect_value_target(target)?;
                let flag = match input {
                    RawInput::Flag(flag) => flag,
                    RawInput::Text(text) => match text.trim() {
                        "true" => true,
                        "false" => false,
                        other => {
                            return Err(self.mismatch(format!("{other:?} is not true or false")))
                        }
                    },
                };
                Edit {
                    key: key.clone(),
                    value: Some(FieldValue::Flag(flag)),
                }
            }
            Control::Select { key, .. } => {
                self.expect_value_target(target)?;
                let text = self.expect_text(input)?;
                Edit {
                    key: key.clone(),
                    value: (!text.is_empty()).then_some(FieldValue::Text(text)),
                }
            }
        };
        Ok(Some(edit))
    }

    fn side<'a>(&self, start: &'a str, end: &'a str, target: EditTarget) -> EngineResult<&'a str> {
        match target {
            EditTarget::Start => Ok(start),
            EditTarget::End => Ok(end),
            EditTarget::Value => Err(self.mismatch("range edits must name the start or end".into())),
        }
    }

    fn expect_value_target(&self, target: EditTarget) -> EngineResult<()> {
        if target == EditTarget::Value {
            Ok(())
        } else {
            Err(self.mismatch(format!("{target:?} only applies to range controls")))
        }
    }

    fn expect_text(&self, input: RawInput) -> EngineResult<String> {
        match input {
            RawInput::Text(text) => Ok(text),
            RawInput::Flag(_) => Err(self.mismatch("expected text, got a flag".into())),
        }
    }

    fn mismatch(&self, reason: String) -> EngineError {
        EngineError::EditMismatch {
            field: self.keys().first().map(|k| k.to_string()).unwrap_or_default(),
            control: self.kind().as_str(),
            reason,
        }
    }
}
