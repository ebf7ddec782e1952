//! Value types shared between the form engine and the filter query client.
//!
//! The engine produces [`FormSnapshot`]s; the query client posts them. Keeping the snapshot
//! type here lets the client depend on the wire shape without pulling in the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// Schema node names are held as `NonEmptyText` so that every leaf has something to derive a
/// state key from. The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A captured filter value.
///
/// Text covers every string-valued control (free text, numbers, dates, range bounds and select
/// choices). Flags come from boolean controls. An undefined value is modelled as `None` by the
/// containers below rather than as a variant here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(flag) => Some(*flag),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Flag(value)
    }
}

/// By-value snapshot of the aggregate form state.
///
/// Serializes as a flat JSON object with one member per declared key. Undefined values are
/// written as `null` so that the receiving query service always sees the full key set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormSnapshot(BTreeMap<String, Option<FieldValue>>);

impl FormSnapshot {
    pub fn new(values: BTreeMap<String, Option<FieldValue>>) -> Self {
        Self(values)
    }

    /// Returns the value for `key`; `None` both when the key is undeclared and when it is unset.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key).and_then(Option::as_ref)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&FieldValue>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Option<FieldValue>> {
        self.0
    }
}

impl From<BTreeMap<String, Option<FieldValue>>> for FormSnapshot {
    fn from(values: BTreeMap<String, Option<FieldValue>>) -> Self {
        Self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_and_rejects_blank() {
        assert_eq!(NonEmptyText::new("  issue date ").unwrap().as_str(), "issue date");
        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
    }

    #[test]
    fn test_snapshot_serializes_unset_values_as_null() {
        let mut values = BTreeMap::new();
        values.insert("issue date-start".to_string(), Some(FieldValue::from("2024-01-05")));
        values.insert("issue date-end".to_string(), None);
        values.insert("inpatient".to_string(), Some(FieldValue::Flag(true)));

        let json = serde_json::to_value(FormSnapshot::new(values)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "inpatient": true,
                "issue date-end": null,
                "issue date-start": "2024-01-05",
            })
        );
    }

    #[test]
    fn test_snapshot_tracks_declared_but_unset_keys() {
        let mut values = BTreeMap::new();
        values.insert("state".to_string(), None);
        let snapshot = FormSnapshot::from(values);

        assert!(snapshot.contains_key("state"));
        assert!(snapshot.get("state").is_none());
        assert!(!snapshot.contains_key("problem"));
    }

    #[test]
    fn test_field_value_deserializes_untagged() {
        let text: FieldValue = serde_json::from_str("\"A\"").unwrap();
        let flag: FieldValue = serde_json::from_str("false").unwrap();
        assert_eq!(text.as_text(), Some("A"));
        assert_eq!(flag.as_flag(), Some(false));
    }
}
