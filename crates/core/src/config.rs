//! Engine configuration.
//!
//! Configuration is resolved once (typically at process startup, from flags or environment
//! values read by the binary) and then passed into each [`crate::FormSession`]. The engine
//! itself never reads environment variables.

use crate::constants::DEFAULT_PATH_SEPARATOR;
use crate::error::{EngineError, EngineResult};
use crate::expand::Expansion;
use crate::keys::{KeyCase, KeyDeriver, KeyScope};

/// What to do with an `inputType` the engine does not recognise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownInputPolicy {
    /// Treat the leaf as free text and log a warning.
    #[default]
    FallBackToText,
    /// Fail the document load with `EngineError::UnknownInputKind`.
    Reject,
}

/// Engine configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    default_expansion: Expansion,
    key_case: KeyCase,
    key_scope: KeyScope,
    unknown_inputs: UnknownInputPolicy,
    strict_dates: bool,
}

impl EngineConfig {
    /// Create a new `EngineConfig`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` if `key_scope` is path-qualified with an empty
    /// separator.
    pub fn new(
        default_expansion: Expansion,
        key_case: KeyCase,
        key_scope: KeyScope,
        unknown_inputs: UnknownInputPolicy,
        strict_dates: bool,
    ) -> EngineResult<Self> {
        validate_key_scope(&key_scope)?;

        Ok(Self {
            default_expansion,
            key_case,
            key_scope,
            unknown_inputs,
            strict_dates,
        })
    }

    /// Defaults for a data-entry form: every group starts expanded.
    pub fn form() -> Self {
        Self {
            default_expansion: Expansion::Expanded,
            key_case: KeyCase::default(),
            key_scope: KeyScope::default(),
            unknown_inputs: UnknownInputPolicy::default(),
            strict_dates: false,
        }
    }

    /// Defaults for a browse-only outline: every group starts collapsed.
    pub fn browse() -> Self {
        Self {
            default_expansion: Expansion::Collapsed,
            ..Self::form()
        }
    }

    pub fn with_default_expansion(mut self, default_expansion: Expansion) -> Self {
        self.default_expansion = default_expansion;
        self
    }

    pub fn with_key_case(mut self, key_case: KeyCase) -> Self {
        self.key_case = key_case;
        self
    }

    /// # Errors
    ///
    /// As for [`EngineConfig::new`].
    pub fn with_key_scope(mut self, key_scope: KeyScope) -> EngineResult<Self> {
        validate_key_scope(&key_scope)?;
        self.key_scope = key_scope;
        Ok(self)
    }

    pub fn with_unknown_inputs(mut self, unknown_inputs: UnknownInputPolicy) -> Self {
        self.unknown_inputs = unknown_inputs;
        self
    }

    pub fn with_strict_dates(mut self, strict_dates: bool) -> Self {
        self.strict_dates = strict_dates;
        self
    }

    pub fn default_expansion(&self) -> Expansion {
        self.default_expansion
    }

    pub fn key_case(&self) -> KeyCase {
        self.key_case
    }

    pub fn key_scope(&self) -> &KeyScope {
        &self.key_scope
    }

    pub fn unknown_inputs(&self) -> UnknownInputPolicy {
        self.unknown_inputs
    }

    pub fn strict_dates(&self) -> bool {
        self.strict_dates
    }

    /// The built-in key strategy described by this configuration.
    pub fn key_deriver(&self) -> KeyDeriver {
        KeyDeriver::new(self.key_case, self.key_scope.clone())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::form()
    }
}

fn validate_key_scope(key_scope: &KeyScope) -> EngineResult<()> {
    if let KeyScope::Path { separator } = key_scope {
        if separator.is_empty() {
            return Err(EngineError::InvalidInput(
                "path-qualified keys need a non-empty separator".into(),
            ));
        }
    }
    Ok(())
}

/// Path-qualified key scope with the default separator.
pub fn path_scope() -> KeyScope {
    KeyScope::Path {
        separator: DEFAULT_PATH_SEPARATOR.into(),
    }
}

/// Parse the key case from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`KeyCase::Preserve`].
pub fn key_case_from_env_value(value: Option<String>) -> EngineResult<KeyCase> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<KeyCase>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}

/// Parse a default expansion from an optional string value, falling back to `fallback` when
/// the value is absent or blank.
pub fn expansion_from_env_value(
    value: Option<String>,
    fallback: Expansion,
) -> EngineResult<Expansion> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<Expansion>()).transpose()?;

    Ok(parsed.unwrap_or(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_and_browse_defaults_differ_only_in_expansion() {
        let form = EngineConfig::form();
        let browse = EngineConfig::browse();
        assert_eq!(form.default_expansion(), Expansion::Expanded);
        assert_eq!(browse.default_expansion(), Expansion::Collapsed);
        assert_eq!(form.with_default_expansion(Expansion::Collapsed), browse);
    }

    #[test]
    fn test_new_rejects_empty_separator() {
        let err = EngineConfig::new(
            Expansion::Expanded,
            KeyCase::Preserve,
            KeyScope::Path {
                separator: String::new(),
            },
            UnknownInputPolicy::default(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(msg) if msg.contains("separator")));

        assert!(EngineConfig::form().with_key_scope(path_scope()).is_ok());
    }

    #[test]
    fn test_key_case_from_env_value() {
        assert_eq!(key_case_from_env_value(None).unwrap(), KeyCase::Preserve);
        assert_eq!(
            key_case_from_env_value(Some("   ".into())).unwrap(),
            KeyCase::Preserve
        );
        assert_eq!(
            key_case_from_env_value(Some("lowercase".into())).unwrap(),
            KeyCase::Lowercase
        );
        assert!(key_case_from_env_value(Some("camel".into())).is_err());
    }

    #[test]
    fn test_expansion_from_env_value() {
        assert_eq!(
            expansion_from_env_value(None, Expansion::Collapsed).unwrap(),
            Expansion::Collapsed
        );
        assert_eq!(
            expansion_from_env_value(Some("expanded".into()), Expansion::Collapsed).unwrap(),
            Expansion::Expanded
        );
    }
}
