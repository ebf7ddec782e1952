//! Constants used throughout the engine crate.

/// Suffix of the first state key owned by a composite (date or range) field.
pub const START_SUFFIX: &str = "-start";

/// Suffix of the second state key owned by a composite (date or range) field.
pub const END_SUFFIX: &str = "-end";

/// Separator used by path-qualified keys when none is configured.
pub const DEFAULT_PATH_SEPARATOR: &str = ".";

/// Separator used when displaying a node path to people (logs, errors).
pub const PATH_DISPLAY_SEPARATOR: &str = " / ";

/// Placeholder path used in errors raised against the document root.
pub const ROOT_PATH_LABEL: &str = "<root>";

/// Calendar date format accepted by date controls when strict dates are enabled.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
