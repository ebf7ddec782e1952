#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("schema violation at {path}: {reason}")]
    SchemaViolation { path: String, reason: String },
    #[error("unknown input type {value:?} at {path}")]
    UnknownInputKind { path: String, value: String },
    #[error("schema document mismatch at {path}: {reason}")]
    SchemaParse { path: String, reason: String },
    #[error("unsupported schema document format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to read schema document: {0}")]
    FileRead(std::io::Error),

    #[error("no schema node with id {0}")]
    UnknownNode(String),
    #[error("no field owns the key {0:?}")]
    UnknownKey(String),
    #[error("edit does not fit the {control} control for {field}: {reason}")]
    EditMismatch {
        field: String,
        control: &'static str,
        reason: String,
    },
    #[error("invalid date {value:?} for {key} (expected YYYY-MM-DD)")]
    InvalidDate { key: String, value: String },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
