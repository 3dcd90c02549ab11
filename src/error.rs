//! Error types shared by the compiler and the runtime containers.
use thiserror::Error;

/// Malformed or self-contradictory schema input. Always fatal to a compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown field type `{kind}` at `{path}`")]
    UnknownKind { kind: String, path: String },

    #[error("malformed descriptor at `{path}`: {reason}")]
    Malformed { path: String, reason: String },

    #[error("date format `{format}` lists layout `{layout}` more than once")]
    DuplicateDateLayout { format: String, layout: String },

    #[error("date format `{format}` has more than one epoch marker")]
    DuplicateEpochMarker { format: String },

    #[error("date format `{format}` has no string layout")]
    EmptyDateFormat { format: String },

    #[error("preferred date format `{preferred}` is not one of {compiled:?}")]
    PreferredFormatNotCompiled { preferred: String, compiled: Vec<String> },

    #[error("bad date pattern `{pattern}`: {reason}")]
    BadDatePattern { pattern: String, reason: String },

    #[error("unknown aggregate metric `{metric}` at `{path}`")]
    UnknownMetric { metric: String, path: String },
}

impl SchemaError {
    /// `Malformed` at the dotted form of `path` (empty for the document root).
    pub fn malformed(path: &[String], reason: impl Into<String>) -> Self {
        SchemaError::Malformed { path: path.join("."), reason: reason.into() }
    }
}

/// Type naming failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    /// Only raised when the naming strategy is configured to fail on overlap.
    #[error("type name `{name}` (from `{path}`) overlaps an already generated type")]
    Overlap { name: String, path: String },

    #[error("type name `{name}` collides at the document root; no parent segment to disambiguate")]
    RootCollision { name: String },

    #[error("cannot generate a type name from an empty path")]
    EmptyPath,
}

/// Everything [`crate::compiler::compile`] can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Naming(#[from] NamingError),

    #[error("at `{path}`: {source}")]
    At {
        path: String,
        #[source]
        source: Box<CompileError>,
    },
}

impl CompileError {
    pub fn at(path: &[String], err: impl Into<CompileError>) -> Self {
        let err = err.into();
        match err {
            // already carries a location
            CompileError::At { .. } => err,
            other => CompileError::At { path: path.join("."), source: Box::new(other) },
        }
    }
}

/// Misuse of a strict [`crate::field::Field`] accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldStateError {
    #[error("field is undefined")]
    Undefined,
    #[error("field is null")]
    Null,
    #[error("field is present but holds no value")]
    Empty,
}

/// A raw value that does not have any of the shapes a type accepts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value for {type_name}: expected one of {accepted:?}, got `{raw}`")]
pub struct ValueShapeError {
    pub raw: String,
    pub accepted: Vec<String>,
    pub type_name: String,
}

impl ValueShapeError {
    pub fn new(raw: impl Into<String>, accepted: &[&str], type_name: impl Into<String>) -> Self {
        ValueShapeError {
            raw: raw.into(),
            accepted: accepted.iter().map(|s| s.to_string()).collect(),
            type_name: type_name.into(),
        }
    }
}

/// No compiled layout accepted a date string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{input}` matches no layout: {}", .attempts.iter().map(|(l, e)| format!("{l} ({e})")).collect::<Vec<_>>().join("; "))]
pub struct DateParseError {
    pub input: String,
    /// `(canonical layout, error)` per attempted layout, in attempt order.
    pub attempts: Vec<(String, String)>,
}

/// Runtime decoding failure of a date leaf.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateValueError {
    #[error(transparent)]
    Parse(#[from] DateParseError),
    #[error(transparent)]
    Shape(#[from] ValueShapeError),
    #[error("epoch value {0} is out of range")]
    OutOfRange(i64),
    #[error("year {0} is outside 0000-9999")]
    YearOutOfRange(i32),
    #[error("date does not fit the marshal layout")]
    Format(#[from] std::fmt::Error),
}

/// Failure of the schema-driven codec in [`crate::dynamic`].
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("no type named `{0}` in the forest")]
    UnknownType(String),

    #[error("at `{path}`: {source}")]
    Shape {
        path: String,
        #[source]
        source: ValueShapeError,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A configuration document that failed to deserialize.
#[derive(Debug, Error)]
#[error("at JSON path {path} → {source}")]
pub struct ConfigError {
    /// `serde_path_to_error` rendering, `.` for the document root.
    pub path: String,
    #[source]
    pub source: serde_json::Error,
}
