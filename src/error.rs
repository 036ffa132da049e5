//! Error types for grammar compilation and document validation

use thiserror::Error;

/// Result type for grammar and validation operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Grammar and validation errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The grammar itself is malformed (subtype without type, bad predicate, ...)
    #[error("Invalid grammar node: {0}")]
    Construction(String),

    #[error("Duplicate child segment \"{key}\"")]
    DuplicateKey { key: String },

    #[error("Type mismatch: found {found}, expected {expected}")]
    TypeMismatch { found: String, expected: String },

    /// `found` lists every distinct offending element type, sorted
    #[error("Subtype mismatch in {primary}: found {}, expected {expected}", .found.join(", "))]
    SubtypeMismatch {
        primary: String,
        found: Vec<String>,
        expected: String,
    },

    #[error("Predicate failed: {actual} {mode} {expected}")]
    PredicateMismatch {
        actual: String,
        mode: String,
        expected: String,
    },

    #[error("Missing required key: {key}")]
    MissingRequiredKey { key: String },

    #[error("{path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: Box<SchemaError>,
    },

    #[error("Unknown grammar tree \"{0}\"")]
    UnknownTree(String),

    #[error("Unknown statistic type: {0}")]
    UnknownStatType(String),

    /// Validated data that the catalog still cannot reconcile
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    /// Wrap an error with the document path it was raised for
    pub fn at(path: impl Into<String>, source: SchemaError) -> Self {
        SchemaError::Parse {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Path of a `Parse` error, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            SchemaError::Parse { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Innermost error beneath any `Parse` wrapping
    pub fn root_cause(&self) -> &SchemaError {
        let mut current = self;
        while let SchemaError::Parse { source, .. } = current {
            current = source.as_ref();
        }
        current
    }

    /// Whether this error (or its root cause) came from a failed data check
    /// rather than a malformed grammar
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self.root_cause(),
            SchemaError::TypeMismatch { .. }
                | SchemaError::SubtypeMismatch { .. }
                | SchemaError::PredicateMismatch { .. }
                | SchemaError::MissingRequiredKey { .. }
                | SchemaError::UnknownStatType(_)
        )
    }
}
