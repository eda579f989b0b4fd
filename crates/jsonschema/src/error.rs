//! Error types surfaced by compilation, plus the validation result's error payload.

use core::fmt;

use referencing::{Error as ReferencingError, RemoteResolutionError};

use crate::paths::JsonPointer;

/// A compile-time failure, naming the schema pointer at which it occurred.
#[derive(Debug)]
pub enum SchemaCompilationError {
    /// The schema document itself is malformed (wrong JSON shape for a keyword).
    Syntax {
        schema_path: JsonPointer,
        message: String,
    },
    /// A `$ref` could not be resolved to any node.
    UnresolvedRef {
        schema_path: JsonPointer,
        reference: String,
    },
    /// A `$ref`/`$dynamicRef`-only cycle was detected with no intervening assertion.
    CyclicRef {
        schema_path: JsonPointer,
        reference: String,
    },
    /// Fetching or enforcing policy over a remote document failed.
    Remote(RemoteResolutionError),
    /// Reserved for forward compatibility; never raised for spec-defined keywords.
    UnsupportedKeyword {
        schema_path: JsonPointer,
        keyword: String,
    },
}

impl fmt::Display for SchemaCompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaCompilationError::Syntax { schema_path, message } => {
                write!(f, "at '{schema_path}': {message}")
            }
            SchemaCompilationError::UnresolvedRef { schema_path, reference } => {
                write!(f, "at '{schema_path}': unresolved reference '{reference}'")
            }
            SchemaCompilationError::CyclicRef { schema_path, reference } => {
                write!(f, "at '{schema_path}': cyclic reference '{reference}' with no intervening assertion")
            }
            SchemaCompilationError::Remote(err) => write!(f, "{err}"),
            SchemaCompilationError::UnsupportedKeyword { schema_path, keyword } => {
                write!(f, "at '{schema_path}': unsupported keyword '{keyword}'")
            }
        }
    }
}

impl std::error::Error for SchemaCompilationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchemaCompilationError::Remote(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RemoteResolutionError> for SchemaCompilationError {
    fn from(error: RemoteResolutionError) -> Self {
        SchemaCompilationError::Remote(error)
    }
}

impl From<ReferencingError> for SchemaCompilationError {
    fn from(error: ReferencingError) -> Self {
        match error {
            ReferencingError::Remote(err) => SchemaCompilationError::Remote(err),
            other => SchemaCompilationError::Syntax {
                schema_path: JsonPointer::root(),
                message: other.to_string(),
            },
        }
    }
}

/// Discriminates the handful of validation failures callers may need to branch on
/// programmatically, as opposed to ones only meant to be read as a `message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationErrorKind {
    /// A keyword assertion failed; the failure is fully described by `message`.
    General,
    /// The walker's recursion depth guard tripped. At most one error of this kind
    /// ever appears in a [`ValidationResult`], regardless of how many schema
    /// branches independently would have exceeded the limit.
    RecursionLimitExceeded,
}

/// One validation failure, carrying both the instance and schema location.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationError {
    #[serde(rename = "instancePath")]
    pub instance_path: JsonPointer,
    #[serde(rename = "schemaPath")]
    pub schema_path: JsonPointer,
    pub message: String,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    #[must_use]
    pub fn new(instance_path: JsonPointer, schema_path: JsonPointer, message: impl Into<String>) -> Self {
        ValidationError {
            instance_path,
            schema_path,
            message: message.into(),
            kind: ValidationErrorKind::General,
        }
    }

    /// An error reporting that the walker's recursion depth guard tripped.
    #[must_use]
    pub fn recursion_limit_exceeded(instance_path: JsonPointer, schema_path: JsonPointer) -> Self {
        ValidationError {
            instance_path,
            schema_path,
            message: "exceeded the maximum allowed schema recursion depth".to_string(),
            kind: ValidationErrorKind::RecursionLimitExceeded,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (instance: '{}', schema: '{}')", self.message, self.instance_path, self.schema_path)
    }
}

impl std::error::Error for ValidationError {}

/// The outcome of validating one instance against a compiled schema.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    #[must_use]
    pub fn valid() -> Self {
        ValidationResult {
            valid: true,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        ValidationResult {
            valid: errors.is_empty(),
            errors,
        }
    }
}
