//! Compile-time schema errors and the error pairs a validation run produces.

use core::fmt;

/// A malformed schema document, caught before any instance is validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JtdSchemaError {
    NotAnObject,
    DefinitionsNotObject,
    /// `definitions` appeared on a schema other than the document root.
    DefinitionsInNonRoot,
    /// More than one of the eight schema forms was present on one node.
    MultipleForms(Vec<String>),
    RefNotString,
    RefNotFound(String),
    TypeNotString,
    UnknownType(String),
    /// `enum` was missing, empty, or contained a non-string element.
    InvalidEnum,
    EnumDuplicates,
    /// The same key appeared in both `properties` and `optionalProperties`.
    OverlappingProperties(String),
    DiscriminatorNotString,
    MissingMapping,
    /// A `discriminator.mapping` value was not itself a Properties form.
    MappingNotProperties,
    /// A mapped variant's property set shadowed the discriminator's own tag.
    TagInVariant(String),
}

impl fmt::Display for JtdSchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JtdSchemaError::NotAnObject => write!(f, "schema must be a JSON object"),
            JtdSchemaError::DefinitionsNotObject => write!(f, "definitions must be a JSON object"),
            JtdSchemaError::DefinitionsInNonRoot => write!(f, "definitions must only appear at the schema root"),
            JtdSchemaError::MultipleForms(forms) => write!(f, "schema has multiple forms: {forms:?}"),
            JtdSchemaError::RefNotString => write!(f, "ref must be a string"),
            JtdSchemaError::RefNotFound(name) => write!(f, "ref '{name}' not found in definitions"),
            JtdSchemaError::TypeNotString => write!(f, "type must be a string"),
            JtdSchemaError::UnknownType(name) => write!(f, "unknown type keyword '{name}'"),
            JtdSchemaError::InvalidEnum => write!(f, "enum must be a non-empty array of strings"),
            JtdSchemaError::EnumDuplicates => write!(f, "enum contains duplicate values"),
            JtdSchemaError::OverlappingProperties(name) => {
                write!(f, "'{name}' is in both properties and optionalProperties")
            }
            JtdSchemaError::DiscriminatorNotString => write!(f, "discriminator must be a string"),
            JtdSchemaError::MissingMapping => write!(f, "discriminator schema must have a mapping object"),
            JtdSchemaError::MappingNotProperties => write!(f, "discriminator mapping values must be Properties forms"),
            JtdSchemaError::TagInVariant(tag) => {
                write!(f, "discriminator tag '{tag}' must not appear in a mapped variant's properties")
            }
        }
    }
}

impl std::error::Error for JtdSchemaError {}

/// One validation failure: the instance location and the schema keyword that
/// rejected it, both as slash-delimited JSON-pointer strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JtdError {
    pub instance_path: String,
    pub schema_path: String,
}
