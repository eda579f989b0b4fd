//! A JSON Schema 2020-12 compiler and validator.
//!
//! Schemas are compiled once into a flat arena of [`ir::SchemaNode`]s addressed by
//! stable [`ir::NodeId`]s, then validated against as many instances as you like
//! without re-walking the schema document itself.
//!
//! ```rust
//! use jsonschema::{CompileOptions, JsonSchema};
//! use serde_json::json;
//!
//! let schema = json!({"type": "string", "minLength": 3});
//! let compiled = JsonSchema::compile(&schema, CompileOptions::default()).unwrap();
//!
//! assert!(compiled.is_valid(&json!("abc")));
//! assert!(!compiled.is_valid(&json!("ab")));
//!
//! let result = compiled.validate(&json!(42));
//! assert!(!result.valid);
//! for error in &result.errors {
//!     eprintln!("{error}");
//! }
//! ```
//!
//! Remote `$ref`s are never fetched unless the caller supplies a [`referencing::Retrieve`]
//! implementation via [`CompileOptions::retriever`]; the default performs no I/O at all.

mod compiler;
mod ecma;
pub mod error;
mod format;
pub mod ir;
mod options;
pub mod paths;
mod validator;

pub use error::{SchemaCompilationError, ValidationError, ValidationResult};
pub use ir::{NodeId, SchemaNode};
pub use options::CompileOptions;
pub use referencing::{DefaultRetriever, FetchPolicy, InMemoryRetriever, Retrieve};

/// A schema compiled into its arena-based intermediate representation, ready to
/// validate any number of instances.
#[derive(Debug)]
pub struct CompiledSchema {
    pub(crate) arena: Vec<ir::SchemaNode>,
    pub(crate) root: ir::NodeId,
    pub(crate) max_depth: usize,
    pub(crate) assert_formats: bool,
}

/// Entry point for compiling a JSON Schema document.
pub struct JsonSchema;

impl JsonSchema {
    /// Compile `schema` under `options` into a reusable [`CompiledSchema`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaCompilationError`] if the schema is malformed, a `$ref` cannot
    /// be resolved, a fatal reference-only cycle exists, or a remote document fetch
    /// fails or is denied by the configured fetch policy.
    pub fn compile(
        schema: &value::Value,
        options: CompileOptions,
    ) -> Result<CompiledSchema, SchemaCompilationError> {
        compiler::build_validator(schema, &options)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn compiles_and_validates_a_flat_schema() {
        let schema = json!({"type": "integer", "minimum": 0});
        let compiled = JsonSchema::compile(&schema, CompileOptions::default()).unwrap();

        assert!(compiled.is_valid(&json!(5)));
        assert!(!compiled.is_valid(&json!(-1)));
        assert!(!compiled.is_valid(&json!("5")));
    }

    #[test]
    fn validate_collects_every_error_not_just_the_first() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string", "minLength": 1}}
        });
        let compiled = JsonSchema::compile(&schema, CompileOptions::default()).unwrap();

        let result = compiled.validate(&json!({"name": ""}));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn malformed_schema_is_rejected_at_compile_time() {
        let schema = json!({"$ref": "#/$defs/missing"});
        let result = JsonSchema::compile(&schema, CompileOptions::default());
        assert!(result.is_err());
    }
}
