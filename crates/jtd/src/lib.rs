//! An RFC 8927 (JSON Type Definition) schema compiler and validator: `compiler`
//! turns a schema document into a [`model::Node`] tree in two passes so `ref`
//! can see every definition regardless of declaration order, and `validator`
//! walks that tree against an instance, collecting every violation as an
//! `(instancePath, schemaPath)` pair in pre-order.
//!
//! ```rust
//! use jtd::Jtd;
//! use serde_json::json;
//!
//! let schema = Jtd::compile(&json!({"properties": {"a": {"type": "string"}}})).unwrap();
//! let errors = schema.validate(&json!({"a": 1, "b": 2}));
//! assert_eq!(errors.len(), 2);
//! assert_eq!(errors[0].instance_path, "/a");
//! assert_eq!(errors[0].schema_path, "/properties/a/type");
//! assert_eq!(errors[1].instance_path, "/b");
//! assert_eq!(errors[1].schema_path, "/additionalProperties");
//! ```

mod compiler;
pub mod error;
pub mod model;
mod validator;

pub use error::{JtdError, JtdSchemaError};
pub use model::{Node, TypeKeyword};

use std::collections::BTreeMap;

use value::Value;

/// Entry point for compiling a schema document.
pub struct Jtd;

impl Jtd {
    /// Compile `schema`, rejecting malformed documents before any instance is validated.
    pub fn compile(schema: &Value) -> Result<CompiledJtd, JtdSchemaError> {
        let (root, definitions) = compiler::compile(schema)?;
        Ok(CompiledJtd { root, definitions })
    }
}

/// A compiled schema, ready to validate any number of instances.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledJtd {
    root: Node,
    definitions: BTreeMap<String, Node>,
}

impl CompiledJtd {
    /// Validate `instance`, returning every violation found by a pre-order
    /// walk of the schema. An empty result means the instance is valid.
    #[must_use]
    pub fn validate(&self, instance: &Value) -> Vec<JtdError> {
        validator::validate(&self.root, &self.definitions, instance)
    }

    /// Convenience wrapper over [`CompiledJtd::validate`] for callers that only
    /// care whether the instance is valid.
    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test]
    fn empty_schema_accepts_anything() {
        let schema = Jtd::compile(&json!({})).unwrap();
        assert!(schema.is_valid(&json!(42)));
        assert!(schema.is_valid(&json!(null)));
    }

    #[test]
    fn type_mismatch_reports_root_path() {
        let schema = Jtd::compile(&json!({"type": "string"})).unwrap();
        let errors = schema.validate(&json!(42));
        assert_eq!(errors, vec![JtdError { instance_path: String::new(), schema_path: "/type".into() }]);
    }

    #[test_case(json!(127), true; "int8 upper bound")]
    #[test_case(json!(-128), true; "int8 lower bound")]
    #[test_case(json!(128), false; "int8 overflow")]
    #[test_case(json!(1.5), false; "int8 fractional")]
    fn integer_range_is_enforced(instance: Value, expected_valid: bool) {
        let schema = Jtd::compile(&json!({"type": "int8"})).unwrap();
        assert_eq!(schema.is_valid(&instance), expected_valid);
    }

    #[test_case("2024-01-05T12:30:00Z", true; "basic utc")]
    #[test_case("2024-01-05T12:30:00.123Z", true; "fractional seconds")]
    #[test_case("2024-01-05T12:30:00+05:30", true; "explicit offset")]
    #[test_case("2024-01-05T23:59:60Z", true; "leap second normalized")]
    #[test_case("not-a-timestamp", false; "garbage")]
    #[test_case("2024-13-05T12:30:00Z", false; "invalid month")]
    fn timestamp_follows_rfc3339(value: &str, expected_valid: bool) {
        let schema = Jtd::compile(&json!({"type": "timestamp"})).unwrap();
        assert_eq!(schema.is_valid(&json!(value)), expected_valid);
    }

    #[test]
    fn enum_rejects_values_outside_the_listed_set() {
        let schema = Jtd::compile(&json!({"enum": ["DRAFT", "PUBLISHED"]})).unwrap();
        assert!(schema.is_valid(&json!("DRAFT")));
        assert!(!schema.is_valid(&json!("ARCHIVED")));
    }

    #[test]
    fn elements_validates_each_item_with_an_indexed_path() {
        let schema = Jtd::compile(&json!({"elements": {"type": "uint8"}})).unwrap();
        let errors = schema.validate(&json!([1, 300, 3]));
        assert_eq!(errors, vec![JtdError { instance_path: "/1".into(), schema_path: "/elements/type".into() }]);
    }

    #[test]
    fn values_validates_every_member_with_a_keyed_path() {
        let schema = Jtd::compile(&json!({"values": {"type": "boolean"}})).unwrap();
        let errors = schema.validate(&json!({"a": true, "b": 1}));
        assert_eq!(errors, vec![JtdError { instance_path: "/b".into(), schema_path: "/values/type".into() }]);
    }

    #[test]
    fn properties_reports_missing_required_and_rejected_additional_keys() {
        let schema = Jtd::compile(&json!({"properties": {"a": {"type": "string"}}})).unwrap();
        let errors = schema.validate(&json!({"a": 1, "b": 2}));
        assert_eq!(
            errors,
            vec![
                JtdError { instance_path: "/a".into(), schema_path: "/properties/a/type".into() },
                JtdError { instance_path: "/b".into(), schema_path: "/additionalProperties".into() },
            ]
        );
    }

    #[test]
    fn properties_allows_additional_keys_when_opted_in() {
        let schema = Jtd::compile(&json!({"properties": {"a": {"type": "string"}}, "additionalProperties": true})).unwrap();
        assert!(schema.is_valid(&json!({"a": "x", "b": 2})));
    }

    #[test]
    fn missing_required_property_is_reported_at_its_own_path() {
        let schema = Jtd::compile(&json!({"properties": {"a": {"type": "string"}}})).unwrap();
        let errors = schema.validate(&json!({}));
        assert_eq!(errors, vec![JtdError { instance_path: String::new(), schema_path: "/properties/a".into() }]);
    }

    #[test]
    fn nullable_accepts_null_and_otherwise_defers_to_the_inner_schema() {
        let schema = Jtd::compile(&json!({"type": "string", "nullable": true})).unwrap();
        assert!(schema.is_valid(&json!(null)));
        assert!(schema.is_valid(&json!("x")));
        assert!(!schema.is_valid(&json!(1)));
    }

    #[test]
    fn ref_resolves_into_definitions_regardless_of_declaration_order() {
        let schema = Jtd::compile(&json!({
            "definitions": {"address": {"type": "string"}},
            "properties": {"home": {"ref": "address"}}
        }))
        .unwrap();
        assert!(schema.is_valid(&json!({"home": "1 Main St"})));
        assert!(!schema.is_valid(&json!({"home": 1})));
    }

    #[test]
    fn discriminator_routes_to_the_mapped_variant_and_hides_the_tag() {
        let schema = Jtd::compile(&json!({
            "discriminator": "type",
            "mapping": {
                "cat": {"properties": {"meow": {"type": "boolean"}}},
                "dog": {"properties": {"bark": {"type": "boolean"}}}
            }
        }))
        .unwrap();
        assert!(schema.is_valid(&json!({"type": "cat", "meow": true})));
        assert!(!schema.is_valid(&json!({"type": "cat", "meow": "loud"})));
        assert!(!schema.is_valid(&json!({"type": "fox", "meow": true})));
    }

    #[test]
    fn rejects_schemas_with_more_than_one_form() {
        let error = Jtd::compile(&json!({"type": "string", "enum": ["a"]})).unwrap_err();
        assert!(matches!(error, JtdSchemaError::MultipleForms(_)));
    }

    #[test]
    fn rejects_duplicate_enum_values() {
        assert_eq!(Jtd::compile(&json!({"enum": ["a", "a"]})).unwrap_err(), JtdSchemaError::EnumDuplicates);
    }

    #[test]
    fn rejects_unresolvable_refs() {
        assert_eq!(
            Jtd::compile(&json!({"ref": "missing"})).unwrap_err(),
            JtdSchemaError::RefNotFound("missing".into())
        );
    }

    #[test]
    fn rejects_definitions_outside_the_root() {
        let error = Jtd::compile(&json!({"elements": {"definitions": {}, "type": "string"}})).unwrap_err();
        assert_eq!(error, JtdSchemaError::DefinitionsInNonRoot);
    }

    #[test]
    fn rejects_overlapping_required_and_optional_properties() {
        let error = Jtd::compile(&json!({"properties": {"x": {}}, "optionalProperties": {"x": {}}})).unwrap_err();
        assert_eq!(error, JtdSchemaError::OverlappingProperties("x".into()));
    }

    #[test]
    fn rejects_a_discriminator_mapping_that_shadows_the_tag() {
        let error = Jtd::compile(&json!({
            "discriminator": "type",
            "mapping": {"cat": {"properties": {"type": {"type": "string"}}}}
        }))
        .unwrap_err();
        assert_eq!(error, JtdSchemaError::TagInVariant("type".into()));
    }
}
