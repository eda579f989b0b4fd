//! Walks the compiled IR against an instance, accumulating [`ValidationError`]s and
//! the evaluated-location bookkeeping that `unevaluatedProperties`/`unevaluatedItems` need.

use std::collections::HashSet;
use std::sync::Arc;

use referencing::List;
use value::Value;

use crate::{
    error::ValidationError,
    format,
    ir::{NodeId, RefTarget, SchemaNode},
    paths::JsonPointer,
    CompiledSchema,
};

/// One schema resource currently in scope during a top-down walk, named by the
/// `$dynamicAnchor` it declared. `$dynamicRef` resolves against this stack rather
/// than the static compile-time binding whenever a same-named anchor is in scope.
struct DynamicScopeFrame {
    anchor: String,
    node: NodeId,
}

#[derive(Default)]
struct Evaluated {
    properties: HashSet<String>,
    items: HashSet<usize>,
}

impl Evaluated {
    fn merge(&mut self, other: Evaluated) {
        self.properties.extend(other.properties);
        self.items.extend(other.items);
    }
}

struct Walker<'a> {
    schema: &'a CompiledSchema,
}

impl CompiledSchema {
    /// Validate `instance`, collecting every failure rather than stopping at the first.
    #[must_use]
    pub fn validate(&self, instance: &Value) -> crate::error::ValidationResult {
        let mut errors = Vec::new();
        let walker = Walker { schema: self };
        walker.run(
            self.root,
            instance,
            &JsonPointer::root(),
            &JsonPointer::root(),
            &List::new(),
            0,
            &mut errors,
        );
        crate::error::ValidationResult::from_errors(errors)
    }

    /// Like [`CompiledSchema::validate`] but stops at the first failure.
    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).valid
    }
}

impl<'a> Walker<'a> {
    fn node(&self, id: NodeId) -> &SchemaNode {
        &self.schema.arena[id.index()]
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        &self,
        node_id: NodeId,
        instance: &Value,
        instance_path: &JsonPointer,
        schema_path: &JsonPointer,
        scope: &List<DynamicScopeFrame>,
        depth: usize,
        errors: &mut Vec<ValidationError>,
    ) -> Evaluated {
        if errors
            .iter()
            .any(|e| e.kind == crate::error::ValidationErrorKind::RecursionLimitExceeded)
        {
            return Evaluated::default();
        }

        if depth > self.schema.max_depth {
            errors.push(ValidationError::recursion_limit_exceeded(
                instance_path.clone(),
                schema_path.clone(),
            ));
            return Evaluated::default();
        }

        match self.node(node_id) {
            SchemaNode::True => Evaluated::default(),
            SchemaNode::False => {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.clone(),
                    "no instance is valid against a `false` schema",
                ));
                Evaluated::default()
            }
            SchemaNode::Keywords(bag) => {
                let scope = match &bag.dynamic_anchor {
                    Some(anchor) => scope.push_front(Arc::new(DynamicScopeFrame {
                        anchor: anchor.clone(),
                        node: node_id,
                    })),
                    None => scope.clone(),
                };

                let mut evaluated = Evaluated::default();

                if let Some(types) = &bag.types {
                    if !types.is_empty() && !types.iter().any(|ty| matches_type(instance, *ty)) {
                        errors.push(ValidationError::new(
                            instance_path.clone(),
                            schema_path.push("type"),
                            format!("Expected {}, got {instance}", describe_types(types)),
                        ));
                    }
                }

                if let Some(values) = &bag.enum_values {
                    if !values.iter().any(|allowed| value::equal(allowed, instance)) {
                        errors.push(ValidationError::new(
                            instance_path.clone(),
                            schema_path.push("enum"),
                            format!("{instance} does not match any value in the enum"),
                        ));
                    }
                }
                if let Some(expected) = &bag.const_value {
                    if !value::equal(expected, instance) {
                        errors.push(ValidationError::new(
                            instance_path.clone(),
                            schema_path.push("const"),
                            format!("{instance} does not equal the const value"),
                        ));
                    }
                }

                self.check_numeric(bag, instance, instance_path, schema_path, errors);
                self.check_string(bag, instance, instance_path, schema_path, errors);
                self.check_array(
                    bag,
                    instance,
                    instance_path,
                    schema_path,
                    &scope,
                    depth,
                    errors,
                    &mut evaluated,
                );
                self.check_object(
                    bag,
                    instance,
                    instance_path,
                    schema_path,
                    &scope,
                    depth,
                    errors,
                    &mut evaluated,
                );

                for (i, branch) in bag.all_of.iter().enumerate() {
                    let branch_evaluated = self.run(
                        *branch,
                        instance,
                        instance_path,
                        &schema_path.push("allOf").push(i),
                        &scope,
                        depth + 1,
                        errors,
                    );
                    evaluated.merge(branch_evaluated);
                }

                if !bag.any_of.is_empty() {
                    let mut any_valid = false;
                    let mut collected = Evaluated::default();
                    for (i, branch) in bag.any_of.iter().enumerate() {
                        let mut local_errors = Vec::new();
                        let branch_evaluated = self.run(
                            *branch,
                            instance,
                            instance_path,
                            &schema_path.push("anyOf").push(i),
                            &scope,
                            depth + 1,
                            &mut local_errors,
                        );
                        if local_errors.is_empty() {
                            any_valid = true;
                            collected.merge(branch_evaluated);
                        }
                    }
                    if any_valid {
                        evaluated.merge(collected);
                    } else {
                        errors.push(ValidationError::new(
                            instance_path.clone(),
                            schema_path.push("anyOf"),
                            "instance does not match any subschema in anyOf",
                        ));
                    }
                }

                if !bag.one_of.is_empty() {
                    let mut matches = Vec::new();
                    for (i, branch) in bag.one_of.iter().enumerate() {
                        let mut local_errors = Vec::new();
                        let branch_evaluated = self.run(
                            *branch,
                            instance,
                            instance_path,
                            &schema_path.push("oneOf").push(i),
                            &scope,
                            depth + 1,
                            &mut local_errors,
                        );
                        if local_errors.is_empty() {
                            matches.push(branch_evaluated);
                        }
                    }
                    match matches.len() {
                        1 => evaluated.merge(matches.into_iter().next().expect("one match")),
                        0 => errors.push(ValidationError::new(
                            instance_path.clone(),
                            schema_path.push("oneOf"),
                            "instance does not match any subschema in oneOf",
                        )),
                        n => errors.push(ValidationError::new(
                            instance_path.clone(),
                            schema_path.push("oneOf"),
                            format!("instance matches {n} subschemas in oneOf, expected exactly one"),
                        )),
                    }
                }

                if let Some(not) = bag.not {
                    let mut local_errors = Vec::new();
                    self.run(
                        not,
                        instance,
                        instance_path,
                        &schema_path.push("not"),
                        &scope,
                        depth + 1,
                        &mut local_errors,
                    );
                    if local_errors.is_empty() {
                        errors.push(ValidationError::new(
                            instance_path.clone(),
                            schema_path.push("not"),
                            "instance matches the schema in `not`, which is forbidden",
                        ));
                    }
                }

                if let Some(if_node) = bag.if_ {
                    let mut local_errors = Vec::new();
                    let if_evaluated = self.run(
                        if_node,
                        instance,
                        instance_path,
                        &schema_path.push("if"),
                        &scope,
                        depth + 1,
                        &mut local_errors,
                    );
                    if local_errors.is_empty() {
                        evaluated.merge(if_evaluated);
                        if let Some(then_node) = bag.then {
                            let then_evaluated = self.run(
                                then_node,
                                instance,
                                instance_path,
                                &schema_path.push("then"),
                                &scope,
                                depth + 1,
                                errors,
                            );
                            evaluated.merge(then_evaluated);
                        }
                    } else if let Some(else_node) = bag.else_ {
                        let else_evaluated = self.run(
                            else_node,
                            instance,
                            instance_path,
                            &schema_path.push("else"),
                            &scope,
                            depth + 1,
                            errors,
                        );
                        evaluated.merge(else_evaluated);
                    }
                }

                if let Some(reference) = &bag.ref_ {
                    let target = self.resolve_dynamic(reference, &scope);
                    let ref_evaluated = self.run(
                        target,
                        instance,
                        instance_path,
                        &schema_path.push("$ref"),
                        &scope,
                        depth + 1,
                        errors,
                    );
                    evaluated.merge(ref_evaluated);
                }

                self.check_unevaluated(
                    bag,
                    instance,
                    instance_path,
                    schema_path,
                    &scope,
                    depth,
                    errors,
                    &mut evaluated,
                );

                evaluated
            }
        }
    }

    fn resolve_dynamic(&self, target: &RefTarget, scope: &List<DynamicScopeFrame>) -> NodeId {
        match target {
            RefTarget::Static(node) => *node,
            RefTarget::Dynamic { anchor, fallback } => {
                // `scope` walks from the innermost frame outward, so the first match
                // found is the innermost one.
                scope
                    .iter()
                    .find(|frame| &frame.anchor == anchor)
                    .map(|frame| frame.node)
                    .unwrap_or(*fallback)
            }
        }
    }

    fn check_numeric(
        &self,
        bag: &crate::ir::KeywordBag,
        instance: &Value,
        instance_path: &JsonPointer,
        schema_path: &JsonPointer,
        errors: &mut Vec<ValidationError>,
    ) {
        let Some(n) = instance.as_f64() else { return };

        if let Some(min) = bag.minimum {
            if n < min {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("minimum"),
                    format!("{n} is less than the minimum of {min}"),
                ));
            }
        }
        if let Some(max) = bag.maximum {
            if n > max {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("maximum"),
                    format!("{n} is greater than the maximum of {max}"),
                ));
            }
        }
        if let Some(min) = bag.exclusive_minimum {
            if n <= min {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("exclusiveMinimum"),
                    format!("{n} is not strictly greater than {min}"),
                ));
            }
        }
        if let Some(max) = bag.exclusive_maximum {
            if n >= max {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("exclusiveMaximum"),
                    format!("{n} is not strictly less than {max}"),
                ));
            }
        }
        if let Some(multiple_of) = bag.multiple_of {
            let quotient = n / multiple_of;
            if (quotient - quotient.round()).abs() > 1e-9 {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("multipleOf"),
                    format!("{n} is not a multiple of {multiple_of}"),
                ));
            }
        }
    }

    fn check_string(
        &self,
        bag: &crate::ir::KeywordBag,
        instance: &Value,
        instance_path: &JsonPointer,
        schema_path: &JsonPointer,
        errors: &mut Vec<ValidationError>,
    ) {
        let Value::String(s) = instance else { return };
        let length = s.chars().count() as u64;

        if let Some(min) = bag.min_length {
            if length < min {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("minLength"),
                    format!("'{s}' is shorter than the minimum length of {min}"),
                ));
            }
        }
        if let Some(max) = bag.max_length {
            if length > max {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("maxLength"),
                    format!("'{s}' is longer than the maximum length of {max}"),
                ));
            }
        }
        if let Some(pattern) = &bag.pattern {
            if !pattern.regex.is_match(s).unwrap_or(false) {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("pattern"),
                    format!("'{s}' does not match the pattern '{}'", pattern.source),
                ));
            }
        }
        if let Some(name) = &bag.format {
            let assert = bag.format_assertion.unwrap_or(self.schema.assert_formats);
            if assert {
                if let Some(false) = format::check(name, s) {
                    errors.push(ValidationError::new(
                        instance_path.clone(),
                        schema_path.push("format"),
                        format!("'{s}' is not a valid '{name}'"),
                    ));
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_array(
        &self,
        bag: &crate::ir::KeywordBag,
        instance: &Value,
        instance_path: &JsonPointer,
        schema_path: &JsonPointer,
        scope: &List<DynamicScopeFrame>,
        depth: usize,
        errors: &mut Vec<ValidationError>,
        evaluated: &mut Evaluated,
    ) {
        let Value::Array(items) = instance else { return };

        if let Some(min) = bag.min_items {
            if (items.len() as u64) < min {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("minItems"),
                    format!("array has fewer than the minimum {min} items"),
                ));
            }
        }
        if let Some(max) = bag.max_items {
            if (items.len() as u64) > max {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("maxItems"),
                    format!("array has more than the maximum {max} items"),
                ));
            }
        }
        if bag.unique_items && !value::has_unique_items(items) {
            errors.push(ValidationError::new(
                instance_path.clone(),
                schema_path.push("uniqueItems"),
                "array contains duplicate items",
            ));
        }

        for (i, prefix_schema) in bag.prefix_items.iter().enumerate() {
            let Some(item) = items.get(i) else { break };
            evaluated.items.insert(i);
            self.run(
                *prefix_schema,
                item,
                &instance_path.push(i),
                &schema_path.push("prefixItems").push(i),
                scope,
                depth + 1,
                errors,
            );
        }

        if let Some(items_schema) = bag.items {
            for (i, item) in items.iter().enumerate().skip(bag.prefix_items.len()) {
                evaluated.items.insert(i);
                self.run(
                    items_schema,
                    item,
                    &instance_path.push(i),
                    &schema_path.push("items"),
                    scope,
                    depth + 1,
                    errors,
                );
            }
        }

        if let Some(contains_schema) = bag.contains {
            let mut matched = 0u64;
            for (i, item) in items.iter().enumerate() {
                let mut local_errors = Vec::new();
                self.run(
                    contains_schema,
                    item,
                    &instance_path.push(i),
                    &schema_path.push("contains"),
                    scope,
                    depth + 1,
                    &mut local_errors,
                );
                if local_errors.is_empty() {
                    matched += 1;
                    evaluated.items.insert(i);
                }
            }
            let min = bag.min_contains.unwrap_or(1);
            if matched < min {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("contains"),
                    format!("array contains {matched} matching items, expected at least {min}"),
                ));
            }
            if let Some(max) = bag.max_contains {
                if matched > max {
                    errors.push(ValidationError::new(
                        instance_path.clone(),
                        schema_path.push("contains"),
                        format!("array contains {matched} matching items, expected at most {max}"),
                    ));
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_object(
        &self,
        bag: &crate::ir::KeywordBag,
        instance: &Value,
        instance_path: &JsonPointer,
        schema_path: &JsonPointer,
        scope: &List<DynamicScopeFrame>,
        depth: usize,
        errors: &mut Vec<ValidationError>,
        evaluated: &mut Evaluated,
    ) {
        let Value::Object(obj) = instance else { return };

        if let Some(min) = bag.min_properties {
            if (obj.len() as u64) < min {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("minProperties"),
                    format!("object has fewer than the minimum {min} properties"),
                ));
            }
        }
        if let Some(max) = bag.max_properties {
            if (obj.len() as u64) > max {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("maxProperties"),
                    format!("object has more than the maximum {max} properties"),
                ));
            }
        }
        for name in &bag.required {
            if !obj.contains_key(name) {
                errors.push(ValidationError::new(
                    instance_path.clone(),
                    schema_path.push("required"),
                    format!("object is missing required property '{name}'"),
                ));
            }
        }
        for (trigger, names) in &bag.dependencies.required {
            if obj.contains_key(trigger) {
                for name in names {
                    if !obj.contains_key(name) {
                        errors.push(ValidationError::new(
                            instance_path.clone(),
                            schema_path.push("dependentRequired"),
                            format!("object has '{trigger}' but is missing dependent property '{name}'"),
                        ));
                    }
                }
            }
        }
        for (trigger, node) in &bag.dependencies.schemas {
            if obj.contains_key(trigger) {
                let sub_evaluated = self.run(
                    *node,
                    instance,
                    instance_path,
                    &schema_path.push("dependentSchemas").push(trigger.as_str()),
                    scope,
                    depth + 1,
                    errors,
                );
                evaluated.merge(sub_evaluated);
            }
        }

        if let Some(names_schema) = bag.property_names {
            for name in obj.keys() {
                self.run(
                    names_schema,
                    &Value::String(name.clone()),
                    &instance_path.push(name.as_str()),
                    &schema_path.push("propertyNames"),
                    scope,
                    depth + 1,
                    errors,
                );
            }
        }

        for (name, value) in obj {
            let mut matched = false;
            if let Some((_, schema)) = bag.properties.iter().find(|(key, _)| key == name) {
                evaluated.properties.insert(name.clone());
                matched = true;
                self.run(
                    *schema,
                    value,
                    &instance_path.push(name.as_str()),
                    &schema_path.push("properties").push(name.as_str()),
                    scope,
                    depth + 1,
                    errors,
                );
            }
            for (pattern, schema) in &bag.pattern_properties {
                if pattern.regex.is_match(name).unwrap_or(false) {
                    evaluated.properties.insert(name.clone());
                    matched = true;
                    self.run(
                        *schema,
                        value,
                        &instance_path.push(name.as_str()),
                        &schema_path.push("patternProperties").push(name.as_str()),
                        scope,
                        depth + 1,
                        errors,
                    );
                }
            }
            if !matched {
                if let Some(additional) = bag.additional_properties {
                    evaluated.properties.insert(name.clone());
                    self.run(
                        additional,
                        value,
                        &instance_path.push(name.as_str()),
                        &schema_path.push("additionalProperties"),
                        scope,
                        depth + 1,
                        errors,
                    );
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_unevaluated(
        &self,
        bag: &crate::ir::KeywordBag,
        instance: &Value,
        instance_path: &JsonPointer,
        schema_path: &JsonPointer,
        scope: &List<DynamicScopeFrame>,
        depth: usize,
        errors: &mut Vec<ValidationError>,
        evaluated: &mut Evaluated,
    ) {
        if let Some(unevaluated_schema) = bag.unevaluated_properties {
            if let Value::Object(obj) = instance {
                let keys: Vec<String> = obj
                    .keys()
                    .filter(|name| !evaluated.properties.contains(*name))
                    .cloned()
                    .collect();
                for name in keys {
                    let value = &obj[&name];
                    self.run(
                        unevaluated_schema,
                        value,
                        &instance_path.push(name.as_str()),
                        &schema_path.push("unevaluatedProperties"),
                        scope,
                        depth + 1,
                        errors,
                    );
                    evaluated.properties.insert(name);
                }
            }
        }
        if let Some(unevaluated_schema) = bag.unevaluated_items {
            if let Value::Array(items) = instance {
                for (i, item) in items.iter().enumerate() {
                    if evaluated.items.contains(&i) {
                        continue;
                    }
                    self.run(
                        unevaluated_schema,
                        item,
                        &instance_path.push(i),
                        &schema_path.push("unevaluatedItems"),
                        scope,
                        depth + 1,
                        errors,
                    );
                    evaluated.items.insert(i);
                }
            }
        }
    }
}

fn matches_type(instance: &Value, ty: value::PrimitiveType) -> bool {
    let kind = value::kind(instance);
    kind == ty || (ty == value::PrimitiveType::Number && kind == value::PrimitiveType::Integer)
}

fn describe_types(types: &[value::PrimitiveType]) -> String {
    types
        .iter()
        .map(value::PrimitiveType::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use crate::{error::ValidationErrorKind, options::CompileOptions, JsonSchema};
    use serde_json::json;

    #[test]
    fn validates_a_flat_object_schema() {
        let schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        });
        let compiled = JsonSchema::compile(&schema, CompileOptions::default()).unwrap();
        assert!(compiled.is_valid(&json!({"name": "Alice"})));
        assert!(!compiled.is_valid(&json!({})));
        assert!(!compiled.is_valid(&json!({"name": 1})));
    }

    #[test]
    fn unevaluated_properties_rejects_unknown_siblings() {
        let schema = json!({
            "allOf": [{"properties": {"a": {"type": "string"}}}],
            "unevaluatedProperties": false
        });
        let compiled = JsonSchema::compile(&schema, CompileOptions::default()).unwrap();
        assert!(compiled.is_valid(&json!({"a": "x"})));
        assert!(!compiled.is_valid(&json!({"a": "x", "b": 1})));
    }

    #[test]
    fn if_then_else_selects_the_right_branch() {
        let schema = json!({
            "if": {"properties": {"kind": {"const": "a"}}},
            "then": {"required": ["x"]},
            "else": {"required": ["y"]}
        });
        let compiled = JsonSchema::compile(&schema, CompileOptions::default()).unwrap();
        assert!(compiled.is_valid(&json!({"kind": "a", "x": 1})));
        assert!(!compiled.is_valid(&json!({"kind": "a"})));
        assert!(compiled.is_valid(&json!({"kind": "b", "y": 1})));
    }

    #[test]
    fn type_mismatch_message_names_the_expected_type() {
        let schema = json!({"type": "string"});
        let compiled = JsonSchema::compile(&schema, CompileOptions::default()).unwrap();
        let result = compiled.validate(&json!(42));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("Expected string"));
        assert_eq!(result.errors[0].instance_path.to_string(), "");
    }

    #[test]
    fn recursion_limit_trips_exactly_once_across_independent_branches() {
        let schema = json!({
            "$defs": {
                "rec": {"allOf": [{"$ref": "#/$defs/rec"}, {"$ref": "#/$defs/rec"}]}
            },
            "allOf": [{"$ref": "#/$defs/rec"}, {"$ref": "#/$defs/rec"}]
        });
        let compiled =
            JsonSchema::compile(&schema, CompileOptions::default().max_depth(4)).unwrap();
        let result = compiled.validate(&json!({}));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ValidationErrorKind::RecursionLimitExceeded);
    }

    #[test]
    fn contains_enforces_min_and_max() {
        let schema = json!({
            "contains": {"type": "integer"},
            "minContains": 2,
            "maxContains": 3
        });
        let compiled = JsonSchema::compile(&schema, CompileOptions::default()).unwrap();
        assert!(!compiled.is_valid(&json!([1, "x", "y"])));
        assert!(compiled.is_valid(&json!([1, 2, "x"])));
        assert!(!compiled.is_valid(&json!([1, 2, 3, 4])));
    }
}
