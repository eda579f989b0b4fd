//! Walks a compiled schema against an instance, collecting every keyword
//! violation as an `(instancePath, schemaPath)` pair in pre-order.

use std::collections::BTreeMap;

use value::Value;

use crate::error::JtdError;
use crate::model::{Node, TypeKeyword};

pub(crate) fn validate(root: &Node, definitions: &BTreeMap<String, Node>, instance: &Value) -> Vec<JtdError> {
    let mut errors = Vec::new();
    walk(root, definitions, instance, "", "", &mut errors);
    errors
}

fn walk(node: &Node, definitions: &BTreeMap<String, Node>, instance: &Value, instance_path: &str, schema_path: &str, errors: &mut Vec<JtdError>) {
    match node {
        Node::Empty => {}
        Node::Type { type_kw } => validate_type(*type_kw, instance, instance_path, schema_path, errors),
        Node::Enum { values } => validate_enum(values, instance, instance_path, schema_path, errors),
        Node::Elements { schema } => validate_elements(schema, definitions, instance, instance_path, schema_path, errors),
        Node::Properties { required, optional, additional } => {
            validate_properties(required, optional, *additional, None, definitions, instance, instance_path, schema_path, errors)
        }
        Node::Values { schema } => validate_values(schema, definitions, instance, instance_path, schema_path, errors),
        Node::Discriminator { tag, mapping } => validate_discriminator(tag, mapping, definitions, instance, instance_path, schema_path, errors),
        Node::Ref { name } => {
            let target = definitions.get(name).expect("ref targets are checked to exist at compile time");
            walk(target, definitions, instance, instance_path, schema_path, errors);
        }
        Node::Nullable { inner } => {
            if !instance.is_null() {
                walk(inner, definitions, instance, instance_path, schema_path, errors);
            }
        }
    }
}

fn push(errors: &mut Vec<JtdError>, instance_path: &str, schema_path: &str) {
    errors.push(JtdError {
        instance_path: instance_path.to_string(),
        schema_path: schema_path.to_string(),
    });
}

fn extend(path: &str, segment: &str) -> String {
    format!("{path}/{segment}")
}

fn validate_type(type_kw: TypeKeyword, instance: &Value, instance_path: &str, schema_path: &str, errors: &mut Vec<JtdError>) {
    let schema_path = extend(schema_path, "type");
    let ok = match type_kw {
        TypeKeyword::Boolean => instance.is_boolean(),
        TypeKeyword::String => instance.is_string(),
        TypeKeyword::Timestamp => instance.as_str().is_some_and(is_valid_timestamp),
        TypeKeyword::Float32 | TypeKeyword::Float64 => instance.is_number(),
        TypeKeyword::Int8
        | TypeKeyword::Uint8
        | TypeKeyword::Int16
        | TypeKeyword::Uint16
        | TypeKeyword::Int32
        | TypeKeyword::Uint32 => instance
            .as_f64()
            .is_some_and(|n| n.fract() == 0.0 && type_kw.integer_range().is_some_and(|(min, max)| n >= min && n <= max)),
    };
    if !ok {
        push(errors, instance_path, &schema_path);
    }
}

/// Accepts RFC 3339 date-times; a `:60` leap second is normalized to `:59`
/// before the numeric components are range-checked, per RFC 8927's deferral
/// to RFC 3339 §5.6 with leap seconds folded away.
fn is_valid_timestamp(text: &str) -> bool {
    let normalized = text.replacen(":60", ":59", 1);
    let bytes = normalized.as_bytes();
    if bytes.len() < 20 {
        return false;
    }
    let digits = |s: &[u8]| s.iter().all(u8::is_ascii_digit);
    if !(digits(&bytes[0..4]) && bytes[4] == b'-' && digits(&bytes[5..7]) && bytes[7] == b'-' && digits(&bytes[8..10])) {
        return false;
    }
    if !matches!(bytes.get(10), Some(b'T') | Some(b't')) {
        return false;
    }
    if !(digits(&bytes[11..13]) && bytes[13] == b':' && digits(&bytes[14..16]) && bytes[16] == b':' && digits(&bytes[17..19])) {
        return false;
    }
    let month: u32 = normalized[5..7].parse().unwrap_or(0);
    let day: u32 = normalized[8..10].parse().unwrap_or(0);
    let hour: u32 = normalized[11..13].parse().unwrap_or(99);
    let minute: u32 = normalized[14..16].parse().unwrap_or(99);
    let second: u32 = normalized[17..19].parse().unwrap_or(99);
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 || minute > 59 || second > 59 {
        return false;
    }

    let mut rest = &normalized[19..];
    if let Some(stripped) = rest.strip_prefix('.') {
        let frac_len = stripped.chars().take_while(char::is_ascii_digit).count();
        if frac_len == 0 {
            return false;
        }
        rest = &stripped[frac_len..];
    }
    matches!(rest, "Z" | "z") || is_valid_offset(rest)
}

fn is_valid_offset(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.len() == 6
        && matches!(bytes[0], b'+' | b'-')
        && bytes[1..3].iter().all(u8::is_ascii_digit)
        && bytes[3] == b':'
        && bytes[4..6].iter().all(u8::is_ascii_digit)
}

fn validate_enum(values: &[String], instance: &Value, instance_path: &str, schema_path: &str, errors: &mut Vec<JtdError>) {
    let schema_path = extend(schema_path, "enum");
    let ok = instance.as_str().is_some_and(|s| values.iter().any(|v| v == s));
    if !ok {
        push(errors, instance_path, &schema_path);
    }
}

fn validate_elements(item_schema: &Node, definitions: &BTreeMap<String, Node>, instance: &Value, instance_path: &str, schema_path: &str, errors: &mut Vec<JtdError>) {
    let Some(arr) = instance.as_array() else {
        push(errors, instance_path, &extend(schema_path, "elements"));
        return;
    };
    let schema_path = extend(schema_path, "elements");
    for (index, item) in arr.iter().enumerate() {
        walk(item_schema, definitions, item, &extend(instance_path, &index.to_string()), &schema_path, errors);
    }
}

fn validate_values(value_schema: &Node, definitions: &BTreeMap<String, Node>, instance: &Value, instance_path: &str, schema_path: &str, errors: &mut Vec<JtdError>) {
    let Some(obj) = instance.as_object() else {
        push(errors, instance_path, &extend(schema_path, "values"));
        return;
    };
    let schema_path = extend(schema_path, "values");
    for (key, item) in obj {
        walk(value_schema, definitions, item, &extend(instance_path, key), &schema_path, errors);
    }
}

fn validate_properties(
    required: &BTreeMap<String, Node>,
    optional: &BTreeMap<String, Node>,
    additional: bool,
    discriminator_tag: Option<&str>,
    definitions: &BTreeMap<String, Node>,
    instance: &Value,
    instance_path: &str,
    schema_path: &str,
    errors: &mut Vec<JtdError>,
) {
    let Some(obj) = instance.as_object() else {
        push(errors, instance_path, schema_path);
        return;
    };

    for (key, sub_schema) in required {
        match obj.get(key) {
            Some(value) => walk(
                sub_schema,
                definitions,
                value,
                &extend(instance_path, key),
                &extend(&extend(schema_path, "properties"), key),
                errors,
            ),
            None => push(errors, instance_path, &extend(&extend(schema_path, "properties"), key)),
        }
    }

    for (key, sub_schema) in optional {
        if let Some(value) = obj.get(key) {
            walk(
                sub_schema,
                definitions,
                value,
                &extend(instance_path, key),
                &extend(&extend(schema_path, "optionalProperties"), key),
                errors,
            );
        }
    }

    if !additional {
        for key in obj.keys() {
            if required.contains_key(key) || optional.contains_key(key) {
                continue;
            }
            if discriminator_tag == Some(key.as_str()) {
                continue;
            }
            push(errors, &extend(instance_path, key), &extend(schema_path, "additionalProperties"));
        }
    }
}

fn validate_discriminator(
    tag: &str,
    mapping: &BTreeMap<String, Node>,
    definitions: &BTreeMap<String, Node>,
    instance: &Value,
    instance_path: &str,
    schema_path: &str,
    errors: &mut Vec<JtdError>,
) {
    let Some(obj) = instance.as_object() else {
        push(errors, instance_path, schema_path);
        return;
    };

    let Some(tag_value) = obj.get(tag).and_then(Value::as_str) else {
        push(errors, &extend(instance_path, tag), &extend(schema_path, "discriminator"));
        return;
    };

    let Some(variant) = mapping.get(tag_value) else {
        push(errors, &extend(instance_path, tag), &extend(schema_path, "mapping"));
        return;
    };

    let Node::Properties { required, optional, additional } = variant else {
        unreachable!("compile_discriminator only accepts Properties-form mappings");
    };
    validate_properties(
        required,
        optional,
        *additional,
        Some(tag),
        definitions,
        instance,
        instance_path,
        &extend(&extend(schema_path, "mapping"), tag_value),
        errors,
    );
}
