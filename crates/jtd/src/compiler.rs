//! Compiles a schema document into a [`Node`] tree in two passes: first every
//! name under `definitions` is registered as a placeholder so `ref` can see
//! the full set of valid targets regardless of declaration order, then each
//! definition's body is compiled for real.

use std::collections::BTreeMap;

use value::Value;

use crate::error::JtdSchemaError;
use crate::model::{Node, TypeKeyword};

pub(crate) fn compile(schema: &Value) -> Result<(Node, BTreeMap<String, Node>), JtdSchemaError> {
    let obj = schema.as_object().ok_or(JtdSchemaError::NotAnObject)?;

    let mut definitions = BTreeMap::new();
    let mut def_keys = Vec::new();

    if let Some(defs_val) = obj.get("definitions") {
        let defs_obj = defs_val.as_object().ok_or(JtdSchemaError::DefinitionsNotObject)?;
        for key in defs_obj.keys() {
            def_keys.push(key.clone());
            definitions.insert(key.clone(), Node::Empty);
        }
        for key in &def_keys {
            let body = defs_obj.get(key).expect("key taken from this same map");
            let node = compile_node(body, false, &definitions)?;
            definitions.insert(key.clone(), node);
        }
    }

    let root = compile_node(schema, true, &definitions)?;
    Ok((root, definitions))
}

fn compile_node(json: &Value, is_root: bool, definitions: &BTreeMap<String, Node>) -> Result<Node, JtdSchemaError> {
    let obj = json.as_object().ok_or(JtdSchemaError::NotAnObject)?;

    if !is_root && obj.contains_key("definitions") {
        return Err(JtdSchemaError::DefinitionsInNonRoot);
    }

    let mut forms = Vec::new();
    if obj.contains_key("ref") {
        forms.push("ref");
    }
    if obj.contains_key("type") {
        forms.push("type");
    }
    if obj.contains_key("enum") {
        forms.push("enum");
    }
    if obj.contains_key("elements") {
        forms.push("elements");
    }
    if obj.contains_key("values") {
        forms.push("values");
    }
    if obj.contains_key("discriminator") {
        forms.push("discriminator");
    }
    if obj.contains_key("properties") || obj.contains_key("optionalProperties") {
        forms.push("properties");
    }

    if forms.len() > 1 {
        return Err(JtdSchemaError::MultipleForms(forms.iter().map(|s| s.to_string()).collect()));
    }

    let node = match forms.first().copied() {
        None => Node::Empty,
        Some("ref") => compile_ref(obj, definitions)?,
        Some("type") => compile_type(obj)?,
        Some("enum") => compile_enum(obj)?,
        Some("elements") => compile_elements(obj, definitions)?,
        Some("properties") => compile_properties(obj, definitions)?,
        Some("values") => compile_values(obj, definitions)?,
        Some("discriminator") => compile_discriminator(obj, definitions)?,
        _ => unreachable!("forms has at most one entry, all arms above are covered"),
    };

    Ok(if obj.get("nullable") == Some(&Value::Bool(true)) {
        Node::Nullable { inner: Box::new(node) }
    } else {
        node
    })
}

fn compile_ref(obj: &value::Map<String, Value>, definitions: &BTreeMap<String, Node>) -> Result<Node, JtdSchemaError> {
    let name = obj.get("ref").and_then(Value::as_str).ok_or(JtdSchemaError::RefNotString)?;
    if !definitions.contains_key(name) {
        return Err(JtdSchemaError::RefNotFound(name.to_string()));
    }
    Ok(Node::Ref { name: name.to_string() })
}

fn compile_type(obj: &value::Map<String, Value>) -> Result<Node, JtdSchemaError> {
    let name = obj.get("type").and_then(Value::as_str).ok_or(JtdSchemaError::TypeNotString)?;
    let type_kw = TypeKeyword::from_name(name).ok_or_else(|| JtdSchemaError::UnknownType(name.to_string()))?;
    Ok(Node::Type { type_kw })
}

fn compile_enum(obj: &value::Map<String, Value>) -> Result<Node, JtdSchemaError> {
    let arr = obj.get("enum").and_then(Value::as_array).ok_or(JtdSchemaError::InvalidEnum)?;
    if arr.is_empty() {
        return Err(JtdSchemaError::InvalidEnum);
    }
    let mut values = Vec::with_capacity(arr.len());
    let mut seen = std::collections::HashSet::with_capacity(arr.len());
    for item in arr {
        let s = item.as_str().ok_or(JtdSchemaError::InvalidEnum)?;
        if !seen.insert(s) {
            return Err(JtdSchemaError::EnumDuplicates);
        }
        values.push(s.to_string());
    }
    Ok(Node::Enum { values })
}

fn compile_elements(obj: &value::Map<String, Value>, definitions: &BTreeMap<String, Node>) -> Result<Node, JtdSchemaError> {
    let inner = obj.get("elements").expect("presence checked by the caller's form detection");
    let schema = compile_node(inner, false, definitions)?;
    Ok(Node::Elements { schema: Box::new(schema) })
}

fn compile_values(obj: &value::Map<String, Value>, definitions: &BTreeMap<String, Node>) -> Result<Node, JtdSchemaError> {
    let inner = obj.get("values").expect("presence checked by the caller's form detection");
    let schema = compile_node(inner, false, definitions)?;
    Ok(Node::Values { schema: Box::new(schema) })
}

fn compile_properties(obj: &value::Map<String, Value>, definitions: &BTreeMap<String, Node>) -> Result<Node, JtdSchemaError> {
    let mut required = BTreeMap::new();
    let mut optional = BTreeMap::new();

    if let Some(props) = obj.get("properties") {
        let props_obj = props.as_object().ok_or(JtdSchemaError::NotAnObject)?;
        for (key, schema) in props_obj {
            required.insert(key.clone(), compile_node(schema, false, definitions)?);
        }
    }

    if let Some(opt_props) = obj.get("optionalProperties") {
        let opt_obj = opt_props.as_object().ok_or(JtdSchemaError::NotAnObject)?;
        for (key, schema) in opt_obj {
            if required.contains_key(key) {
                return Err(JtdSchemaError::OverlappingProperties(key.clone()));
            }
            optional.insert(key.clone(), compile_node(schema, false, definitions)?);
        }
    }

    let additional = obj.get("additionalProperties").and_then(Value::as_bool).unwrap_or(false);

    Ok(Node::Properties { required, optional, additional })
}

fn compile_discriminator(obj: &value::Map<String, Value>, definitions: &BTreeMap<String, Node>) -> Result<Node, JtdSchemaError> {
    let tag = obj
        .get("discriminator")
        .and_then(Value::as_str)
        .ok_or(JtdSchemaError::DiscriminatorNotString)?
        .to_string();

    let mapping_obj = obj
        .get("mapping")
        .and_then(Value::as_object)
        .ok_or(JtdSchemaError::MissingMapping)?;

    let mut mapping = BTreeMap::new();
    for (key, schema) in mapping_obj {
        let node = compile_node(schema, false, definitions)?;
        match &node {
            Node::Properties { required, optional, .. } => {
                if required.contains_key(&tag) || optional.contains_key(&tag) {
                    return Err(JtdSchemaError::TagInVariant(tag));
                }
            }
            _ => return Err(JtdSchemaError::MappingNotProperties),
        }
        mapping.insert(key.clone(), node);
    }

    Ok(Node::Discriminator { tag, mapping })
}
