//! Transforms a parsed schema [`Value`] into the IR: identification, document loading,
//! reference binding, cycle analysis and lowering, per the compiler's phase breakdown.

use std::sync::Arc;

use ahash::AHashMap;
use fancy_regex::Regex;
use referencing::{PolicyEnforcingRetriever, Registry};
use value::Value;

use crate::{
    ecma,
    error::SchemaCompilationError,
    ir::{CompiledPattern, Dependencies, KeywordBag, NodeId, RefTarget, SchemaNode},
    options::CompileOptions,
    paths::JsonPointer,
    CompiledSchema,
};

/// Keys that never count as an assertion/applicator for the purposes of deciding
/// whether a `$ref` sits alone on its node (a "pure redirect", which is the only
/// shape that can produce a fatal reference-only cycle).
const NON_ASSERTING_KEYS: &[&str] = &[
    "$id", "id", "$schema", "$anchor", "$dynamicAnchor", "$comment", "title",
    "description", "default", "examples", "deprecated", "readOnly", "writeOnly",
    "$defs", "definitions", "formatAssertion",
];

#[derive(Clone)]
struct Ctx {
    base_uri: url::Url,
    document_uri: String,
}

struct Compiler<'a> {
    retriever: PolicyEnforcingRetriever<'a>,
    registry: Registry,
    arena: Vec<SchemaNode>,
    compiled: AHashMap<String, NodeId>,
    /// Pointer keys of pure-redirect `$ref` nodes currently being resolved. A back-edge
    /// that lands on a key already here means the redirect chain never reaches an
    /// asserting node and is rejected rather than silently resolved to `true`.
    ref_only_chain: Vec<String>,
}

/// Compile `root` into a reusable, immutable [`CompiledSchema`].
///
/// # Errors
///
/// Returns [`SchemaCompilationError`] if the schema is malformed, a `$ref` cannot be
/// resolved, a fatal reference-only cycle exists, or a remote document fetch fails
/// or is denied by the fetch policy.
pub fn build_validator(
    root: &Value,
    options: &CompileOptions,
) -> Result<CompiledSchema, SchemaCompilationError> {
    let root_uri = root
        .get("$id")
        .or_else(|| root.get("id"))
        .and_then(Value::as_str)
        .map(referencing::parse_uri)
        .transpose()?
        .or_else(|| {
            options
                .default_base_uri
                .as_deref()
                .and_then(|uri| referencing::parse_uri(uri).ok())
        })
        .unwrap_or_else(|| referencing::resolve_against(None, "").expect("default root resolves"));

    let mut compiler = Compiler {
        retriever: PolicyEnforcingRetriever::new(options.retriever.as_ref(), &options.fetch_policy),
        registry: Registry::new(),
        arena: Vec::new(),
        compiled: AHashMap::new(),
        ref_only_chain: Vec::new(),
    };
    let document_uri = referencing::document_uri(&root_uri);
    compiler.registry.insert_document(document_uri.clone(), root.clone());

    let ctx = Ctx {
        base_uri: root_uri,
        document_uri,
    };
    let root_id = compiler.compile_node(&ctx, root, &JsonPointer::root())?;

    Ok(CompiledSchema {
        arena: compiler.arena,
        root: root_id,
        max_depth: options.max_depth,
        assert_formats: options.assert_formats,
    })
}

impl<'a> Compiler<'a> {
    fn pointer_key(document_uri: &str, pointer: &JsonPointer) -> String {
        format!("{document_uri}#{pointer}")
    }

    fn compile_node(
        &mut self,
        ctx: &Ctx,
        value: &Value,
        pointer: &JsonPointer,
    ) -> Result<NodeId, SchemaCompilationError> {
        match value {
            Value::Bool(true) => Ok(self.push(SchemaNode::True)),
            Value::Bool(false) => Ok(self.push(SchemaNode::False)),
            Value::Object(obj) => self.compile_object(ctx, obj, pointer),
            other => Err(SchemaCompilationError::Syntax {
                schema_path: pointer.clone(),
                message: format!("expected a schema (object or boolean), found {}", value::kind(other)),
            }),
        }
    }

    fn push(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId(self.arena.len() as u32);
        self.arena.push(node);
        id
    }

    fn compile_object(
        &mut self,
        ctx: &Ctx,
        obj: &value::Map<String, Value>,
        pointer: &JsonPointer,
    ) -> Result<NodeId, SchemaCompilationError> {
        let key = Self::pointer_key(&ctx.document_uri, pointer);
        if let Some(existing) = self.compiled.get(&key) {
            return Ok(*existing);
        }

        let node_id = self.push(SchemaNode::True);
        self.compiled.insert(key.clone(), node_id);

        let base_uri = match obj.get("$id").or_else(|| obj.get("id")).and_then(Value::as_str) {
            Some(id) => referencing::resolve_against(Some(&ctx.base_uri), id)?,
            None => ctx.base_uri.clone(),
        };
        let new_ctx = Ctx {
            base_uri: base_uri.clone(),
            document_uri: ctx.document_uri.clone(),
        };

        if let Some(anchor) = obj.get("$anchor").and_then(Value::as_str) {
            self.registry.register_anchor(base_uri.as_str(), anchor, pointer.to_string());
        }
        let dynamic_anchor = obj.get("$dynamicAnchor").and_then(Value::as_str).map(str::to_string);
        if let Some(anchor) = &dynamic_anchor {
            self.registry.register_anchor(base_uri.as_str(), anchor, pointer.to_string());
        }

        let mut bag = KeywordBag {
            schema_pointer: pointer.to_string(),
            dynamic_anchor,
            ..KeywordBag::default()
        };

        let asserting_key_count = obj
            .keys()
            .filter(|k| k.as_str() != "$ref" && !NON_ASSERTING_KEYS.contains(&k.as_str()))
            .count();
        let is_pure_ref = obj.contains_key("$ref") && asserting_key_count == 0;

        if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
            if is_pure_ref {
                let (target_ctx, target_value, target_pointer) = self.locate_ref(&new_ctx, reference, pointer)?;
                let target_key = Self::pointer_key(&target_ctx.document_uri, &target_pointer);
                if self.ref_only_chain.contains(&target_key) {
                    return Err(SchemaCompilationError::CyclicRef {
                        schema_path: pointer.clone(),
                        reference: reference.to_string(),
                    });
                }
                self.ref_only_chain.push(key.clone());
                let target = self.compile_node(&target_ctx, &target_value, &target_pointer);
                self.ref_only_chain.pop();
                bag.ref_ = Some(RefTarget::Static(target?));
            } else {
                bag.ref_ = Some(RefTarget::Static(self.resolve_ref(&new_ctx, reference, pointer)?));
            }
        }

        if let Some(reference) = obj.get("$dynamicRef").and_then(Value::as_str) {
            let anchor_name = reference.trim_start_matches('#').to_string();
            if !anchor_name.is_empty() && !self.registry.has_anchor_anywhere(&anchor_name) {
                return Err(SchemaCompilationError::UnresolvedRef {
                    schema_path: pointer.clone(),
                    reference: reference.to_string(),
                });
            }
            let fallback = self.resolve_ref(&new_ctx, reference, pointer)?;
            bag.ref_ = Some(RefTarget::Dynamic {
                anchor: anchor_name,
                fallback,
            });
        }

        self.populate_keywords(&new_ctx, obj, pointer, &mut bag)?;

        self.arena[node_id.index()] = SchemaNode::Keywords(Box::new(bag));
        Ok(node_id)
    }

    #[allow(clippy::too_many_lines)]
    fn populate_keywords(
        &mut self,
        ctx: &Ctx,
        obj: &value::Map<String, Value>,
        pointer: &JsonPointer,
        bag: &mut KeywordBag,
    ) -> Result<(), SchemaCompilationError> {
        if let Some(type_value) = obj.get("type") {
            let names: Vec<&str> = match type_value {
                Value::String(s) => vec![s.as_str()],
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            bag.types = Some(names.into_iter().filter_map(value::PrimitiveType::from_name).collect());
        }

        if let Some(values) = obj.get("enum").and_then(Value::as_array) {
            bag.enum_values = Some(values.clone());
        }
        if let Some(value) = obj.get("const") {
            bag.const_value = Some(value.clone());
        }

        let minimum = obj.get("minimum").and_then(Value::as_f64);
        let maximum = obj.get("maximum").and_then(Value::as_f64);
        match obj.get("exclusiveMinimum") {
            Some(Value::Bool(true)) => bag.exclusive_minimum = minimum,
            Some(Value::Bool(false)) | None => bag.minimum = minimum,
            Some(other) => {
                bag.minimum = minimum;
                bag.exclusive_minimum = other.as_f64();
            }
        }
        match obj.get("exclusiveMaximum") {
            Some(Value::Bool(true)) => bag.exclusive_maximum = maximum,
            Some(Value::Bool(false)) | None => bag.maximum = maximum,
            Some(other) => {
                bag.maximum = maximum;
                bag.exclusive_maximum = other.as_f64();
            }
        }
        bag.multiple_of = obj.get("multipleOf").and_then(Value::as_f64);

        bag.min_length = obj.get("minLength").and_then(Value::as_u64);
        bag.max_length = obj.get("maxLength").and_then(Value::as_u64);
        if let Some(pattern) = obj.get("pattern").and_then(Value::as_str) {
            bag.pattern = Some(self.compile_pattern(pattern, pointer)?);
        }
        bag.format = obj.get("format").and_then(Value::as_str).map(str::to_string);
        bag.format_assertion = obj.get("formatAssertion").and_then(Value::as_bool);

        if let Some(items) = obj.get("prefixItems").and_then(Value::as_array) {
            for (i, item) in items.iter().enumerate() {
                bag.prefix_items
                    .push(self.compile_node(ctx, item, &pointer.push("prefixItems").push(i))?);
            }
        }
        if let Some(items) = obj.get("items") {
            bag.items = Some(self.compile_node(ctx, items, &pointer.push("items"))?);
        }
        if let Some(contains) = obj.get("contains") {
            bag.contains = Some(self.compile_node(ctx, contains, &pointer.push("contains"))?);
        }
        bag.min_contains = obj.get("minContains").and_then(Value::as_u64);
        bag.max_contains = obj.get("maxContains").and_then(Value::as_u64);
        bag.unique_items = obj.get("uniqueItems").and_then(Value::as_bool).unwrap_or(false);
        bag.min_items = obj.get("minItems").and_then(Value::as_u64);
        bag.max_items = obj.get("maxItems").and_then(Value::as_u64);
        if let Some(unevaluated) = obj.get("unevaluatedItems") {
            bag.unevaluated_items = Some(self.compile_node(ctx, unevaluated, &pointer.push("unevaluatedItems"))?);
        }

        if let Some(properties) = obj.get("properties").and_then(Value::as_object) {
            for (name, schema) in properties {
                let child = self.compile_node(ctx, schema, &pointer.push("properties").push(name.as_str()))?;
                bag.properties.push((name.clone(), child));
            }
        }
        if let Some(pattern_properties) = obj.get("patternProperties").and_then(Value::as_object) {
            for (pattern, schema) in pattern_properties {
                let compiled_pattern = self.compile_pattern(pattern, pointer)?;
                let child = self.compile_node(
                    ctx,
                    schema,
                    &pointer.push("patternProperties").push(pattern.as_str()),
                )?;
                bag.pattern_properties.push((compiled_pattern, child));
            }
        }
        if let Some(additional) = obj.get("additionalProperties") {
            bag.additional_properties = Some(self.compile_node(ctx, additional, &pointer.push("additionalProperties"))?);
        }
        if let Some(names) = obj.get("propertyNames") {
            bag.property_names = Some(self.compile_node(ctx, names, &pointer.push("propertyNames"))?);
        }
        if let Some(required) = obj.get("required").and_then(Value::as_array) {
            bag.required = required.iter().filter_map(Value::as_str).map(str::to_string).collect();
        }
        bag.min_properties = obj.get("minProperties").and_then(Value::as_u64);
        bag.max_properties = obj.get("maxProperties").and_then(Value::as_u64);

        let mut dependencies = Dependencies::default();
        if let Some(dependent_required) = obj.get("dependentRequired").and_then(Value::as_object) {
            for (trigger, required) in dependent_required {
                let names = required
                    .as_array()
                    .map(|values| values.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                dependencies.required.push((trigger.clone(), names));
            }
        }
        if let Some(dependent_schemas) = obj.get("dependentSchemas").and_then(Value::as_object) {
            for (trigger, schema) in dependent_schemas {
                let child = self.compile_node(ctx, schema, &pointer.push("dependentSchemas").push(trigger.as_str()))?;
                dependencies.schemas.push((trigger.clone(), child));
            }
        }
        bag.dependencies = dependencies;
        if let Some(unevaluated) = obj.get("unevaluatedProperties") {
            bag.unevaluated_properties =
                Some(self.compile_node(ctx, unevaluated, &pointer.push("unevaluatedProperties"))?);
        }

        if let Some(branches) = obj.get("allOf").and_then(Value::as_array) {
            for (i, branch) in branches.iter().enumerate() {
                bag.all_of.push(self.compile_node(ctx, branch, &pointer.push("allOf").push(i))?);
            }
        }
        if let Some(branches) = obj.get("anyOf").and_then(Value::as_array) {
            for (i, branch) in branches.iter().enumerate() {
                bag.any_of.push(self.compile_node(ctx, branch, &pointer.push("anyOf").push(i))?);
            }
        }
        if let Some(branches) = obj.get("oneOf").and_then(Value::as_array) {
            for (i, branch) in branches.iter().enumerate() {
                bag.one_of.push(self.compile_node(ctx, branch, &pointer.push("oneOf").push(i))?);
            }
        }
        if let Some(branch) = obj.get("not") {
            bag.not = Some(self.compile_node(ctx, branch, &pointer.push("not"))?);
        }

        if let Some(branch) = obj.get("if") {
            bag.if_ = Some(self.compile_node(ctx, branch, &pointer.push("if"))?);
        }
        if let Some(branch) = obj.get("then") {
            bag.then = Some(self.compile_node(ctx, branch, &pointer.push("then"))?);
        }
        if let Some(branch) = obj.get("else") {
            bag.else_ = Some(self.compile_node(ctx, branch, &pointer.push("else"))?);
        }

        Ok(())
    }

    fn compile_pattern(&self, pattern: &str, pointer: &JsonPointer) -> Result<CompiledPattern, SchemaCompilationError> {
        let translated = ecma::to_rust_regex(pattern).map_err(|()| SchemaCompilationError::Syntax {
            schema_path: pointer.clone(),
            message: format!("invalid regular expression: {pattern}"),
        })?;
        let regex = Regex::new(&translated).map_err(|err| SchemaCompilationError::Syntax {
            schema_path: pointer.clone(),
            message: format!("invalid regular expression '{pattern}': {err}"),
        })?;
        Ok(CompiledPattern {
            source: pattern.to_string(),
            regex: Arc::new(regex),
        })
    }

    /// Resolve a `$ref`/`$dynamicRef` string to the `(context, value, pointer)` it
    /// names, loading and registering a remote document first if needed, without
    /// compiling it. Split out of [`Compiler::resolve_ref`] so a pure-redirect node
    /// can check for a cycle against the target's key before recursing into it.
    fn locate_ref(
        &mut self,
        ctx: &Ctx,
        reference: &str,
        pointer: &JsonPointer,
    ) -> Result<(Ctx, Value, JsonPointer), SchemaCompilationError> {
        let (uri_part, fragment) = referencing::split_fragment(reference);

        let target_document_uri = if uri_part.is_empty() {
            ctx.document_uri.clone()
        } else {
            let absolute = referencing::resolve_against(Some(&ctx.base_uri), uri_part)?;
            let doc_uri = referencing::document_uri(&absolute);
            self.ensure_document_loaded(&doc_uri)?;
            doc_uri
        };

        let doc_ctx = Ctx {
            base_uri: referencing::parse_uri(&target_document_uri)?,
            document_uri: target_document_uri.clone(),
        };

        match fragment {
            None | Some("") => {
                let root_value = self.registry.document(&target_document_uri).expect("document loaded").clone();
                Ok((doc_ctx, root_value, JsonPointer::root()))
            }
            Some(pointer_fragment) if pointer_fragment.starts_with('/') => {
                let root_value = self.registry.document(&target_document_uri).expect("document loaded");
                let target = referencing::resolve_pointer(root_value, pointer_fragment)
                    .map_err(|_err| SchemaCompilationError::UnresolvedRef {
                        schema_path: pointer.clone(),
                        reference: reference.to_string(),
                    })?
                    .clone();
                Ok((doc_ctx, target, pointer_to_chunks(pointer_fragment)))
            }
            Some(anchor) => {
                let anchor_pointer = self
                    .registry
                    .anchor_pointer(&target_document_uri, anchor)
                    .map_err(|_err| SchemaCompilationError::UnresolvedRef {
                        schema_path: pointer.clone(),
                        reference: reference.to_string(),
                    })?
                    .to_string();
                let root_value = self.registry.document(&target_document_uri).expect("document loaded");
                let target = referencing::resolve_pointer(root_value, &anchor_pointer)
                    .map_err(|_err| SchemaCompilationError::UnresolvedRef {
                        schema_path: pointer.clone(),
                        reference: reference.to_string(),
                    })?
                    .clone();
                Ok((doc_ctx, target, pointer_to_chunks(&anchor_pointer)))
            }
        }
    }

    fn resolve_ref(
        &mut self,
        ctx: &Ctx,
        reference: &str,
        pointer: &JsonPointer,
    ) -> Result<NodeId, SchemaCompilationError> {
        let (target_ctx, target_value, target_pointer) = self.locate_ref(ctx, reference, pointer)?;
        self.compile_node(&target_ctx, &target_value, &target_pointer)
    }

    fn ensure_document_loaded(&mut self, document_uri: &str) -> Result<(), SchemaCompilationError> {
        if self.registry.contains(document_uri) {
            return Ok(());
        }
        let document = self.retriever.retrieve(document_uri).map_err(SchemaCompilationError::Remote)?;
        self.registry.insert_document(document_uri.to_string(), document);
        Ok(())
    }
}

fn pointer_to_chunks(fragment: &str) -> JsonPointer {
    let mut pointer = JsonPointer::root();
    for raw_segment in fragment.trim_start_matches('/').split('/') {
        if raw_segment.is_empty() {
            continue;
        }
        let decoded = percent_encoding::percent_decode_str(raw_segment)
            .decode_utf8()
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw_segment.to_string());
        let unescaped = decoded.replace("~1", "/").replace("~0", "~");
        pointer = pointer.push(unescaped);
    }
    pointer
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compiles_a_trivial_type_schema() {
        let schema = json!({"type": "string"});
        let options = CompileOptions::default();
        let compiled = build_validator(&schema, &options).unwrap();
        match &compiled.arena[compiled.root.index()] {
            SchemaNode::Keywords(bag) => {
                assert_eq!(bag.types.as_ref().unwrap(), &[value::PrimitiveType::String]);
            }
            _ => panic!("expected a keyword node"),
        }
    }

    #[test]
    fn detects_fatal_ref_only_cycle() {
        let schema = json!({
            "$id": "http://example.com/a.json",
            "$defs": {
                "x": {"$ref": "#/$defs/y"},
                "y": {"$ref": "#/$defs/x"}
            },
            "$ref": "#/$defs/x"
        });
        let options = CompileOptions::default();
        let result = build_validator(&schema, &options);
        assert!(matches!(result, Err(SchemaCompilationError::CyclicRef { .. })));
    }

    #[test]
    fn allows_recursion_through_properties() {
        let schema = json!({
            "$id": "http://example.com/tree.json",
            "type": "object",
            "properties": {
                "children": {
                    "type": "array",
                    "items": {"$ref": "#"}
                }
            }
        });
        let options = CompileOptions::default();
        build_validator(&schema, &options).unwrap();
    }

    #[test]
    fn resolves_ref_by_anchor() {
        let schema = json!({
            "$id": "http://example.com/anchors.json",
            "$defs": {
                "positive": {"$anchor": "positive", "type": "integer", "minimum": 0}
            },
            "$ref": "#positive"
        });
        let options = CompileOptions::default();
        let compiled = build_validator(&schema, &options).unwrap();
        match &compiled.arena[compiled.root.index()] {
            SchemaNode::Keywords(bag) => assert!(matches!(bag.ref_, Some(RefTarget::Static(_)))),
            _ => panic!("expected a keyword node"),
        }
    }
}
