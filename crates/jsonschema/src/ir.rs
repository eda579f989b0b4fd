//! The compiled intermediate representation: an arena of nodes addressed by stable
//! indices rather than owning pointers, so that recursive schemas (back-edges
//! through `$ref`) are ordinary indices instead of requiring interior mutability
//! or reference counting to break a cycle.

use std::sync::Arc;

use fancy_regex::Regex;
use value::Value;

/// A stable index into a [`crate::compiler::CompiledSchema`]'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single schema node: either a degenerate boolean schema or a bag of keywords.
#[derive(Debug)]
pub enum SchemaNode {
    /// The `true` schema: every instance is valid.
    True,
    /// The `false` schema: every instance is invalid.
    False,
    /// An object schema, represented as a bag of the keywords it declared.
    Keywords(Box<KeywordBag>),
}

/// One `(min, max)`-shaped bound, as accepted by `minContains`/`maxContains` etc.
#[derive(Debug, Clone, Copy)]
pub struct Bound {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// A compiled pattern: the original source plus the `fancy_regex` engine compiled
/// once at schema-compile time, used with unanchored `find` semantics.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub source: String,
    pub regex: Arc<Regex>,
}

/// `dependentRequired`/`dependentSchemas` entries keyed by the triggering property.
#[derive(Debug, Default)]
pub struct Dependencies {
    pub required: Vec<(String, Vec<String>)>,
    pub schemas: Vec<(String, NodeId)>,
}

/// A `$ref` or `$dynamicRef` target.
#[derive(Debug, Clone)]
pub enum RefTarget {
    /// Bound at compile time to a concrete node (`$ref`, and `$dynamicRef` when it
    /// does not actually need dynamic scoping because only one matching anchor exists).
    Static(NodeId),
    /// Resolved at validation time against the dynamic scope stack by anchor name.
    Dynamic { anchor: String, fallback: NodeId },
}

/// Every JSON Schema 2020-12 keyword this toolkit implements, collected on one node.
///
/// Grouped by the categorization in the data model: assertions produce errors
/// directly, applicators recurse into child nodes, annotations only record
/// information consumed by other keywords (`unevaluatedProperties`/`unevaluatedItems`).
#[derive(Debug, Default)]
pub struct KeywordBag {
    // -- identity / structure, used by error reporting --
    pub schema_pointer: String,

    // -- type --
    pub types: Option<Vec<value::PrimitiveType>>,

    // -- generic --
    pub enum_values: Option<Vec<Value>>,
    pub const_value: Option<Value>,

    // -- numeric assertions --
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,

    // -- string assertions --
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<CompiledPattern>,
    pub format: Option<String>,
    pub format_assertion: Option<bool>,

    // -- array applicators/assertions --
    pub prefix_items: Vec<NodeId>,
    pub items: Option<NodeId>,
    pub contains: Option<NodeId>,
    pub min_contains: Option<u64>,
    pub max_contains: Option<u64>,
    pub unique_items: bool,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unevaluated_items: Option<NodeId>,

    // -- object applicators/assertions --
    pub properties: Vec<(String, NodeId)>,
    pub pattern_properties: Vec<(CompiledPattern, NodeId)>,
    pub additional_properties: Option<NodeId>,
    pub property_names: Option<NodeId>,
    pub required: Vec<String>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
    pub dependencies: Dependencies,
    pub unevaluated_properties: Option<NodeId>,

    // -- combinators --
    pub all_of: Vec<NodeId>,
    pub any_of: Vec<NodeId>,
    pub one_of: Vec<NodeId>,
    pub not: Option<NodeId>,

    // -- conditionals --
    pub if_: Option<NodeId>,
    pub then: Option<NodeId>,
    pub else_: Option<NodeId>,

    // -- references --
    pub ref_: Option<RefTarget>,

    // -- dynamic scope bookkeeping --
    /// Present iff this node declared `$dynamicAnchor`; the anchor name it registers
    /// on the dynamic scope stack whenever this node is entered during validation.
    pub dynamic_anchor: Option<String>,
}
