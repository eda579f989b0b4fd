//! The parsed JSONPath abstract syntax tree.

use value::Value;

/// A parsed path: the root marker plus the ordered segments applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub segments: Vec<Segment>,
}

/// One step applied to the current node set.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name` or the single-name form of `['name']`.
    Property(String),
    /// `*` — every member of an object, or every element of an array.
    Wildcard,
    /// `[i]` — a single array index, possibly negative.
    Index(i64),
    /// `[start:end:step]`.
    Slice(Slice),
    /// `[a,b,...]` — at least two selectors sharing one bracket.
    Union(Vec<Selector>),
    /// `..target` — pre-order traversal applying `target` at every visited node.
    RecursiveDescent(Box<Segment>),
    /// `[?( expr )]`.
    Filter(FilterExpr),
    /// `[( ... )]` — only `@.length-1` carries meaning; every other script is a no-op.
    Script(ScriptExpr),
}

/// One member of a bracket union.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Property(String),
    Index(i64),
}

/// `start?:end?(:step?)?`. `None` means the default for that position applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub step: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptExpr {
    /// `@.length-1`.
    LastIndex,
    /// Any other script body.
    Noop,
}

/// A filter predicate, evaluated with the candidate array element bound to `@`.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Or(Box<FilterExpr>, Box<FilterExpr>),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
    Compare(Atom, CmpOp, Atom),
    /// A bare atom with no comparison: true iff it resolves to a non-null value.
    Exists(Atom),
}

/// A leaf of a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    /// `@` followed by zero or more `.name` accessors.
    Current(Vec<String>),
    Literal(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
