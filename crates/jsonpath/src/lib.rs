//! A JSONPath query engine: a recursive-descent parser (`parser`) that turns a
//! path expression into an AST (`ast`), and an evaluator (`evaluator`) that walks
//! a JSON value against that AST, producing an ordered sequence of references.
//!
//! ```rust
//! use jsonpath::JsonPath;
//! use serde_json::json;
//!
//! let document = json!({"store": {"book": [
//!     {"title": "Sword", "price": 8},
//!     {"title": "Moby", "price": 23}
//! ]}});
//! let path = JsonPath::parse("$.store.book[?(@.price<10)].title").unwrap();
//! let titles: Vec<&str> = path.query(&document).iter().filter_map(|v| v.as_str()).collect();
//! assert_eq!(titles, vec!["Sword"]);
//! ```

mod ast;
mod evaluator;
pub mod error;
mod parser;

pub use ast::{Atom, CmpOp, FilterExpr, ScriptExpr, Segment, Selector, Slice};
pub use error::JsonPathParseError;

use value::Value;

/// Entry point for parsing a path expression.
pub struct JsonPath;

impl JsonPath {
    /// Parse `text` into a reusable [`CompiledPath`].
    pub fn parse(text: &str) -> Result<CompiledPath, JsonPathParseError> {
        let path = parser::parse(text)?;
        Ok(CompiledPath { path })
    }
}

/// A parsed path expression, ready to query any number of values.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPath {
    path: ast::Path,
}

impl CompiledPath {
    /// Evaluate this path against `instance`, returning matched values in
    /// deterministic, order-preserving document order.
    #[must_use]
    pub fn query<'v>(&self, instance: &'v Value) -> Vec<&'v Value> {
        evaluator::query(&self.path, instance)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn goessner_store() -> Value {
        json!({
            "store": {
                "book": [
                    {"category": "reference", "author": "Nigel Rees", "title": "Sayings of the Century", "price": 8.95},
                    {"category": "fiction", "author": "Evelyn Waugh", "title": "Sword of Honour", "price": 12.99},
                    {"category": "fiction", "author": "Herman Melville", "title": "Moby Dick", "isbn": "0-553-21311-3", "price": 8.99},
                    {"category": "fiction", "author": "J. R. R. Tolkien", "title": "The Lord of the Rings", "isbn": "0-395-19395-8", "price": 22.99}
                ],
                "bicycle": {"color": "red", "price": 19.95}
            }
        })
    }

    #[test]
    fn property_and_index_access() {
        let store = goessner_store();
        let path = JsonPath::parse("$.store.book[0].title").unwrap();
        let result = path.query(&store);
        assert_eq!(result, vec![&json!("Sayings of the Century")]);
    }

    #[test]
    fn wildcard_collects_every_array_element() {
        let store = goessner_store();
        let path = JsonPath::parse("$.store.book[*].author").unwrap();
        assert_eq!(path.query(&store).len(), 4);
    }

    #[test]
    fn slice_selects_a_subrange() {
        let document = json!({"items": [0, 1, 2, 3, 4]});
        let path = JsonPath::parse("$.items[1:3]").unwrap();
        assert_eq!(path.query(&document), vec![&json!(1), &json!(2)]);
    }

    #[test]
    fn negative_index_counts_from_the_end() {
        let document = json!({"items": [0, 1, 2, 3, 4]});
        let path = JsonPath::parse("$.items[-1]").unwrap();
        assert_eq!(path.query(&document), vec![&json!(4)]);
    }

    #[test]
    fn recursive_descent_finds_nested_authors() {
        let store = goessner_store();
        let path = JsonPath::parse("$..author").unwrap();
        assert_eq!(path.query(&store).len(), 4);
    }

    #[test]
    fn filter_selects_books_cheaper_than_ten() {
        let store = goessner_store();
        let path = JsonPath::parse("$.store.book[?(@.price<10)].title").unwrap();
        let titles: Vec<&str> = path.query(&store).iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(titles, vec!["Sayings of the Century", "Moby Dick"]);
    }

    #[test]
    fn union_of_quoted_names() {
        let document = json!({"a": 1, "b": 2, "c": 3});
        let path = JsonPath::parse("$['a','c']").unwrap();
        assert_eq!(path.query(&document), vec![&json!(1), &json!(3)]);
    }

    #[test]
    fn unsupported_script_expression_passes_nodes_through_unchanged() {
        let document = json!({"items": [1, 2, 3]});
        let path = JsonPath::parse("$.items[(@.foo)]").unwrap();
        assert_eq!(path.query(&document), vec![&document["items"]]);
    }

    #[test]
    fn last_index_script_selects_the_final_element() {
        let document = json!({"items": [1, 2, 3]});
        let path = JsonPath::parse("$.items[(@.length-1)]").unwrap();
        assert_eq!(path.query(&document), vec![&json!(3)]);
    }

    #[test]
    fn bare_root_matches_the_whole_document() {
        let document = json!({"a": 1});
        let path = JsonPath::parse("$").unwrap();
        assert_eq!(path.query(&document), vec![&document]);
    }

    #[test]
    fn missing_dollar_sign_is_a_parse_error() {
        let error = JsonPath::parse("store.book").unwrap_err();
        assert_eq!(error.position, 0);
    }
}
