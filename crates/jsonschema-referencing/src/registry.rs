use ahash::AHashMap;
use serde_json::Value;
use url::Url;

use crate::error::Error;

/// Maps absolute URIs to parsed documents and `(documentURI, anchor)` pairs to the
/// JSON pointer of the node the anchor names.
///
/// Built fresh for each compile and dropped when it returns, per the fetch-policy
/// memoization window: the registry is where a document lands once retrieved, so a
/// `$ref` to a URI already loaded never triggers another fetch.
#[derive(Debug, Default)]
pub struct Registry {
    documents: AHashMap<String, Value>,
    anchors: AHashMap<(String, String), String>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Registry {
            documents: AHashMap::new(),
            anchors: AHashMap::new(),
        }
    }

    /// True iff a document is already registered under this absolute URI (fragment-free).
    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.documents.contains_key(uri)
    }

    pub fn insert_document(&mut self, uri: impl Into<String>, document: Value) {
        self.documents.insert(uri.into(), document);
    }

    #[must_use]
    pub fn document(&self, uri: &str) -> Option<&Value> {
        self.documents.get(uri)
    }

    pub fn register_anchor(&mut self, document_uri: impl Into<String>, anchor: impl Into<String>, pointer: impl Into<String>) {
        self.anchors
            .insert((document_uri.into(), anchor.into()), pointer.into());
    }

    /// Resolve `(documentURI, anchor)` to the JSON pointer registered for it.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchAnchor`] if no anchor with that name was registered for the document.
    pub fn anchor_pointer(&self, document_uri: &str, anchor: &str) -> Result<&str, Error> {
        self.anchors
            .get(&(document_uri.to_string(), anchor.to_string()))
            .map(String::as_str)
            .ok_or_else(|| Error::no_such_anchor(anchor))
    }

    /// Every document URI currently registered. Used to answer `$dynamicRef`'s
    /// "does some anchor of this name exist anywhere in the composed registry" check.
    pub fn document_uris(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    #[must_use]
    pub fn has_anchor_anywhere(&self, anchor: &str) -> bool {
        self.anchors.keys().any(|(_, name)| name == anchor)
    }
}

/// Walk a JSON Pointer (RFC 6901) through `document`, applying `~1` → `/` and
/// `~0` → `~` unescaping, in that order, to each segment.
///
/// # Errors
///
/// [`Error::PointerToNowhere`] if the pointer does not resolve; [`Error::InvalidArrayIndex`]
/// if an array segment is not a valid index.
pub fn resolve_pointer<'d>(document: &'d Value, pointer: &str) -> Result<&'d Value, Error> {
    if pointer.is_empty() {
        return Ok(document);
    }
    let mut current = document;
    for raw_segment in pointer.trim_start_matches('/').split('/') {
        let decoded = percent_encoding::percent_decode_str(raw_segment)
            .decode_utf8()
            .map_err(|source| Error::invalid_percent_encoding(pointer, source))?;
        let segment = unescape_segment(&decoded);
        current = match current {
            Value::Object(map) => map
                .get(segment.as_ref())
                .ok_or_else(|| Error::pointer_to_nowhere(pointer))?,
            Value::Array(items) => {
                let index: usize = segment
                    .parse()
                    .map_err(|err| Error::invalid_array_index(pointer, segment.into_owned(), err))?;
                items.get(index).ok_or_else(|| Error::pointer_to_nowhere(pointer))?
            }
            _ => return Err(Error::pointer_to_nowhere(pointer)),
        };
    }
    Ok(current)
}

fn unescape_segment(segment: &str) -> std::borrow::Cow<'_, str> {
    if segment.contains('~') {
        std::borrow::Cow::Owned(segment.replace("~1", "/").replace("~0", "~"))
    } else {
        std::borrow::Cow::Borrowed(segment)
    }
}

/// Strip a fragment from a URI, returning the absolute document URI it belongs to.
#[must_use]
pub fn document_uri(uri: &Url) -> String {
    let mut without_fragment = uri.clone();
    without_fragment.set_fragment(None);
    without_fragment.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pointer_unescapes_tilde_then_slash() {
        let document = json!({"/": {"~": 42}});
        let value = resolve_pointer(&document, "/~1/~0").unwrap();
        assert_eq!(value, &json!(42));
    }

    #[test]
    fn pointer_into_array_by_index() {
        let document = json!({"items": [1, 2, 3]});
        let value = resolve_pointer(&document, "/items/1").unwrap();
        assert_eq!(value, &json!(2));
    }

    #[test]
    fn pointer_to_nowhere_is_an_error() {
        let document = json!({"a": 1});
        assert!(resolve_pointer(&document, "/b").is_err());
    }

    #[test]
    fn anchor_lookup_round_trips() {
        let mut registry = Registry::new();
        registry.register_anchor("http://example.com/a.json", "foo", "/$defs/foo");
        assert_eq!(
            registry.anchor_pointer("http://example.com/a.json", "foo").unwrap(),
            "/$defs/foo"
        );
        assert!(registry.anchor_pointer("http://example.com/a.json", "bar").is_err());
    }
}
