//! URI resolution helpers built on top of `url::Url`.

use once_cell::sync::Lazy;
use url::Url;

use crate::Error;

/// The synthetic base used to resolve schemeless identifiers (e.g. a schema whose
/// only `$id` is `"my-schema"` rather than an absolute URI).
static DEFAULT_ROOT_URI: Lazy<Url> = Lazy::new(|| Url::parse("json-schema:///").expect("valid URL"));

/// Resolve `reference` against `base` (or the default root, if `base` is `None`),
/// returning an absolute, normalized URI.
pub fn resolve_against(base: Option<&Url>, reference: &str) -> Result<Url, Error> {
    base.unwrap_or(&DEFAULT_ROOT_URI)
        .join(reference)
        .map_err(|err| Error::invalid_uri(reference, err))
}

/// Parse a possibly-relative URI string, resolving against the default root if needed.
pub fn from_str(uri: &str) -> Result<Url, Error> {
    match Url::parse(uri) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => resolve_against(None, uri),
        Err(err) => Err(Error::invalid_uri(uri, err)),
    }
}

/// Split a URI reference into its non-fragment part and an optional fragment
/// (without the leading `#`).
#[must_use]
pub fn split_fragment(uri: &str) -> (&str, Option<&str>) {
    match uri.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (uri, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_fragment_only_reference_against_base() {
        let base = Url::parse("http://example.com/schema.json").unwrap();
        let resolved = resolve_against(Some(&base), "#/definitions/foo").unwrap();
        assert_eq!(resolved.as_str(), "http://example.com/schema.json#/definitions/foo");
    }

    #[test]
    fn schemeless_reference_resolves_against_default_root() {
        let resolved = from_str("my-schema").unwrap();
        assert_eq!(resolved.scheme(), "json-schema");
    }

    #[test]
    fn split_fragment_separates_pointer() {
        assert_eq!(
            split_fragment("http://example.com/a.json#/foo"),
            ("http://example.com/a.json", Some("/foo"))
        );
        assert_eq!(split_fragment("http://example.com/a.json"), ("http://example.com/a.json", None));
    }
}
