use std::{
    collections::HashSet,
    sync::Mutex,
    time::{Duration, Instant},
};

use ahash::AHashMap;
use serde_json::Value;

use crate::error::{RemoteResolutionError, RemoteResolutionReason};

/// Capability for retrieving documents that are not already present in a registry.
///
/// Implementors may read from disk, an in-memory map, or the network; the core
/// never performs I/O itself.
pub trait Retrieve: Send + Sync {
    /// Attempt to retrieve the document at `uri`.
    ///
    /// # Errors
    ///
    /// If the resource could not be retrieved.
    fn retrieve(&self, uri: &str) -> Result<Value, RemoteResolutionError>;
}

/// A retriever that never fetches anything; every call fails with `NotFound`.
///
/// This is the default, matching the requirement that the core performs no I/O
/// unless a caller explicitly opts in by providing their own [`Retrieve`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefaultRetriever;

impl Retrieve for DefaultRetriever {
    fn retrieve(&self, uri: &str) -> Result<Value, RemoteResolutionError> {
        Err(RemoteResolutionError::new(uri, RemoteResolutionReason::NotFound))
    }
}

/// A retriever backed by a fixed in-memory map, useful for tests and for callers
/// who want to preload schema documents without performing any I/O at all.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRetriever {
    documents: AHashMap<String, Value>,
}

impl InMemoryRetriever {
    #[must_use]
    pub fn new() -> Self {
        InMemoryRetriever {
            documents: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn with_document(mut self, uri: impl Into<String>, document: Value) -> Self {
        self.documents.insert(uri.into(), document);
        self
    }
}

impl Retrieve for InMemoryRetriever {
    fn retrieve(&self, uri: &str) -> Result<Value, RemoteResolutionError> {
        self.documents
            .get(uri)
            .cloned()
            .ok_or_else(|| RemoteResolutionError::new(uri, RemoteResolutionReason::NotFound))
    }
}

/// The declarative policy a compile operation enforces around every retrieval.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub allowed_schemes: HashSet<String>,
    pub max_document_bytes: u64,
    pub timeout: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        FetchPolicy {
            allowed_schemes: ["http", "https"].iter().map(|s| (*s).to_string()).collect(),
            max_document_bytes: 1_048_576,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Wraps a [`Retrieve`] implementation with scheme checking, size enforcement,
/// timeout enforcement and per-compile memoization, per the fetch policy.
///
/// Built fresh for each compile operation and dropped when it returns; the cache
/// has the lifetime of a single compile, never longer.
pub struct PolicyEnforcingRetriever<'a> {
    inner: &'a dyn Retrieve,
    policy: &'a FetchPolicy,
    cache: Mutex<AHashMap<String, Result<Value, RemoteResolutionReason>>>,
}

impl<'a> PolicyEnforcingRetriever<'a> {
    #[must_use]
    pub fn new(inner: &'a dyn Retrieve, policy: &'a FetchPolicy) -> Self {
        PolicyEnforcingRetriever {
            inner,
            policy,
            cache: Mutex::new(AHashMap::new()),
        }
    }

    /// Retrieve `uri`, enforcing scheme, size and timeout policy and memoizing
    /// both successes and failures for the lifetime of this retriever.
    ///
    /// # Errors
    ///
    /// If the scheme is denied, the payload is too large, the call exceeds the
    /// configured timeout, or the underlying retriever fails.
    pub fn retrieve(&self, uri: &str) -> Result<Value, RemoteResolutionError> {
        if let Some(cached) = self.cache.lock().unwrap().get(uri) {
            return cached
                .clone()
                .map_err(|reason| RemoteResolutionError::new(uri, reason));
        }

        let result = self.retrieve_uncached(uri);
        let memoized = result
            .as_ref()
            .map(Clone::clone)
            .map_err(|err| err.reason.clone());
        self.cache.lock().unwrap().insert(uri.to_string(), memoized);
        result
    }

    fn retrieve_uncached(&self, uri: &str) -> Result<Value, RemoteResolutionError> {
        let scheme = uri.split(':').next().unwrap_or_default();
        if !self.policy.allowed_schemes.iter().any(|s| s == scheme) {
            return Err(RemoteResolutionError::new(uri, RemoteResolutionReason::PolicyDenied));
        }

        let start = Instant::now();
        let document = self.inner.retrieve(uri)?;
        let elapsed = start.elapsed();
        if elapsed > self.policy.timeout {
            return Err(RemoteResolutionError::new(uri, RemoteResolutionReason::Timeout));
        }

        let size = serde_json::to_vec(&document)
            .map(|bytes| bytes.len() as u64)
            .unwrap_or(u64::MAX);
        if size > self.policy.max_document_bytes {
            return Err(RemoteResolutionError::new(uri, RemoteResolutionReason::PayloadTooLarge));
        }

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct CountingRetriever {
        calls: Mutex<u32>,
    }

    impl Retrieve for CountingRetriever {
        fn retrieve(&self, _uri: &str) -> Result<Value, RemoteResolutionError> {
            *self.calls.lock().unwrap() += 1;
            Ok(json!({"$defs": {"x": {"type": "integer"}}}))
        }
    }

    #[test]
    fn scheme_not_in_allow_list_is_denied_without_calling_the_retriever() {
        let retriever = CountingRetriever { calls: Mutex::new(0) };
        let policy = FetchPolicy::default();
        let wrapped = PolicyEnforcingRetriever::new(&retriever, &policy);

        let err = wrapped.retrieve("file:///etc/passwd").unwrap_err();
        assert_eq!(err.reason, RemoteResolutionReason::PolicyDenied);
        assert_eq!(*retriever.calls.lock().unwrap(), 0);
    }

    #[test]
    fn repeated_fetches_of_the_same_uri_are_memoized() {
        let retriever = CountingRetriever { calls: Mutex::new(0) };
        let policy = FetchPolicy::default();
        let wrapped = PolicyEnforcingRetriever::new(&retriever, &policy);

        wrapped.retrieve("http://example.com/a.json").unwrap();
        wrapped.retrieve("http://example.com/a.json").unwrap();

        assert_eq!(*retriever.calls.lock().unwrap(), 1);
    }

    #[test]
    fn oversized_documents_are_rejected() {
        let retriever = CountingRetriever { calls: Mutex::new(0) };
        let policy = FetchPolicy {
            max_document_bytes: 1,
            ..FetchPolicy::default()
        };
        let wrapped = PolicyEnforcingRetriever::new(&retriever, &policy);

        let err = wrapped.retrieve("http://example.com/a.json").unwrap_err();
        assert_eq!(err.reason, RemoteResolutionReason::PayloadTooLarge);
    }
}
