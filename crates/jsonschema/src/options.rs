//! Compile-time configuration: `CompileOptions` and the fetch policy it carries.

use std::sync::Arc;

use referencing::{DefaultRetriever, FetchPolicy, Retrieve};

/// Options accepted by [`crate::JsonSchema::compile`].
pub struct CompileOptions {
    pub(crate) assert_formats: bool,
    pub(crate) fetch_policy: FetchPolicy,
    pub(crate) retriever: Arc<dyn Retrieve>,
    pub(crate) default_base_uri: Option<String>,
    pub(crate) max_depth: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            assert_formats: false,
            fetch_policy: FetchPolicy::default(),
            retriever: Arc::new(DefaultRetriever),
            default_base_uri: None,
            max_depth: 1024,
        }
    }
}

impl CompileOptions {
    #[must_use]
    pub fn new() -> Self {
        CompileOptions::default()
    }

    /// Enable format assertion globally (can still be overridden per-schema via a
    /// `formatAssertion: true` sibling of `format`).
    #[must_use]
    pub fn assert_formats(mut self, value: bool) -> Self {
        self.assert_formats = value;
        self
    }

    #[must_use]
    pub fn fetch_policy(mut self, value: FetchPolicy) -> Self {
        self.fetch_policy = value;
        self
    }

    #[must_use]
    pub fn retriever(mut self, value: Arc<dyn Retrieve>) -> Self {
        self.retriever = value;
        self
    }

    #[must_use]
    pub fn default_base_uri(mut self, value: impl Into<String>) -> Self {
        self.default_base_uri = Some(value.into());
        self
    }

    /// Recursion guard: validation fails with `RecursionLimitExceeded` beyond this depth.
    #[must_use]
    pub fn max_depth(mut self, value: usize) -> Self {
        self.max_depth = value;
        self
    }
}
