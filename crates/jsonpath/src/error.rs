//! The error raised when a path expression fails to parse.

use std::fmt;

/// A syntactic failure while parsing a path expression, naming the byte offset
/// at which it occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPathParseError {
    pub position: usize,
    pub path: String,
    pub message: String,
}

impl JsonPathParseError {
    pub(crate) fn new(path: &str, position: usize, message: impl Into<String>) -> Self {
        JsonPathParseError {
            position,
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for JsonPathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let excerpt: String = self.path.chars().skip(self.position).take(16).collect();
        write!(
            f,
            "at byte {} of '{}': {} (near '{excerpt}')",
            self.position, self.path, self.message
        )
    }
}

impl std::error::Error for JsonPathParseError {}
