use core::fmt;
use std::{num::ParseIntError, str::Utf8Error};

/// The reason a [`crate::Retrieve`] call failed, per the declarative fetch policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteResolutionReason {
    NotFound,
    PolicyDenied,
    PayloadTooLarge,
    Timeout,
    Transport,
}

impl fmt::Display for RemoteResolutionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RemoteResolutionReason::NotFound => "not found",
            RemoteResolutionReason::PolicyDenied => "denied by fetch policy",
            RemoteResolutionReason::PayloadTooLarge => "payload exceeds the configured size limit",
            RemoteResolutionReason::Timeout => "timed out",
            RemoteResolutionReason::Transport => "transport error",
        };
        f.write_str(text)
    }
}

/// An error raised while retrieving or enforcing policy over an external document.
#[derive(Debug)]
pub struct RemoteResolutionError {
    pub uri: String,
    pub reason: RemoteResolutionReason,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RemoteResolutionError {
    #[must_use]
    pub fn new(uri: impl Into<String>, reason: RemoteResolutionReason) -> Self {
        RemoteResolutionError {
            uri: uri.into(),
            reason,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(
        uri: impl Into<String>,
        reason: RemoteResolutionReason,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        RemoteResolutionError {
            uri: uri.into(),
            reason,
            source: Some(source),
        }
    }
}

impl fmt::Display for RemoteResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to resolve '{}': {}", self.uri, self.reason)?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteResolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Errors that can occur during reference resolution and resource handling.
#[derive(Debug)]
pub enum Error {
    /// A resource is not present in a registry and retrieving it failed.
    Unretrievable {
        uri: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    /// A JSON Pointer leads to a part of a document that does not exist.
    PointerToNowhere { pointer: String },
    /// JSON Pointer contains invalid percent-encoded data.
    InvalidPercentEncoding { pointer: String, source: Utf8Error },
    /// Failed to parse an array index in a JSON Pointer.
    InvalidArrayIndex {
        pointer: String,
        index: String,
        source: ParseIntError,
    },
    /// An anchor does not exist within a particular resource.
    NoSuchAnchor { anchor: String },
    /// An error occurred while parsing or resolving a URI.
    InvalidUri { uri: String, source: url::ParseError },
    /// A document was retrieved but denied or failed under the fetch policy.
    Remote(RemoteResolutionError),
}

impl Error {
    pub(crate) fn pointer_to_nowhere(pointer: impl Into<String>) -> Error {
        Error::PointerToNowhere {
            pointer: pointer.into(),
        }
    }

    pub(crate) fn invalid_percent_encoding(pointer: impl Into<String>, source: Utf8Error) -> Error {
        Error::InvalidPercentEncoding {
            pointer: pointer.into(),
            source,
        }
    }

    pub(crate) fn invalid_array_index(
        pointer: impl Into<String>,
        index: impl Into<String>,
        source: ParseIntError,
    ) -> Error {
        Error::InvalidArrayIndex {
            pointer: pointer.into(),
            index: index.into(),
            source,
        }
    }

    pub(crate) fn no_such_anchor(anchor: impl Into<String>) -> Error {
        Error::NoSuchAnchor {
            anchor: anchor.into(),
        }
    }

    pub(crate) fn invalid_uri(uri: impl Into<String>, source: url::ParseError) -> Error {
        Error::InvalidUri {
            uri: uri.into(),
            source,
        }
    }

    pub(crate) fn unretrievable(
        uri: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Error {
        Error::Unretrievable {
            uri: uri.into(),
            source,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unretrievable { uri, source } => {
                write!(f, "resource '{uri}' is not present in the registry and retrieving it failed")?;
                if let Some(err) = source {
                    write!(f, ": {err}")?;
                }
                Ok(())
            }
            Error::PointerToNowhere { pointer } => {
                write!(f, "pointer '{pointer}' does not exist")
            }
            Error::InvalidPercentEncoding { pointer, .. } => {
                write!(f, "invalid percent encoding in pointer '{pointer}': the decoded bytes are not valid UTF-8")
            }
            Error::InvalidArrayIndex { pointer, index, .. } => {
                write!(f, "failed to parse array index '{index}' in pointer '{pointer}'")
            }
            Error::NoSuchAnchor { anchor } => {
                write!(f, "anchor '{anchor}' does not exist")
            }
            Error::InvalidUri { uri, source } => {
                write!(f, "invalid URI '{uri}': {source}")
            }
            Error::Remote(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Unretrievable { source, .. } => source.as_deref().map(|e| e as &(dyn std::error::Error + 'static)),
            Error::InvalidPercentEncoding { source, .. } => Some(source),
            Error::InvalidArrayIndex { source, .. } => Some(source),
            Error::InvalidUri { source, .. } => Some(source),
            Error::Remote(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RemoteResolutionError> for Error {
    fn from(error: RemoteResolutionError) -> Self {
        Error::Remote(error)
    }
}
