//! Document registry, URI resolution, and the remote fetch capability shared by
//! schema-like validation languages.
//!
//! This crate knows nothing about JSON Schema vocabulary; it only resolves URIs,
//! walks JSON pointers, and provides the `Retrieve` capability boundary so that no
//! I/O happens inside a compiler unless the caller opts in.

mod error;
mod list;
mod registry;
mod retriever;
mod uri;

pub use error::{Error, RemoteResolutionError, RemoteResolutionReason};
pub use list::List;
pub use registry::{document_uri, resolve_pointer, Registry};
pub use retriever::{DefaultRetriever, FetchPolicy, InMemoryRetriever, PolicyEnforcingRetriever, Retrieve};
pub use uri::{from_str as parse_uri, resolve_against, split_fragment};

pub use url::Url;
