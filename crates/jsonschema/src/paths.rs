//! Instance and schema path tracking, rendered as RFC 6901 JSON Pointers.

use std::fmt;

/// One segment of a path: a property name, an array index, or a schema keyword name.
///
/// Keywords get their own variant rather than reusing `Property` so that future
/// output formats can tell "this segment is a literal keyword" from "this segment
/// came from the instance data" without re-deriving it from a fixed keyword list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathChunk {
    Property(String),
    Index(usize),
    Keyword(&'static str),
}

impl From<String> for PathChunk {
    fn from(value: String) -> Self {
        PathChunk::Property(value)
    }
}

impl From<&str> for PathChunk {
    fn from(value: &str) -> Self {
        PathChunk::Property(value.to_string())
    }
}

impl From<usize> for PathChunk {
    fn from(value: usize) -> Self {
        PathChunk::Index(value)
    }
}


/// A JSON Pointer, represented as a sequence of path chunks so indices don't need
/// to be stringified until the pointer is actually rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPointer(Vec<PathChunk>);

impl JsonPointer {
    #[must_use]
    pub fn root() -> Self {
        JsonPointer(Vec::new())
    }

    #[must_use]
    pub fn push(&self, chunk: impl Into<PathChunk>) -> Self {
        let mut chunks = self.0.clone();
        chunks.push(chunk.into());
        JsonPointer(chunks)
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathChunk> {
        self.0.iter()
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in &self.0 {
            f.write_str("/")?;
            match chunk {
                PathChunk::Property(value) => {
                    for ch in value.chars() {
                        match ch {
                            '~' => f.write_str("~0")?,
                            '/' => f.write_str("~1")?,
                            _ => f.write_char(ch)?,
                        }
                    }
                }
                PathChunk::Index(index) => write!(f, "{index}")?,
                PathChunk::Keyword(keyword) => f.write_str(keyword)?,
            }
        }
        Ok(())
    }
}

impl serde::Serialize for JsonPointer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_tilde_and_slash() {
        let pointer = JsonPointer::root().push("/").push("~");
        assert_eq!(pointer.to_string(), "/~1/~0");
    }

    #[test]
    fn renders_indices_without_quoting() {
        let pointer = JsonPointer::root().push("items").push(3usize);
        assert_eq!(pointer.to_string(), "/items/3");
    }

    #[test]
    fn root_pointer_is_empty_string() {
        assert_eq!(JsonPointer::root().to_string(), "");
    }
}
