//! The compiled form of a JTD schema: a sum type over RFC 8927's eight schema
//! forms, plus the `nullable` modifier that can wrap any of them.

use std::collections::BTreeMap;

/// One compiled schema node. `definitions` referenced by [`Node::Ref`] live
/// alongside the root in [`crate::CompiledJtd`], not inline here.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `{}` — every instance is valid.
    Empty,
    Type {
        type_kw: TypeKeyword,
    },
    Enum {
        values: Vec<String>,
    },
    Elements {
        schema: Box<Node>,
    },
    Properties {
        required: BTreeMap<String, Node>,
        optional: BTreeMap<String, Node>,
        additional: bool,
    },
    Values {
        schema: Box<Node>,
    },
    Discriminator {
        tag: String,
        mapping: BTreeMap<String, Node>,
    },
    /// A reference into the root schema's `definitions` map, by name.
    Ref {
        name: String,
    },
    /// `nullable: true` wrapping any other form: `null` passes outright.
    Nullable {
        inner: Box<Node>,
    },
}

/// The primitive types named by JTD's `type` form, each with the numeric
/// range its wire representation must fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKeyword {
    Boolean,
    String,
    Timestamp,
    Float32,
    Float64,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
}

impl TypeKeyword {
    pub(crate) fn from_name(name: &str) -> Option<TypeKeyword> {
        Some(match name {
            "boolean" => TypeKeyword::Boolean,
            "string" => TypeKeyword::String,
            "timestamp" => TypeKeyword::Timestamp,
            "float32" => TypeKeyword::Float32,
            "float64" => TypeKeyword::Float64,
            "int8" => TypeKeyword::Int8,
            "uint8" => TypeKeyword::Uint8,
            "int16" => TypeKeyword::Int16,
            "uint16" => TypeKeyword::Uint16,
            "int32" => TypeKeyword::Int32,
            "uint32" => TypeKeyword::Uint32,
            _ => return None,
        })
    }

    /// The inclusive `[min, max]` range for the integer-typed keywords;
    /// `None` for the non-integer ones.
    pub(crate) fn integer_range(self) -> Option<(f64, f64)> {
        match self {
            TypeKeyword::Int8 => Some((-128.0, 127.0)),
            TypeKeyword::Uint8 => Some((0.0, 255.0)),
            TypeKeyword::Int16 => Some((-32_768.0, 32_767.0)),
            TypeKeyword::Uint16 => Some((0.0, 65_535.0)),
            TypeKeyword::Int32 => Some((-2_147_483_648.0, 2_147_483_647.0)),
            TypeKeyword::Uint32 => Some((0.0, 4_294_967_295.0)),
            TypeKeyword::Boolean | TypeKeyword::String | TypeKeyword::Timestamp | TypeKeyword::Float32 | TypeKeyword::Float64 => None,
        }
    }
}
