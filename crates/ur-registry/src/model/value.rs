//! Generic value model.
//!
//! Every record is projected into a [`Value`] before it touches bytes, and
//! every decode starts from one. The variants mirror the CBOR major types;
//! tagging is always explicit through [`Value::Tagged`].

use std::fmt;

/// The shape of a [`Value`], used in mismatch errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Unsigned,
    Negative,
    Bytes,
    Text,
    Array,
    Map,
    Tagged,
    Bool,
    Null,
    Float,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Unsigned => "unsigned integer",
            Kind::Negative => "negative integer",
            Kind::Bytes => "byte string",
            Kind::Text => "text string",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Tagged => "tagged value",
            Kind::Bool => "bool",
            Kind::Null => "null",
            Kind::Float => "float",
        };
        f.write_str(name)
    }
}

/// A wire-level value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unsigned integer (major type 0).
    Unsigned(u64),
    /// Negative integer `-1 - n` (major type 1).
    Negative(u64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// UTF-8 text string.
    Text(String),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Key/value pairs in wire order.
    Map(Vec<(Value, Value)>),
    /// Semantic tag wrapping an inner value (major type 6).
    Tagged(u64, Box<Value>),
    Bool(bool),
    Null,
    Float(f64),
}

impl Value {
    /// Wraps `inner` in a semantic tag.
    pub fn tagged(tag: u64, inner: Value) -> Value {
        Value::Tagged(tag, Box::new(inner))
    }

    /// Returns the shape of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Unsigned(_) => Kind::Unsigned,
            Value::Negative(_) => Kind::Negative,
            Value::Bytes(_) => Kind::Bytes,
            Value::Text(_) => Kind::Text,
            Value::Array(_) => Kind::Array,
            Value::Map(_) => Kind::Map,
            Value::Tagged(..) => Kind::Tagged,
            Value::Bool(_) => Kind::Bool,
            Value::Null => Kind::Null,
            Value::Float(_) => Kind::Float,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Unsigned(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns an unsigned or negative integer that fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Unsigned(v) => i64::try_from(*v).ok(),
            Value::Negative(n) => i64::try_from(*n).ok().map(|n| -1 - n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the tag and inner value of a tagged value.
    pub fn as_tagged(&self) -> Option<(u64, &Value)> {
        match self {
            Value::Tagged(tag, inner) => Some((*tag, inner)),
            _ => None,
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Unsigned(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_of_each_variant() {
        assert_eq!(Value::Unsigned(1).kind(), Kind::Unsigned);
        assert_eq!(Value::Negative(0).kind(), Kind::Negative);
        assert_eq!(Value::tagged(37, Value::Null).kind(), Kind::Tagged);
        assert_eq!(Value::Map(vec![]).kind(), Kind::Map);
    }

    #[test]
    fn test_accessors_reject_other_kinds() {
        let v = Value::Unsigned(7);
        assert_eq!(v.as_u64(), Some(7));
        assert_eq!(v.as_bool(), None);
        assert_eq!(v.as_text(), None);

        // Truthy integers are not booleans.
        assert_eq!(Value::Unsigned(1).as_bool(), None);
    }

    #[test]
    fn test_as_tagged() {
        let v = Value::tagged(305, Value::Map(vec![]));
        let (tag, inner) = v.as_tagged().unwrap();
        assert_eq!(tag, 305);
        assert_eq!(inner.kind(), Kind::Map);
    }
}
