//! Record type descriptors and validated record instances.
//!
//! A record type is a plain struct of raw field values implementing
//! [`Schema`]. The only way to hold one as a record is [`Record<F>`], which
//! can only be obtained through validation, either by [`Record::new`] or by
//! decoding.

use std::fmt;
use std::ops::Deref;

use crate::codec::{cbor, ur};
use crate::error::{DecodeError, EncodeError, ValidationError};
use crate::model::Value;
use crate::registry::{self, DecodeContext, Registry, union};
use crate::validate::Violations;

/// A named field and its compact integer key on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey {
    /// Field name, used in errors and schema text.
    pub name: &'static str,
    /// Map key on the wire.
    pub key: u64,
    /// Whether decoding requires the key to be present.
    pub required: bool,
}

impl FieldKey {
    pub const fn required(name: &'static str, key: u64) -> Self {
        Self {
            name,
            key,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, key: u64) -> Self {
        Self {
            name,
            key,
            required: false,
        }
    }
}

/// Static description of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    /// CBOR tag identifying the type on the wire.
    pub tag: u64,
    /// Registry name, also the UR type.
    pub name: &'static str,
    /// Field-key map. Empty for leaf types.
    pub keys: &'static [FieldKey],
    /// CDDL documentation of the wire shape.
    pub schema: &'static str,
    /// Reject map keys not listed in `keys`.
    pub strict_keys: bool,
}

impl TypeDescriptor {
    /// Returns the field registered under a wire key.
    pub fn field(&self, key: u64) -> Option<&'static FieldKey> {
        self.keys.iter().find(|f| f.key == key)
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &'static FieldKey> {
        self.keys.iter().filter(|f| f.required)
    }

    pub fn optional_keys(&self) -> impl Iterator<Item = &'static FieldKey> {
        self.keys.iter().filter(|f| !f.required)
    }
}

/// Checks the invariants of a set of field values.
///
/// Implementations push every violation they find and never stop at the
/// first one. They must not mutate anything.
pub trait Validate {
    fn validate(&self, violations: &mut Violations);
}

/// Projects field values into an untagged [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Reads field values from an untagged [`Value`].
///
/// Range problems found while reading go into `violations` rather than
/// failing immediately, so they are reported together with the validator's.
pub trait FromValue: Sized {
    fn from_value(
        value: &Value,
        cx: DecodeContext<'_>,
        violations: &mut Violations,
    ) -> Result<Self, DecodeError>;
}

/// A registrable record type.
pub trait Schema:
    Validate + ToValue + FromValue + fmt::Debug + Clone + PartialEq + Send + Sync + 'static
{
    fn descriptor() -> &'static TypeDescriptor;
}

/// A validated record instance.
///
/// Dereferences to the field values. There is no mutable access; to change
/// a record, take its fields with [`Record::into_fields`] and construct anew.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record<F>(F);

impl<F: Schema> Record<F> {
    /// Validates `fields` and wraps them as a record.
    pub fn new(fields: F) -> Result<Self, ValidationError> {
        Self::construct(fields, Violations::new())
    }

    pub(crate) fn construct(fields: F, mut violations: Violations) -> Result<Self, ValidationError> {
        fields.validate(&mut violations);
        violations.into_result(F::descriptor().name)?;
        Ok(Record(fields))
    }

    pub fn descriptor() -> &'static TypeDescriptor {
        F::descriptor()
    }

    pub fn tag(&self) -> u64 {
        F::descriptor().tag
    }

    pub fn fields(&self) -> &F {
        &self.0
    }

    pub fn into_fields(self) -> F {
        self.0
    }

    /// Returns the untagged wire value.
    pub fn to_value(&self) -> Value {
        self.0.to_value()
    }

    /// Returns the wire value wrapped in this type's tag.
    pub fn to_tagged_value(&self) -> Value {
        Value::tagged(self.tag(), self.to_value())
    }

    /// Encodes the untagged value, as carried in a UR payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        cbor::encode(&self.to_value())
    }

    /// Encodes the tagged value, self-identifying without a UR type.
    pub fn to_tagged_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        cbor::encode(&self.to_tagged_value())
    }

    /// Encodes as a single-part `ur:<name>/<bytewords>` string.
    pub fn to_ur(&self) -> Result<String, EncodeError> {
        Ok(ur::encode(F::descriptor().name, &self.to_bytes()?))
    }

    /// Decodes an untagged value and validates the result.
    pub fn from_value(value: &Value, cx: DecodeContext<'_>) -> Result<Self, DecodeError> {
        let mut violations = Violations::new();
        let fields = F::from_value(value, cx, &mut violations)?;
        Ok(Self::construct(fields, violations)?)
    }

    /// Decodes an untagged payload using the global registry.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::from_bytes_in(bytes, registry::global())
    }

    pub fn from_bytes_in(bytes: &[u8], registry: &Registry) -> Result<Self, DecodeError> {
        let value = cbor::decode(bytes)?;
        Self::from_value(&value, DecodeContext::new(registry))
    }

    /// Decodes a tagged payload using the global registry.
    pub fn from_tagged_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::from_tagged_bytes_in(bytes, registry::global())
    }

    pub fn from_tagged_bytes_in(bytes: &[u8], registry: &Registry) -> Result<Self, DecodeError> {
        let value = cbor::decode(bytes)?;
        union::decode_nested::<F>(&value, F::descriptor().name, "<root>", DecodeContext::new(registry))
    }

    /// Decodes a single-part UR using the global registry.
    pub fn from_ur(s: &str) -> Result<Self, DecodeError> {
        Self::from_ur_in(s, registry::global())
    }

    pub fn from_ur_in(s: &str, registry: &Registry) -> Result<Self, DecodeError> {
        let parsed = ur::decode(s)?;
        let expected = F::descriptor();
        if parsed.ur_type != expected.name {
            let entry = registry.lookup_name(&parsed.ur_type)?;
            return Err(DecodeError::UnexpectedTag {
                type_name: expected.name,
                field: "<ur>",
                tag: entry.descriptor().tag,
                found: entry.descriptor().name,
                expected: expected.name,
            });
        }
        Self::from_bytes_in(&parsed.payload, registry)
    }
}

impl<F: Schema + fmt::Display> fmt::Display for Record<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<F> Deref for Record<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.0
    }
}
