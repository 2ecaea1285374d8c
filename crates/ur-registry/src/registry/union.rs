//! Resolution of nested and polymorphic fields.
//!
//! A nested record is always `tag(value)` on the wire. Its tag is looked up
//! in the registry, never guessed from the value's shape. A union field is
//! either a sequence of one record type or a single tagged value drawn from
//! a list of alternatives, checked in declared order. A union with a
//! fallback is open: any other registered tag decodes through the registry.

use tracing::trace;

use crate::error::DecodeError;
use crate::limits::MAX_SEQUENCE_LEN;
use crate::model::{Kind, Record, Schema, Value};
use crate::registry::{DecodeContext, DynRecord};

/// Decodes `tag(value)` as a `Record<F>`.
///
/// The tag must be registered ([`DecodeError::UnknownTag`] otherwise) and
/// must resolve to `F` ([`DecodeError::UnexpectedTag`] otherwise).
pub fn decode_nested<F: Schema>(
    value: &Value,
    type_name: &'static str,
    field: &'static str,
    cx: DecodeContext<'_>,
) -> Result<Record<F>, DecodeError> {
    let (tag, inner) = value.as_tagged().ok_or(DecodeError::TypeMismatch {
        type_name,
        field,
        expected: Kind::Tagged,
        found: value.kind(),
    })?;
    let entry = cx.registry().lookup_tag(tag)?;
    if !entry.is::<F>() {
        return Err(DecodeError::UnexpectedTag {
            type_name,
            field,
            tag,
            found: entry.descriptor().name,
            expected: F::descriptor().name,
        });
    }
    Record::from_value(inner, cx)
}

/// Decodes each element of a sequence as a tagged `Record<F>`.
pub fn decode_sequence<F: Schema>(
    items: &[Value],
    type_name: &'static str,
    field: &'static str,
    cx: DecodeContext<'_>,
) -> Result<Vec<Record<F>>, DecodeError> {
    if items.len() > MAX_SEQUENCE_LEN {
        return Err(DecodeError::LengthExceedsLimit {
            field,
            len: items.len(),
            max: MAX_SEQUENCE_LEN,
        });
    }
    items
        .iter()
        .map(|item| decode_nested::<F>(item, type_name, field, cx))
        .collect()
}

/// Decoder for one admissible single-value member of a union.
pub struct Alternative<T> {
    /// Tag selecting this member.
    pub tag: u64,
    /// Registry name, for errors and logs.
    pub name: &'static str,
    /// Decodes the untagged inner value.
    pub decode: fn(&Value, DecodeContext<'_>) -> Result<T, DecodeError>,
}

/// A polymorphic field.
pub struct Union<T: 'static> {
    /// Registry name of the enclosing record type.
    pub type_name: &'static str,
    /// Field name.
    pub field: &'static str,
    /// Decoder for the sequence form, if the field admits one.
    pub sequence: Option<fn(&[Value], DecodeContext<'_>) -> Result<T, DecodeError>>,
    /// Single-value members in priority order. The first matching tag wins.
    pub alternatives: &'static [Alternative<T>],
    /// Wraps a registered record whose tag matches no alternative. Without
    /// one, such tags fail with [`DecodeError::UnexpectedTag`].
    pub fallback: Option<fn(Box<dyn DynRecord>) -> T>,
}

impl<T> Union<T> {
    /// Resolves a raw field value to one member of the union.
    pub fn decode(&self, value: &Value, cx: DecodeContext<'_>) -> Result<T, DecodeError> {
        match value {
            Value::Array(items) => {
                let Some(sequence) = self.sequence else {
                    return Err(self.mismatch(Kind::Tagged, value));
                };
                trace!(type_name = self.type_name, field = self.field, len = items.len(), "union: sequence branch");
                sequence(items, cx)
            }
            Value::Tagged(tag, inner) => {
                if let Some(alt) = self.alternatives.iter().find(|alt| alt.tag == *tag) {
                    trace!(type_name = self.type_name, field = self.field, tag, member = alt.name, "union: tagged branch");
                    return (alt.decode)(inner, cx);
                }
                let entry = cx.registry().lookup_tag(*tag)?;
                if let Some(fallback) = self.fallback {
                    trace!(type_name = self.type_name, field = self.field, tag, member = entry.descriptor().name, "union: registry branch");
                    return entry.decode(inner, cx).map(fallback);
                }
                Err(DecodeError::UnexpectedTag {
                    type_name: self.type_name,
                    field: self.field,
                    tag: *tag,
                    found: entry.descriptor().name,
                    expected: self.expected(),
                })
            }
            _ => {
                let expected = if self.sequence.is_some() { Kind::Array } else { Kind::Tagged };
                Err(self.mismatch(expected, value))
            }
        }
    }

    /// Returns the tags admissible as a single value, in priority order.
    pub fn tags(&self) -> impl Iterator<Item = u64> + '_ {
        self.alternatives.iter().map(|alt| alt.tag)
    }

    fn expected(&self) -> &'static str {
        self.alternatives.first().map_or("a sequence", |alt| alt.name)
    }

    fn mismatch(&self, expected: Kind, value: &Value) -> DecodeError {
        DecodeError::TypeMismatch {
            type_name: self.type_name,
            field: self.field,
            expected,
            found: value.kind(),
        }
    }
}
