//! Projection between record fields and keyed maps.
//!
//! [`FieldMap`] reads a decoded map through a descriptor's field-key map;
//! [`MapBuilder`] writes one back in ascending key order.

use rustc_hash::FxHashMap;
use tracing::warn;

use crate::error::DecodeError;
use crate::limits::{MAX_BYTES_LEN, MAX_SEQUENCE_LEN, MAX_TEXT_LEN};
use crate::model::{FieldKey, Kind, Record, Schema, TypeDescriptor, Value};
use crate::registry::{DecodeContext, union};
use crate::validate::Violations;

// =============================================================================
// DECODING
// =============================================================================

/// Decoding state for one field.
pub struct FieldCx<'a> {
    /// Registry name of the enclosing record type.
    pub type_name: &'static str,
    /// Name of the field being read.
    pub field: &'static str,
    /// Registry access for nested records.
    pub cx: DecodeContext<'a>,
    violations: &'a mut Violations,
}

impl<'a> FieldCx<'a> {
    pub fn new(
        type_name: &'static str,
        field: &'static str,
        cx: DecodeContext<'a>,
        violations: &'a mut Violations,
    ) -> Self {
        Self {
            type_name,
            field,
            cx,
            violations,
        }
    }

    /// Builds a kind mismatch error for this field.
    pub fn mismatch(&self, expected: Kind, found: &Value) -> DecodeError {
        DecodeError::TypeMismatch {
            type_name: self.type_name,
            field: self.field,
            expected,
            found: found.kind(),
        }
    }

    /// Builds a shape error for this field.
    pub fn invalid(&self, reason: &'static str) -> DecodeError {
        DecodeError::InvalidShape {
            type_name: self.type_name,
            field: self.field,
            reason,
        }
    }

    /// Records a violation to be reported with the validator's.
    pub fn violation(&mut self, reason: impl Into<String>) {
        self.violations.push(reason);
    }

    /// Rejects sequences above `max` elements.
    pub fn check_len(&self, len: usize, max: usize) -> Result<(), DecodeError> {
        if len > max {
            return Err(DecodeError::LengthExceedsLimit {
                field: self.field,
                len,
                max,
            });
        }
        Ok(())
    }

    /// Decodes every element of an array field.
    pub fn array<T>(
        &mut self,
        value: &Value,
        mut element: impl FnMut(&Value, &mut FieldCx<'_>) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let items = value.as_array().ok_or_else(|| self.mismatch(Kind::Array, value))?;
        self.check_len(items.len(), MAX_SEQUENCE_LEN)?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(element(item, self)?);
        }
        Ok(out)
    }
}

/// A field type that can be read from a wire value.
pub trait FromField: Sized {
    fn from_field(value: &Value, field: &mut FieldCx<'_>) -> Result<Self, DecodeError>;

    /// Stand-in for a missing required field, so the rest of the map can
    /// still be read. `None` when the type has no neutral value.
    fn absent() -> Option<Self> {
        None
    }
}

impl FromField for u64 {
    fn from_field(value: &Value, field: &mut FieldCx<'_>) -> Result<Self, DecodeError> {
        value.as_u64().ok_or_else(|| field.mismatch(Kind::Unsigned, value))
    }

    fn absent() -> Option<Self> {
        Some(Self::default())
    }
}

impl FromField for i64 {
    fn from_field(value: &Value, field: &mut FieldCx<'_>) -> Result<Self, DecodeError> {
        match value {
            Value::Unsigned(_) | Value::Negative(_) => Ok(value.as_i64().unwrap_or_else(|| {
                field.violation(format!("{} value exceeds the signed 64-bit range", field.field));
                0
            })),
            _ => Err(field.mismatch(Kind::Unsigned, value)),
        }
    }

    fn absent() -> Option<Self> {
        Some(0)
    }
}

impl FromField for u32 {
    fn from_field(value: &Value, field: &mut FieldCx<'_>) -> Result<Self, DecodeError> {
        let wide = u64::from_field(value, field)?;
        Ok(u32::try_from(wide).unwrap_or_else(|_| {
            field.violation(format!("{} value {} exceeds the 32-bit range", field.field, wide));
            u32::MAX
        }))
    }

    fn absent() -> Option<Self> {
        Some(Self::default())
    }
}

impl FromField for u8 {
    fn from_field(value: &Value, field: &mut FieldCx<'_>) -> Result<Self, DecodeError> {
        let wide = u64::from_field(value, field)?;
        Ok(u8::try_from(wide).unwrap_or_else(|_| {
            field.violation(format!("{} value {} exceeds the 8-bit range", field.field, wide));
            u8::MAX
        }))
    }

    fn absent() -> Option<Self> {
        Some(Self::default())
    }
}

impl FromField for bool {
    fn from_field(value: &Value, field: &mut FieldCx<'_>) -> Result<Self, DecodeError> {
        value.as_bool().ok_or_else(|| field.mismatch(Kind::Bool, value))
    }

    fn absent() -> Option<Self> {
        Some(Self::default())
    }
}

impl FromField for String {
    fn from_field(value: &Value, field: &mut FieldCx<'_>) -> Result<Self, DecodeError> {
        let text = value.as_text().ok_or_else(|| field.mismatch(Kind::Text, value))?;
        field.check_len(text.len(), MAX_TEXT_LEN)?;
        Ok(text.to_string())
    }

    fn absent() -> Option<Self> {
        Some(Self::default())
    }
}

impl FromField for Vec<u8> {
    fn from_field(value: &Value, field: &mut FieldCx<'_>) -> Result<Self, DecodeError> {
        let bytes = value.as_bytes().ok_or_else(|| field.mismatch(Kind::Bytes, value))?;
        field.check_len(bytes.len(), MAX_BYTES_LEN)?;
        Ok(bytes.to_vec())
    }

    fn absent() -> Option<Self> {
        Some(Self::default())
    }
}

impl<F: Schema> FromField for Record<F> {
    fn from_field(value: &Value, field: &mut FieldCx<'_>) -> Result<Self, DecodeError> {
        union::decode_nested::<F>(value, field.type_name, field.field, field.cx)
    }
}

impl<F: Schema> FromField for Vec<Record<F>> {
    fn from_field(value: &Value, field: &mut FieldCx<'_>) -> Result<Self, DecodeError> {
        let items = value.as_array().ok_or_else(|| field.mismatch(Kind::Array, value))?;
        union::decode_sequence::<F>(items, field.type_name, field.field, field.cx)
    }

    fn absent() -> Option<Self> {
        Some(Vec::new())
    }
}

/// A keyed map being read through a descriptor.
pub struct FieldMap<'a> {
    descriptor: &'static TypeDescriptor,
    entries: FxHashMap<u64, &'a Value>,
    cx: DecodeContext<'a>,
    violations: &'a mut Violations,
}

impl<'a> FieldMap<'a> {
    /// Checks the map's keys against the descriptor.
    ///
    /// Fails on non-integer or repeated keys and on unknown keys when the
    /// descriptor is strict. Missing required keys are recorded as
    /// violations and reading carries on, so they are reported together with
    /// every problem found in the fields that are present.
    pub fn new(
        value: &'a Value,
        descriptor: &'static TypeDescriptor,
        cx: DecodeContext<'a>,
        violations: &'a mut Violations,
    ) -> Result<Self, DecodeError> {
        let type_name = descriptor.name;
        let pairs = value.as_map().ok_or(DecodeError::TypeMismatch {
            type_name,
            field: "<record>",
            expected: Kind::Map,
            found: value.kind(),
        })?;

        let mut entries = FxHashMap::default();
        for (k, v) in pairs {
            let key = k.as_u64().ok_or(DecodeError::TypeMismatch {
                type_name,
                field: "<key>",
                expected: Kind::Unsigned,
                found: k.kind(),
            })?;
            if descriptor.field(key).is_none() {
                if descriptor.strict_keys {
                    return Err(DecodeError::UnknownKey { type_name, key });
                }
                warn!(type_name, key, "ignoring unknown map key");
                continue;
            }
            if entries.insert(key, v).is_some() {
                return Err(DecodeError::DuplicateKey { type_name, key });
            }
        }

        for field in descriptor.required_keys().filter(|f| !entries.contains_key(&f.key)) {
            violations.push(format!("missing required key {} ({})", field.key, field.name));
            violations.mark_absent(field.name);
        }

        Ok(Self {
            descriptor,
            entries,
            cx,
            violations,
        })
    }

    /// Reads an optional field.
    pub fn optional<T: FromField>(&mut self, field: &'static FieldKey) -> Result<Option<T>, DecodeError> {
        let Some(&value) = self.entries.get(&field.key) else {
            return Ok(None);
        };
        let mut fcx = FieldCx::new(self.descriptor.name, field.name, self.cx, &mut *self.violations);
        T::from_field(value, &mut fcx).map(Some)
    }

    /// Reads a required field.
    ///
    /// A missing field yields [`FromField::absent`]; types without one end
    /// decoding with everything recorded so far.
    pub fn required<T: FromField>(&mut self, field: &'static FieldKey) -> Result<T, DecodeError> {
        match self.optional(field)? {
            Some(value) => Ok(value),
            None => T::absent().ok_or_else(|| self.incomplete()),
        }
    }

    /// Reads a field with a custom element decoder, for fields whose shape
    /// is not a single [`FromField`] type.
    pub fn with<T>(
        &mut self,
        field: &'static FieldKey,
        read: impl FnOnce(&Value, &mut FieldCx<'_>) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        let Some(&value) = self.entries.get(&field.key) else {
            return Ok(None);
        };
        let mut fcx = FieldCx::new(self.descriptor.name, field.name, self.cx, &mut *self.violations);
        read(value, &mut fcx).map(Some)
    }

    /// Reads a required field with a custom decoder.
    pub fn required_with<T>(
        &mut self,
        field: &'static FieldKey,
        read: impl FnOnce(&Value, &mut FieldCx<'_>) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        match self.with(field, read)? {
            Some(value) => Ok(value),
            None => Err(self.incomplete()),
        }
    }

    fn incomplete(&mut self) -> DecodeError {
        self.violations.take(self.descriptor.name).into()
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// A field type that can be written as a wire value.
pub trait ToField {
    fn to_field(&self) -> Value;
}

impl ToField for u64 {
    fn to_field(&self) -> Value {
        Value::Unsigned(*self)
    }
}

impl ToField for i64 {
    fn to_field(&self) -> Value {
        match u64::try_from(*self) {
            Ok(v) => Value::Unsigned(v),
            Err(_) => Value::Negative((-1 - *self) as u64),
        }
    }
}

impl ToField for u32 {
    fn to_field(&self) -> Value {
        Value::Unsigned(u64::from(*self))
    }
}

impl ToField for u8 {
    fn to_field(&self) -> Value {
        Value::Unsigned(u64::from(*self))
    }
}

impl ToField for bool {
    fn to_field(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToField for String {
    fn to_field(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToField for Vec<u8> {
    fn to_field(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl<F: Schema> ToField for Record<F> {
    fn to_field(&self) -> Value {
        self.to_tagged_value()
    }
}

impl<F: Schema> ToField for Vec<Record<F>> {
    fn to_field(&self) -> Value {
        Value::Array(self.iter().map(Record::to_tagged_value).collect())
    }
}

/// Writes a keyed map in ascending key order.
#[derive(Debug, Default)]
pub struct MapBuilder {
    entries: Vec<(u64, Value)>,
}

impl MapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T: ToField>(self, field: &FieldKey, value: &T) -> Self {
        self.value(field, value.to_field())
    }

    pub fn optional<T: ToField>(self, field: &FieldKey, value: Option<&T>) -> Self {
        match value {
            Some(v) => self.field(field, v),
            None => self,
        }
    }

    /// Writes `value` only when `present` holds, for fields with a default.
    pub fn field_if<T: ToField>(self, present: bool, field: &FieldKey, value: &T) -> Self {
        if present { self.field(field, value) } else { self }
    }

    /// Writes an already-projected value.
    pub fn value(mut self, field: &FieldKey, value: Value) -> Self {
        self.entries.push((field.key, value));
        self
    }

    pub fn build(mut self) -> Value {
        self.entries.sort_by_key(|(key, _)| *key);
        Value::Map(
            self.entries
                .into_iter()
                .map(|(key, value)| (Value::Unsigned(key), value))
                .collect(),
        )
    }
}
