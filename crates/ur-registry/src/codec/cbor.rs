//! CBOR byte codec.
//!
//! The byte-level work is done by `ciborium`; this module converts between
//! its value type and [`Value`], enforces payload limits and rejects
//! trailing data.

use ciborium::value::{Integer, Value as CborValue};

use crate::error::{DecodeError, EncodeError};
use crate::limits::MAX_PAYLOAD_BYTES;
use crate::model::Value;

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a value to CBOR bytes.
pub fn encode(value: &Value) -> Result<Vec<u8>, EncodeError> {
    let cbor = to_cbor(value)?;
    let mut buf = Vec::new();
    ciborium::into_writer(&cbor, &mut buf).map_err(|e| EncodeError::Cbor(format!("{e:?}")))?;
    Ok(buf)
}

fn to_cbor(value: &Value) -> Result<CborValue, EncodeError> {
    Ok(match value {
        Value::Unsigned(n) => CborValue::Integer(Integer::from(*n)),
        Value::Negative(n) => {
            let signed = -1 - i128::from(*n);
            let int = Integer::try_from(signed).map_err(|_| EncodeError::NegativeOutOfRange(*n))?;
            CborValue::Integer(int)
        }
        Value::Bytes(b) => CborValue::Bytes(b.clone()),
        Value::Text(t) => CborValue::Text(t.clone()),
        Value::Array(items) => CborValue::Array(items.iter().map(to_cbor).collect::<Result<_, _>>()?),
        Value::Map(pairs) => CborValue::Map(
            pairs
                .iter()
                .map(|(k, v)| Ok((to_cbor(k)?, to_cbor(v)?)))
                .collect::<Result<_, EncodeError>>()?,
        ),
        Value::Tagged(tag, inner) => CborValue::Tag(*tag, Box::new(to_cbor(inner)?)),
        Value::Bool(b) => CborValue::Bool(*b),
        Value::Null => CborValue::Null,
        Value::Float(f) => CborValue::Float(*f),
    })
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes exactly one CBOR item from `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Value, DecodeError> {
    if bytes.len() > MAX_PAYLOAD_BYTES {
        return Err(DecodeError::LengthExceedsLimit {
            field: "payload",
            len: bytes.len(),
            max: MAX_PAYLOAD_BYTES,
        });
    }
    let mut rest = bytes;
    let cbor: CborValue =
        ciborium::from_reader(&mut rest).map_err(|e| DecodeError::Malformed(format!("{e:?}")))?;
    if !rest.is_empty() {
        return Err(DecodeError::TrailingBytes { count: rest.len() });
    }
    from_cbor(cbor)
}

fn from_cbor(cbor: CborValue) -> Result<Value, DecodeError> {
    Ok(match cbor {
        CborValue::Integer(int) => {
            let wide = i128::from(int);
            if wide >= 0 {
                Value::Unsigned(u64::try_from(wide).map_err(|_| out_of_range(wide))?)
            } else {
                Value::Negative(u64::try_from(-1 - wide).map_err(|_| out_of_range(wide))?)
            }
        }
        CborValue::Bytes(b) => Value::Bytes(b),
        CborValue::Text(t) => Value::Text(t),
        CborValue::Array(items) => Value::Array(items.into_iter().map(from_cbor).collect::<Result<_, _>>()?),
        CborValue::Map(pairs) => Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| Ok((from_cbor(k)?, from_cbor(v)?)))
                .collect::<Result<_, DecodeError>>()?,
        ),
        CborValue::Tag(tag, inner) => Value::Tagged(tag, Box::new(from_cbor(*inner)?)),
        CborValue::Bool(b) => Value::Bool(b),
        CborValue::Null => Value::Null,
        CborValue::Float(f) => Value::Float(f),
        other => return Err(DecodeError::Malformed(format!("unsupported CBOR item {other:?}"))),
    })
}

fn out_of_range(wide: i128) -> DecodeError {
    DecodeError::Malformed(format!("integer {wide} is outside the 64-bit range"))
}
