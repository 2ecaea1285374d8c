//! Leaf record types: a single byte string, no field-key map.

use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, ParseError};
use crate::model::{FieldCx, FromField, FromValue, Schema, ToValue, TypeDescriptor, Validate, Value};
use crate::registry::DecodeContext;
use crate::validate::Violations;

// =============================================================================
// UUID
// =============================================================================

/// An RFC 4122 UUID carried as its 16 raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uuid(pub uuid::Uuid);

static UUID: TypeDescriptor = TypeDescriptor {
    tag: 37,
    name: "uuid",
    keys: &[],
    schema: "uuid = #6.37(bstr .size 16)",
    strict_keys: true,
};

impl Uuid {
    /// Generates a random (version 4) UUID.
    pub fn new_v4() -> Self {
        Uuid(uuid::Uuid::new_v4())
    }

    /// Generates a time-ordered (version 7) UUID.
    pub fn now_v7() -> Self {
        Uuid(uuid::Uuid::now_v7())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Uuid(uuid::Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Validate for Uuid {
    fn validate(&self, _: &mut Violations) {}
}

impl ToValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Bytes(self.0.as_bytes().to_vec())
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut field = FieldCx::new(UUID.name, "value", cx, violations);
        let bytes = Vec::<u8>::from_field(value, &mut field)?;
        match <[u8; 16]>::try_from(bytes.as_slice()) {
            Ok(raw) => Ok(Uuid::from_bytes(raw)),
            Err(_) => {
                field.violation(format!("uuid must be 16 bytes, got {}", bytes.len()));
                Ok(Uuid(uuid::Uuid::nil()))
            }
        }
    }
}

impl Schema for Uuid {
    fn descriptor() -> &'static TypeDescriptor {
        &UUID
    }
}

/// Lowercase hyphenated form, e.g. `123e4567-e89b-12d3-a456-426614174000`.
impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Uuid {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Uuid)
            .map_err(|_| ParseError::InvalidUuid(s.to_string()))
    }
}

// =============================================================================
// SYNC ID
// =============================================================================

/// Opaque identifier a device uses to match portfolio updates, 1 to 16 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncId(pub Vec<u8>);

static SYNC_ID: TypeDescriptor = TypeDescriptor {
    tag: 41410,
    name: "sync-id",
    keys: &[],
    schema: "sync-id = #6.41410(bstr .size (1..16))",
    strict_keys: true,
};

impl Validate for SyncId {
    fn validate(&self, v: &mut Violations) {
        let len = self.0.len();
        v.check((1..=16).contains(&len), || format!("sync-id must be 1 to 16 bytes, got {len}"));
    }
}

impl ToValue for SyncId {
    fn to_value(&self) -> Value {
        Value::Bytes(self.0.clone())
    }
}

impl FromValue for SyncId {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut field = FieldCx::new(SYNC_ID.name, "value", cx, violations);
        Vec::<u8>::from_field(value, &mut field).map(SyncId)
    }
}

impl Schema for SyncId {
    fn descriptor() -> &'static TypeDescriptor {
        &SYNC_ID
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::Record;
    use proptest::prelude::*;

    #[test]
    fn test_sync_id_payload() {
        let bytes = vec![0xba, 0xbe, 0xca, 0xfe, 0x8b, 0xad, 0xf0, 0x0d];
        let id = Record::new(SyncId(bytes.clone())).unwrap();

        let payload = id.to_bytes().unwrap();
        assert_eq!(payload, [0x48, 0xba, 0xbe, 0xca, 0xfe, 0x8b, 0xad, 0xf0, 0x0d]);
        assert_eq!(Record::<SyncId>::from_bytes(&payload).unwrap().fields().0, bytes);
        assert_eq!(id.to_string(), "babecafe8badf00d");
    }

    #[test]
    fn test_sync_id_bounds() {
        let err = Record::new(SyncId(vec![])).unwrap_err();
        assert_eq!(err.reasons, ["sync-id must be 1 to 16 bytes, got 0"]);
        assert!(Record::new(SyncId(vec![0; 17])).is_err());
        assert!(Record::new(SyncId(vec![0; 16])).is_ok());
    }

    #[test]
    fn test_sync_id_ur() {
        let id = Record::new(SyncId(vec![0xba, 0xbe, 0xca, 0xfe, 0x8b, 0xad, 0xf0, 0x0d])).unwrap();
        let ur = id.to_ur().unwrap();
        assert_eq!(ur, "ur:sync-id/fdrdrnsgzelupmwtbtjpryzsss");
        assert_eq!(Record::<SyncId>::from_ur(&ur).unwrap(), id);
        assert_eq!(Record::<SyncId>::from_ur(&ur.to_uppercase()).unwrap(), id);
    }

    #[test]
    fn test_uuid_text_form() {
        let raw = [
            0x12, 0x3e, 0x45, 0x67, 0xe8, 0x9b, 0x12, 0xd3, 0xa4, 0x56, 0x42, 0x66, 0x14, 0x17, 0x40, 0x00,
        ];
        let id = Record::new(Uuid::from_bytes(raw)).unwrap();
        let text = id.to_string();
        assert_eq!(text, "123e4567-e89b-12d3-a456-426614174000");

        let parsed = Record::new(text.parse::<Uuid>().unwrap()).unwrap();
        assert_eq!(parsed.to_value(), Value::Bytes(raw.to_vec()));
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_uuid_parse_rejects_garbage() {
        assert_eq!(
            "not-a-uuid".parse::<Uuid>().unwrap_err(),
            ParseError::InvalidUuid("not-a-uuid".into())
        );
    }

    #[test]
    fn test_uuid_wrong_length_is_validation_error() {
        let err = Record::<Uuid>::from_bytes(&[0x43, 1, 2, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.reasons(), ["uuid must be 16 bytes, got 3"]);
    }

    #[test]
    fn test_leaf_rejects_non_bytes() {
        let err = Record::<SyncId>::from_bytes(&[0x61, 0x61]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_generated_versions() {
        assert_eq!(Uuid::new_v4().0.get_version_num(), 4);
        assert_eq!(Uuid::now_v7().0.get_version_num(), 7);
    }

    #[test]
    fn test_tagged_uuid() {
        let id = Record::new(Uuid::new_v4()).unwrap();
        let bytes = id.to_tagged_bytes().unwrap();
        assert_eq!(&bytes[..3], [0xd8, 0x25, 0x50]);
        assert_eq!(Record::<Uuid>::from_tagged_bytes(&bytes).unwrap(), id);
    }

    proptest! {
        #[test]
        fn prop_sync_id_survives_ur(bytes in proptest::collection::vec(any::<u8>(), 1..=16)) {
            let id = Record::new(SyncId(bytes)).unwrap();
            let ur = id.to_ur().unwrap();
            prop_assert_eq!(Record::<SyncId>::from_ur(&ur).unwrap(), id);
        }
    }
}
