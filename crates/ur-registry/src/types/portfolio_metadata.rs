//! Portfolio metadata written by the exporting device.
//!
//! Devices add vendor fields here over time, so unknown keys are skipped
//! rather than rejected.

use crate::error::DecodeError;
use crate::model::{FieldKey, FieldMap, FromValue, MapBuilder, Record, Schema, ToValue, TypeDescriptor, Validate, Value};
use crate::registry::DecodeContext;
use crate::types::SyncId;
use crate::validate::{self, Violations};

const SYNC_ID: FieldKey = FieldKey::optional("sync-id", 1);
const LANGUAGE_CODE: FieldKey = FieldKey::optional("language-code", 2);
const FW_VERSION: FieldKey = FieldKey::optional("fw-version", 3);
const DEVICE: FieldKey = FieldKey::optional("device", 4);

static PORTFOLIO_METADATA: TypeDescriptor = TypeDescriptor {
    tag: 41404,
    name: "portfolio-metadata",
    keys: &[SYNC_ID, LANGUAGE_CODE, FW_VERSION, DEVICE],
    schema: "portfolio-metadata = #6.41404({ ? 1: sync-id, ? 2: text .size 2, ? 3: text, ? 4: text, * uint => any })",
    strict_keys: false,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortfolioMetadata {
    pub sync_id: Option<Record<SyncId>>,
    /// ISO 639-1 code of the device's display language.
    pub language_code: Option<String>,
    pub fw_version: Option<String>,
    pub device: Option<String>,
}

impl Validate for PortfolioMetadata {
    fn validate(&self, v: &mut Violations) {
        if let Some(code) = &self.language_code {
            validate::language_code(v, "language-code", code);
        }
        if let Some(device) = &self.device {
            validate::non_empty(v, "device", device);
        }
    }
}

impl ToValue for PortfolioMetadata {
    fn to_value(&self) -> Value {
        MapBuilder::new()
            .optional(&SYNC_ID, self.sync_id.as_ref())
            .optional(&LANGUAGE_CODE, self.language_code.as_ref())
            .optional(&FW_VERSION, self.fw_version.as_ref())
            .optional(&DEVICE, self.device.as_ref())
            .build()
    }
}

impl FromValue for PortfolioMetadata {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut map = FieldMap::new(value, &PORTFOLIO_METADATA, cx, violations)?;
        Ok(PortfolioMetadata {
            sync_id: map.optional(&SYNC_ID)?,
            language_code: map.optional(&LANGUAGE_CODE)?,
            fw_version: map.optional(&FW_VERSION)?,
            device: map.optional(&DEVICE)?,
        })
    }
}

impl Schema for PortfolioMetadata {
    fn descriptor() -> &'static TypeDescriptor {
        &PORTFOLIO_METADATA
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn metadata() -> PortfolioMetadata {
        PortfolioMetadata {
            sync_id: Some(Record::new(SyncId(vec![0xba, 0xbe])).unwrap()),
            language_code: Some("en".into()),
            fw_version: Some("1.7.2".into()),
            device: Some("keystone".into()),
        }
    }

    #[test]
    fn test_round_trip() {
        let meta = Record::new(metadata()).unwrap();
        assert_eq!(Record::<PortfolioMetadata>::from_bytes(&meta.to_bytes().unwrap()).unwrap(), meta);
    }

    #[test]
    fn test_unknown_keys_are_tolerated() {
        let meta = Record::new(metadata()).unwrap();
        let Value::Map(mut pairs) = meta.to_value() else {
            unreachable!()
        };
        pairs.push((Value::Unsigned(99), Value::Text("vendor".into())));
        let decoded =
            Record::<PortfolioMetadata>::from_value(&Value::Map(pairs), DecodeContext::new(crate::registry::global()))
                .unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn test_invalid_fields() {
        let mut meta = metadata();
        meta.language_code = Some("eng".into());
        meta.device = Some(String::new());
        let err = Record::new(meta).unwrap_err();
        assert_eq!(err.reasons.len(), 2);
        assert!(err.mentions("\"eng\""));
    }

    #[test]
    fn test_sync_id_bounds_checked_when_nested() {
        let long = Value::tagged(41410, Value::Bytes(vec![0; 17]));
        let value = Value::Map(vec![(Value::Unsigned(1), long)]);
        let err = Record::<PortfolioMetadata>::from_value(&value, DecodeContext::new(crate::registry::global()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.reasons(), ["sync-id must be 1 to 16 bytes, got 17"]);
    }
}
