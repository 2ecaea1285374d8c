//! Single-coin account export (BCR-2020-015 `crypto-account`).

use crate::error::DecodeError;
use crate::model::{FieldKey, FieldMap, FromValue, MapBuilder, Record, Schema, ToValue, TypeDescriptor, Validate, Value};
use crate::registry::DecodeContext;
use crate::types::{HdKey, OutputDescriptor};
use crate::validate::{self, Violations};

const MASTER_FINGERPRINT: FieldKey = FieldKey::required("master-fingerprint", 1);
const OUTPUT_DESCRIPTORS: FieldKey = FieldKey::required("output-descriptors", 2);

static ACCOUNT: TypeDescriptor = TypeDescriptor {
    tag: 311,
    name: "crypto-account",
    keys: &[MASTER_FINGERPRINT, OUTPUT_DESCRIPTORS],
    schema: "crypto-account = #6.311({ 1: uint32, 2: [+ crypto-output] })",
    strict_keys: true,
};

/// The output descriptors of one account, anchored to a master key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub master_fingerprint: u32,
    pub output_descriptors: Vec<Record<OutputDescriptor>>,
}

impl Account {
    pub fn hd_keys(&self) -> impl Iterator<Item = &Record<HdKey>> {
        self.output_descriptors.iter().flat_map(|output| output.hd_keys())
    }
}

impl Validate for Account {
    fn validate(&self, v: &mut Violations) {
        if !v.is_absent(MASTER_FINGERPRINT.name) {
            validate::fingerprint(v, "master-fingerprint", self.master_fingerprint);
        }
        if !v.is_absent(OUTPUT_DESCRIPTORS.name) {
            v.check(!self.output_descriptors.is_empty(), || {
                "output-descriptors must not be empty".to_string()
            });
        }
    }
}

impl ToValue for Account {
    fn to_value(&self) -> Value {
        MapBuilder::new()
            .field(&MASTER_FINGERPRINT, &self.master_fingerprint)
            .field(&OUTPUT_DESCRIPTORS, &self.output_descriptors)
            .build()
    }
}

impl FromValue for Account {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut map = FieldMap::new(value, &ACCOUNT, cx, violations)?;
        Ok(Account {
            master_fingerprint: map.required(&MASTER_FINGERPRINT)?,
            output_descriptors: map.required(&OUTPUT_DESCRIPTORS)?,
        })
    }
}

impl Schema for Account {
    fn descriptor() -> &'static TypeDescriptor {
        &ACCOUNT
    }
}
