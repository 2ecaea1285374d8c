//! Bare elliptic-curve keys (BCR-2020-008 `crypto-eckey`).

use crate::error::DecodeError;
use crate::model::{FieldKey, FieldMap, FromValue, MapBuilder, Schema, ToValue, TypeDescriptor, Validate, Value};
use crate::registry::DecodeContext;
use crate::validate::Violations;

const CURVE: FieldKey = FieldKey::optional("curve", 1);
const IS_PRIVATE: FieldKey = FieldKey::optional("is-private", 2);
const DATA: FieldKey = FieldKey::required("data", 3);

static ECKEY: TypeDescriptor = TypeDescriptor {
    tag: 306,
    name: "crypto-eckey",
    keys: &[CURVE, IS_PRIVATE, DATA],
    schema: "eckey = #6.306({ ? 1: uint .default 0, ? 2: bool .default false, 3: bytes })",
    strict_keys: true,
};

/// Curve number for secp256k1, the default.
pub const CURVE_SECP256K1: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EcKey {
    pub curve: u64,
    pub is_private: bool,
    pub data: Vec<u8>,
}

impl Validate for EcKey {
    fn validate(&self, v: &mut Violations) {
        if v.is_absent(DATA.name) {
            return;
        }
        let len = self.data.len();
        if self.curve != CURVE_SECP256K1 {
            v.check(len > 0, || "data must not be empty".to_string());
        } else if self.is_private {
            v.check(len == 32, || format!("private key data must be 32 bytes, got {len}"));
        } else {
            v.check(len == 33 || len == 65, || {
                format!("public key data must be 33 or 65 bytes, got {len}")
            });
        }
    }
}

impl ToValue for EcKey {
    fn to_value(&self) -> Value {
        MapBuilder::new()
            .field_if(self.curve != CURVE_SECP256K1, &CURVE, &self.curve)
            .field_if(self.is_private, &IS_PRIVATE, &true)
            .field(&DATA, &self.data)
            .build()
    }
}

impl FromValue for EcKey {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut map = FieldMap::new(value, &ECKEY, cx, violations)?;
        Ok(EcKey {
            curve: map.optional(&CURVE)?.unwrap_or(CURVE_SECP256K1),
            is_private: map.optional(&IS_PRIVATE)?.unwrap_or(false),
            data: map.required(&DATA)?,
        })
    }
}

impl Schema for EcKey {
    fn descriptor() -> &'static TypeDescriptor {
        &ECKEY
    }
}
