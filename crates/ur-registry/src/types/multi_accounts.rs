//! Multi-coin account export (`crypto-multi-accounts`).

use crate::error::DecodeError;
use crate::model::{FieldKey, FieldMap, FromValue, MapBuilder, Record, Schema, ToValue, TypeDescriptor, Validate, Value};
use crate::registry::DecodeContext;
use crate::types::HdKey;
use crate::validate::{self, Violations};

const MASTER_FINGERPRINT: FieldKey = FieldKey::required("master-fingerprint", 1);
const KEYS: FieldKey = FieldKey::required("keys", 2);
const DEVICE: FieldKey = FieldKey::optional("device", 3);
const DEVICE_ID: FieldKey = FieldKey::optional("device-id", 4);
const VERSION: FieldKey = FieldKey::optional("version", 5);

static MULTI_ACCOUNTS: TypeDescriptor = TypeDescriptor {
    tag: 1103,
    name: "crypto-multi-accounts",
    keys: &[MASTER_FINGERPRINT, KEYS, DEVICE, DEVICE_ID, VERSION],
    schema: "crypto-multi-accounts = #6.1103({ 1: uint32, 2: [+ crypto-hdkey], ? 3: text, ? 4: text, ? 5: text })",
    strict_keys: true,
};

/// Account-level keys for several coins, exported by one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiAccounts {
    pub master_fingerprint: u32,
    pub keys: Vec<Record<HdKey>>,
    pub device: Option<String>,
    pub device_id: Option<String>,
    pub version: Option<String>,
}

impl MultiAccounts {
    pub fn new(master_fingerprint: u32, keys: Vec<Record<HdKey>>) -> Self {
        MultiAccounts {
            master_fingerprint,
            keys,
            device: None,
            device_id: None,
            version: None,
        }
    }
}

impl Validate for MultiAccounts {
    fn validate(&self, v: &mut Violations) {
        let fingerprint_known = !v.is_absent(MASTER_FINGERPRINT.name);
        if fingerprint_known {
            validate::fingerprint(v, "master-fingerprint", self.master_fingerprint);
        }
        if !v.is_absent(KEYS.name) {
            v.check(!self.keys.is_empty(), || "keys must not be empty".to_string());
        }
        for (i, key) in self.keys.iter().enumerate() {
            let Some(origin) = &key.origin else {
                v.push(format!("key #{i} has no origin"));
                continue;
            };
            if let Some(source) = origin.source_fingerprint.filter(|_| fingerprint_known) {
                v.check(source == self.master_fingerprint, || {
                    format!(
                        "key #{i} origin fingerprint {source:08x} does not match master-fingerprint {:08x}",
                        self.master_fingerprint
                    )
                });
            }
        }
        if let Some(device) = &self.device {
            validate::non_empty(v, "device", device);
        }
    }
}

impl ToValue for MultiAccounts {
    fn to_value(&self) -> Value {
        MapBuilder::new()
            .field(&MASTER_FINGERPRINT, &self.master_fingerprint)
            .field(&KEYS, &self.keys)
            .optional(&DEVICE, self.device.as_ref())
            .optional(&DEVICE_ID, self.device_id.as_ref())
            .optional(&VERSION, self.version.as_ref())
            .build()
    }
}

impl FromValue for MultiAccounts {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut map = FieldMap::new(value, &MULTI_ACCOUNTS, cx, violations)?;
        Ok(MultiAccounts {
            master_fingerprint: map.required(&MASTER_FINGERPRINT)?,
            keys: map.required(&KEYS)?,
            device: map.optional(&DEVICE)?,
            device_id: map.optional(&DEVICE_ID)?,
            version: map.optional(&VERSION)?,
        })
    }
}

impl Schema for MultiAccounts {
    fn descriptor() -> &'static TypeDescriptor {
        &MULTI_ACCOUNTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hdkey::tests::key_at;

    #[test]
    fn test_round_trip() {
        let mut accounts = MultiAccounts::new(0x73c5da0a, vec![key_at("m/44'/501'/0'"), key_at("m/44'/60'/0'")]);
        accounts.device = Some("keystone".into());
        accounts.version = Some("1.2.0".into());
        let accounts = Record::new(accounts).unwrap();

        let decoded = Record::<MultiAccounts>::from_tagged_bytes(&accounts.to_tagged_bytes().unwrap()).unwrap();
        assert_eq!(decoded, accounts);
        assert_eq!(decoded.keys[1].origin.as_ref().unwrap().to_string(), "m/44'/60'/0'");
    }

    #[test]
    fn test_keys_need_matching_origin() {
        let mut orphan = key_at("m/44'/0'/0'").into_fields();
        orphan.origin = None;
        let orphan = Record::new(orphan).unwrap();

        let accounts = MultiAccounts::new(0x12345678, vec![key_at("m/44'/0'/0'"), orphan]);
        let err = Record::new(accounts).unwrap_err();
        assert_eq!(
            err.reasons,
            [
                "key #0 origin fingerprint 73c5da0a does not match master-fingerprint 12345678",
                "key #1 has no origin",
            ]
        );
    }
}
