//! BIP-32 extended keys (BCR-2020-007 `crypto-hdkey`).

use crate::error::DecodeError;
use crate::model::{
    FieldKey, FieldMap, FromValue, MapBuilder, Record, Schema, ToValue, TypeDescriptor, Validate, Value,
};
use crate::registry::DecodeContext;
use crate::types::{CoinInfo, Keypath};
use crate::validate::{self, Violations};

const IS_MASTER: FieldKey = FieldKey::optional("is-master", 1);
const IS_PRIVATE: FieldKey = FieldKey::optional("is-private", 2);
const KEY_DATA: FieldKey = FieldKey::required("key-data", 3);
const CHAIN_CODE: FieldKey = FieldKey::optional("chain-code", 4);
const USE_INFO: FieldKey = FieldKey::optional("use-info", 5);
const ORIGIN: FieldKey = FieldKey::optional("origin", 6);
const CHILDREN: FieldKey = FieldKey::optional("children", 7);
const PARENT_FINGERPRINT: FieldKey = FieldKey::optional("parent-fingerprint", 8);
const NAME: FieldKey = FieldKey::optional("name", 9);
const NOTE: FieldKey = FieldKey::optional("note", 10);

static HDKEY: TypeDescriptor = TypeDescriptor {
    tag: 303,
    name: "crypto-hdkey",
    keys: &[
        IS_MASTER,
        IS_PRIVATE,
        KEY_DATA,
        CHAIN_CODE,
        USE_INFO,
        ORIGIN,
        CHILDREN,
        PARENT_FINGERPRINT,
        NAME,
        NOTE,
    ],
    schema: "hdkey = #6.303({ ? 1: bool, ? 2: bool, 3: bytes .size 33, ? 4: bytes .size 32, \
             ? 5: coininfo, ? 6: keypath, ? 7: keypath, ? 8: uint32, ? 9: text, ? 10: text })",
    strict_keys: true,
};

pub const KEY_DATA_LEN: usize = 33;
pub const CHAIN_CODE_LEN: usize = 32;

/// An extended key.
///
/// Private key data is the 32-byte secret prefixed with `0x00`. Public key
/// data is either a compressed secp256k1 point (`0x02` or `0x03` prefix) or,
/// following SLIP-10, a 32-byte ed25519 point prefixed with `0x00`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HdKey {
    pub is_master: bool,
    pub is_private: bool,
    pub key_data: Vec<u8>,
    pub chain_code: Option<Vec<u8>>,
    pub use_info: Option<Record<CoinInfo>>,
    /// Path from the master key to this key.
    pub origin: Option<Record<Keypath>>,
    /// Path template for keys derived from this one.
    pub children: Option<Record<Keypath>>,
    pub parent_fingerprint: Option<u32>,
    pub name: Option<String>,
    pub note: Option<String>,
}

impl HdKey {
    /// A derived public key.
    pub fn public(key_data: Vec<u8>, chain_code: Vec<u8>) -> Self {
        HdKey {
            key_data,
            chain_code: Some(chain_code),
            ..Default::default()
        }
    }

    /// A derived SLIP-10 ed25519 public key.
    pub fn ed25519(point: [u8; 32], chain_code: Vec<u8>) -> Self {
        let mut key_data = Vec::with_capacity(KEY_DATA_LEN);
        key_data.push(0x00);
        key_data.extend_from_slice(&point);
        Self::public(key_data, chain_code)
    }

    pub fn with_origin(mut self, origin: Record<Keypath>) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Returns true for a public key in SLIP-10 ed25519 form.
    pub fn is_ed25519(&self) -> bool {
        !self.is_private && self.key_data.len() == KEY_DATA_LEN && self.key_data[0] == 0x00
    }
}

impl Validate for HdKey {
    fn validate(&self, v: &mut Violations) {
        if !v.is_absent(KEY_DATA.name) {
            validate::exact_len(v, "key-data", &self.key_data, KEY_DATA_LEN);
        }
        if let Some(&prefix) = self.key_data.first() {
            if self.is_private {
                v.check(prefix == 0x00, || {
                    format!("private key-data must start with 0x00, got {prefix:#04x}")
                });
            } else {
                v.check(matches!(prefix, 0x00 | 0x02 | 0x03), || {
                    format!("public key-data must start with 0x02 or 0x03 (secp256k1) or 0x00 (ed25519), got {prefix:#04x}")
                });
            }
        }
        if let Some(chain_code) = &self.chain_code {
            validate::exact_len(v, "chain-code", chain_code, CHAIN_CODE_LEN);
        }
        if let Some(fp) = self.parent_fingerprint {
            validate::fingerprint(v, "parent-fingerprint", fp);
        }
        if self.is_master {
            v.check(self.chain_code.is_some(), || "master key must carry a chain-code".to_string());
            v.check(self.origin.is_none(), || "master key cannot have an origin".to_string());
            v.check(self.children.is_none(), || "master key cannot have children".to_string());
            v.check(self.parent_fingerprint.is_none(), || {
                "master key cannot have a parent-fingerprint".to_string()
            });
        }
    }
}

impl ToValue for HdKey {
    fn to_value(&self) -> Value {
        MapBuilder::new()
            .field_if(self.is_master, &IS_MASTER, &true)
            .field_if(self.is_private, &IS_PRIVATE, &true)
            .field(&KEY_DATA, &self.key_data)
            .optional(&CHAIN_CODE, self.chain_code.as_ref())
            .optional(&USE_INFO, self.use_info.as_ref())
            .optional(&ORIGIN, self.origin.as_ref())
            .optional(&CHILDREN, self.children.as_ref())
            .optional(&PARENT_FINGERPRINT, self.parent_fingerprint.as_ref())
            .optional(&NAME, self.name.as_ref())
            .optional(&NOTE, self.note.as_ref())
            .build()
    }
}

impl FromValue for HdKey {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut map = FieldMap::new(value, &HDKEY, cx, violations)?;
        Ok(HdKey {
            is_master: map.optional(&IS_MASTER)?.unwrap_or(false),
            is_private: map.optional(&IS_PRIVATE)?.unwrap_or(false),
            key_data: map.required(&KEY_DATA)?,
            chain_code: map.optional(&CHAIN_CODE)?,
            use_info: map.optional(&USE_INFO)?,
            origin: map.optional(&ORIGIN)?,
            children: map.optional(&CHILDREN)?,
            parent_fingerprint: map.optional(&PARENT_FINGERPRINT)?,
            name: map.optional(&NAME)?,
            note: map.optional(&NOTE)?,
        })
    }
}

impl Schema for HdKey {
    fn descriptor() -> &'static TypeDescriptor {
        &HDKEY
    }
}
