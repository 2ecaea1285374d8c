//! A single account with the tokens tracked under it.

use rustc_hash::FxHashSet;

use crate::error::DecodeError;
use crate::model::{
    FieldCx, FieldKey, FieldMap, FromField, FromValue, Kind, MapBuilder, Record, Schema, ToValue, TypeDescriptor,
    Validate, Value,
};
use crate::registry::{DecodeContext, DynRecord};
use crate::registry::union::{Alternative, Union};
use crate::types::{HdKey, OutputDescriptor, erased_hd_keys};
use crate::validate::Violations;

const ACCOUNT: FieldKey = FieldKey::required("account", 1);
const TOKEN_IDS: FieldKey = FieldKey::optional("token-ids", 2);

static DETAILED_ACCOUNT: TypeDescriptor = TypeDescriptor {
    tag: 41402,
    name: "detailed-account",
    keys: &[ACCOUNT, TOKEN_IDS],
    schema: "detailed-account = #6.41402({ 1: crypto-hdkey / crypto-output, ? 2: [+ (text / bytes)] })",
    strict_keys: true,
};

/// The key an account is exported as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountKey {
    HdKey(Record<HdKey>),
    Output(Record<OutputDescriptor>),
    /// Any other registered key format.
    Other(Box<dyn DynRecord>),
}

fn decode_hdkey(value: &Value, cx: DecodeContext<'_>) -> Result<AccountKey, DecodeError> {
    Record::from_value(value, cx).map(AccountKey::HdKey)
}

fn decode_output(value: &Value, cx: DecodeContext<'_>) -> Result<AccountKey, DecodeError> {
    Record::from_value(value, cx).map(AccountKey::Output)
}

static ACCOUNT_KEY: Union<AccountKey> = Union {
    type_name: "detailed-account",
    field: "account",
    sequence: None,
    alternatives: &[
        Alternative {
            tag: 303,
            name: "crypto-hdkey",
            decode: decode_hdkey,
        },
        Alternative {
            tag: 308,
            name: "crypto-output",
            decode: decode_output,
        },
    ],
    fallback: Some(AccountKey::Other),
};

/// A token tracked under an account: a contract address, mint or symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenId {
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailedAccount {
    pub account: AccountKey,
    pub token_ids: Vec<TokenId>,
}

impl DetailedAccount {
    pub fn new(account: AccountKey) -> Self {
        DetailedAccount {
            account,
            token_ids: Vec::new(),
        }
    }

    /// Every HD key behind the account.
    pub fn hd_keys(&self) -> Box<dyn Iterator<Item = &Record<HdKey>> + '_> {
        match &self.account {
            AccountKey::HdKey(key) => Box::new(std::iter::once(key)),
            AccountKey::Output(output) => Box::new(output.hd_keys()),
            AccountKey::Other(record) => erased_hd_keys(&**record),
        }
    }
}

impl Validate for DetailedAccount {
    fn validate(&self, v: &mut Violations) {
        let mut seen = FxHashSet::default();
        for (i, token) in self.token_ids.iter().enumerate() {
            let empty = match token {
                TokenId::Text(text) => text.is_empty(),
                TokenId::Bytes(bytes) => bytes.is_empty(),
            };
            v.check(!empty, || format!("token id #{i} is empty"));
            v.check(seen.insert(token), || format!("token id #{i} is a duplicate"));
        }
    }
}

impl ToValue for DetailedAccount {
    fn to_value(&self) -> Value {
        let account = match &self.account {
            AccountKey::HdKey(key) => key.to_tagged_value(),
            AccountKey::Output(output) => output.to_tagged_value(),
            AccountKey::Other(record) => record.to_tagged_value(),
        };
        let map = MapBuilder::new().value(&ACCOUNT, account);
        if self.token_ids.is_empty() {
            return map.build();
        }
        let tokens = self
            .token_ids
            .iter()
            .map(|token| match token {
                TokenId::Text(text) => Value::Text(text.clone()),
                TokenId::Bytes(bytes) => Value::Bytes(bytes.clone()),
            })
            .collect();
        map.value(&TOKEN_IDS, Value::Array(tokens)).build()
    }
}

fn read_token_ids(value: &Value, field: &mut FieldCx<'_>) -> Result<Vec<TokenId>, DecodeError> {
    field.array(value, |item, field| match item {
        Value::Text(_) => String::from_field(item, field).map(TokenId::Text),
        Value::Bytes(_) => Vec::<u8>::from_field(item, field).map(TokenId::Bytes),
        other => Err(field.mismatch(Kind::Text, other)),
    })
}

impl FromValue for DetailedAccount {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut map = FieldMap::new(value, &DETAILED_ACCOUNT, cx, violations)?;
        Ok(DetailedAccount {
            account: map.required_with(&ACCOUNT, |value, field| ACCOUNT_KEY.decode(value, field.cx))?,
            token_ids: map.with(&TOKEN_IDS, read_token_ids)?.unwrap_or_default(),
        })
    }
}

impl Schema for DetailedAccount {
    fn descriptor() -> &'static TypeDescriptor {
        &DETAILED_ACCOUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::account::tests::account_at;
    use crate::types::hdkey::tests::key_at;

    #[test]
    fn test_hdkey_account_with_tokens() {
        let mut account = DetailedAccount::new(AccountKey::HdKey(key_at("m/44'/501'/0'")));
        account.token_ids = vec![
            TokenId::Text("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".into()),
            TokenId::Bytes(vec![0xa0, 0xb8, 0x69, 0x91]),
        ];
        let account = Record::new(account).unwrap();
        let decoded = Record::<DetailedAccount>::from_bytes(&account.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, account);
        assert_eq!(decoded.hd_keys().count(), 1);
    }

    #[test]
    fn test_output_account() {
        let output = account_at(&["m/84'/0'/0'"]).output_descriptors[0].clone();
        let account = Record::new(DetailedAccount::new(AccountKey::Output(output))).unwrap();
        let decoded = Record::<DetailedAccount>::from_tagged_bytes(&account.to_tagged_bytes().unwrap()).unwrap();
        assert!(matches!(decoded.account, AccountKey::Output(_)));
        assert_eq!(decoded, account);
    }

    #[test]
    fn test_token_ids_unique_and_non_empty() {
        let mut account = DetailedAccount::new(AccountKey::HdKey(key_at("m/44'/60'/0'")));
        account.token_ids = vec![
            TokenId::Text("usdc".into()),
            TokenId::Text(String::new()),
            TokenId::Text("usdc".into()),
        ];
        let err = Record::new(account).unwrap_err();
        assert_eq!(err.reasons, ["token id #1 is empty", "token id #2 is a duplicate"]);
    }

    #[test]
    fn test_account_key_resolves_other_registered_types() {
        let sync_id = Record::new(crate::types::SyncId(vec![1])).unwrap();
        let value = Value::Map(vec![(Value::Unsigned(1), sync_id.to_tagged_value())]);
        let account = Record::<DetailedAccount>::from_value(&value, DecodeContext::new(crate::registry::global()))
            .unwrap();
        let AccountKey::Other(record) = &account.account else {
            panic!("expected a registry member");
        };
        assert_eq!(record.downcast_ref::<crate::types::SyncId>(), Some(&sync_id));
        assert_eq!(account.hd_keys().count(), 0);
        assert_eq!(account.to_value(), value);
    }

    #[test]
    fn test_account_key_with_unknown_tag() {
        let value = Value::Map(vec![(Value::Unsigned(1), Value::tagged(41499, Value::Map(vec![])))]);
        let err = Record::<DetailedAccount>::from_value(&value, DecodeContext::new(crate::registry::global()))
            .unwrap_err();
        assert_eq!(err, DecodeError::UnknownTag { tag: 41499 });
    }
}
