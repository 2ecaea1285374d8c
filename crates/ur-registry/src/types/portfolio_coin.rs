//! One coin of a portfolio and the accounts held for it.
//!
//! The accounts field is polymorphic. Current exporters write a sequence of
//! tagged `detailed-account` records; older ones write a single legacy
//! export, either `crypto-multi-accounts` or `crypto-account`. The legacy
//! members are tried in that order. Any other registered type is accepted as
//! [`PortfolioAccounts::Other`], so new account formats only need a
//! registration.

use crate::error::DecodeError;
use crate::model::{FieldKey, FieldMap, FromValue, MapBuilder, Record, Schema, ToField, ToValue, TypeDescriptor, Validate, Value};
use crate::registry::{DecodeContext, DynRecord};
use crate::registry::union::{self, Alternative, Union};
use crate::types::{Account, CoinIdentity, DetailedAccount, HdKey, MultiAccounts, erased_hd_keys};
use crate::validate::{self, Violations};

const COIN_ID: FieldKey = FieldKey::required("coin-id", 1);
const ACCOUNTS: FieldKey = FieldKey::required("accounts", 2);
const MASTER_FINGERPRINT: FieldKey = FieldKey::optional("master-fingerprint", 3);

static PORTFOLIO_COIN: TypeDescriptor = TypeDescriptor {
    tag: 41403,
    name: "portfolio-coin",
    keys: &[COIN_ID, ACCOUNTS, MASTER_FINGERPRINT],
    schema: "portfolio-coin = #6.41403({ 1: coin-identity, \
             2: [+ detailed-account] / crypto-multi-accounts / crypto-account, ? 3: uint32 })",
    strict_keys: true,
};

/// Accounts held for a coin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortfolioAccounts {
    Detailed(Vec<Record<DetailedAccount>>),
    MultiAccounts(Record<MultiAccounts>),
    Account(Record<Account>),
    /// A registered type outside the built-in members.
    Other(Box<dyn DynRecord>),
}

impl PortfolioAccounts {
    /// Every HD key across the accounts.
    pub fn hd_keys(&self) -> Box<dyn Iterator<Item = &Record<HdKey>> + '_> {
        match self {
            PortfolioAccounts::Detailed(accounts) => Box::new(accounts.iter().flat_map(|a| a.hd_keys())),
            PortfolioAccounts::MultiAccounts(multi) => Box::new(multi.keys.iter()),
            PortfolioAccounts::Account(account) => Box::new(account.hd_keys()),
            PortfolioAccounts::Other(record) => erased_hd_keys(&**record),
        }
    }
}

fn decode_detailed(items: &[Value], cx: DecodeContext<'_>) -> Result<PortfolioAccounts, DecodeError> {
    union::decode_sequence(items, PORTFOLIO_COIN.name, ACCOUNTS.name, cx).map(PortfolioAccounts::Detailed)
}

fn decode_multi_accounts(value: &Value, cx: DecodeContext<'_>) -> Result<PortfolioAccounts, DecodeError> {
    Record::from_value(value, cx).map(PortfolioAccounts::MultiAccounts)
}

fn decode_account(value: &Value, cx: DecodeContext<'_>) -> Result<PortfolioAccounts, DecodeError> {
    Record::from_value(value, cx).map(PortfolioAccounts::Account)
}

/// Resolver for [`PortfolioAccounts`].
pub static PORTFOLIO_ACCOUNTS: Union<PortfolioAccounts> = Union {
    type_name: "portfolio-coin",
    field: "accounts",
    sequence: Some(decode_detailed),
    alternatives: &[
        Alternative {
            tag: 1103,
            name: "crypto-multi-accounts",
            decode: decode_multi_accounts,
        },
        Alternative {
            tag: 311,
            name: "crypto-account",
            decode: decode_account,
        },
    ],
    fallback: Some(PortfolioAccounts::Other),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioCoin {
    pub coin_id: Record<CoinIdentity>,
    pub accounts: PortfolioAccounts,
    pub master_fingerprint: Option<u32>,
}

impl Validate for PortfolioCoin {
    fn validate(&self, v: &mut Violations) {
        if let PortfolioAccounts::Detailed(accounts) = &self.accounts {
            v.check(!accounts.is_empty(), || "accounts must not be empty".to_string());
        }
        if let Some(fp) = self.master_fingerprint {
            validate::fingerprint(v, "master-fingerprint", fp);
        }
        validate::hardened_origin_policy(v, self.coin_id.curve, self.accounts.hd_keys());
    }
}

impl ToValue for PortfolioCoin {
    fn to_value(&self) -> Value {
        let accounts = match &self.accounts {
            PortfolioAccounts::Detailed(accounts) => accounts.to_field(),
            PortfolioAccounts::MultiAccounts(multi) => multi.to_tagged_value(),
            PortfolioAccounts::Account(account) => account.to_tagged_value(),
            PortfolioAccounts::Other(record) => record.to_tagged_value(),
        };
        MapBuilder::new()
            .field(&COIN_ID, &self.coin_id)
            .value(&ACCOUNTS, accounts)
            .optional(&MASTER_FINGERPRINT, self.master_fingerprint.as_ref())
            .build()
    }
}

impl FromValue for PortfolioCoin {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut map = FieldMap::new(value, &PORTFOLIO_COIN, cx, violations)?;
        Ok(PortfolioCoin {
            coin_id: map.required(&COIN_ID)?,
            accounts: map.required_with(&ACCOUNTS, |value, field| PORTFOLIO_ACCOUNTS.decode(value, field.cx))?,
            master_fingerprint: map.optional(&MASTER_FINGERPRINT)?,
        })
    }
}

impl Schema for PortfolioCoin {
    fn descriptor() -> &'static TypeDescriptor {
        &PORTFOLIO_COIN
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::{RegistryBuilder, global};
    use crate::types::account::tests::account_at;
    use crate::types::hdkey::tests::{ed25519_key_at, key_at};
    use crate::types::{AccountKey, EllipticCurve};

    fn coin(curve: EllipticCurve, coin_type: u32) -> Record<CoinIdentity> {
        Record::new(CoinIdentity::new(curve, coin_type)).unwrap()
    }

    pub(crate) fn solana(paths: &[&str]) -> PortfolioCoin {
        PortfolioCoin {
            coin_id: coin(EllipticCurve::Ed25519, 501),
            accounts: PortfolioAccounts::Detailed(
                paths
                    .iter()
                    .map(|p| Record::new(DetailedAccount::new(AccountKey::HdKey(ed25519_key_at(p)))).unwrap())
                    .collect(),
            ),
            master_fingerprint: Some(0x73c5da0a),
        }
    }

    #[test]
    fn test_detailed_accounts_round_trip() {
        let coin = Record::new(solana(&["m/44'/501'/0'/0'", "m/44'/501'/1'/0'"])).unwrap();
        let decoded = Record::<PortfolioCoin>::from_ur(&coin.to_ur().unwrap()).unwrap();
        assert_eq!(decoded, coin);
        assert_eq!(decoded.accounts.hd_keys().count(), 2);
    }

    #[test]
    fn test_edwards_coin_rejects_soft_derivation() {
        let err = Record::new(solana(&["m/44'/501'/0'/0"])).unwrap_err();
        assert_eq!(err.type_name, "portfolio-coin");
        assert!(err.mentions("not fully hardened"));
        assert!(err.mentions("hardened derivation"));
        assert!(err.mentions("ed25519"));
    }

    #[test]
    fn test_edwards_coin_requires_origin() {
        let mut key = ed25519_key_at("m/44'/501'/0'").into_fields();
        key.origin = None;
        let account = DetailedAccount::new(AccountKey::HdKey(Record::new(key).unwrap()));
        let mut coin = solana(&[]);
        coin.accounts = PortfolioAccounts::Detailed(vec![Record::new(account).unwrap()]);
        let err = Record::new(coin).unwrap_err();
        assert_eq!(
            err.reasons,
            ["account key #0 has no origin; ed25519 keys require a fully hardened derivation path"]
        );
    }

    #[test]
    fn test_policy_applies_on_decode() {
        // Encode an invalid coin by hand, bypassing construction.
        let bad = solana(&["m/44'/501'/0'/0"]);
        let bytes = crate::codec::cbor::encode(&bad.to_value()).unwrap();
        let err = Record::<PortfolioCoin>::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.reasons()[0].contains("hardened"));
    }

    #[test]
    fn test_secp256k1_allows_soft_derivation() {
        let mut coin = solana(&["m/44'/60'/0'/0/0"]);
        coin.coin_id = self::coin(EllipticCurve::Secp256k1, 60);
        assert!(Record::new(coin).is_ok());
    }

    #[test]
    fn test_legacy_multi_accounts_member() {
        let multi = Record::new(MultiAccounts::new(0x73c5da0a, vec![key_at("m/44'/60'/0'")])).unwrap();
        let coin = PortfolioCoin {
            coin_id: coin(EllipticCurve::Secp256k1, 60),
            accounts: PortfolioAccounts::MultiAccounts(multi.clone()),
            master_fingerprint: None,
        };
        let value = coin.to_value();
        let (_, accounts) = &value.as_map().unwrap()[1];
        assert_eq!(accounts.as_tagged().map(|(tag, _)| tag), Some(1103));

        let decoded = Record::<PortfolioCoin>::from_value(&value, DecodeContext::new(global())).unwrap();
        assert_eq!(decoded.accounts, PortfolioAccounts::MultiAccounts(multi));
    }

    #[test]
    fn test_legacy_account_member() {
        let account = account_at(&["m/84'/0'/0'"]);
        let coin = Record::new(PortfolioCoin {
            coin_id: coin(EllipticCurve::Secp256k1, 0),
            accounts: PortfolioAccounts::Account(account.clone()),
            master_fingerprint: None,
        })
        .unwrap();
        let decoded = Record::<PortfolioCoin>::from_bytes(&coin.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.accounts, PortfolioAccounts::Account(account));
        assert_eq!(PORTFOLIO_ACCOUNTS.tags().collect::<Vec<_>>(), [1103, 311]);
    }

    #[test]
    fn test_accounts_with_unregistered_tag() {
        let mut value = Record::new(solana(&["m/44'/501'/0'"])).unwrap().to_value();
        if let Value::Map(pairs) = &mut value {
            pairs[1].1 = Value::tagged(40000, Value::Map(vec![]));
        }
        let err = Record::<PortfolioCoin>::from_value(&value, DecodeContext::new(global())).unwrap_err();
        assert_eq!(err, DecodeError::UnknownTag { tag: 40000 });
    }

    #[test]
    fn test_edwards_coin_rejects_secp256k1_keys() {
        let mut coin = solana(&[]);
        let account = DetailedAccount::new(AccountKey::HdKey(key_at("m/44'/501'/0'/0'")));
        coin.accounts = PortfolioAccounts::Detailed(vec![Record::new(account).unwrap()]);
        let err = Record::new(coin).unwrap_err();
        assert_eq!(err.reasons, ["account key #0 is not an ed25519 public key"]);
    }

    #[test]
    fn test_accounts_resolve_other_registered_tags() {
        let key = ed25519_key_at("m/44'/501'/0'/0'");
        let mut value = Record::new(solana(&["m/44'/501'/0'"])).unwrap().to_value();
        if let Value::Map(pairs) = &mut value {
            pairs[1].1 = key.to_tagged_value();
        }
        let coin = Record::<PortfolioCoin>::from_value(&value, DecodeContext::new(global())).unwrap();
        let PortfolioAccounts::Other(record) = &coin.accounts else {
            panic!("expected a registry member");
        };
        assert_eq!(record.downcast_ref::<HdKey>(), Some(&key));
        assert_eq!(coin.accounts.hd_keys().count(), 1);
        assert_eq!(coin.to_value(), value);
    }

    #[test]
    fn test_policy_covers_registry_members() {
        let mut value = Record::new(solana(&["m/44'/501'/0'"])).unwrap().to_value();
        if let Value::Map(pairs) = &mut value {
            pairs[1].1 = ed25519_key_at("m/44'/501'/0'/0").to_tagged_value();
        }
        let err = Record::<PortfolioCoin>::from_value(&value, DecodeContext::new(global())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.reasons()[0].contains("not fully hardened"));
    }

    /// An account format registered by an embedder.
    #[derive(Debug, Clone, PartialEq)]
    struct VaultAccount {
        label: String,
    }

    const LABEL: FieldKey = FieldKey::required("label", 1);

    static VAULT_ACCOUNT: TypeDescriptor = TypeDescriptor {
        tag: 41490,
        name: "vault-account",
        keys: &[LABEL],
        schema: "vault-account = #6.41490({ 1: text })",
        strict_keys: true,
    };

    impl Validate for VaultAccount {
        fn validate(&self, v: &mut Violations) {
            validate::non_empty(v, "label", &self.label);
        }
    }

    impl ToValue for VaultAccount {
        fn to_value(&self) -> Value {
            MapBuilder::new().field(&LABEL, &self.label).build()
        }
    }

    impl FromValue for VaultAccount {
        fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
            let mut map = FieldMap::new(value, &VAULT_ACCOUNT, cx, violations)?;
            Ok(VaultAccount {
                label: map.required(&LABEL)?,
            })
        }
    }

    impl Schema for VaultAccount {
        fn descriptor() -> &'static TypeDescriptor {
            &VAULT_ACCOUNT
        }
    }

    #[test]
    fn test_registration_extends_accounts() {
        let vault = Record::new(VaultAccount { label: "cold".into() }).unwrap();
        let coin = Record::new(PortfolioCoin {
            coin_id: coin(EllipticCurve::Secp256k1, 0),
            accounts: PortfolioAccounts::Other(Box::new(vault.clone())),
            master_fingerprint: None,
        })
        .unwrap();
        let bytes = coin.to_tagged_bytes().unwrap();

        // Unknown to the built-in registry.
        let err = Record::<PortfolioCoin>::from_tagged_bytes(&bytes).unwrap_err();
        assert_eq!(err, DecodeError::UnknownTag { tag: 41490 });

        let mut builder = RegistryBuilder::new();
        builder.register_builtin().unwrap().register::<VaultAccount>().unwrap();
        let registry = builder.freeze();

        let decoded = Record::<PortfolioCoin>::from_tagged_bytes_in(&bytes, &registry).unwrap();
        assert_eq!(decoded, coin);
        let PortfolioAccounts::Other(record) = &decoded.accounts else {
            panic!("expected a registry member");
        };
        assert_eq!(record.downcast_ref::<VaultAccount>(), Some(&vault));
        assert_eq!(PORTFOLIO_ACCOUNTS.tags().collect::<Vec<_>>(), [1103, 311]);
    }

    #[test]
    fn test_empty_detailed_list() {
        let err = Record::new(solana(&[])).unwrap_err();
        assert_eq!(err.reasons, ["accounts must not be empty"]);
    }
}
