//! Built-in record types.
//!
//! Legacy account-export types keep their BC-UR registry tags; the
//! portfolio family uses the 414xx range.
//!
//! | tag   | name                    | type                |
//! |-------|-------------------------|---------------------|
//! | 37    | `uuid`                  | [`Uuid`]            |
//! | 303   | `crypto-hdkey`          | [`HdKey`]           |
//! | 304   | `crypto-keypath`        | [`Keypath`]         |
//! | 305   | `crypto-coin-info`      | [`CoinInfo`]        |
//! | 306   | `crypto-eckey`          | [`EcKey`]           |
//! | 308   | `crypto-output`         | [`OutputDescriptor`]|
//! | 311   | `crypto-account`        | [`Account`]         |
//! | 1103  | `crypto-multi-accounts` | [`MultiAccounts`]   |
//! | 41401 | `coin-identity`         | [`CoinIdentity`]    |
//! | 41402 | `detailed-account`      | [`DetailedAccount`] |
//! | 41403 | `portfolio-coin`        | [`PortfolioCoin`]   |
//! | 41404 | `portfolio-metadata`    | [`PortfolioMetadata`]|
//! | 41405 | `portfolio`             | [`Portfolio`]       |
//! | 41410 | `sync-id`               | [`SyncId`]          |

mod account;
mod coin_identity;
mod coin_info;
mod detailed_account;
mod eckey;
mod hdkey;
mod keypath;
mod leaf;
mod multi_accounts;
mod output;
mod portfolio;
mod portfolio_coin;
mod portfolio_metadata;

pub use account::Account;
pub use coin_identity::{CoinIdentity, EllipticCurve, Subtype};
pub use coin_info::CoinInfo;
pub use detailed_account::{AccountKey, DetailedAccount, TokenId};
pub use eckey::{CURVE_SECP256K1, EcKey};
pub use hdkey::{CHAIN_CODE_LEN, HdKey, KEY_DATA_LEN};
pub use keypath::{HARDENED_OFFSET, Keypath, PathComponent};
pub use leaf::{SyncId, Uuid};
pub use multi_accounts::MultiAccounts;
pub use output::{DescriptorKey, MultiKey, OutputDescriptor, OutputKey, ScriptExpression};
pub use portfolio::Portfolio;
pub use portfolio_coin::{PORTFOLIO_ACCOUNTS, PortfolioAccounts, PortfolioCoin};
pub use portfolio_metadata::PortfolioMetadata;

use crate::model::Record;
use crate::registry::DynRecord;

/// HD keys held by a record known only at runtime, e.g. a union member
/// resolved through the registry. Types holding no keys yield nothing.
pub(crate) fn erased_hd_keys(record: &dyn DynRecord) -> Box<dyn Iterator<Item = &Record<HdKey>> + '_> {
    if let Some(key) = record.downcast_ref::<HdKey>() {
        return Box::new(std::iter::once(key));
    }
    if let Some(account) = record.downcast_ref::<DetailedAccount>() {
        return account.hd_keys();
    }
    if let Some(output) = record.downcast_ref::<OutputDescriptor>() {
        return Box::new(output.hd_keys());
    }
    if let Some(account) = record.downcast_ref::<Account>() {
        return Box::new(account.hd_keys());
    }
    if let Some(multi) = record.downcast_ref::<MultiAccounts>() {
        return Box::new(multi.keys.iter());
    }
    Box::new(std::iter::empty())
}
