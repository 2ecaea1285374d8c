//! Coin and network a key is meant for (BCR-2020-007 `crypto-coininfo`).

use crate::error::DecodeError;
use crate::model::{FieldKey, FieldMap, FromValue, MapBuilder, Schema, ToValue, TypeDescriptor, Validate, Value};
use crate::registry::DecodeContext;
use crate::validate::Violations;

const TYPE: FieldKey = FieldKey::optional("type", 1);
const NETWORK: FieldKey = FieldKey::optional("network", 2);

static COIN_INFO: TypeDescriptor = TypeDescriptor {
    tag: 305,
    name: "crypto-coin-info",
    keys: &[TYPE, NETWORK],
    schema: "coininfo = #6.305({ ? 1: uint .default 0, ? 2: int .default 0 })",
    strict_keys: true,
};

/// SLIP-44 coin type and network. Both default to 0 (bitcoin mainnet) and
/// are omitted on the wire when they hold the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CoinInfo {
    pub coin_type: u32,
    pub network: i64,
}

impl CoinInfo {
    pub const NETWORK_MAINNET: i64 = 0;
    pub const NETWORK_TESTNET: i64 = 1;
}

impl Validate for CoinInfo {
    fn validate(&self, _: &mut Violations) {}
}

impl ToValue for CoinInfo {
    fn to_value(&self) -> Value {
        MapBuilder::new()
            .field_if(self.coin_type != 0, &TYPE, &self.coin_type)
            .field_if(self.network != 0, &NETWORK, &self.network)
            .build()
    }
}

impl FromValue for CoinInfo {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut map = FieldMap::new(value, &COIN_INFO, cx, violations)?;
        Ok(CoinInfo {
            coin_type: map.optional(&TYPE)?.unwrap_or_default(),
            network: map.optional(&NETWORK)?.unwrap_or_default(),
        })
    }
}

impl Schema for CoinInfo {
    fn descriptor() -> &'static TypeDescriptor {
        &COIN_INFO
    }
}
