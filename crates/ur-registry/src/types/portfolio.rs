//! The top-level portfolio: every coin a device exports, plus metadata.

use rustc_hash::FxHashSet;

use crate::error::DecodeError;
use crate::model::{FieldKey, FieldMap, FromValue, MapBuilder, Record, Schema, ToValue, TypeDescriptor, Validate, Value};
use crate::registry::DecodeContext;
use crate::types::{PortfolioCoin, PortfolioMetadata};
use crate::validate::Violations;

const COINS: FieldKey = FieldKey::required("coins", 1);
const METADATA: FieldKey = FieldKey::optional("metadata", 2);

static PORTFOLIO: TypeDescriptor = TypeDescriptor {
    tag: 41405,
    name: "portfolio",
    keys: &[COINS, METADATA],
    schema: "portfolio = #6.41405({ 1: [* portfolio-coin], ? 2: portfolio-metadata })",
    strict_keys: true,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Portfolio {
    pub coins: Vec<Record<PortfolioCoin>>,
    pub metadata: Option<Record<PortfolioMetadata>>,
}

impl Portfolio {
    /// Finds the coin with the given identifier, e.g. `bc_coin:6/501`.
    pub fn coin(&self, identifier: &str) -> Option<&Record<PortfolioCoin>> {
        self.coins.iter().find(|coin| coin.coin_id.identifier() == identifier)
    }
}

impl Validate for Portfolio {
    fn validate(&self, v: &mut Violations) {
        let mut seen = FxHashSet::default();
        for coin in &self.coins {
            let id = coin.coin_id.identifier();
            if !seen.insert(id.clone()) {
                v.push(format!("coin {id} appears more than once"));
            }
        }
    }
}

impl ToValue for Portfolio {
    fn to_value(&self) -> Value {
        MapBuilder::new()
            .field(&COINS, &self.coins)
            .optional(&METADATA, self.metadata.as_ref())
            .build()
    }
}

impl FromValue for Portfolio {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut map = FieldMap::new(value, &PORTFOLIO, cx, violations)?;
        Ok(Portfolio {
            coins: map.required(&COINS)?,
            metadata: map.optional(&METADATA)?,
        })
    }
}

impl Schema for Portfolio {
    fn descriptor() -> &'static TypeDescriptor {
        &PORTFOLIO
    }
}
