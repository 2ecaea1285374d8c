//! Coin identity: curve, SLIP-44 coin type and optional subtypes.
//!
//! The identity names a coin independently of any key. Subtypes narrow it
//! further, e.g. a chain id for an EVM network or a token standard.

use std::fmt;

use crate::error::DecodeError;
use crate::limits::MAX_SUBTYPES;
use crate::model::{
    FieldCx, FieldKey, FieldMap, FromField, FromValue, Kind, MapBuilder, Schema, ToField, ToValue,
    TypeDescriptor, Validate, Value,
};
use crate::registry::DecodeContext;
use crate::validate::{self, Violations};

const CURVE: FieldKey = FieldKey::required("curve", 1);
const TYPE: FieldKey = FieldKey::required("type", 2);
const SUBTYPE: FieldKey = FieldKey::optional("subtype", 3);

static COIN_IDENTITY: TypeDescriptor = TypeDescriptor {
    tag: 41401,
    name: "coin-identity",
    keys: &[CURVE, TYPE, SUBTYPE],
    schema: "coin-identity = #6.41401({ 1: curve, 2: uint31, ? 3: [+ (text / uint)] })",
    strict_keys: true,
};

// =============================================================================
// CURVES
// =============================================================================

/// Elliptic curves, numbered as in the COSE registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EllipticCurve {
    P256,
    P384,
    P521,
    X25519,
    X448,
    Ed25519,
    Ed448,
    Secp256k1,
    /// A curve number this crate does not know. Never passes validation.
    Unknown(u64),
}

impl EllipticCurve {
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => EllipticCurve::P256,
            2 => EllipticCurve::P384,
            3 => EllipticCurve::P521,
            4 => EllipticCurve::X25519,
            5 => EllipticCurve::X448,
            6 => EllipticCurve::Ed25519,
            7 => EllipticCurve::Ed448,
            8 => EllipticCurve::Secp256k1,
            other => EllipticCurve::Unknown(other),
        }
    }

    pub fn code(self) -> u64 {
        match self {
            EllipticCurve::P256 => 1,
            EllipticCurve::P384 => 2,
            EllipticCurve::P521 => 3,
            EllipticCurve::X25519 => 4,
            EllipticCurve::X448 => 5,
            EllipticCurve::Ed25519 => 6,
            EllipticCurve::Ed448 => 7,
            EllipticCurve::Secp256k1 => 8,
            EllipticCurve::Unknown(code) => code,
        }
    }

    /// Twisted Edwards curves, where only hardened derivation is defined.
    pub fn is_edwards(self) -> bool {
        matches!(self, EllipticCurve::Ed25519 | EllipticCurve::Ed448)
    }

    pub fn is_known(self) -> bool {
        !matches!(self, EllipticCurve::Unknown(_))
    }
}

impl fmt::Display for EllipticCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EllipticCurve::P256 => f.write_str("p256"),
            EllipticCurve::P384 => f.write_str("p384"),
            EllipticCurve::P521 => f.write_str("p521"),
            EllipticCurve::X25519 => f.write_str("x25519"),
            EllipticCurve::X448 => f.write_str("x448"),
            EllipticCurve::Ed25519 => f.write_str("ed25519"),
            EllipticCurve::Ed448 => f.write_str("ed448"),
            EllipticCurve::Secp256k1 => f.write_str("secp256k1"),
            EllipticCurve::Unknown(code) => write!(f, "curve#{code}"),
        }
    }
}

impl FromField for EllipticCurve {
    fn from_field(value: &Value, field: &mut FieldCx<'_>) -> Result<Self, DecodeError> {
        u64::from_field(value, field).map(EllipticCurve::from_code)
    }
}

impl ToField for EllipticCurve {
    fn to_field(&self) -> Value {
        Value::Unsigned(self.code())
    }
}

// =============================================================================
// COIN IDENTITY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subtype {
    Text(String),
    Number(u64),
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subtype::Text(text) => f.write_str(text),
            Subtype::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoinIdentity {
    pub curve: EllipticCurve,
    /// SLIP-44 coin type.
    pub coin_type: u32,
    pub subtypes: Vec<Subtype>,
}

impl CoinIdentity {
    pub fn new(curve: EllipticCurve, coin_type: u32) -> Self {
        CoinIdentity {
            curve,
            coin_type,
            subtypes: Vec::new(),
        }
    }

    pub fn with_subtype(mut self, subtype: Subtype) -> Self {
        self.subtypes.push(subtype);
        self
    }

    pub fn is_edwards(&self) -> bool {
        self.curve.is_edwards()
    }

    /// Returns the canonical text identifier, e.g. `bc_coin:8/60/137`.
    pub fn identifier(&self) -> String {
        let mut id = format!("bc_coin:{}/{}", self.curve.code(), self.coin_type);
        for subtype in &self.subtypes {
            id.push('/');
            id.push_str(&subtype.to_string());
        }
        id
    }
}

impl fmt::Display for CoinIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

impl Validate for CoinIdentity {
    fn validate(&self, v: &mut Violations) {
        v.check(self.curve.is_known(), || format!("unsupported curve {}", self.curve.code()));
        v.check(self.coin_type < 1 << 31, || {
            format!("coin type {} must be below 2^31", self.coin_type)
        });
        v.check(self.subtypes.len() <= MAX_SUBTYPES, || {
            format!("at most {MAX_SUBTYPES} subtypes allowed, got {}", self.subtypes.len())
        });
        for subtype in &self.subtypes {
            if let Subtype::Text(text) = subtype {
                validate::non_empty(v, "subtype", text);
            }
        }
    }
}

impl ToValue for CoinIdentity {
    fn to_value(&self) -> Value {
        let subtypes = (!self.subtypes.is_empty()).then(|| {
            Value::Array(
                self.subtypes
                    .iter()
                    .map(|s| match s {
                        Subtype::Text(text) => Value::Text(text.clone()),
                        Subtype::Number(n) => Value::Unsigned(*n),
                    })
                    .collect(),
            )
        });
        let map = MapBuilder::new()
            .field(&CURVE, &self.curve)
            .field(&TYPE, &self.coin_type);
        let map = match subtypes {
            Some(value) => map.value(&SUBTYPE, value),
            None => map,
        };
        map.build()
    }
}

fn read_subtypes(value: &Value, field: &mut FieldCx<'_>) -> Result<Vec<Subtype>, DecodeError> {
    if let Some(items) = value.as_array() {
        field.check_len(items.len(), MAX_SUBTYPES)?;
    }
    field.array(value, |item, field| match item {
        Value::Text(_) => String::from_field(item, field).map(Subtype::Text),
        Value::Unsigned(n) => Ok(Subtype::Number(*n)),
        other => Err(field.mismatch(Kind::Text, other)),
    })
}

impl FromValue for CoinIdentity {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut map = FieldMap::new(value, &COIN_IDENTITY, cx, violations)?;
        Ok(CoinIdentity {
            curve: map.required(&CURVE)?,
            coin_type: map.required(&TYPE)?,
            subtypes: map.with(&SUBTYPE, read_subtypes)?.unwrap_or_default(),
        })
    }
}

impl Schema for CoinIdentity {
    fn descriptor() -> &'static TypeDescriptor {
        &COIN_IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::Record;
    use proptest::prelude::*;

    #[test]
    fn test_identifier() {
        let polygon = CoinIdentity::new(EllipticCurve::Secp256k1, 60).with_subtype(Subtype::Number(137));
        assert_eq!(polygon.identifier(), "bc_coin:8/60/137");
        assert!(!polygon.is_edwards());

        let sol = CoinIdentity::new(EllipticCurve::Ed25519, 501);
        assert_eq!(sol.to_string(), "bc_coin:6/501");
        assert!(sol.is_edwards());
    }

    #[test]
    fn test_wire_shape() {
        let id = Record::new(CoinIdentity::new(EllipticCurve::Ed25519, 501).with_subtype(Subtype::Text("spl".into())))
            .unwrap();
        assert_eq!(
            id.to_value(),
            Value::Map(vec![
                (Value::Unsigned(1), Value::Unsigned(6)),
                (Value::Unsigned(2), Value::Unsigned(501)),
                (Value::Unsigned(3), Value::Array(vec![Value::Text("spl".into())])),
            ])
        );
        assert_eq!(Record::<CoinIdentity>::from_bytes(&id.to_bytes().unwrap()).unwrap(), id);
    }

    #[test]
    fn test_unknown_curve_rejected() {
        // {1: 99, 2: 0}
        let err = Record::<CoinIdentity>::from_bytes(&[0xa2, 0x01, 0x18, 0x63, 0x02, 0x00]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.reasons(), ["unsupported curve 99"]);
    }

    #[test]
    fn test_empty_text_subtype() {
        let id = CoinIdentity::new(EllipticCurve::Secp256k1, 0).with_subtype(Subtype::Text(String::new()));
        assert_eq!(Record::new(id).unwrap_err().reasons, ["subtype must not be empty"]);
    }

    #[test]
    fn test_subtype_kind_mismatch() {
        let value = Value::Map(vec![
            (Value::Unsigned(1), Value::Unsigned(8)),
            (Value::Unsigned(2), Value::Unsigned(60)),
            (Value::Unsigned(3), Value::Array(vec![Value::Bool(true)])),
        ]);
        let err = Record::<CoinIdentity>::from_value(&value, DecodeContext::new(crate::registry::global()))
            .unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { field: "subtype", .. }));
    }

    fn known_curve() -> impl Strategy<Value = EllipticCurve> {
        (1u64..=8).prop_map(EllipticCurve::from_code)
    }

    fn subtype() -> impl Strategy<Value = Subtype> {
        prop_oneof![
            "[a-z0-9]{1,12}".prop_map(Subtype::Text),
            any::<u64>().prop_map(Subtype::Number),
        ]
    }

    proptest! {
        #[test]
        fn prop_coin_identity_round_trip(
            curve in known_curve(),
            coin_type in 0u32..(1 << 31),
            subtypes in proptest::collection::vec(subtype(), 0..=MAX_SUBTYPES),
        ) {
            let id = Record::new(CoinIdentity { curve, coin_type, subtypes }).unwrap();
            let decoded = Record::<CoinIdentity>::from_tagged_bytes(&id.to_tagged_bytes().unwrap()).unwrap();
            prop_assert_eq!(decoded.identifier(), id.identifier());
            prop_assert_eq!(decoded, id);
        }
    }
}
