//! Output descriptors (BCR-2020-010 `crypto-output`).
//!
//! An output descriptor is a chain of script-expression tags around a key:
//!
//! ```text
//! crypto-output = #6.308(script-exp)
//! script-exp    = #6.400(script-exp)           ; sh
//!               / #6.401(script-exp)           ; wsh
//!               / #6.402(key) / ... / #6.405(key)
//!               / #6.406(multikey)             ; multi
//!               / #6.407(multikey)             ; sortedmulti
//!               / #6.409(key)                  ; tr
//! multikey      = { 1: uint, 2: [+ key] }
//! key           = crypto-hdkey / crypto-eckey
//! ```

use std::fmt;

use crate::error::DecodeError;
use crate::limits::{MAX_SCRIPT_DEPTH, MAX_SEQUENCE_LEN};
use crate::model::{
    FieldCx, FromField, FromValue, Kind, Record, Schema, ToField, ToValue, TypeDescriptor, Validate, Value,
};
use crate::registry::DecodeContext;
use crate::registry::union::{Alternative, Union};
use crate::types::{EcKey, HdKey};
use crate::validate::Violations;

static OUTPUT: TypeDescriptor = TypeDescriptor {
    tag: 308,
    name: "crypto-output",
    keys: &[],
    schema: "crypto-output = #6.308(script-exp)",
    strict_keys: true,
};

// =============================================================================
// SCRIPT EXPRESSIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptExpression {
    ScriptHash,
    WitnessScriptHash,
    PublicKey,
    PublicKeyHash,
    WitnessPublicKeyHash,
    Combo,
    Multisig,
    SortedMultisig,
    Taproot,
}

impl ScriptExpression {
    pub fn tag(self) -> u64 {
        match self {
            ScriptExpression::ScriptHash => 400,
            ScriptExpression::WitnessScriptHash => 401,
            ScriptExpression::PublicKey => 402,
            ScriptExpression::PublicKeyHash => 403,
            ScriptExpression::WitnessPublicKeyHash => 404,
            ScriptExpression::Combo => 405,
            ScriptExpression::Multisig => 406,
            ScriptExpression::SortedMultisig => 407,
            ScriptExpression::Taproot => 409,
        }
    }

    pub fn from_tag(tag: u64) -> Option<Self> {
        Some(match tag {
            400 => ScriptExpression::ScriptHash,
            401 => ScriptExpression::WitnessScriptHash,
            402 => ScriptExpression::PublicKey,
            403 => ScriptExpression::PublicKeyHash,
            404 => ScriptExpression::WitnessPublicKeyHash,
            405 => ScriptExpression::Combo,
            406 => ScriptExpression::Multisig,
            407 => ScriptExpression::SortedMultisig,
            409 => ScriptExpression::Taproot,
            _ => return None,
        })
    }

    /// Returns the descriptor-language function name.
    pub fn name(self) -> &'static str {
        match self {
            ScriptExpression::ScriptHash => "sh",
            ScriptExpression::WitnessScriptHash => "wsh",
            ScriptExpression::PublicKey => "pk",
            ScriptExpression::PublicKeyHash => "pkh",
            ScriptExpression::WitnessPublicKeyHash => "wpkh",
            ScriptExpression::Combo => "combo",
            ScriptExpression::Multisig => "multi",
            ScriptExpression::SortedMultisig => "sortedmulti",
            ScriptExpression::Taproot => "tr",
        }
    }

    pub fn is_multisig(self) -> bool {
        matches!(self, ScriptExpression::Multisig | ScriptExpression::SortedMultisig)
    }

    /// Returns true for expressions that wrap another script expression.
    pub fn is_wrapper(self) -> bool {
        matches!(self, ScriptExpression::ScriptHash | ScriptExpression::WitnessScriptHash)
    }
}

// =============================================================================
// KEYS
// =============================================================================

/// A key at the bottom of a script expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorKey {
    HdKey(Record<HdKey>),
    EcKey(Record<EcKey>),
}

impl DescriptorKey {
    fn to_field(&self) -> Value {
        match self {
            DescriptorKey::HdKey(key) => key.to_tagged_value(),
            DescriptorKey::EcKey(key) => key.to_tagged_value(),
        }
    }
}

fn decode_hdkey(value: &Value, cx: DecodeContext<'_>) -> Result<DescriptorKey, DecodeError> {
    Record::from_value(value, cx).map(DescriptorKey::HdKey)
}

fn decode_eckey(value: &Value, cx: DecodeContext<'_>) -> Result<DescriptorKey, DecodeError> {
    Record::from_value(value, cx).map(DescriptorKey::EcKey)
}

static KEY: Union<DescriptorKey> = Union {
    type_name: "crypto-output",
    field: "key",
    sequence: None,
    alternatives: &[
        Alternative {
            tag: 303,
            name: "crypto-hdkey",
            decode: decode_hdkey,
        },
        Alternative {
            tag: 306,
            name: "crypto-eckey",
            decode: decode_eckey,
        },
    ],
    fallback: None,
};

/// A threshold over a set of keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiKey {
    pub threshold: u32,
    pub keys: Vec<DescriptorKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKey {
    Single(DescriptorKey),
    Multi(MultiKey),
}

// =============================================================================
// OUTPUT DESCRIPTOR
// =============================================================================

/// A script-expression chain, outermost first, around a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub expressions: Vec<ScriptExpression>,
    pub key: OutputKey,
}

impl OutputDescriptor {
    pub fn new(expressions: Vec<ScriptExpression>, key: OutputKey) -> Self {
        OutputDescriptor { expressions, key }
    }

    /// Every HD key the descriptor references, in wire order.
    pub fn hd_keys(&self) -> impl Iterator<Item = &Record<HdKey>> {
        let keys: &[DescriptorKey] = match &self.key {
            OutputKey::Single(key) => std::slice::from_ref(key),
            OutputKey::Multi(multi) => &multi.keys,
        };
        keys.iter().filter_map(|key| match key {
            DescriptorKey::HdKey(hd) => Some(hd),
            DescriptorKey::EcKey(_) => None,
        })
    }
}

impl Validate for OutputDescriptor {
    fn validate(&self, v: &mut Violations) {
        let depth = self.expressions.len();
        v.check(depth > 0, || "output descriptor needs a script expression".to_string());
        v.check(depth <= MAX_SCRIPT_DEPTH, || {
            format!("script expression depth {depth} exceeds {MAX_SCRIPT_DEPTH}")
        });

        let last = self.expressions.len().saturating_sub(1);
        for (i, expr) in self.expressions.iter().enumerate() {
            if i < last {
                v.check(expr.is_wrapper(), || {
                    format!("{} cannot wrap another script expression", expr.name())
                });
            }
        }

        let innermost = self.expressions.last().copied();
        match &self.key {
            OutputKey::Multi(multi) => {
                v.check(innermost.is_some_and(ScriptExpression::is_multisig), || {
                    "a multisig key requires multi or sortedmulti as the innermost expression".to_string()
                });
                let n = multi.keys.len();
                let t = multi.threshold;
                v.check(t >= 1 && (t as usize) <= n, || {
                    format!("threshold {t} must be between 1 and the number of keys {n}")
                });
            }
            OutputKey::Single(_) => match innermost {
                Some(expr) if expr.is_multisig() => {
                    v.push(format!("{} requires a multisig key", expr.name()));
                }
                Some(expr) if expr.is_wrapper() => {
                    v.push(format!("{} must wrap another script expression", expr.name()));
                }
                _ => {}
            },
        }
    }
}

impl ToValue for OutputDescriptor {
    fn to_value(&self) -> Value {
        let mut value = match &self.key {
            OutputKey::Single(key) => key.to_field(),
            OutputKey::Multi(multi) => Value::Map(vec![
                (Value::Unsigned(1), multi.threshold.to_field()),
                (
                    Value::Unsigned(2),
                    Value::Array(multi.keys.iter().map(DescriptorKey::to_field).collect()),
                ),
            ]),
        };
        for expr in self.expressions.iter().rev() {
            value = Value::tagged(expr.tag(), value);
        }
        value
    }
}

fn read_multikey(value: &Value, field: &mut FieldCx<'_>) -> Result<MultiKey, DecodeError> {
    let pairs = value.as_map().ok_or_else(|| field.mismatch(Kind::Map, value))?;
    let mut threshold = None;
    let mut keys = None;
    for (k, v) in pairs {
        match k.as_u64() {
            Some(1) if threshold.is_none() => threshold = Some(u32::from_field(v, field)?),
            Some(2) if keys.is_none() => {
                let items = v.as_array().ok_or_else(|| field.mismatch(Kind::Array, v))?;
                field.check_len(items.len(), MAX_SEQUENCE_LEN)?;
                keys = Some(
                    items
                        .iter()
                        .map(|item| KEY.decode(item, field.cx))
                        .collect::<Result<Vec<_>, _>>()?,
                );
            }
            _ => return Err(field.invalid("multikey map must hold exactly keys 1 and 2")),
        }
    }
    match (threshold, keys) {
        (Some(threshold), Some(keys)) => Ok(MultiKey { threshold, keys }),
        _ => Err(field.invalid("multikey map must hold exactly keys 1 and 2")),
    }
}

impl FromValue for OutputDescriptor {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut field = FieldCx::new(OUTPUT.name, "script", cx, violations);
        let mut expressions = Vec::new();
        let mut current = value;
        while let Some((tag, inner)) = current.as_tagged() {
            let Some(expr) = ScriptExpression::from_tag(tag) else {
                break;
            };
            field.check_len(expressions.len() + 1, MAX_SCRIPT_DEPTH)?;
            expressions.push(expr);
            current = inner;
            if !expr.is_wrapper() {
                break;
            }
        }
        if expressions.is_empty() {
            return Err(field.invalid("expected a script expression tag"));
        }

        field.field = "key";
        let key = if expressions.last().is_some_and(|e| e.is_multisig()) {
            OutputKey::Multi(read_multikey(current, &mut field)?)
        } else {
            OutputKey::Single(KEY.decode(current, cx)?)
        };
        Ok(OutputDescriptor { expressions, key })
    }
}

impl Schema for OutputDescriptor {
    fn descriptor() -> &'static TypeDescriptor {
        &OUTPUT
    }
}

/// Formats the expression chain with key placeholders, e.g. `sh(wpkh(@0))`.
impl fmt::Display for OutputDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for expr in &self.expressions {
            write!(f, "{}(", expr.name())?;
        }
        match &self.key {
            OutputKey::Single(_) => f.write_str("@0")?,
            OutputKey::Multi(multi) => {
                write!(f, "{}", multi.threshold)?;
                for i in 0..multi.keys.len() {
                    write!(f, ",@{i}")?;
                }
            }
        }
        for _ in &self.expressions {
            f.write_str(")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::hdkey::tests::key_at;

    fn wpkh(path: &str) -> OutputDescriptor {
        OutputDescriptor::new(
            vec![ScriptExpression::WitnessPublicKeyHash],
            OutputKey::Single(DescriptorKey::HdKey(key_at(path))),
        )
    }

    fn multisig(threshold: u32, n: usize) -> OutputDescriptor {
        let keys = (0..n)
            .map(|i| DescriptorKey::HdKey(key_at(&format!("m/48'/0'/0'/{i}'"))))
            .collect();
        OutputDescriptor::new(
            vec![ScriptExpression::WitnessScriptHash, ScriptExpression::SortedMultisig],
            OutputKey::Multi(MultiKey { threshold, keys }),
        )
    }

    #[test]
    fn test_single_key_wire_shape() {
        let output = Record::new(wpkh("m/84'/0'/0'")).unwrap();
        let tagged = output.to_tagged_value();
        let (outer, script) = tagged.as_tagged().unwrap();
        assert_eq!(outer, 308);
        let (expr, key) = script.as_tagged().unwrap();
        assert_eq!(expr, 404);
        assert_eq!(key.as_tagged().map(|(tag, _)| tag), Some(303));

        let decoded = Record::<OutputDescriptor>::from_tagged_bytes(&output.to_tagged_bytes().unwrap()).unwrap();
        assert_eq!(decoded, output);
        assert_eq!(decoded.to_string(), "wpkh(@0)");
    }

    #[test]
    fn test_multisig_round_trip() {
        let output = Record::new(multisig(2, 3)).unwrap();
        assert_eq!(output.to_string(), "wsh(sortedmulti(2,@0,@1,@2))");
        assert_eq!(output.hd_keys().count(), 3);
        let decoded = Record::<OutputDescriptor>::from_bytes(&output.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, output);
    }

    #[test]
    fn test_eckey_member() {
        let ec = Record::new(EcKey { data: vec![3; 33], ..Default::default() }).unwrap();
        let output = Record::new(OutputDescriptor::new(
            vec![ScriptExpression::PublicKeyHash],
            OutputKey::Single(DescriptorKey::EcKey(ec)),
        ))
        .unwrap();
        assert_eq!(output.hd_keys().count(), 0);
        assert_eq!(Record::<OutputDescriptor>::from_bytes(&output.to_bytes().unwrap()).unwrap(), output);
    }

    #[test]
    fn test_threshold_bounds() {
        let err = Record::new(multisig(4, 3)).unwrap_err();
        assert_eq!(err.reasons, ["threshold 4 must be between 1 and the number of keys 3"]);
        assert!(Record::new(multisig(0, 2)).is_err());
    }

    #[test]
    fn test_key_kind_must_match_expression() {
        let mut single = wpkh("m/84'/0'/0'");
        single.expressions = vec![ScriptExpression::Multisig];
        let err = Record::new(single).unwrap_err();
        assert!(err.mentions("multi requires a multisig key"));

        let mut multi = multisig(1, 1);
        multi.expressions = vec![ScriptExpression::WitnessPublicKeyHash];
        let err = Record::new(multi).unwrap_err();
        assert!(err.mentions("requires multi or sortedmulti"));
    }

    #[test]
    fn test_only_wrappers_nest() {
        let mut output = wpkh("m/84'/0'/0'");
        output.expressions.insert(0, ScriptExpression::PublicKey);
        let err = Record::new(output).unwrap_err();
        assert_eq!(err.reasons, ["pk cannot wrap another script expression"]);
    }

    #[test]
    fn test_untagged_script_rejected() {
        let value = key_at("m/84'").to_tagged_value();
        let err = Record::<OutputDescriptor>::from_value(&value, DecodeContext::new(crate::registry::global()))
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidShape { field: "script", .. }));
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_key_must_be_registered_key_type() {
        // wpkh(coininfo)
        let info = Record::new(crate::types::CoinInfo::default()).unwrap();
        let value = Value::tagged(404, info.to_tagged_value());
        let err = Record::<OutputDescriptor>::from_value(&value, DecodeContext::new(crate::registry::global()))
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedTag { tag: 305, .. }));
    }
}
