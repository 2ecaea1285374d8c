//! BIP-32 derivation paths (BCR-2020-007 `crypto-keypath`).
//!
//! On the wire the components are flattened into one array of
//! `index, hardened` pairs, with an empty array standing in for the index of
//! a wildcard component:
//!
//! ```text
//! m/44'/60'/0'/*  =>  [44, true, 60, true, 0, true, [], false]
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, ParseError};
use crate::limits::MAX_KEYPATH_COMPONENTS;
use crate::model::{
    FieldCx, FieldKey, FieldMap, FromField, FromValue, Kind, MapBuilder, Schema, ToField, ToValue,
    TypeDescriptor, Validate, Value,
};
use crate::registry::DecodeContext;
use crate::validate::{self, Violations};

const COMPONENTS: FieldKey = FieldKey::required("components", 1);
const SOURCE_FINGERPRINT: FieldKey = FieldKey::optional("source-fingerprint", 2);
const DEPTH: FieldKey = FieldKey::optional("depth", 3);

static KEYPATH: TypeDescriptor = TypeDescriptor {
    tag: 304,
    name: "crypto-keypath",
    keys: &[COMPONENTS, SOURCE_FINGERPRINT, DEPTH],
    schema: "keypath = #6.304({ 1: [* (uint31 / []) , bool], ? 2: uint32, ? 3: uint8 })",
    strict_keys: true,
};

/// First index of the hardened range.
pub const HARDENED_OFFSET: u32 = 1 << 31;

/// One step of a derivation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathComponent {
    Index { index: u32, hardened: bool },
    Wildcard { hardened: bool },
}

impl PathComponent {
    pub fn hardened(index: u32) -> Self {
        PathComponent::Index { index, hardened: true }
    }

    pub fn normal(index: u32) -> Self {
        PathComponent::Index { index, hardened: false }
    }

    pub fn is_hardened(&self) -> bool {
        match *self {
            PathComponent::Index { hardened, .. } | PathComponent::Wildcard { hardened } => hardened,
        }
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathComponent::Index { index, .. } => write!(f, "{index}")?,
            PathComponent::Wildcard { .. } => f.write_str("*")?,
        }
        if self.is_hardened() {
            f.write_str("'")?;
        }
        Ok(())
    }
}

impl FromStr for PathComponent {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (body, hardened) = match s.strip_suffix(['\'', 'h']) {
            Some(body) => (body, true),
            None => (s, false),
        };
        if body == "*" {
            return Ok(PathComponent::Wildcard { hardened });
        }
        match body.parse::<u32>() {
            Ok(index) if index < HARDENED_OFFSET && !body.starts_with('+') => {
                Ok(PathComponent::Index { index, hardened })
            }
            _ => Err(ParseError::InvalidPathComponent(s.to_string())),
        }
    }
}

/// A derivation path, optionally anchored to the master key it starts from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Keypath {
    pub components: Vec<PathComponent>,
    /// Fingerprint of the key the path starts from.
    pub source_fingerprint: Option<u32>,
    /// Number of derivation steps from the master key.
    pub depth: Option<u8>,
}

impl Keypath {
    pub fn new(components: Vec<PathComponent>) -> Self {
        Keypath {
            components,
            ..Default::default()
        }
    }

    pub fn with_source_fingerprint(mut self, fingerprint: u32) -> Self {
        self.source_fingerprint = Some(fingerprint);
        self
    }

    /// Returns true if the path is non-empty and every step is hardened.
    pub fn is_fully_hardened(&self) -> bool {
        !self.components.is_empty() && self.components.iter().all(PathComponent::is_hardened)
    }
}

impl Validate for Keypath {
    fn validate(&self, v: &mut Violations) {
        for (i, component) in self.components.iter().enumerate() {
            if let PathComponent::Index { index, .. } = component {
                v.check(*index < HARDENED_OFFSET, || {
                    format!("component #{i} index {index} must be below 2^31")
                });
            }
        }
        if let Some(fp) = self.source_fingerprint {
            validate::fingerprint(v, "source-fingerprint", fp);
        }
        if let Some(depth) = self.depth {
            let len = self.components.len();
            v.check(usize::from(depth) >= len, || {
                format!("depth {depth} is less than the number of components {len}")
            });
        }
    }
}

impl ToValue for Keypath {
    fn to_value(&self) -> Value {
        let mut flat = Vec::with_capacity(self.components.len() * 2);
        for component in &self.components {
            let index = match component {
                PathComponent::Index { index, .. } => index.to_field(),
                PathComponent::Wildcard { .. } => Value::Array(Vec::new()),
            };
            flat.push(index);
            flat.push(Value::Bool(component.is_hardened()));
        }
        MapBuilder::new()
            .value(&COMPONENTS, Value::Array(flat))
            .optional(&SOURCE_FINGERPRINT, self.source_fingerprint.as_ref())
            .optional(&DEPTH, self.depth.as_ref())
            .build()
    }
}

fn read_components(value: &Value, field: &mut FieldCx<'_>) -> Result<Vec<PathComponent>, DecodeError> {
    let flat = value.as_array().ok_or_else(|| field.mismatch(Kind::Array, value))?;
    if flat.len() % 2 != 0 {
        return Err(field.invalid("components must be index/hardened pairs"));
    }
    field.check_len(flat.len() / 2, MAX_KEYPATH_COMPONENTS)?;

    let mut components = Vec::with_capacity(flat.len() / 2);
    for pair in flat.chunks_exact(2) {
        let hardened = bool::from_field(&pair[1], field)?;
        let component = match &pair[0] {
            Value::Array(range) if range.is_empty() => PathComponent::Wildcard { hardened },
            Value::Array(_) => return Err(field.invalid("child index ranges are not supported")),
            index => PathComponent::Index {
                index: u32::from_field(index, field)?,
                hardened,
            },
        };
        components.push(component);
    }
    Ok(components)
}

impl FromValue for Keypath {
    fn from_value(value: &Value, cx: DecodeContext<'_>, violations: &mut Violations) -> Result<Self, DecodeError> {
        let mut map = FieldMap::new(value, &KEYPATH, cx, violations)?;
        Ok(Keypath {
            components: map.with(&COMPONENTS, read_components)?.unwrap_or_default(),
            source_fingerprint: map.optional(&SOURCE_FINGERPRINT)?,
            depth: map.optional(&DEPTH)?,
        })
    }
}

impl Schema for Keypath {
    fn descriptor() -> &'static TypeDescriptor {
        &KEYPATH
    }
}

/// Formats as `m/44'/60'/0'/0/*`.
impl fmt::Display for Keypath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

/// Parses `m/44'/60'/0'`, also accepting `h` as the hardened marker and a
/// path without the leading `m`.
impl FromStr for Keypath {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = match s.strip_prefix('m') {
            Some("") => return Ok(Keypath::default()),
            Some(rest) => rest
                .strip_prefix('/')
                .ok_or_else(|| ParseError::InvalidPathComponent(s.to_string()))?,
            None => s,
        };
        let components = body.split('/').map(str::parse).collect::<Result<Vec<_>, _>>()?;
        Ok(Keypath::new(components))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::cbor;
    use crate::error::ErrorKind;
    use crate::model::Record;
    use proptest::prelude::*;

    #[test]
    fn test_parse_and_display() {
        let path: Keypath = "m/44'/60h/0'/0/*".parse().unwrap();
        assert_eq!(
            path.components,
            [
                PathComponent::hardened(44),
                PathComponent::hardened(60),
                PathComponent::hardened(0),
                PathComponent::normal(0),
                PathComponent::Wildcard { hardened: false },
            ]
        );
        assert_eq!(path.to_string(), "m/44'/60'/0'/0/*");
        assert!(!path.is_fully_hardened());
        assert!("44'/501'".parse::<Keypath>().unwrap().is_fully_hardened());
        assert_eq!("m".parse::<Keypath>().unwrap(), Keypath::default());
    }

    #[test]
    fn test_parse_rejects_bad_components() {
        for bad in ["m/", "m/x", "m/2147483648", "m//1", "m/1''", "mm/1"] {
            assert!(bad.parse::<Keypath>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_empty_path_is_not_hardened() {
        assert!(!Keypath::default().is_fully_hardened());
    }

    #[test]
    fn test_wire_shape() {
        let path = Record::new("m/44'/*".parse::<Keypath>().unwrap().with_source_fingerprint(0x78412e3a)).unwrap();
        let expected = Value::Map(vec![
            (
                Value::Unsigned(1),
                Value::Array(vec![
                    Value::Unsigned(44),
                    Value::Bool(true),
                    Value::Array(vec![]),
                    Value::Bool(false),
                ]),
            ),
            (Value::Unsigned(2), Value::Unsigned(0x78412e3a)),
        ]);
        assert_eq!(path.to_value(), expected);
        assert_eq!(Record::<Keypath>::from_bytes(&path.to_bytes().unwrap()).unwrap(), path);
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let path = Keypath {
            components: vec![PathComponent::normal(HARDENED_OFFSET), PathComponent::hardened(1)],
            source_fingerprint: Some(0),
            depth: Some(1),
        };
        let err = Record::new(path).unwrap_err();
        assert_eq!(
            err.reasons,
            [
                "component #0 index 2147483648 must be below 2^31",
                "source-fingerprint must be non-zero",
                "depth 1 is less than the number of components 2",
            ]
        );
    }

    #[test]
    fn test_odd_component_array() {
        let value = Value::Map(vec![(Value::Unsigned(1), Value::Array(vec![Value::Unsigned(44)]))]);
        let bytes = cbor::encode(&value).unwrap();
        let err = Record::<Keypath>::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_missing_components() {
        let err = Record::<Keypath>::from_bytes(&[0xa1, 0x03, 0x01]).unwrap_err();
        assert_eq!(err.reasons(), ["missing required key 1 (components)"]);
    }

    #[test]
    fn test_missing_components_reported_with_field_errors() {
        // {2: 0, 3: 300}
        let err = Record::<Keypath>::from_bytes(&[0xa2, 0x02, 0x00, 0x03, 0x19, 0x01, 0x2c]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.reasons(),
            [
                "missing required key 1 (components)",
                "depth value 300 exceeds the 8-bit range",
                "source-fingerprint must be non-zero",
            ]
        );
    }

    fn component() -> impl Strategy<Value = PathComponent> {
        prop_oneof![
            (0..HARDENED_OFFSET, any::<bool>()).prop_map(|(index, hardened)| PathComponent::Index { index, hardened }),
            any::<bool>().prop_map(|hardened| PathComponent::Wildcard { hardened }),
        ]
    }

    proptest! {
        #[test]
        fn prop_keypath_round_trip(
            components in proptest::collection::vec(component(), 0..12),
            fingerprint in proptest::option::of(1..=u32::MAX),
        ) {
            let depth = u8::try_from(components.len()).ok();
            let path = Record::new(Keypath { components, source_fingerprint: fingerprint, depth }).unwrap();
            let decoded = Record::<Keypath>::from_tagged_bytes(&path.to_tagged_bytes().unwrap()).unwrap();
            prop_assert_eq!(&decoded, &path);

            let text = path.to_string();
            prop_assert_eq!(text.parse::<Keypath>().unwrap().components, path.components.clone());
        }
    }
}
