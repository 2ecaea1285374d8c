//! Error types for registry setup, record construction, encoding and decoding.

use thiserror::Error;

use crate::model::Kind;

/// Error kinds, one per failure class a caller can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// E001: Record failed structural or domain validation
    Validation,
    /// E002: Tag or type name not present in the registry
    UnknownType,
    /// E003: Wire shape does not match the declared field kind
    TypeMismatch,
    /// E004: Two different descriptors claim one tag or name
    DuplicateRegistration,
    /// E005: Byte codec or UR transport rejected the input
    MalformedEncoding,
}

impl ErrorKind {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "E001",
            ErrorKind::UnknownType => "E002",
            ErrorKind::TypeMismatch => "E003",
            ErrorKind::DuplicateRegistration => "E004",
            ErrorKind::MalformedEncoding => "E005",
        }
    }
}

/// A record was rejected at construction.
///
/// Carries every violated invariant, in the order the checks ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[E001] invalid {type_name}: {}", .reasons.join("; "))]
pub struct ValidationError {
    /// Registry name of the record type.
    pub type_name: &'static str,
    /// Human-readable violation descriptions.
    pub reasons: Vec<String>,
}

impl ValidationError {
    /// Returns true if any reason contains `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.reasons.iter().any(|r| r.contains(needle))
    }
}

/// Error while populating a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("[E004] tag {tag} is already registered to {existing}, cannot register {new}")]
    DuplicateTag {
        tag: u64,
        existing: &'static str,
        new: &'static str,
    },

    #[error("[E004] type name {name:?} is already registered under tag {existing}, cannot reuse it for tag {new}")]
    DuplicateName {
        name: &'static str,
        existing: u64,
        new: u64,
    },
}

impl RegistryError {
    /// Returns the error kind for this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::DuplicateRegistration
    }
}

/// Error during decoding from bytes, values or UR strings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    // === E001: Validation ===
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // === E002: Unknown type ===
    #[error("[E002] tag {tag} is not registered")]
    UnknownTag { tag: u64 },

    #[error("[E002] type name {name:?} is not registered")]
    UnknownName { name: String },

    // === E003: Type mismatch ===
    #[error("[E003] {type_name}.{field}: expected {expected}, found {found}")]
    TypeMismatch {
        type_name: &'static str,
        field: &'static str,
        expected: Kind,
        found: Kind,
    },

    #[error("[E003] {type_name}.{field}: tag {tag} ({found}) is not admissible here, expected {expected}")]
    UnexpectedTag {
        type_name: &'static str,
        field: &'static str,
        tag: u64,
        found: &'static str,
        expected: &'static str,
    },

    #[error("[E003] {type_name}.{field}: {reason}")]
    InvalidShape {
        type_name: &'static str,
        field: &'static str,
        reason: &'static str,
    },

    #[error("[E003] {type_name}: unknown map key {key}")]
    UnknownKey { type_name: &'static str, key: u64 },

    #[error("[E003] {type_name}: map key {key} appears more than once")]
    DuplicateKey { type_name: &'static str, key: u64 },

    // === E005: Malformed encoding ===
    #[error("[E005] malformed CBOR: {0}")]
    Malformed(String),

    #[error("[E005] {count} trailing bytes after CBOR item")]
    TrailingBytes { count: usize },

    #[error("[E005] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error(transparent)]
    Ur(#[from] UrError),
}

impl DecodeError {
    /// Returns the error kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::Validation(_) => ErrorKind::Validation,
            DecodeError::UnknownTag { .. } | DecodeError::UnknownName { .. } => {
                ErrorKind::UnknownType
            }
            DecodeError::TypeMismatch { .. }
            | DecodeError::UnexpectedTag { .. }
            | DecodeError::InvalidShape { .. }
            | DecodeError::UnknownKey { .. }
            | DecodeError::DuplicateKey { .. } => ErrorKind::TypeMismatch,
            DecodeError::Malformed(_)
            | DecodeError::TrailingBytes { .. }
            | DecodeError::LengthExceedsLimit { .. }
            | DecodeError::Ur(_) => ErrorKind::MalformedEncoding,
        }
    }

    /// Returns the validation reasons if this is a validation failure.
    pub fn reasons(&self) -> &[String] {
        match self {
            DecodeError::Validation(e) => &e.reasons,
            _ => &[],
        }
    }
}

/// Error during encoding to bytes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("CBOR serialization failed: {0}")]
    Cbor(String),

    #[error("negative integer -1-{0} is outside the CBOR range")]
    NegativeOutOfRange(u64),
}

/// Error in the textual UR transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrError {
    #[error("[E005] UR must start with \"ur:\"")]
    InvalidScheme,

    #[error("[E005] invalid UR type {0:?}")]
    InvalidType(String),

    #[error("[E005] UR has no payload")]
    MissingPayload,

    #[error("[E005] multi-part UR {seq} needs fountain reassembly")]
    MultiPartUnsupported { seq: String },

    #[error("[E005] invalid byteword {0:?}")]
    InvalidByteword(String),

    #[error("[E005] bytewords payload too short ({len} bytes)")]
    TooShort { len: usize },

    #[error("[E005] bytewords checksum mismatch: expected {expected:08x}, found {found:08x}")]
    ChecksumMismatch { expected: u32, found: u32 },
}

/// Error parsing the text form of a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid key path component {0:?}")]
    InvalidPathComponent(String),

    #[error("invalid UUID {0:?}")]
    InvalidUuid(String),
}
