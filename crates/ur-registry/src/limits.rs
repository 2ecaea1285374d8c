//! Limits applied while decoding untrusted input.
//!
//! Payloads arrive from QR scans and other size-constrained channels, so
//! every allocation driven by a length on the wire is bounded here.

/// Maximum size of a single CBOR payload.
pub const MAX_PAYLOAD_BYTES: usize = 1 << 20;

/// Maximum number of elements in any sequence field.
pub const MAX_SEQUENCE_LEN: usize = 1024;

/// Maximum length of a text field, in bytes.
pub const MAX_TEXT_LEN: usize = 1024;

/// Maximum length of a byte-string field.
pub const MAX_BYTES_LEN: usize = 4096;

/// Maximum number of components in a key path (BIP-32 depth is a u8).
pub const MAX_KEYPATH_COMPONENTS: usize = 255;

/// Maximum number of nested script expressions in an output descriptor.
pub const MAX_SCRIPT_DEPTH: usize = 4;

/// Maximum number of subtypes in a coin identity.
pub const MAX_SUBTYPES: usize = 8;
