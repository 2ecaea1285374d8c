//! UR registry: self-describing CBOR records for offline wallet sync.
//!
//! This crate defines the record types an air-gapped signer exchanges with a
//! companion wallet (keys, key paths, accounts, coin identities and whole
//! portfolios) together with the machinery that encodes, decodes and
//! validates them.
//!
//! # Overview
//!
//! - Every record type has a static [`TypeDescriptor`]: a CBOR tag, a
//!   registry name, and a field-key map from field names to compact integer
//!   map keys.
//! - A validated instance is a [`Record<F>`]. Construction always runs the
//!   type's validator and reports *every* violated invariant at once.
//! - Nested and polymorphic fields are self-identified by their tag and
//!   resolved through a [`Registry`], never guessed from their shape.
//! - Records travel as CBOR bytes or as single-part `ur:<type>/<bytewords>`
//!   strings.
//!
//! # Quick Start
//!
//! ```rust
//! use ur_registry::Record;
//! use ur_registry::types::{CoinIdentity, EllipticCurve, Subtype};
//!
//! let coin = Record::new(
//!     CoinIdentity::new(EllipticCurve::Secp256k1, 60).with_subtype(Subtype::Number(137)),
//! )
//! .unwrap();
//! assert_eq!(coin.identifier(), "bc_coin:8/60/137");
//!
//! // Encode as a UR string and decode it back
//! let ur = coin.to_ur().unwrap();
//! assert!(ur.starts_with("ur:coin-identity/"));
//! let decoded = Record::<CoinIdentity>::from_ur(&ur).unwrap();
//! assert_eq!(decoded, coin);
//! ```
//!
//! Decoding without knowing the type up front goes through the registry:
//!
//! ```rust
//! use ur_registry::registry;
//! use ur_registry::types::SyncId;
//!
//! let record = registry::global()
//!     .decode_ur("ur:sync-id/fdrdrnsgzelupmwtbtjpryzsss")
//!     .unwrap();
//! let sync_id = record.downcast_ref::<SyncId>().unwrap();
//! assert_eq!(sync_id.fields().0, [0xba, 0xbe, 0xca, 0xfe, 0x8b, 0xad, 0xf0, 0x0d]);
//! ```
//!
//! # Modules
//!
//! - [`model`]: value model, descriptors and [`Record`]
//! - [`registry`]: type registry and union resolution
//! - [`types`]: built-in record types
//! - [`validate`]: shared checks and domain policies
//! - [`codec`]: CBOR bytes, bytewords and UR strings
//! - [`error`]: error types
//! - [`limits`]: bounds applied to untrusted input
//!
//! # Security
//!
//! Payloads come from QR codes and other untrusted channels:
//! - Every length read from the wire is bounded by [`limits`]
//! - Unknown tags fail with [`DecodeError::UnknownTag`]; there is no
//!   best-effort partial decode
//! - Unknown map keys are rejected except where a type opts out

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod registry;
pub mod types;
pub mod validate;

// Re-export commonly used types at crate root
pub use error::{DecodeError, EncodeError, ErrorKind, ParseError, RegistryError, UrError, ValidationError};
pub use model::{FieldKey, Record, Schema, TypeDescriptor, Value};
pub use registry::{DecodeContext, DynRecord, Registry, RegistryBuilder};
pub use validate::Violations;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
