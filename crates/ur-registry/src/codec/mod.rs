//! Byte and text encodings.
//!
//! - [`cbor`]: [`Value`](crate::model::Value) to and from CBOR bytes
//! - [`bytewords`]: byte-to-word encoding with CRC-32 checksum
//! - [`ur`]: the `ur:<type>/<payload>` text transport

pub mod bytewords;
pub mod cbor;
pub mod ur;

pub use ur::Ur;
