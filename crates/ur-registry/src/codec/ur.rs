//! Single-part UR strings: `ur:<type>/<bytewords>`.
//!
//! Multi-part URs (`ur:<type>/<seq>-<count>/<fragment>`) carry fountain-coded
//! fragments and are reassembled by the transport before reaching this
//! module; they are recognised and rejected here.

use std::fmt;

use crate::codec::bytewords::{self, Style};
use crate::error::UrError;

const SCHEME: &str = "ur:";

/// A parsed single-part UR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ur {
    /// Registry name of the payload type.
    pub ur_type: String,
    /// CBOR payload.
    pub payload: Vec<u8>,
}

impl fmt::Display for Ur {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(&self.ur_type, &self.payload))
    }
}

/// Encodes a payload as a UR string.
pub fn encode(ur_type: &str, payload: &[u8]) -> String {
    format!("{SCHEME}{ur_type}/{}", bytewords::encode(payload, Style::Minimal))
}

/// Parses a single-part UR string.
pub fn decode(s: &str) -> Result<Ur, UrError> {
    let lower = s.to_ascii_lowercase();
    let body = lower.strip_prefix(SCHEME).ok_or(UrError::InvalidScheme)?;

    let mut parts = body.split('/');
    let ur_type = parts.next().unwrap_or_default();
    if !is_valid_type(ur_type) {
        return Err(UrError::InvalidType(ur_type.to_string()));
    }
    let segments: Vec<&str> = parts.collect();
    let words = match segments.as_slice() {
        [words] if !words.is_empty() => *words,
        [seq, _] if is_sequence(seq) => {
            return Err(UrError::MultiPartUnsupported { seq: seq.to_string() });
        }
        _ => return Err(UrError::MissingPayload),
    };

    Ok(Ur {
        ur_type: ur_type.to_string(),
        payload: bytewords::decode(words, Style::Minimal)?,
    })
}

fn is_valid_type(ur_type: &str) -> bool {
    !ur_type.is_empty()
        && ur_type
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

fn is_sequence(seg: &str) -> bool {
    match seg.split_once('-') {
        Some((n, total)) => {
            !n.is_empty()
                && !total.is_empty()
                && n.bytes().all(|b| b.is_ascii_digit())
                && total.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}
