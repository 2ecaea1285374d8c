//! Semantic validation.
//!
//! Validators run when a record is constructed, whether by hand or by
//! decoding. They are pure predicates: each check pushes a reason into a
//! [`Violations`] list and carries on, so a caller sees every problem with a
//! record at once.
//!
//! Structural checks shared between record types live here, along with the
//! cross-record domain policies.

use crate::error::ValidationError;
use crate::model::Record;
use crate::types::{EllipticCurve, HdKey};

/// An ordered list of violated invariants.
///
/// During decoding it also remembers which required fields were missing from
/// the wire, so validators can skip checks on their placeholder values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations {
    reasons: Vec<String>,
    absent: Vec<&'static str>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    /// Pushes the reason produced by `reason` unless `ok` holds.
    pub fn check(&mut self, ok: bool, reason: impl FnOnce() -> String) {
        if !ok {
            self.reasons.push(reason());
        }
    }

    /// Records a required field missing from the wire.
    pub fn mark_absent(&mut self, field: &'static str) {
        self.absent.push(field);
    }

    /// Returns true if `field` was missing when the record was decoded.
    pub fn is_absent(&self, field: &str) -> bool {
        self.absent.contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Converts to a result, failing if any violation was recorded.
    pub fn into_result(self, type_name: &'static str) -> Result<(), ValidationError> {
        if self.reasons.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                type_name,
                reasons: self.reasons,
            })
        }
    }

    /// Moves everything recorded so far into an error, leaving `self` empty.
    pub(crate) fn take(&mut self, type_name: &'static str) -> ValidationError {
        ValidationError {
            type_name,
            reasons: std::mem::take(&mut self.reasons),
        }
    }
}

/// Requires a byte field to have exactly `expected` bytes.
pub fn exact_len(v: &mut Violations, field: &str, bytes: &[u8], expected: usize) {
    v.check(bytes.len() == expected, || {
        format!("{field} must be {expected} bytes, got {}", bytes.len())
    });
}

/// Requires a BIP-32 fingerprint to be non-zero.
pub fn fingerprint(v: &mut Violations, field: &str, fp: u32) {
    v.check(fp != 0, || format!("{field} must be non-zero"));
}

/// Requires a two-letter lowercase ISO 639-1 language code.
pub fn language_code(v: &mut Violations, field: &str, code: &str) {
    let ok = code.len() == 2 && code.bytes().all(|b| b.is_ascii_lowercase());
    v.check(ok, || {
        format!("{field} {code:?} is not a two-letter lowercase ISO 639-1 code")
    });
}

/// Requires a text field to be non-empty.
pub fn non_empty(v: &mut Violations, field: &str, text: &str) {
    v.check(!text.is_empty(), || format!("{field} must not be empty"));
}

/// Edwards-curve coins may only hold keys derived along fully hardened paths.
///
/// Non-hardened derivation on ed25519 is not defined by SLIP-10, so every
/// account key of such a coin must name its origin and every component of
/// that origin must be hardened. Public keys of an ed25519 coin must also be
/// in SLIP-10 ed25519 form.
pub fn hardened_origin_policy<'k>(
    v: &mut Violations,
    curve: EllipticCurve,
    keys: impl IntoIterator<Item = &'k Record<HdKey>>,
) {
    if !curve.is_edwards() {
        return;
    }
    for (i, key) in keys.into_iter().enumerate() {
        if curve == EllipticCurve::Ed25519 && !key.is_private && !key.is_ed25519() {
            v.push(format!("account key #{i} is not an {curve} public key"));
        }
        match &key.origin {
            None => v.push(format!(
                "account key #{i} has no origin; {curve} keys require a fully hardened derivation path"
            )),
            Some(origin) if !origin.is_fully_hardened() => v.push(format!(
                "account key #{i} path {} is not fully hardened; {curve} keys require hardened derivation",
                **origin
            )),
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violations_collect_in_order() {
        let mut v = Violations::new();
        fingerprint(&mut v, "master-fingerprint", 0);
        exact_len(&mut v, "chain-code", &[0; 31], 32);
        language_code(&mut v, "language-code", "EN");
        non_empty(&mut v, "device", "keystone");

        assert_eq!(v.len(), 3);
        let err = v.into_result("test").unwrap_err();
        assert_eq!(err.reasons[0], "master-fingerprint must be non-zero");
        assert_eq!(err.reasons[1], "chain-code must be 32 bytes, got 31");
        assert!(err.reasons[2].contains("\"EN\""));
    }

    #[test]
    fn test_empty_violations_pass() {
        let mut v = Violations::new();
        language_code(&mut v, "language-code", "fr");
        exact_len(&mut v, "key-data", &[2; 33], 33);
        assert!(v.is_empty());
        assert!(v.into_result("test").is_ok());
    }

    #[test]
    fn test_absent_fields() {
        let mut v = Violations::new();
        v.mark_absent("key-data");
        assert!(v.is_absent("key-data"));
        assert!(!v.is_absent("chain-code"));
        assert!(v.is_empty());
    }
}
