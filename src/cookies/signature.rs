//! Keyed signing of cookie values.
//!
//! A signed value is `value + "." + base64(HMAC-SHA256(secret, value))` with the base64
//! padding removed. Verification recomputes the signature over everything before the
//! last `.` and compares the complete strings in constant time.
//!
//! Secrets rotate by list: the first secret signs, all of them verify.
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::{Result, SessionError};

type HmacSha256 = Hmac<Sha256>;

/// Signs `value` with `secret`. Same inputs always produce the same output.
pub fn sign(value: &str, secret: &str) -> Result<String> {
    if secret.is_empty() {
        return Err(SessionError::InvalidSecret);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SessionError::InvalidSecret)?;
    mac.update(value.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!("{value}.{}", STANDARD_NO_PAD.encode(signature)))
}

/// Verifies `input` against `secret` and returns the embedded value.
///
/// A mismatch is an expected outcome (forged, stale or rotated cookies) and yields `None`.
pub fn unsign(input: &str, secret: &str) -> Option<String> {
    let (value, _) = input.rsplit_once('.')?;
    let expected = sign(value, secret).ok()?;

    if constant_time_eq::constant_time_eq(expected.as_bytes(), input.as_bytes()) {
        Some(value.to_string())
    } else {
        None
    }
}

/// Tries each secret in order; the first one that verifies wins.
pub fn unsign_with_any<S: AsRef<str>>(input: &str, secrets: &[S]) -> Option<String> {
    secrets.iter().find_map(|secret| unsign(input, secret.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_is_deterministic_and_unpadded() {
        let a = sign("hello", "tobiiscool").unwrap();
        let b = sign("hello", "tobiiscool").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "hello.DGDUkGlIkCzPz+C0B064FNgHdEjox7ch8tOBGslZ5QI");
        assert!(!a.ends_with('='));
    }

    #[test]
    fn sign_rejects_empty_secret() {
        assert!(matches!(sign("hello", ""), Err(SessionError::InvalidSecret)));
    }

    #[test]
    fn unsign_round_trips() {
        for value in ["abc", "", "with.dots.inside", "3f2b-uuid-like"] {
            let signed = sign(value, "secret").unwrap();
            assert_eq!(unsign(&signed, "secret").as_deref(), Some(value));
        }
    }

    #[test]
    fn unsign_with_other_secret_fails() {
        let signed = sign("abc", "one").unwrap();
        assert!(unsign(&signed, "two").is_none());
        assert!(unsign(&signed, "").is_none());
    }

    #[test]
    fn tampering_is_detected() {
        let signed = sign("abc", "secret").unwrap();
        let forged = signed.replacen("abc", "abd", 1);
        assert!(unsign(&forged, "secret").is_none());
        assert!(unsign("abc", "secret").is_none());
        assert!(unsign(&format!("{signed}x"), "secret").is_none());
    }

    #[test]
    fn any_secret_in_rotation_verifies() {
        let old = sign("abc", "old").unwrap();
        let new = sign("abc", "new").unwrap();
        let secrets = ["new", "old"];

        assert_eq!(unsign_with_any(&old, &secrets).as_deref(), Some("abc"));
        assert_eq!(unsign_with_any(&new, &secrets).as_deref(), Some("abc"));
        assert!(unsign_with_any(&old, &["new"]).is_none());
        assert!(unsign_with_any::<&str>(&old, &[]).is_none());
    }
}
