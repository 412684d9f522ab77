//! Cryptographic utilities for webhook signature verification.
//!
//! Senders sign `"{timestamp}.{raw body}"` with HMAC-SHA256 and send
//!
//! ```text
//! webhook-signature: t=1700000000,v1=5257a869...,v1=9a0c7e12...
//! ```
//!
//! Several `v1` values may be present while a sender rotates its secret, and
//! the receiver may hold several secrets for the same reason. Signature
//! schemes other than `v1` are ignored.

use std::{fmt, str::FromStr, time::Duration};

use hmac::{digest::InvalidLength, Hmac, Mac};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};
use thiserror::Error;
use tracing::{debug, trace};

type HmacSha256 = Hmac<Sha256>;

/// Header key carrying the signing timestamp.
pub const TIMESTAMP_KEY: &str = "t";

/// Header key carrying an HMAC-SHA256 signature.
pub const SIGNATURE_SCHEME: &str = "v1";

/// Default replay window.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// Signature verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Header missing, or lacking a timestamp or a `v1` signature.
    #[error("malformed signature header: {0}")]
    MalformedHeader(String),

    /// No candidate signature matched any configured secret.
    #[error("no signature matched the payload")]
    SignatureMismatch,

    /// Signature matched but the timestamp is outside the tolerance window.
    #[error("timestamp skew of {skew_secs}s exceeds tolerance of {tolerance_secs}s")]
    TimestampOutOfTolerance {
        /// Absolute difference between now and the signed timestamp
        skew_secs: u64,
        /// Configured tolerance
        tolerance_secs: u64,
    },
}

/// Shared secret used to sign webhook payloads.
///
/// `Debug` never prints the secret. Compared only through HMAC verification.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Wraps secret bytes.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// Raw secret bytes.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(***)")
    }
}

impl From<&str> for SigningSecret {
    fn from(secret: &str) -> Self {
        Self(secret.as_bytes().to_vec())
    }
}

impl From<String> for SigningSecret {
    fn from(secret: String) -> Self {
        Self(secret.into_bytes())
    }
}

impl Serialize for SigningSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.0))
    }
}

impl<'de> Deserialize<'de> for SigningSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|secret| Self(secret.into_bytes()))
    }
}

/// Parsed form of the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Signing time, seconds since the Unix epoch.
    pub timestamp: i64,
    /// Candidate `v1` signatures as sent (hex encoded).
    pub signatures: Vec<String>,
}

impl FromStr for SignatureHeader {
    type Err = VerificationError;

    /// Parses `key=value` pairs separated by `,` or `;`.
    ///
    /// Unknown keys are ignored. Exactly one timestamp value and at least one
    /// `v1` signature are required.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut timestamp: Option<i64> = None;
        let mut signatures = Vec::new();

        for element in value.split([',', ';']).map(str::trim).filter(|e| !e.is_empty()) {
            let Some((key, val)) = element.split_once('=') else {
                return Err(malformed(format!("element '{element}' is not key=value")));
            };
            let (key, val) = (key.trim(), val.trim());

            match key {
                TIMESTAMP_KEY => {
                    let parsed = val
                        .parse::<i64>()
                        .map_err(|_| malformed(format!("timestamp '{val}' is not an integer")))?;
                    match timestamp {
                        Some(existing) if existing != parsed => {
                            return Err(malformed("conflicting timestamps"));
                        },
                        _ => timestamp = Some(parsed),
                    }
                },
                SIGNATURE_SCHEME if !val.is_empty() => signatures.push(val.to_string()),
                _ => {},
            }
        }

        let timestamp = timestamp.ok_or_else(|| malformed("missing timestamp"))?;
        if signatures.is_empty() {
            return Err(malformed("no v1 signature"));
        }

        Ok(Self { timestamp, signatures })
    }
}

impl fmt::Display for SignatureHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TIMESTAMP_KEY}={}", self.timestamp)?;
        for signature in &self.signatures {
            write!(f, ",{SIGNATURE_SCHEME}={signature}")?;
        }
        Ok(())
    }
}

fn malformed(reason: impl Into<String>) -> VerificationError {
    VerificationError::MalformedHeader(reason.into())
}

/// Successful verification details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedSignature {
    /// The signed timestamp.
    pub timestamp: i64,
    /// Position of the matching secret in the verifier's secret list.
    pub secret_index: usize,
}

/// Verifies webhook signatures against one or more secrets.
///
/// Pure and stateless after construction; share it freely across tasks.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secrets: Vec<SigningSecret>,
    tolerance: Duration,
}

impl SignatureVerifier {
    /// Creates a verifier. Secrets are tried in order, current secret first.
    pub fn new(secrets: Vec<SigningSecret>, tolerance: Duration) -> Self {
        Self { secrets, tolerance }
    }

    /// Configured replay window.
    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Number of configured secrets.
    pub fn secret_count(&self) -> usize {
        self.secrets.len()
    }

    /// Verifies `raw_body` against the signature header at time `now_unix`.
    ///
    /// The signature is checked first. A matching signature with a timestamp
    /// outside the tolerance is still rejected.
    ///
    /// # Errors
    ///
    /// - [`VerificationError::MalformedHeader`] if the header cannot be parsed
    /// - [`VerificationError::SignatureMismatch`] if no secret produces any
    ///   candidate signature
    /// - [`VerificationError::TimestampOutOfTolerance`] if the signature is
    ///   valid but stale or from the future
    pub fn verify(
        &self,
        raw_body: &[u8],
        header_value: &str,
        now_unix: i64,
    ) -> Result<VerifiedSignature, VerificationError> {
        let header: SignatureHeader = header_value.parse()?;
        trace!(body = %String::from_utf8_lossy(raw_body), "Verifying payload");

        let candidates: Vec<Option<Vec<u8>>> =
            header.signatures.iter().map(|sig| hex::decode(sig).ok()).collect();

        let secret_index = self
            .secrets
            .iter()
            .position(|secret| matches_any(secret, header.timestamp, raw_body, &candidates))
            .ok_or(VerificationError::SignatureMismatch)?;

        let skew_secs = now_unix.abs_diff(header.timestamp);
        let tolerance_secs = self.tolerance.as_secs();
        if skew_secs > tolerance_secs {
            return Err(VerificationError::TimestampOutOfTolerance { skew_secs, tolerance_secs });
        }

        debug!(secret_index, timestamp = header.timestamp, "Signature verified");
        Ok(VerifiedSignature { timestamp: header.timestamp, secret_index })
    }
}

/// Compares the expected digest with every candidate without early exit.
fn matches_any(
    secret: &SigningSecret,
    timestamp: i64,
    raw_body: &[u8],
    candidates: &[Option<Vec<u8>>],
) -> bool {
    let Ok(expected) = signed_digest(secret.expose(), timestamp, raw_body) else {
        return false;
    };

    let mut matched = Choice::from(0);
    for candidate in candidates.iter().flatten() {
        matched |= expected.as_slice().ct_eq(candidate.as_slice());
    }
    matched.into()
}

fn signed_digest(secret: &[u8], timestamp: i64, raw_body: &[u8]) -> Result<Vec<u8>, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(raw_body);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verifies with a single secret.
///
/// # Errors
///
/// See [`SignatureVerifier::verify`].
pub fn verify(
    raw_body: &[u8],
    header_value: &str,
    secret: &[u8],
    tolerance: Duration,
    now_unix: i64,
) -> Result<(), VerificationError> {
    SignatureVerifier::new(vec![SigningSecret::new(secret)], tolerance)
        .verify(raw_body, header_value, now_unix)
        .map(|_| ())
}

/// Computes the hex `v1` signature of `raw_body` signed at `timestamp`.
///
/// # Errors
///
/// Returns `InvalidLength` if the HMAC implementation rejects the key.
pub fn compute_signature(
    secret: &[u8],
    timestamp: i64,
    raw_body: &[u8],
) -> Result<String, InvalidLength> {
    signed_digest(secret, timestamp, raw_body).map(hex::encode)
}

/// Builds a complete header value signing `raw_body` with each secret.
///
/// # Errors
///
/// Returns `InvalidLength` if the HMAC implementation rejects a key.
pub fn generate_signature_header(
    secrets: &[SigningSecret],
    timestamp: i64,
    raw_body: &[u8],
) -> Result<String, InvalidLength> {
    let signatures = secrets
        .iter()
        .map(|secret| compute_signature(secret.expose(), timestamp, raw_body))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SignatureHeader { timestamp, signatures }.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn header_for(secret: &str, timestamp: i64, body: &[u8]) -> String {
        format!("t={timestamp},v1={}", compute_signature(secret.as_bytes(), timestamp, body).unwrap())
    }

    #[test]
    fn parse_header_with_rotation_and_unknown_schemes() {
        let header: SignatureHeader = "t=1700000000,v1=aa,v0=legacy,v1=bb,scheme=v2".parse().unwrap();

        assert_eq!(header.timestamp, 1_700_000_000);
        assert_eq!(header.signatures, vec!["aa".to_string(), "bb".to_string()]);
    }

    #[test]
    fn parse_header_accepts_semicolons_and_whitespace() {
        let header: SignatureHeader = " t = 42 ; v1 = ab ;".parse().unwrap();

        assert_eq!(header.timestamp, 42);
        assert_eq!(header.signatures, vec!["ab".to_string()]);
    }

    #[test]
    fn parse_header_rejects_missing_parts() {
        for value in ["", "v1=ab", "t=42", "t=42,v0=ab", "t=abc,v1=ab", "t=42,v1=ab,garbage", "t=1,t=2,v1=ab"] {
            assert!(
                matches!(value.parse::<SignatureHeader>(), Err(VerificationError::MalformedHeader(_))),
                "{value:?} should be malformed"
            );
        }
    }

    #[test]
    fn parse_header_tolerates_repeated_identical_timestamp() {
        assert!("t=7,t=7,v1=ab".parse::<SignatureHeader>().is_ok());
    }

    #[test]
    fn compute_signature_is_hex_sha256() {
        let signature = compute_signature(b"whsec_test", NOW, b"{}").unwrap();

        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(signature, compute_signature(b"whsec_test", NOW, b"{}").unwrap());
    }

    #[test]
    fn signed_payload_is_timestamp_dot_body() {
        let mut mac = HmacSha256::new_from_slice(b"whsec_test").unwrap();
        mac.update(b"1700000000.{\"id\":\"evt_1\"}");
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(compute_signature(b"whsec_test", NOW, br#"{"id":"evt_1"}"#).unwrap(), expected);
    }

    #[test]
    fn verify_accepts_valid_signature() {
        let body = br#"{"id":"evt_1","type":"customer.created"}"#;
        let header = header_for("whsec_test", NOW, body);

        assert_eq!(verify(body, &header, b"whsec_test", DEFAULT_TOLERANCE, NOW), Ok(()));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let body = b"payload";
        let header = header_for("whsec_other", NOW, body);

        assert_eq!(
            verify(body, &header, b"whsec_test", DEFAULT_TOLERANCE, NOW),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn verify_treats_non_hex_candidates_as_mismatch() {
        assert_eq!(
            verify(b"payload", "t=1700000000,v1=zz-not-hex", b"whsec_test", DEFAULT_TOLERANCE, NOW),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn verify_checks_tolerance_in_both_directions() {
        let body = b"payload";
        let header = header_for("whsec_test", NOW, body);
        let tolerance = Duration::from_secs(300);

        assert!(verify(body, &header, b"whsec_test", tolerance, NOW + 300).is_ok());
        assert!(verify(body, &header, b"whsec_test", tolerance, NOW - 300).is_ok());
        assert_eq!(
            verify(body, &header, b"whsec_test", tolerance, NOW + 301),
            Err(VerificationError::TimestampOutOfTolerance { skew_secs: 301, tolerance_secs: 300 })
        );
        assert_eq!(
            verify(body, &header, b"whsec_test", tolerance, NOW - 301),
            Err(VerificationError::TimestampOutOfTolerance { skew_secs: 301, tolerance_secs: 300 })
        );
    }

    #[test]
    fn mismatch_takes_precedence_over_stale_timestamp() {
        let header = header_for("whsec_other", NOW, b"payload");

        assert_eq!(
            verify(b"payload", &header, b"whsec_test", DEFAULT_TOLERANCE, NOW + 10_000),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn verifier_tries_each_secret_in_order() {
        let body = b"payload";
        let verifier = SignatureVerifier::new(
            vec![SigningSecret::from("whsec_new"), SigningSecret::from("whsec_old")],
            DEFAULT_TOLERANCE,
        );

        let old = verifier.verify(body, &header_for("whsec_old", NOW, body), NOW).unwrap();
        let new = verifier.verify(body, &header_for("whsec_new", NOW, body), NOW).unwrap();

        assert_eq!(old.secret_index, 1);
        assert_eq!(new.secret_index, 0);
        assert_eq!(
            verifier.verify(body, &header_for("whsec_gone", NOW, body), NOW),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn any_of_several_candidates_may_match() {
        let body = b"payload";
        let good = compute_signature(b"whsec_test", NOW, body).unwrap();
        let header = format!("t={NOW},v1={},v1={good}", "00".repeat(32));

        assert_eq!(verify(body, &header, b"whsec_test", DEFAULT_TOLERANCE, NOW), Ok(()));
    }

    #[test]
    fn generated_header_carries_one_signature_per_secret() {
        let secrets = [SigningSecret::from("a"), SigningSecret::from("b")];
        let header = generate_signature_header(&secrets, NOW, b"payload").unwrap();
        let parsed: SignatureHeader = header.parse().unwrap();

        assert_eq!(parsed.timestamp, NOW);
        assert_eq!(parsed.signatures.len(), 2);
        assert_eq!(parsed.signatures[1], compute_signature(b"b", NOW, b"payload").unwrap());
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = SigningSecret::from("whsec_super_secret");
        assert_eq!(format!("{secret:?}"), "SigningSecret(***)");
        assert!(!format!("{:?}", SignatureVerifier::new(vec![secret], DEFAULT_TOLERANCE))
            .contains("super_secret"));
    }
}
