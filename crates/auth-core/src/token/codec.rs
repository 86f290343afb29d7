use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{Algorithm, Claims, Clock, SigningKey, TokenError, VerifierRegistry};
use crate::Result;

const SEGMENT_SEPARATOR: char = '.';

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
}

/// Serialize and sign `claims` into `header.claims.signature`.
///
/// Output is deterministic for identical claims and key.
pub fn encode(claims: &Claims, key: &SigningKey) -> Result<String> {
    claims.check_payload()?;

    let header = Header {
        alg: key.algorithm().as_str().to_string(),
        typ: Some("JWT".to_string()),
        kid: key.key_id().map(str::to_string),
    };

    let header_segment = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
    let claims_segment = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{}{}{}", header_segment, SEGMENT_SEPARATOR, claims_segment);
    let signature = key.sign(signing_input.as_bytes())?;

    Ok(format!(
        "{}{}{}",
        signing_input,
        SEGMENT_SEPARATOR,
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Verify a token and return its claims.
///
/// Checks run in a fixed order: segment count, header and verifier lookup,
/// signature, claims decoding, then expiration. Claims are never decoded
/// from a token whose signature did not verify.
pub fn decode_and_verify(
    token: &str,
    registry: &VerifierRegistry,
    clock: &dyn Clock,
) -> std::result::Result<Claims, TokenError> {
    let segments: Vec<&str> = token.split(SEGMENT_SEPARATOR).collect();
    let &[header_segment, claims_segment, signature_segment] = segments.as_slice() else {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments separated by '{}', found {}",
            SEGMENT_SEPARATOR,
            segments.len()
        )));
    };

    let header: Header = decode_segment(header_segment, "header")?;
    let algorithm: Algorithm = header
        .alg
        .parse()
        .map_err(|_| TokenError::VerifierNotFound(header.alg.clone()))?;

    let mut candidates = registry.candidates(algorithm, header.kid.as_deref()).peekable();
    if candidates.peek().is_none() {
        return Err(TokenError::VerifierNotFound(match header.kid.as_deref() {
            Some(kid) => format!("{} (kid {})", algorithm, kid),
            None => algorithm.to_string(),
        }));
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature_segment)
        .map_err(|_| TokenError::SignatureMismatch)?;

    // Signing input is the first two segments exactly as received
    let signing_input = &token[..header_segment.len() + 1 + claims_segment.len()];
    if !candidates.any(|v| v.verify(signing_input.as_bytes(), &signature)) {
        trace!(%algorithm, "no verifier accepted token signature");
        return Err(TokenError::SignatureMismatch);
    }

    let claims: Claims = decode_segment(claims_segment, "claims")?;
    if claims.is_expired_at(clock.now()) {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

fn decode_segment<T: serde::de::DeserializeOwned>(
    segment: &str,
    name: &str,
) -> std::result::Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(format!("{} is not base64url: {}", name, e)))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(format!("{} is not valid JSON: {}", name, e)))
}
