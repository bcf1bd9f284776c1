//! Claims extraction from compact (JWT-shaped) tokens.
//!
//! Only the payload segment is read. Nothing is verified: the token is
//! trusted because it was just issued to an authenticated browser session.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::{Map, Value};

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Decode the claims (second `.`-separated segment) of a token.
///
/// Returns `None` for anything malformed: missing segment, bad base64,
/// invalid JSON, or a payload that is not a JSON object.
pub fn decode_claims(token: &str) -> Option<Map<String, Value>> {
    let payload_part = token.trim().split('.').nth(1)?;
    if payload_part.is_empty() {
        return None;
    }

    let mut padded = payload_part.to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }

    let payload = URL_SAFE_LENIENT
        .decode(&padded)
        .or_else(|_| STANDARD_LENIENT.decode(&padded))
        .ok()?;

    match serde_json::from_slice(&payload).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// Read a claim as a non-empty string. Integer claims are rendered in
/// decimal.
pub fn claim_string(claims: &Map<String, Value>, name: &str) -> Option<String> {
    match claims.get(name)? {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
