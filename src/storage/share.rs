//! URL-safe encoding of a finished plan, so it can be reconstructed from a
//! query parameter without re-invoking generation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::error::{PlannerError, Result};
use crate::types::Plan;

/// Upper bound on the encoded payload. URLs beyond this stop being
/// portable across browsers and chat clients.
pub const MAX_SHARE_BYTES: usize = 8 * 1024;

/// Serialize a plan into a URL-safe string.
///
/// Oversized plans fail with `EncodingTooLarge`; the payload is never
/// truncated.
pub fn encode_for_sharing(plan: &Plan) -> Result<String> {
    let json = serde_json::to_string(plan)?;
    let encoded = URL_SAFE_NO_PAD.encode(json.as_bytes());

    if encoded.len() > MAX_SHARE_BYTES {
        return Err(PlannerError::EncodingTooLarge {
            size: encoded.len(),
            limit: MAX_SHARE_BYTES,
        });
    }
    Ok(encoded)
}

/// Reverse of [`encode_for_sharing`]. Any decode or parse failure is a
/// `CorruptShareLink`.
pub fn decode_shared_plan(encoded: &str) -> Result<Plan> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim())
        .map_err(|err| PlannerError::CorruptShareLink(format!("invalid encoding: {err}")))?;

    let json = String::from_utf8(bytes)
        .map_err(|err| PlannerError::CorruptShareLink(format!("invalid text payload: {err}")))?;

    serde_json::from_str(&json)
        .map_err(|err| PlannerError::CorruptShareLink(format!("invalid plan payload: {err}")))
}
