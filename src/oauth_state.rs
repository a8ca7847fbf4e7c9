//! Signed OAuth state blobs.
//!
//! The authorize endpoint round-trips tenant context through the Meta OAuth
//! dialog in the `state` parameter. The blob is a base64url JSON payload with
//! an HMAC-SHA256 signature appended (`payload.sig`) so the callback can
//! reject tampered or foreign state.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Tenant context carried through the OAuth dialog round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthFlowState {
    pub app_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    /// Where to send the browser after the callback completes.
    pub redirect_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    #[error("state payload could not be serialized: {0}")]
    Encode(String),
    #[error("state blob is malformed")]
    Malformed,
    #[error("state signature does not verify")]
    BadSignature,
}

fn sign(payload: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Encodes and signs flow state as `base64url(json).hex(hmac)`.
pub fn encode_state(state: &OAuthFlowState, secret: &str) -> Result<String, StateError> {
    let json = serde_json::to_vec(state).map_err(|e| StateError::Encode(e.to_string()))?;
    let payload = base64_url::encode(&json);
    let signature = sign(&payload, secret);
    Ok(format!("{}.{}", payload, signature))
}

/// Verifies the signature and decodes the flow state.
pub fn decode_state(blob: &str, secret: &str) -> Result<OAuthFlowState, StateError> {
    let (payload, signature) = blob.split_once('.').ok_or(StateError::Malformed)?;
    if payload.is_empty() || signature.is_empty() {
        return Err(StateError::Malformed);
    }

    let expected = sign(payload, secret);
    if expected.as_bytes().ct_eq(signature.as_bytes()).unwrap_u8() != 1 {
        return Err(StateError::BadSignature);
    }

    let json = base64_url::decode(payload).map_err(|_| StateError::Malformed)?;
    serde_json::from_slice(&json).map_err(|_| StateError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> OAuthFlowState {
        OAuthFlowState {
            app_id: "app-123".to_string(),
            org_id: Some("org-456".to_string()),
            redirect_uri: "https://platform.example.com/settings".to_string(),
            label: Some("Acme Ads".to_string()),
        }
    }

    #[test]
    fn test_roundtrip() {
        let state = sample_state();
        let blob = encode_state(&state, "s3cret").unwrap();
        let decoded = decode_state(&blob, "s3cret").unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn test_roundtrip_without_optional_fields() {
        let state = OAuthFlowState {
            app_id: "app-123".to_string(),
            org_id: None,
            redirect_uri: "https://platform.example.com".to_string(),
            label: None,
        };
        let blob = encode_state(&state, "s3cret").unwrap();
        assert_eq!(decode_state(&blob, "s3cret").unwrap(), state);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let blob = encode_state(&sample_state(), "s3cret").unwrap();
        let (payload, sig) = blob.split_once('.').unwrap();
        let mut tampered_payload = payload.to_string();
        tampered_payload.replace_range(0..1, "Z");
        let tampered = format!("{}.{}", tampered_payload, sig);
        assert_eq!(
            decode_state(&tampered, "s3cret"),
            Err(StateError::BadSignature)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let blob = encode_state(&sample_state(), "s3cret").unwrap();
        assert_eq!(
            decode_state(&blob, "different"),
            Err(StateError::BadSignature)
        );
    }

    #[test]
    fn test_malformed_blobs_rejected() {
        for blob in ["", "no-dot-here", ".", "payload.", ".sig"] {
            assert_eq!(decode_state(blob, "s3cret"), Err(StateError::Malformed));
        }
    }
}
