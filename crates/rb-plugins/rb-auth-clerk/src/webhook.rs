//! Svix signature scheme used by Clerk webhooks.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rb_core::{WebhookHeaders, WebhookVerifier};
use sha2::Sha256;

use crate::AuthError;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";
const TOLERANCE_SECS: u64 = 5 * 60;

pub struct SvixWebhookVerifier {
    key: Vec<u8>,
}

impl SvixWebhookVerifier {
    /// Accepts the signing secret as shown in the dashboard (`whsec_<base64>`).
    pub fn from_secret(secret: &str) -> Result<Self, AuthError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD
            .decode(encoded)
            .map_err(|e| AuthError::InvalidKey(format!("webhook secret: {e}")))?;
        if key.is_empty() {
            return Err(AuthError::InvalidKey("empty webhook secret".into()));
        }
        Ok(Self { key })
    }

    /// Base64 signature of a delivery, as the sender computes it.
    pub fn sign(&self, id: &str, timestamp: i64, payload: &[u8]) -> Result<String, AuthError> {
        let mac = self.mac(id, &timestamp.to_string(), payload)?;
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    pub fn verify_at(
        &self,
        headers: &WebhookHeaders,
        payload: &[u8],
        now: i64,
    ) -> Result<(), AuthError> {
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| AuthError::MalformedHeaders("svix-timestamp"))?;
        if now.abs_diff(timestamp) > TOLERANCE_SECS {
            return Err(AuthError::StaleTimestamp);
        }

        let expected = self.mac(&headers.id, headers.timestamp.trim(), payload)?;
        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .filter_map(|(_, sig)| STANDARD.decode(sig).ok())
            .any(|sig| expected.clone().verify_slice(&sig).is_ok());

        if matched {
            Ok(())
        } else {
            Err(AuthError::NoMatchingSignature)
        }
    }

    fn mac(&self, id: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

impl WebhookVerifier for SvixWebhookVerifier {
    fn verify_webhook(&self, headers: &WebhookHeaders, payload: &[u8]) -> anyhow::Result<()> {
        if headers.id.is_empty() || headers.signature.is_empty() {
            return Err(AuthError::MalformedHeaders("missing svix headers").into());
        }
        Ok(self.verify_at(headers, payload, chrono::Utc::now().timestamp())?)
    }
}
