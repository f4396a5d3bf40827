//! # rb-media-imagekit
//!
//! Client-side upload authentication for ImageKit. The browser uploads the
//! cover image directly to the CDN; the server only hands out a signed,
//! short-lived token.

use chrono::Utc;
use hmac::{Hmac, Mac};
use rb_core::{AppError, MediaSigner, UploadAuth};
use sha1::Sha1;
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

type HmacSha1 = Hmac<Sha1>;

pub const DEFAULT_TOKEN_TTL_SECS: u64 = 1800;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media keys are not configured")]
    NotConfigured,

    #[error("invalid private key: {0}")]
    InvalidKey(String),
}

#[derive(Clone)]
pub struct ImageKitSigner {
    public_key: Option<String>,
    private_key: Option<String>,
    url_endpoint: Option<String>,
    ttl_secs: u64,
}

impl ImageKitSigner {
    pub fn new(
        public_key: Option<String>,
        private_key: Option<String>,
        url_endpoint: Option<String>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            public_key: public_key.filter(|k| !k.is_empty()),
            private_key: private_key.filter(|k| !k.is_empty()),
            url_endpoint: url_endpoint.filter(|u| !u.is_empty()),
            ttl_secs,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.public_key.is_some() && self.private_key.is_some() && self.url_endpoint.is_some()
    }

    /// Lowercase hex HMAC-SHA1 of `token` followed by `expire`.
    pub fn sign(&self, token: &str, expire: i64) -> Result<String, MediaError> {
        let key = self.private_key.as_deref().ok_or(MediaError::NotConfigured)?;
        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| MediaError::InvalidKey(e.to_string()))?;
        mac.update(token.as_bytes());
        mac.update(expire.to_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    pub fn issue(&self) -> Result<UploadAuth, MediaError> {
        let (Some(public_key), Some(url_endpoint)) = (&self.public_key, &self.url_endpoint) else {
            return Err(MediaError::NotConfigured);
        };
        let token = Uuid::new_v4().to_string();
        let expire = Utc::now().timestamp() + self.ttl_secs as i64;
        let signature = self.sign(&token, expire)?;
        debug!(expire, "issued upload credentials");

        Ok(UploadAuth {
            token,
            expire,
            signature,
            public_key: public_key.clone(),
            url_endpoint: url_endpoint.clone(),
        })
    }
}

impl MediaSigner for ImageKitSigner {
    fn upload_auth(&self) -> anyhow::Result<UploadAuth> {
        self.issue().map_err(|err| {
            error!(error = %err, "cannot issue upload credentials");
            AppError::Internal("ImageKit configuration error on server.".into()).into()
        })
    }
}
