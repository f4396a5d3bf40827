use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use rb_core::{Identity, IdentityVerifier, Role};
use serde::Deserialize;
use tracing::debug;

use crate::AuthError;

const LEEWAY_SECS: u64 = 5;

/// Claims of a Clerk session token that the blog cares about.
#[derive(Debug, Clone, Deserialize)]
struct SessionClaims {
    sub: String,
    azp: Option<String>,
    #[serde(default)]
    metadata: Option<PublicMetadata>,
}

/// Custom session claim populated from the user's public metadata.
#[derive(Debug, Clone, Default, Deserialize)]
struct PublicMetadata {
    role: Option<String>,
}

pub struct ClerkJwtVerifier {
    key: DecodingKey,
    validation: Validation,
    authorized_parties: Vec<String>,
}

impl ClerkJwtVerifier {
    /// Networkless verification with the instance's PEM public key.
    pub fn from_rsa_pem(pem: &str, authorized_parties: Vec<String>) -> Result<Self, AuthError> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Ok(Self::with_key(key, Algorithm::RS256, authorized_parties))
    }

    /// Shared-secret verification, for local development and tests.
    pub fn from_secret(secret: &str, authorized_parties: Vec<String>) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidKey("empty secret".into()));
        }
        let key = DecodingKey::from_secret(secret.as_bytes());
        Ok(Self::with_key(key, Algorithm::HS256, authorized_parties))
    }

    fn with_key(key: DecodingKey, algorithm: Algorithm, authorized_parties: Vec<String>) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.leeway = LEEWAY_SECS;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key,
            validation,
            authorized_parties,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = jsonwebtoken::decode::<SessionClaims>(token.trim(), &self.key, &self.validation)?;
        let claims = data.claims;

        if let Some(azp) = &claims.azp {
            if !self.authorized_parties.is_empty() && !self.authorized_parties.contains(azp) {
                return Err(AuthError::UnauthorizedParty(azp.clone()));
            }
        }

        let role = match claims.metadata.unwrap_or_default().role.as_deref() {
            Some("admin") => Role::Admin,
            _ => Role::User,
        };
        debug!(sub = %claims.sub, ?role, "session token verified");

        Ok(Identity {
            clerk_user_id: claims.sub,
            role,
        })
    }
}

impl IdentityVerifier for ClerkJwtVerifier {
    fn verify_token(&self, token: &str) -> anyhow::Result<Identity> {
        Ok(self.verify(token)?)
    }
}
