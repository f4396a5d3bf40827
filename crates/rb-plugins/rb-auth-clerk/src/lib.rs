//! # rb-auth-clerk
//!
//! Clerk-backed implementations of the identity ports: session token
//! verification (`IdentityVerifier`) and Svix webhook signature checks
//! (`WebhookVerifier`).

mod jwt;
mod webhook;

pub use jwt::ClerkJwtVerifier;
pub use webhook::SvixWebhookVerifier;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid verification key: {0}")]
    InvalidKey(String),

    #[error("invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("token issued for unauthorized party `{0}`")]
    UnauthorizedParty(String),

    #[error("malformed webhook headers: {0}")]
    MalformedHeaders(&'static str),

    #[error("webhook timestamp outside the tolerance window")]
    StaleTimestamp,

    #[error("no matching webhook signature")]
    NoMatchingSignature,
}
