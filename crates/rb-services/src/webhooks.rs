//! Synchronisation of local user records from identity provider webhooks.

use std::sync::Arc;

use rb_core::{
    AppError, CommentRepo, NewUser, PostRepo, Result, UserRepo, WebhookHeaders, WebhookVerifier,
};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// What a delivery changed, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    UserCreated(Uuid),
    UserUpdated(Uuid),
    UserDeleted { user_id: Uuid, posts: u64, comments: u64 },
    Ignored(String),
}

#[derive(Debug, Deserialize)]
struct ClerkEvent {
    #[serde(rename = "type")]
    kind: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ClerkUser {
    id: String,
    username: Option<String>,
    #[serde(default)]
    email_addresses: Vec<ClerkEmail>,
    primary_email_address_id: Option<String>,
    image_url: Option<String>,
    profile_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClerkEmail {
    id: Option<String>,
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct ClerkDeleted {
    id: Option<String>,
}

impl ClerkUser {
    fn primary_email(&self) -> Option<&str> {
        let primary = self.primary_email_address_id.as_deref();
        self.email_addresses
            .iter()
            .find(|e| primary.is_some() && e.id.as_deref() == primary)
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.as_str())
    }

    fn into_new_user(self) -> Result<NewUser> {
        let email = self
            .primary_email()
            .map(str::to_string)
            .ok_or_else(|| AppError::ValidationError("user has no email address".into()))?;
        let username = self
            .username
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| email.clone());

        Ok(NewUser {
            clerk_user_id: self.id,
            username,
            email,
            img: self.image_url.or(self.profile_image_url),
        })
    }
}

#[derive(Clone)]
pub struct WebhookService {
    verifier: Arc<dyn WebhookVerifier>,
    users: Arc<dyn UserRepo>,
    posts: Arc<dyn PostRepo>,
    comments: Arc<dyn CommentRepo>,
}

impl WebhookService {
    pub fn new(
        verifier: Arc<dyn WebhookVerifier>,
        users: Arc<dyn UserRepo>,
        posts: Arc<dyn PostRepo>,
        comments: Arc<dyn CommentRepo>,
    ) -> Self {
        Self {
            verifier,
            users,
            posts,
            comments,
        }
    }

    /// Verifies and applies one delivery. Nothing is written unless the
    /// signature checks out.
    #[instrument(skip_all, fields(delivery = %headers.id))]
    pub async fn handle_clerk_delivery(
        &self,
        headers: &WebhookHeaders,
        payload: &[u8],
    ) -> Result<WebhookOutcome> {
        if let Err(err) = self.verifier.verify_webhook(headers, payload) {
            warn!(error = %err, "webhook signature rejected");
            return Err(AppError::ValidationError("Webhook verification failed!".into()));
        }

        let event: ClerkEvent = serde_json::from_slice(payload)
            .map_err(|e| AppError::ValidationError(format!("malformed webhook payload: {e}")))?;
        debug!(kind = %event.kind, "webhook verified");

        let outcome = match event.kind.as_str() {
            "user.created" => self.user_created(parse(event.data)?).await?,
            "user.updated" => self.user_updated(parse(event.data)?).await?,
            "user.deleted" => self.user_deleted(parse(event.data)?).await?,
            other => WebhookOutcome::Ignored(other.to_string()),
        };
        info!(?outcome, "webhook applied");
        Ok(outcome)
    }

    async fn user_created(&self, data: ClerkUser) -> Result<WebhookOutcome> {
        // Deliveries are retried by the sender; a replay must not fail.
        if let Some(existing) = self.users.find_user_by_clerk_id(&data.id).await? {
            return Ok(WebhookOutcome::UserCreated(existing.id));
        }
        let user = self.users.create_user(data.into_new_user()?).await?;
        Ok(WebhookOutcome::UserCreated(user.id))
    }

    async fn user_updated(&self, data: ClerkUser) -> Result<WebhookOutcome> {
        let profile = data.into_new_user()?;
        match self.users.update_user(profile.clone()).await? {
            Some(user) => Ok(WebhookOutcome::UserUpdated(user.id)),
            None => {
                let user = self.users.create_user(profile).await?;
                Ok(WebhookOutcome::UserCreated(user.id))
            }
        }
    }

    /// Removes the user together with everything they wrote.
    async fn user_deleted(&self, data: ClerkDeleted) -> Result<WebhookOutcome> {
        let Some(clerk_id) = data.id else {
            return Ok(WebhookOutcome::Ignored("user.deleted without id".into()));
        };
        let Some(user) = self.users.find_user_by_clerk_id(&clerk_id).await? else {
            return Ok(WebhookOutcome::Ignored(format!("unknown user {clerk_id}")));
        };

        let comments = self.comments.delete_comments_by_user(user.id).await?;
        let posts = self.posts.delete_posts_by_user(user.id).await?;
        self.users.delete_user(user.id).await?;

        Ok(WebhookOutcome::UserDeleted {
            user_id: user.id,
            posts,
            comments,
        })
    }
}

fn parse<T: serde::de::DeserializeOwned>(data: serde_json::Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| AppError::ValidationError(format!("malformed webhook payload: {e}")))
}
