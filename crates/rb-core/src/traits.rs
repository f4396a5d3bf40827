//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! Repositories return `anyhow::Result`; an adapter that needs the caller to
//! see a specific failure (e.g. a slug conflict) wraps an [`AppError`] in it.
//!
//! [`AppError`]: crate::error::AppError

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Comment, CommentWithAuthor, Identity, NewUser, Post, PostFilter, PostWithAuthor, UploadAuth,
    User, WebhookHeaders,
};
use crate::pagination::PageRequest;

/// Persistence contract for users and their saved posts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_user_by_clerk_id(&self, clerk_user_id: &str) -> anyhow::Result<Option<User>>;
    async fn create_user(&self, user: NewUser) -> anyhow::Result<User>;
    /// Overwrites the profile fields of the user with the same `clerk_user_id`.
    async fn update_user(&self, user: NewUser) -> anyhow::Result<Option<User>>;
    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn saved_post_ids(&self, user_id: Uuid) -> anyhow::Result<Vec<Uuid>>;
    async fn is_post_saved(&self, user_id: Uuid, post_id: Uuid) -> anyhow::Result<bool>;
    async fn save_post(&self, user_id: Uuid, post_id: Uuid) -> anyhow::Result<()>;
    async fn unsave_post(&self, user_id: Uuid, post_id: Uuid) -> anyhow::Result<()>;
}

/// Persistence contract for posts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepo: Send + Sync {
    /// Returns one page of matching posts plus the total number of matches.
    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<PostWithAuthor>, u64)>;
    async fn find_post_by_slug(&self, slug: &str) -> anyhow::Result<Option<PostWithAuthor>>;
    async fn find_post_by_id(&self, id: Uuid) -> anyhow::Result<Option<Post>>;
    async fn slug_exists(&self, slug: &str) -> anyhow::Result<bool>;
    /// Fails with `AppError::Conflict` when the slug is already stored.
    async fn create_post(&self, post: Post) -> anyhow::Result<()>;
    /// Also drops the post's comments and saved entries.
    async fn delete_post(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn set_featured(&self, id: Uuid, featured: bool) -> anyhow::Result<Option<Post>>;
    async fn delete_posts_by_user(&self, user_id: Uuid) -> anyhow::Result<u64>;
}

/// Persistence contract for comments.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepo: Send + Sync {
    /// Newest first.
    async fn list_comments(&self, post_id: Uuid) -> anyhow::Result<Vec<CommentWithAuthor>>;
    async fn find_comment_by_id(&self, id: Uuid) -> anyhow::Result<Option<Comment>>;
    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()>;
    async fn delete_comment(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn delete_comments_by_user(&self, user_id: Uuid) -> anyhow::Result<u64>;
}

/// Verifies bearer tokens issued by the identity provider.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdentityVerifier: Send + Sync {
    fn verify_token(&self, token: &str) -> anyhow::Result<Identity>;
}

/// Verifies that a webhook delivery was signed by the identity provider.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait WebhookVerifier: Send + Sync {
    fn verify_webhook(&self, headers: &WebhookHeaders, payload: &[u8]) -> anyhow::Result<()>;
}

/// Issues short-lived credentials for direct browser uploads to the media CDN.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait MediaSigner: Send + Sync {
    fn upload_auth(&self) -> anyhow::Result<UploadAuth>;
}
