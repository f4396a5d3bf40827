//! Publishing, listing and moderation of posts.

use std::sync::Arc;

use chrono::Utc;
use rb_core::slug;
use rb_core::{
    AppError, Author, Identity, PageRequest, Post, PostDraft, PostFilter, PostPage, PostRepo,
    PostWithAuthor, Result, UploadAuth, MediaSigner, UserRepo,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{current_user, non_blank};

/// Inserts that lose a slug race are retried with a fresh scan this many times in total.
const MAX_CREATE_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepo>,
    users: Arc<dyn UserRepo>,
    media: Arc<dyn MediaSigner>,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepo>, users: Arc<dyn UserRepo>, media: Arc<dyn MediaSigner>) -> Self {
        Self { posts, users, media }
    }

    #[instrument(skip(self))]
    pub async fn list_posts(&self, filter: PostFilter, page: PageRequest) -> Result<PostPage> {
        let (posts, total) = self.posts.list_posts(&filter, page).await?;
        Ok(PostPage {
            has_more: page.has_more(total),
            posts,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_post(&self, slug: &str) -> Result<PostWithAuthor> {
        self.posts
            .find_post_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))
    }

    /// Publishes a post under a slug no other post uses.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_post(&self, identity: &Identity, draft: PostDraft) -> Result<PostWithAuthor> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::ValidationError("title is required".into()));
        }

        let user = current_user(self.users.as_ref(), identity).await?;
        let base = slug::slugify(&title);
        let desc = non_blank(draft.desc);
        let img = non_blank(draft.img);
        let is_featured = draft.is_featured && identity.is_admin();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let now = Utc::now();
            let post = Post {
                id: Uuid::now_v7(),
                user_id: user.id,
                title: title.clone(),
                slug: self.unique_slug(&base).await?,
                desc: desc.clone(),
                category: draft.category,
                content: draft.content.clone(),
                img: img.clone(),
                is_featured,
                created_at: now,
                updated_at: now,
            };

            match self.posts.create_post(post.clone()).await.map_err(AppError::from) {
                Ok(()) => {
                    info!(post_id = %post.id, slug = %post.slug, "post created");
                    return Ok(PostWithAuthor {
                        post,
                        author: Author::from(&user),
                    });
                }
                Err(AppError::Conflict(reason)) if attempt < MAX_CREATE_ATTEMPTS => {
                    warn!(slug = %post.slug, %reason, attempt, "slug taken concurrently, rescanning");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Linear scan over `base`, `base-2`, `base-3`, ...
    async fn unique_slug(&self, base: &str) -> Result<String> {
        let mut n = 1;
        loop {
            let candidate = slug::candidate(base, n);
            n += 1;
            if slug::is_reserved(&candidate) {
                continue;
            }
            if !self.posts.slug_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
    }

    /// Owners delete their own posts; admins delete any.
    #[instrument(skip(self))]
    pub async fn delete_post(&self, identity: &Identity, id: Uuid) -> Result<()> {
        let post = self
            .posts
            .find_post_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        if !identity.is_admin() {
            let user = current_user(self.users.as_ref(), identity).await?;
            if post.user_id != user.id {
                return Err(AppError::Forbidden("You can delete only your posts!".into()));
            }
        }

        if !self.posts.delete_post(id).await? {
            return Err(AppError::not_found("Post"));
        }
        info!(post_id = %id, "post deleted");
        Ok(())
    }

    /// Flips the featured flag. Admins only.
    #[instrument(skip(self))]
    pub async fn toggle_featured(&self, identity: &Identity, id: Uuid) -> Result<Post> {
        if !identity.is_admin() {
            return Err(AppError::Forbidden("You cannot feature posts!".into()));
        }

        let post = self
            .posts
            .find_post_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))?;

        self.posts
            .set_featured(id, !post.is_featured)
            .await?
            .ok_or_else(|| AppError::not_found("Post"))
    }

    /// Credentials for a direct upload of a cover or inline image.
    pub fn upload_auth(&self) -> Result<UploadAuth> {
        Ok(self.media.upload_auth()?)
    }
}
