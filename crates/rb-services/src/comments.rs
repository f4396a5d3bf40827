use std::sync::Arc;

use chrono::Utc;
use rb_core::{
    AppError, Author, Comment, CommentRepo, CommentWithAuthor, Identity, PostRepo, Result,
    UserRepo,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::current_user;

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepo>,
    posts: Arc<dyn PostRepo>,
    users: Arc<dyn UserRepo>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepo>,
        posts: Arc<dyn PostRepo>,
        users: Arc<dyn UserRepo>,
    ) -> Self {
        Self {
            comments,
            posts,
            users,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        Ok(self.comments.list_comments(post_id).await?)
    }

    #[instrument(skip(self, desc))]
    pub async fn add_comment(
        &self,
        identity: &Identity,
        post_id: Uuid,
        desc: &str,
    ) -> Result<CommentWithAuthor> {
        let desc = desc.trim();
        if desc.is_empty() {
            return Err(AppError::ValidationError("comment cannot be empty".into()));
        }

        let user = current_user(self.users.as_ref(), identity).await?;
        if self.posts.find_post_by_id(post_id).await?.is_none() {
            return Err(AppError::not_found("Post"));
        }

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::now_v7(),
            user_id: user.id,
            post_id,
            desc: desc.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.comments.create_comment(comment.clone()).await?;
        info!(comment_id = %comment.id, %post_id, "comment added");

        Ok(CommentWithAuthor {
            comment,
            author: Author::from(&user),
        })
    }

    /// Authors delete their own comments; admins delete any.
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, identity: &Identity, id: Uuid) -> Result<()> {
        let comment = self
            .comments
            .find_comment_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment"))?;

        if !identity.is_admin() {
            let user = current_user(self.users.as_ref(), identity).await?;
            if comment.user_id != user.id {
                return Err(AppError::Forbidden("You can delete only your comment!".into()));
            }
        }

        if !self.comments.delete_comment(id).await? {
            return Err(AppError::not_found("Comment"));
        }
        Ok(())
    }
}
