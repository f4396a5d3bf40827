//! # rb-services
//!
//! Use cases of Rusty-Blog. Handlers call these; these call the ports.
//! Ownership and admin checks live here and nowhere else.

pub mod comments;
pub mod posts;
pub mod users;
pub mod webhooks;

pub use comments::CommentService;
pub use posts::PostService;
pub use users::{SaveOutcome, UserService};
pub use webhooks::{WebhookOutcome, WebhookService};

use rb_core::{AppError, Identity, Result, User, UserRepo};

/// Resolves the caller's local user record. Users appear through the
/// identity provider's webhook, so a verified token may precede the record.
pub(crate) async fn current_user(users: &dyn UserRepo, identity: &Identity) -> Result<User> {
    users
        .find_user_by_clerk_id(&identity.clerk_user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

/// Trims the value and drops it when nothing is left.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use rb_core::{Category, Comment, Identity, Post, Role, User};
    use uuid::Uuid;

    pub fn user(clerk_id: &str, username: &str) -> User {
        User {
            id: Uuid::now_v7(),
            clerk_user_id: clerk_id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            img: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn identity(clerk_id: &str) -> Identity {
        Identity {
            clerk_user_id: clerk_id.to_string(),
            role: Role::User,
        }
    }

    pub fn admin(clerk_id: &str) -> Identity {
        Identity {
            clerk_user_id: clerk_id.to_string(),
            role: Role::Admin,
        }
    }

    pub fn post_by(owner: &User, title: &str) -> Post {
        Post {
            id: Uuid::now_v7(),
            user_id: owner.id,
            title: title.to_string(),
            slug: rb_core::slug::slugify(title),
            desc: None,
            category: Category::General,
            content: String::new(),
            img: None,
            is_featured: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn comment_by(owner: &User, post: &Post, desc: &str) -> Comment {
        Comment {
            id: Uuid::now_v7(),
            user_id: owner.id,
            post_id: post.id,
            desc: desc.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
