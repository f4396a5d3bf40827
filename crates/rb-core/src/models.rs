//! # Domain Models
//!
//! These structs represent the core entities of Rusty-Blog.
//! We use UUID v7 for time-ordered, globally unique identification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// A registered author or reader, mirrored from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// The identity provider's user id (the `sub` claim of session tokens)
    pub clerk_user_id: String,
    pub username: String,
    pub email: String,
    /// Avatar URL hosted by the identity provider
    pub img: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields received from the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub clerk_user_id: String,
    pub username: String,
    pub email: String,
    pub img: Option<String>,
}

/// Fixed set of post categories offered by the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[default]
    General,
    WebDesign,
    Development,
    Databases,
    Seo,
    Marketing,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::General,
        Category::WebDesign,
        Category::Development,
        Category::Databases,
        Category::Seo,
        Category::Marketing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::WebDesign => "web-design",
            Category::Development => "development",
            Category::Databases => "databases",
            Category::Seo => "seo",
            Category::Marketing => "marketing",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::ValidationError(format!("unknown category `{s}`")))
    }
}

/// A published article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    /// Owner of the post
    pub user_id: Uuid,
    pub title: String,
    /// Unique, URL-safe identifier derived from the title
    pub slug: String,
    pub desc: Option<String>,
    pub category: Category,
    /// Rich-text (HTML) body produced by the editor
    pub content: String,
    /// Cover image URL on the media CDN
    pub img: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What an author submits; the slug and owner are decided by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub desc: Option<String>,
    pub category: Category,
    pub content: String,
    pub img: Option<String>,
    pub is_featured: bool,
}

/// The public part of a user shown next to posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
    pub img: Option<String>,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            img: user.img.clone(),
        }
    }
}

/// A post joined with its owner's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author: Author,
}

/// A reader's reply under a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub desc: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    pub comment: Comment,
    pub author: Author,
}

/// Order of the post listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    /// Insertion order
    #[default]
    Oldest,
    Newest,
}

/// Optional narrowing of the post listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub category: Option<Category>,
    /// Username of the owner
    pub author: Option<String>,
    /// Case-insensitive substring of the title
    pub search: Option<String>,
    pub featured_only: bool,
    pub sort: PostSort,
}

impl PostFilter {
    /// Applies the filter to a single post. Used by stores that cannot
    /// express the filter in a query language.
    pub fn matches(&self, post: &Post, author: &Author) -> bool {
        if let Some(category) = self.category {
            if post.category != category {
                return false;
            }
        }
        if let Some(username) = &self.author {
            if &author.username != username {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            if !post.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        !self.featured_only || post.is_featured
    }
}

/// One page of the post listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<PostWithAuthor>,
    pub has_more: bool,
}

/// The verified caller of a request, as asserted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub clerk_user_id: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Signature headers attached to an identity provider webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub id: String,
    pub timestamp: String,
    pub signature: String,
}

/// Credentials that let a browser upload straight to the media CDN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAuth {
    pub token: String,
    /// Unix timestamp (seconds) after which the signature is rejected
    pub expire: i64,
    pub signature: String,
    pub public_key: String,
    pub url_endpoint: String,
}
