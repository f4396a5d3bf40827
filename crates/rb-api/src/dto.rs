//! Wire format of the REST API.
//!
//! Keys are camelCase, ids are `_id`, and the owner of a post is `user`:
//! populated with the public profile where the client renders it, a bare id
//! otherwise.

use chrono::{DateTime, Utc};
use rb_core::{
    AppError, Author, Category, CommentWithAuthor, Post, PostDraft, PostFilter, PostPage,
    PostSort, PostWithAuthor, UploadAuth,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct AuthorDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub img: Option<String>,
}

impl From<Author> for AuthorDto {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            username: author.username,
            img: author.img,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Owner {
    Populated(AuthorDto),
    Id(Uuid),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user: Owner,
    pub title: String,
    pub slug: String,
    pub desc: Option<String>,
    pub category: Category,
    pub content: String,
    pub img: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostDto {
    fn new(post: Post, user: Owner) -> Self {
        Self {
            id: post.id,
            user,
            title: post.title,
            slug: post.slug,
            desc: post.desc,
            category: post.category,
            content: post.content,
            img: post.img,
            is_featured: post.is_featured,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

impl From<PostWithAuthor> for PostDto {
    fn from(value: PostWithAuthor) -> Self {
        PostDto::new(value.post, Owner::Populated(value.author.into()))
    }
}

impl From<Post> for PostDto {
    fn from(post: Post) -> Self {
        let owner = Owner::Id(post.user_id);
        PostDto::new(post, owner)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListDto {
    pub posts: Vec<PostDto>,
    pub has_more: bool,
}

impl From<PostPage> for PostListDto {
    fn from(page: PostPage) -> Self {
        Self {
            posts: page.posts.into_iter().map(PostDto::from).collect(),
            has_more: page.has_more,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user: AuthorDto,
    pub post: Uuid,
    pub desc: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CommentWithAuthor> for CommentDto {
    fn from(value: CommentWithAuthor) -> Self {
        let CommentWithAuthor { comment, author } = value;
        Self {
            id: comment.id,
            user: author.into(),
            post: comment.post_id,
            desc: comment.desc,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAuthDto {
    pub token: String,
    pub expire: i64,
    pub signature: String,
    pub public_key: String,
    pub url_endpoint: String,
}

impl From<UploadAuth> for UploadAuthDto {
    fn from(auth: UploadAuth) -> Self {
        Self {
            token: auth.token,
            expire: auth.expire,
            signature: auth.signature,
            public_key: auth.public_key,
            url_endpoint: auth.url_endpoint,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageDto {
    pub message: &'static str,
}

/// Query string of `GET /posts`. Numbers are parsed leniently.
#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub cat: Option<String>,
    pub author: Option<String>,
    pub search: Option<String>,
    pub featured: Option<String>,
    pub sort: Option<String>,
}

impl ListPostsQuery {
    pub fn filter(&self) -> Result<PostFilter, AppError> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        let category = present(&self.cat).map(|c| c.parse::<Category>()).transpose()?;
        let sort = match present(&self.sort).as_deref() {
            Some("newest") => PostSort::Newest,
            _ => PostSort::Oldest,
        };

        Ok(PostFilter {
            category,
            author: present(&self.author),
            search: present(&self.search),
            featured_only: present(&self.featured).is_some(),
            sort,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(max = 200, message = "title is too long"))]
    pub title: String,
    #[validate(length(max = 1000, message = "description is too long"))]
    pub desc: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub content: String,
    pub img: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

impl CreatePostRequest {
    pub fn into_draft(self) -> Result<PostDraft, AppError> {
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => Category::default(),
            Some(raw) => raw.parse()?,
        };
        Ok(PostDraft {
            title: self.title,
            desc: self.desc,
            category,
            content: self.content,
            img: self.img,
            is_featured: self.is_featured,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(max = 2000, message = "comment is too long"))]
    pub desc: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostIdRequest {
    pub post_id: Uuid,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn post() -> Post {
        Post {
            id: Uuid::nil(),
            user_id: Uuid::from_u128(7),
            title: "Hello".into(),
            slug: "hello".into(),
            desc: None,
            category: Category::WebDesign,
            content: String::new(),
            img: None,
            is_featured: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn post_wire_shape() {
        let value = serde_json::to_value(PostDto::from(PostWithAuthor {
            post: post(),
            author: Author {
                id: Uuid::from_u128(7),
                username: "ann".into(),
                img: None,
            },
        }))
        .unwrap();

        assert_eq!(value["_id"], json!(Uuid::nil()));
        assert_eq!(value["user"]["username"], "ann");
        assert_eq!(value["category"], "web-design");
        assert_eq!(value["isFeatured"], true);
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn unpopulated_owner_is_an_id() {
        let value = serde_json::to_value(PostDto::from(post())).unwrap();
        assert_eq!(value["user"], json!(Uuid::from_u128(7)));
    }

    #[test]
    fn list_query_maps_to_filter() {
        let query = ListPostsQuery {
            cat: Some("seo".into()),
            featured: Some("true".into()),
            sort: Some("newest".into()),
            search: Some("  ".into()),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.category, Some(Category::Seo));
        assert!(filter.featured_only);
        assert_eq!(filter.sort, PostSort::Newest);
        assert_eq!(filter.search, None);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let query = ListPostsQuery {
            cat: Some("cooking".into()),
            ..Default::default()
        };
        assert!(matches!(query.filter(), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn create_request_defaults() {
        let req: CreatePostRequest = serde_json::from_value(json!({ "title": "T" })).unwrap();
        let draft = req.into_draft().unwrap();
        assert_eq!(draft.category, Category::General);
        assert!(!draft.is_featured);
    }

    #[test]
    fn length_limits() {
        let at_limit: CreatePostRequest =
            serde_json::from_value(json!({ "title": "t".repeat(200), "desc": "d".repeat(1000) }))
                .unwrap();
        assert!(at_limit.validate().is_ok());

        let long_title: CreatePostRequest =
            serde_json::from_value(json!({ "title": "t".repeat(201) })).unwrap();
        assert!(long_title.validate().is_err());

        let long_desc: CreatePostRequest =
            serde_json::from_value(json!({ "title": "T", "desc": "d".repeat(1001) })).unwrap();
        assert!(long_desc.validate().is_err());

        let comment = CreateCommentRequest { desc: "c".repeat(2001) };
        assert!(comment.validate().is_err());
        let comment = CreateCommentRequest { desc: "c".repeat(2000) };
        assert!(comment.validate().is_ok());
    }
}
