//! # rb-db-postgres Implementation
//!
//! This module implements the data mapping between the Postgres relational model
//! and the `rb-core` domain models.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rb_core::{
    AppError, Author, Category, Comment, CommentRepo, CommentWithAuthor, NewUser, PageRequest,
    Post, PostFilter, PostRepo, PostSort, PostWithAuthor, User, UserRepo,
};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

/// Schema migrations embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const USER_COLUMNS: &str = "id, clerk_user_id, username, email, img, created_at, updated_at";

const POST_COLUMNS: &str = "id, user_id, title, slug, description, category, content, img, \
     is_featured, created_at, updated_at";

const POST_WITH_AUTHOR: &str = "SELECT p.id, p.user_id, p.title, p.slug, p.description, \
     p.category, p.content, p.img, p.is_featured, p.created_at, p.updated_at, \
     u.username AS author_username, u.img AS author_img \
     FROM posts p JOIN users u ON u.id = p.user_id";

pub struct PgBlogRepo {
    pool: PgPool,
}

impl PgBlogRepo {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .context("failed to connect to postgres")?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .context("failed to run migrations")
    }
}

fn user_from_row(row: &PgRow) -> anyhow::Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        clerk_user_id: row.try_get("clerk_user_id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        img: row.try_get("img")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn post_from_row(row: &PgRow) -> anyhow::Result<Post> {
    let category: String = row.try_get("category")?;
    Ok(Post {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        desc: row.try_get("description")?,
        category: category.parse::<Category>()?,
        content: row.try_get("content")?,
        img: row.try_get("img")?,
        is_featured: row.try_get("is_featured")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn post_with_author_from_row(row: &PgRow) -> anyhow::Result<PostWithAuthor> {
    let post = post_from_row(row)?;
    let author = Author {
        id: post.user_id,
        username: row.try_get("author_username")?,
        img: row.try_get("author_img")?,
    };
    Ok(PostWithAuthor { post, author })
}

fn comment_with_author_from_row(row: &PgRow) -> anyhow::Result<CommentWithAuthor> {
    let comment = Comment {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        post_id: row.try_get("post_id")?,
        desc: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    };
    let author = Author {
        id: comment.user_id,
        username: row.try_get("author_username")?,
        img: row.try_get("author_img")?,
    };
    Ok(CommentWithAuthor { comment, author })
}

/// Turns constraint violations into domain errors the services understand.
fn map_write_error(err: sqlx::Error) -> anyhow::Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or("unique").to_string();
            return AppError::Conflict(constraint).into();
        }
        if db.is_foreign_key_violation() {
            return AppError::not_found("Referenced record").into();
        }
    }
    anyhow::Error::from(err)
}

/// Escapes `LIKE` wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_post_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    qb.push(" WHERE TRUE");
    if let Some(category) = filter.category {
        qb.push(" AND p.category = ").push_bind(category.as_str());
    }
    if let Some(author) = &filter.author {
        qb.push(" AND u.username = ").push_bind(author.clone());
    }
    if let Some(search) = &filter.search {
        qb.push(" AND p.title ILIKE ")
            .push_bind(format!("%{}%", escape_like(search)));
    }
    if filter.featured_only {
        qb.push(" AND p.is_featured");
    }
}

#[async_trait]
impl UserRepo for PgBlogRepo {
    async fn find_user_by_clerk_id(&self, clerk_user_id: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE clerk_user_id = $1"
        ))
        .bind(clerk_user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, user), fields(clerk_user_id = %user.clerk_user_id))]
    async fn create_user(&self, user: NewUser) -> anyhow::Result<User> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (id, clerk_user_id, username, email, img) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(&user.clerk_user_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.img)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        user_from_row(&row)
    }

    async fn update_user(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(&format!(
            "UPDATE users SET username = $2, email = $3, img = $4, updated_at = NOW() \
             WHERE clerk_user_id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.clerk_user_id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.img)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn saved_post_ids(&self, user_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar(
            "SELECT post_id FROM saved_posts WHERE user_id = $1 ORDER BY saved_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn is_post_saved(&self, user_id: Uuid, post_id: Uuid) -> anyhow::Result<bool> {
        let saved = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM saved_posts WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn save_post(&self, user_id: Uuid, post_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO saved_posts (user_id, post_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn unsave_post(&self, user_id: Uuid, post_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM saved_posts WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PostRepo for PgBlogRepo {
    #[instrument(skip(self))]
    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<PostWithAuthor>, u64)> {
        let mut count =
            QueryBuilder::new("SELECT COUNT(*) FROM posts p JOIN users u ON u.id = p.user_id");
        push_post_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::new(POST_WITH_AUTHOR);
        push_post_filters(&mut query, filter);
        query.push(match filter.sort {
            PostSort::Oldest => " ORDER BY p.created_at ASC, p.id ASC",
            PostSort::Newest => " ORDER BY p.created_at DESC, p.id DESC",
        });
        query
            .push(" LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let posts = query
            .build()
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(post_with_author_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok((posts, total.max(0) as u64))
    }

    async fn find_post_by_slug(&self, slug: &str) -> anyhow::Result<Option<PostWithAuthor>> {
        let row = sqlx::query(&format!("{POST_WITH_AUTHOR} WHERE p.slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(post_with_author_from_row).transpose()
    }

    async fn find_post_by_id(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(post_from_row).transpose()
    }

    async fn slug_exists(&self, slug: &str) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    #[instrument(skip(self, post), fields(slug = %post.slug))]
    async fn create_post(&self, post: Post) -> anyhow::Result<()> {
        sqlx::query(&format!(
            "INSERT INTO posts ({POST_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(post.id)
        .bind(post.user_id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.desc)
        .bind(post.category.as_str())
        .bind(&post.content)
        .bind(&post.img)
        .bind(post.is_featured)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn delete_post(&self, id: Uuid) -> anyhow::Result<bool> {
        // comments and saved entries go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_featured(&self, id: Uuid, featured: bool) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "UPDATE posts SET is_featured = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(featured)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(post_from_row).transpose()
    }

    async fn delete_posts_by_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM posts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CommentRepo for PgBlogRepo {
    async fn list_comments(&self, post_id: Uuid) -> anyhow::Result<Vec<CommentWithAuthor>> {
        sqlx::query(
            "SELECT c.id, c.user_id, c.post_id, c.description, c.created_at, c.updated_at, \
             u.username AS author_username, u.img AS author_img \
             FROM comments c JOIN users u ON u.id = c.user_id \
             WHERE c.post_id = $1 ORDER BY c.created_at DESC, c.id DESC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(comment_with_author_from_row)
        .collect()
    }

    async fn find_comment_by_id(&self, id: Uuid) -> anyhow::Result<Option<Comment>> {
        let row = sqlx::query(
            "SELECT id, user_id, post_id, description, created_at, updated_at \
             FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Comment {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            post_id: row.try_get("post_id")?,
            desc: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO comments (id, user_id, post_id, description, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(comment.id)
        .bind(comment.user_id)
        .bind(comment.post_id)
        .bind(&comment.desc)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    async fn delete_comment(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_comments_by_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM comments WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            clerk_user_id: format!("user_{name}"),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            img: None,
        }
    }

    fn post(owner: &User, slug: &str) -> Post {
        Post {
            id: Uuid::now_v7(),
            user_id: owner.id,
            title: slug.to_string(),
            slug: slug.to_string(),
            desc: Some("d".into()),
            category: Category::Databases,
            content: "<p>hi</p>".into(),
            img: None,
            is_featured: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn slug_conflict_maps_to_domain_error(pool: PgPool) -> anyhow::Result<()> {
        let repo = PgBlogRepo::from_pool(pool);
        let ann = repo.create_user(new_user("ann")).await?;
        repo.create_post(post(&ann, "same")).await?;

        let err = repo.create_post(post(&ann, "same")).await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
        Ok(())
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn filters_and_pages_posts(pool: PgPool) -> anyhow::Result<()> {
        let repo = PgBlogRepo::from_pool(pool);
        let ann = repo.create_user(new_user("ann")).await?;
        let bob = repo.create_user(new_user("bob")).await?;
        repo.create_post(post(&ann, "ann-one")).await?;
        repo.create_post(post(&bob, "bob-one")).await?;
        repo.create_post(post(&ann, "ann-two")).await?;

        let filter = PostFilter {
            author: Some("ann".into()),
            ..PostFilter::default()
        };
        let (page, total) = repo.list_posts(&filter, PageRequest::new(Some(1), Some(1))).await?;
        assert_eq!(total, 2);
        assert_eq!(page[0].post.slug, "ann-one");
        assert_eq!(page[0].author.username, "ann");
        Ok(())
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    #[ignore = "requires DATABASE_URL pointing at a Postgres server"]
    async fn deleting_user_cascades(pool: PgPool) -> anyhow::Result<()> {
        let repo = PgBlogRepo::from_pool(pool);
        let ann = repo.create_user(new_user("ann")).await?;
        let p = post(&ann, "gone");
        let post_id = p.id;
        repo.create_post(p).await?;
        repo.save_post(ann.id, post_id).await?;

        assert!(repo.delete_user(ann.id).await?);
        assert!(repo.find_post_by_id(post_id).await?.is_none());
        Ok(())
    }
}
