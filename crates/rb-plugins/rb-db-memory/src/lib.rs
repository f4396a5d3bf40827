//! # rb-db-memory
//!
//! In-process implementation of the repository ports, backed by `DashMap`s.
//! Used for local development without a database and by the HTTP tests.
//! Enforces the same uniqueness rules as the Postgres schema.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rb_core::{
    AppError, Author, Comment, CommentRepo, CommentWithAuthor, NewUser, PageRequest, Post,
    PostFilter, PostRepo, PostSort, PostWithAuthor, User, UserRepo,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredPost {
    /// Insertion counter; defines the natural order of the listing
    seq: u64,
    post: Post,
}

#[derive(Default)]
pub struct MemoryBlogRepo {
    users: DashMap<Uuid, User>,
    posts: DashMap<Uuid, StoredPost>,
    slugs: DashMap<String, Uuid>,
    comments: DashMap<Uuid, Comment>,
    saved: DashMap<Uuid, Vec<Uuid>>,
    seq: AtomicU64,
}

impl MemoryBlogRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn author_of(&self, user_id: Uuid) -> Option<Author> {
        self.users.get(&user_id).map(|u| Author::from(u.value()))
    }

    fn conflict(what: &str) -> anyhow::Error {
        AppError::Conflict(what.to_string()).into()
    }

    /// Rejects a profile whose unique fields belong to another user.
    fn check_unique(&self, user: &NewUser, except: Option<Uuid>) -> anyhow::Result<()> {
        for other in self.users.iter() {
            if Some(other.id) == except {
                continue;
            }
            if other.clerk_user_id == user.clerk_user_id {
                return Err(Self::conflict("clerk user id already registered"));
            }
            if other.username == user.username {
                return Err(Self::conflict("username already taken"));
            }
            if other.email == user.email {
                return Err(Self::conflict("email already registered"));
            }
        }
        Ok(())
    }

    fn remove_post(&self, id: Uuid) -> bool {
        let Some((_, stored)) = self.posts.remove(&id) else {
            return false;
        };
        self.slugs.remove(&stored.post.slug);
        self.comments.retain(|_, c| c.post_id != id);
        for mut saved in self.saved.iter_mut() {
            saved.retain(|p| *p != id);
        }
        true
    }
}

#[async_trait]
impl UserRepo for MemoryBlogRepo {
    async fn find_user_by_clerk_id(&self, clerk_user_id: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.clerk_user_id == clerk_user_id)
            .map(|u| u.value().clone()))
    }

    async fn create_user(&self, user: NewUser) -> anyhow::Result<User> {
        self.check_unique(&user, None)?;
        let now = Utc::now();
        let created = User {
            id: Uuid::now_v7(),
            clerk_user_id: user.clerk_user_id,
            username: user.username,
            email: user.email,
            img: user.img,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let Some(existing) = self.find_user_by_clerk_id(&user.clerk_user_id).await? else {
            return Ok(None);
        };
        self.check_unique(&user, Some(existing.id))?;

        let Some(mut stored) = self.users.get_mut(&existing.id) else {
            return Ok(None);
        };
        stored.username = user.username;
        stored.email = user.email;
        stored.img = user.img;
        stored.updated_at = Utc::now();
        Ok(Some(stored.value().clone()))
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        self.saved.remove(&id);
        Ok(self.users.remove(&id).is_some())
    }

    async fn saved_post_ids(&self, user_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        Ok(self
            .saved
            .get(&user_id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default())
    }

    async fn is_post_saved(&self, user_id: Uuid, post_id: Uuid) -> anyhow::Result<bool> {
        Ok(self
            .saved
            .get(&user_id)
            .is_some_and(|ids| ids.contains(&post_id)))
    }

    async fn save_post(&self, user_id: Uuid, post_id: Uuid) -> anyhow::Result<()> {
        let mut ids = self.saved.entry(user_id).or_default();
        if !ids.contains(&post_id) {
            ids.push(post_id);
        }
        Ok(())
    }

    async fn unsave_post(&self, user_id: Uuid, post_id: Uuid) -> anyhow::Result<()> {
        if let Some(mut ids) = self.saved.get_mut(&user_id) {
            ids.retain(|p| *p != post_id);
        }
        Ok(())
    }
}

#[async_trait]
impl PostRepo for MemoryBlogRepo {
    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> anyhow::Result<(Vec<PostWithAuthor>, u64)> {
        let mut matching: Vec<(u64, PostWithAuthor)> = self
            .posts
            .iter()
            .filter_map(|stored| {
                let author = self.author_of(stored.post.user_id)?;
                filter.matches(&stored.post, &author).then(|| {
                    let post = stored.post.clone();
                    (stored.seq, PostWithAuthor { post, author })
                })
            })
            .collect();

        match filter.sort {
            PostSort::Oldest => matching.sort_by_key(|(seq, _)| *seq),
            PostSort::Newest => matching.sort_by_key(|(seq, _)| std::cmp::Reverse(*seq)),
        }

        let total = matching.len() as u64;
        let posts = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|(_, p)| p)
            .collect();
        Ok((posts, total))
    }

    async fn find_post_by_slug(&self, slug: &str) -> anyhow::Result<Option<PostWithAuthor>> {
        let Some(id) = self.slugs.get(slug).map(|id| *id) else {
            return Ok(None);
        };
        let Some(post) = self.posts.get(&id).map(|s| s.post.clone()) else {
            return Ok(None);
        };
        Ok(self
            .author_of(post.user_id)
            .map(|author| PostWithAuthor { post, author }))
    }

    async fn find_post_by_id(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|s| s.post.clone()))
    }

    async fn slug_exists(&self, slug: &str) -> anyhow::Result<bool> {
        Ok(self.slugs.contains_key(slug))
    }

    async fn create_post(&self, post: Post) -> anyhow::Result<()> {
        if !self.users.contains_key(&post.user_id) {
            return Err(AppError::not_found("User").into());
        }
        match self.slugs.entry(post.slug.clone()) {
            Entry::Occupied(_) => return Err(Self::conflict("slug already taken")),
            Entry::Vacant(slot) => {
                slot.insert(post.id);
            }
        }
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.posts.insert(post.id, StoredPost { seq, post });
        Ok(())
    }

    async fn delete_post(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.remove_post(id))
    }

    async fn set_featured(&self, id: Uuid, featured: bool) -> anyhow::Result<Option<Post>> {
        Ok(self.posts.get_mut(&id).map(|mut stored| {
            stored.post.is_featured = featured;
            stored.post.updated_at = Utc::now();
            stored.post.clone()
        }))
    }

    async fn delete_posts_by_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let owned: Vec<Uuid> = self
            .posts
            .iter()
            .filter(|s| s.post.user_id == user_id)
            .map(|s| s.post.id)
            .collect();
        Ok(owned.into_iter().filter(|id| self.remove_post(*id)).count() as u64)
    }
}

#[async_trait]
impl CommentRepo for MemoryBlogRepo {
    async fn list_comments(&self, post_id: Uuid) -> anyhow::Result<Vec<CommentWithAuthor>> {
        let mut found: Vec<CommentWithAuthor> = self
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| {
                let author = self.author_of(c.user_id)?;
                Some(CommentWithAuthor {
                    comment: c.value().clone(),
                    author,
                })
            })
            .collect();
        found.sort_by(|a, b| {
            b.comment
                .created_at
                .cmp(&a.comment.created_at)
                .then_with(|| b.comment.id.cmp(&a.comment.id))
        });
        Ok(found)
    }

    async fn find_comment_by_id(&self, id: Uuid) -> anyhow::Result<Option<Comment>> {
        Ok(self.comments.get(&id).map(|c| c.value().clone()))
    }

    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()> {
        if !self.posts.contains_key(&comment.post_id) {
            return Err(AppError::not_found("Post").into());
        }
        self.comments.insert(comment.id, comment);
        Ok(())
    }

    async fn delete_comment(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.comments.remove(&id).is_some())
    }

    async fn delete_comments_by_user(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let before = self.comments.len();
        self.comments.retain(|_, c| c.user_id != user_id);
        Ok((before - self.comments.len()) as u64)
    }
}
