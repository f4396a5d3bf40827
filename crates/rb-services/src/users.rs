use std::sync::Arc;

use rb_core::{AppError, Identity, PostRepo, Result, UserRepo};
use tracing::instrument;
use uuid::Uuid;

use crate::current_user;

/// Result of toggling a post in the caller's saved list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Unsaved,
}

impl SaveOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SaveOutcome::Saved => "Post saved",
            SaveOutcome::Unsaved => "Post unsaved",
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepo>,
    posts: Arc<dyn PostRepo>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepo>, posts: Arc<dyn PostRepo>) -> Self {
        Self { users, posts }
    }

    #[instrument(skip(self))]
    pub async fn saved_posts(&self, identity: &Identity) -> Result<Vec<Uuid>> {
        let user = current_user(self.users.as_ref(), identity).await?;
        Ok(self.users.saved_post_ids(user.id).await?)
    }

    #[instrument(skip(self))]
    pub async fn toggle_saved(&self, identity: &Identity, post_id: Uuid) -> Result<SaveOutcome> {
        let user = current_user(self.users.as_ref(), identity).await?;
        if self.posts.find_post_by_id(post_id).await?.is_none() {
            return Err(AppError::not_found("Post"));
        }

        if self.users.is_post_saved(user.id, post_id).await? {
            self.users.unsave_post(user.id, post_id).await?;
            Ok(SaveOutcome::Unsaved)
        } else {
            self.users.save_post(user.id, post_id).await?;
            Ok(SaveOutcome::Saved)
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use rb_core::{MockPostRepo, MockUserRepo};

    use super::*;
    use crate::fixtures::{identity, post_by, user};

    #[tokio::test]
    async fn toggling_saves_then_unsaves() {
        let ann = user("user_1", "ann");
        let post = post_by(&ann, "Keep");
        let (user_id, post_id) = (ann.id, post.id);

        let mut users = MockUserRepo::new();
        users
            .expect_find_user_by_clerk_id()
            .returning(move |_| Ok(Some(ann.clone())));
        users
            .expect_is_post_saved()
            .with(eq(user_id), eq(post_id))
            .times(1)
            .returning(|_, _| Ok(false));
        users
            .expect_save_post()
            .with(eq(user_id), eq(post_id))
            .times(1)
            .returning(|_, _| Ok(()));
        let mut posts = MockPostRepo::new();
        posts
            .expect_find_post_by_id()
            .returning(move |_| Ok(Some(post.clone())));

        let svc = UserService::new(Arc::new(users), Arc::new(posts));
        let outcome = svc.toggle_saved(&identity("user_1"), post_id).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(outcome.message(), "Post saved");
    }

    #[tokio::test]
    async fn already_saved_post_is_unsaved() {
        let ann = user("user_1", "ann");
        let post = post_by(&ann, "Keep");
        let post_id = post.id;

        let mut users = MockUserRepo::new();
        users
            .expect_find_user_by_clerk_id()
            .returning(move |_| Ok(Some(ann.clone())));
        users.expect_is_post_saved().returning(|_, _| Ok(true));
        users.expect_save_post().never();
        users.expect_unsave_post().times(1).returning(|_, _| Ok(()));
        let mut posts = MockPostRepo::new();
        posts
            .expect_find_post_by_id()
            .returning(move |_| Ok(Some(post.clone())));

        let svc = UserService::new(Arc::new(users), Arc::new(posts));
        let outcome = svc.toggle_saved(&identity("user_1"), post_id).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Unsaved);
    }

    #[tokio::test]
    async fn saving_a_missing_post_is_not_found() {
        let ann = user("user_1", "ann");
        let mut users = MockUserRepo::new();
        users
            .expect_find_user_by_clerk_id()
            .returning(move |_| Ok(Some(ann.clone())));
        let mut posts = MockPostRepo::new();
        posts.expect_find_post_by_id().returning(|_| Ok(None));

        let svc = UserService::new(Arc::new(users), Arc::new(posts));
        let err = svc
            .toggle_saved(&identity("user_1"), Uuid::now_v7())
            .await
            .unwrap_err();
        assert_eq!(err, AppError::not_found("Post"));
    }
}
