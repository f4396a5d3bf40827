use std::sync::Arc;

use rb_core::IdentityVerifier;
use rb_services::{CommentService, PostService, UserService, WebhookService};

/// Everything a handler can reach. Cloned per request; all fields are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub comments: CommentService,
    pub users: UserService,
    pub webhooks: WebhookService,
    pub identity: Arc<dyn IdentityVerifier>,
    /// Include the real message and a `stack` field in error bodies.
    pub expose_errors: bool,
}
