pub mod comments;
pub mod posts;
pub mod users;
pub mod webhooks;
