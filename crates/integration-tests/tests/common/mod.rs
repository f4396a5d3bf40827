#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use rb_api::AppState;
use rb_auth_clerk::{ClerkJwtVerifier, SvixWebhookVerifier};
use rb_core::{NewUser, User, UserRepo};
use rb_db_memory::MemoryBlogRepo;
use rb_media_imagekit::ImageKitSigner;
use rb_services::{CommentService, PostService, UserService, WebhookService};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-session-secret";
pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";
pub const IK_PRIVATE_KEY: &str = "private_key_test";

pub struct Options {
    pub expose_errors: bool,
    pub media_configured: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            expose_errors: true,
            media_configured: true,
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryBlogRepo>,
    signer: SvixWebhookVerifier,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(Options::default())
}

pub fn spawn_app_with(options: Options) -> TestApp {
    let repo = Arc::new(MemoryBlogRepo::new());
    let media = if options.media_configured {
        ImageKitSigner::new(
            Some("public_key_test".into()),
            Some(IK_PRIVATE_KEY.into()),
            Some("https://ik.imagekit.io/blog".into()),
            1800,
        )
    } else {
        ImageKitSigner::new(None, None, None, 1800)
    };

    let state = AppState {
        posts: PostService::new(repo.clone(), repo.clone(), Arc::new(media)),
        comments: CommentService::new(repo.clone(), repo.clone(), repo.clone()),
        users: UserService::new(repo.clone(), repo.clone()),
        webhooks: WebhookService::new(
            Arc::new(SvixWebhookVerifier::from_secret(WEBHOOK_SECRET).unwrap()),
            repo.clone(),
            repo.clone(),
            repo.clone(),
        ),
        identity: Arc::new(ClerkJwtVerifier::from_secret(JWT_SECRET, vec![]).unwrap()),
        expose_errors: options.expose_errors,
    };

    TestApp {
        router: rb_api::router(state),
        repo,
        signer: SvixWebhookVerifier::from_secret(WEBHOOK_SECRET).unwrap(),
    }
}

/// A session token for `sub`, optionally carrying the admin role.
pub fn token(sub: &str, admin: bool) -> String {
    let mut claims = json!({
        "sub": sub,
        "exp": Utc::now().timestamp() + 600,
        "azp": "http://localhost:5173",
    });
    if admin {
        claims["metadata"] = json!({ "role": "admin" });
    }
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

impl TestApp {
    pub async fn seed_user(&self, clerk_id: &str, username: &str) -> User {
        self.repo
            .create_user(NewUser {
                clerk_user_id: clerk_id.to_string(),
                username: username.to_string(),
                email: format!("{username}@example.com"),
                img: None,
            })
            .await
            .unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Creates a post through the API and returns its JSON.
    pub async fn create_post(&self, token: &str, title: &str) -> Value {
        let res = self.post("/posts", token, json!({ "title": title, "content": "<p>body</p>" })).await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body
    }

    /// Delivers a correctly signed webhook.
    pub async fn deliver_webhook(&self, payload: &Value) -> TestResponse {
        let raw = payload.to_string();
        let timestamp = Utc::now().timestamp();
        let signature = self.signer.sign("msg_test", timestamp, raw.as_bytes()).unwrap();
        self.deliver_raw_webhook(raw, &timestamp.to_string(), &format!("v1,{signature}"))
            .await
    }

    pub async fn deliver_raw_webhook(
        &self,
        raw: String,
        timestamp: &str,
        signature: &str,
    ) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/webhooks/clerk")
            .header(header::CONTENT_TYPE, "application/json")
            .header("svix-id", "msg_test")
            .header("svix-timestamp", timestamp)
            .header("svix-signature", signature)
            .body(Body::from(raw))
            .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }
}
