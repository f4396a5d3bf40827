//! # Rusty-Blog Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use anyhow::Context;
use rb_api::AppState;
use rb_config::{LogFormat, LogSettings, Settings};
use rb_core::{CommentRepo, IdentityVerifier, MediaSigner, PostRepo, UserRepo, WebhookVerifier};
use rb_services::{CommentService, PostService, UserService, WebhookService};
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(not(any(feature = "db-postgres", feature = "db-memory")))]
compile_error!("enable one database plugin: `db-postgres` or `db-memory`");

#[cfg(not(feature = "auth-clerk"))]
compile_error!("the `auth-clerk` plugin is required");

#[cfg(not(feature = "media-imagekit"))]
compile_error!("the `media-imagekit` plugin is required");

// Feature-gated imports: the binary is compiled to order
#[cfg(feature = "db-postgres")]
use rb_db_postgres::PgBlogRepo;

#[cfg(all(feature = "db-memory", not(feature = "db-postgres")))]
use rb_db_memory::MemoryBlogRepo;

#[cfg(feature = "auth-clerk")]
use rb_auth_clerk::{ClerkJwtVerifier, SvixWebhookVerifier};

#[cfg(feature = "media-imagekit")]
use rb_media_imagekit::ImageKitSigner;

struct Repos {
    users: Arc<dyn UserRepo>,
    posts: Arc<dyn PostRepo>,
    comments: Arc<dyn CommentRepo>,
}

impl Repos {
    fn from_shared<R>(repo: Arc<R>) -> Self
    where
        R: UserRepo + PostRepo + CommentRepo + 'static,
    {
        Self {
            users: repo.clone(),
            posts: repo.clone(),
            comments: repo,
        }
    }
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[cfg(feature = "db-postgres")]
async fn build_repos(settings: &Settings) -> anyhow::Result<Repos> {
    let repo = PgBlogRepo::connect(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
    )
    .await?;
    repo.migrate().await?;
    info!("postgres ready, migrations applied");
    Ok(Repos::from_shared(Arc::new(repo)))
}

#[cfg(all(feature = "db-memory", not(feature = "db-postgres")))]
async fn build_repos(_settings: &Settings) -> anyhow::Result<Repos> {
    tracing::warn!("using the in-memory store; data is lost on shutdown");
    Ok(Repos::from_shared(Arc::new(MemoryBlogRepo::default())))
}

fn build_identity(settings: &Settings) -> anyhow::Result<Arc<dyn IdentityVerifier>> {
    let parties = settings.auth.authorized_parties.clone();
    let verifier = match (&settings.auth.jwt_public_key, &settings.auth.jwt_secret) {
        (Some(pem), _) => ClerkJwtVerifier::from_rsa_pem(pem.expose_secret(), parties)?,
        (None, Some(secret)) => ClerkJwtVerifier::from_secret(secret.expose_secret(), parties)?,
        (None, None) => anyhow::bail!("no session token key configured"),
    };
    Ok(Arc::new(verifier))
}

fn build_webhook_verifier(settings: &Settings) -> anyhow::Result<Arc<dyn WebhookVerifier>> {
    let secret = settings
        .auth
        .webhook_secret
        .as_ref()
        .context("webhook secret is not configured")?;
    Ok(Arc::new(SvixWebhookVerifier::from_secret(secret.expose_secret())?))
}

fn build_media(settings: &Settings) -> Arc<dyn MediaSigner> {
    let media = &settings.media;
    if !media.is_configured() {
        tracing::warn!("media keys missing; upload-auth will answer 500");
    }
    Arc::new(ImageKitSigner::new(
        media.public_key.clone(),
        media.private_key.as_ref().map(|k| k.expose_secret().to_string()),
        media.url_endpoint.clone(),
        media.token_ttl_secs,
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_tracing(&settings.log);

    // 1. Plugins
    let repos = build_repos(&settings).await?;
    let identity = build_identity(&settings)?;
    let webhook_verifier = build_webhook_verifier(&settings)?;
    let media = build_media(&settings);

    // 2. Services and shared state
    let state = AppState {
        posts: PostService::new(repos.posts.clone(), repos.users.clone(), media),
        comments: CommentService::new(
            repos.comments.clone(),
            repos.posts.clone(),
            repos.users.clone(),
        ),
        users: UserService::new(repos.users.clone(), repos.posts.clone()),
        webhooks: WebhookService::new(webhook_verifier, repos.users, repos.posts, repos.comments),
        identity,
        expose_errors: !settings.server.environment.is_production(),
    };

    // 3. Serve
    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, environment = ?settings.server.environment, "rusty-blog listening");

    axum::serve(listener, rb_api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("rusty-blog stopped");
    Ok(())
}
