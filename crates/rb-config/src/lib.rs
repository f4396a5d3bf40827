//! # rb-config
//!
//! Layered runtime configuration for Rusty-Blog.
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. `config/default.toml`, then `config/{APP_ENV}.toml` (both optional)
//! 3. `RUSTY_BLOG__SECTION__KEY` environment variables
//! 4. the conventional variables used by hosting platforms and the identity
//!    and media providers (`DATABASE_URL`, `CLERK_WEBHOOK_SECRET`, `IK_*`, ...)

use std::collections::HashMap;
use std::path::Path;

use config::{Config, Environment as EnvSource, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("could not read .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub media: MediaSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: SecretString,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// PEM public key of the identity provider instance (RS256)
    pub jwt_public_key: Option<SecretString>,
    /// Shared HS256 secret, for development and tests
    pub jwt_secret: Option<SecretString>,
    /// Accepted `azp` claims; empty accepts any
    pub authorized_parties: Vec<String>,
    /// `whsec_`-prefixed signing secret of the webhook endpoint
    pub webhook_secret: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct MediaSettings {
    pub public_key: Option<String>,
    pub private_key: Option<SecretString>,
    pub url_endpoint: Option<String>,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    pub format: LogFormat,
    pub filter: String,
}

impl Settings {
    /// Loads `.env` from the working directory (if present) and then every
    /// source from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        load_env_file(Path::new(".env"))?;
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_sources(&vars, Path::new("config"))
    }

    /// Builds the settings from an explicit variable map and config directory.
    pub fn from_sources(vars: &HashMap<String, String>, config_dir: &Path) -> Result<Self, ConfigError> {
        let var = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();
        let app_env = var("APP_ENV").unwrap_or_else(|| "development".to_string());

        let parties = var("CLERK_AUTHORIZED_PARTIES").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        });

        let settings: Settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000_i64)?
            .set_default("server.environment", app_env.as_str())?
            .set_default("database.url", "postgres://localhost/rusty_blog")?
            .set_default("database.max_connections", 10_i64)?
            .set_default("auth.authorized_parties", Vec::<String>::new())?
            .set_default("media.token_ttl_secs", 1800_i64)?
            .set_default("log.format", "pretty")?
            .set_default("log.filter", "info,rb_api=debug")?
            .add_source(File::from(config_dir.join("default")).required(false))
            .add_source(File::from(config_dir.join(&app_env)).required(false))
            .add_source(
                EnvSource::with_prefix("RUSTY_BLOG")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.authorized_parties")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            )
            .set_override_option("server.port", var("PORT"))?
            .set_override_option("database.url", var("DATABASE_URL"))?
            .set_override_option("auth.jwt_public_key", var("CLERK_JWT_KEY"))?
            .set_override_option("auth.jwt_secret", var("CLERK_SECRET_KEY"))?
            .set_override_option("auth.webhook_secret", var("CLERK_WEBHOOK_SECRET"))?
            .set_override_option("auth.authorized_parties", parties)?
            .set_override_option("media.public_key", var("IK_PUBLIC_KEY"))?
            .set_override_option("media.private_key", var("IK_PRIVATE_KEY"))?
            .set_override_option("media.url_endpoint", var("IK_URL_ENDPOINT"))?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_public_key.is_none() && self.auth.jwt_secret.is_none() {
            return Err(ConfigError::Invalid(
                "one of auth.jwt_public_key (CLERK_JWT_KEY) or auth.jwt_secret (CLERK_SECRET_KEY) is required"
                    .into(),
            ));
        }
        if self.auth.webhook_secret.is_none() {
            return Err(ConfigError::Invalid(
                "auth.webhook_secret (CLERK_WEBHOOK_SECRET) is required".into(),
            ));
        }
        if self.media.token_ttl_secs == 0 {
            return Err(ConfigError::Invalid("media.token_ttl_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl MediaSettings {
    /// All three keys are needed to sign uploads.
    pub fn is_configured(&self) -> bool {
        self.public_key.is_some() && self.private_key.is_some() && self.url_endpoint.is_some()
    }
}

/// A missing file is fine; an unreadable or malformed one is an error.
fn load_env_file(path: &Path) -> Result<(), ConfigError> {
    match dotenvy::from_path(path) {
        Err(err) if !err.not_found() => Err(err.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("CLERK_SECRET_KEY", "sk_test"),
            ("CLERK_WEBHOOK_SECRET", "whsec_dGVzdA=="),
        ]
    }

    fn no_files() -> &'static Path {
        Path::new("does-not-exist")
    }

    #[test]
    fn defaults_fill_everything_else() {
        let settings = Settings::from_sources(&vars(&minimal()), no_files()).unwrap();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.server.environment, Environment::Development);
        assert_eq!(settings.database.max_connections, 10);
        assert_eq!(settings.media.token_ttl_secs, 1800);
        assert_eq!(settings.log.format, LogFormat::Pretty);
        assert!(!settings.media.is_configured());
        assert!(settings.auth.authorized_parties.is_empty());
        assert_eq!(settings.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn conventional_variables_override() {
        let mut pairs = minimal();
        pairs.extend([
            ("APP_ENV", "production"),
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://db/blog"),
            ("CLERK_AUTHORIZED_PARTIES", "https://blog.example, http://localhost:5173"),
            ("IK_PUBLIC_KEY", "public_x"),
            ("IK_PRIVATE_KEY", "private_x"),
            ("IK_URL_ENDPOINT", "https://ik.imagekit.io/demo"),
        ]);
        let settings = Settings::from_sources(&vars(&pairs), no_files()).unwrap();

        assert!(settings.server.environment.is_production());
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.database.url.expose_secret(), "postgres://db/blog");
        assert_eq!(
            settings.auth.authorized_parties,
            ["https://blog.example", "http://localhost:5173"]
        );
        assert!(settings.media.is_configured());
    }

    #[test]
    fn prefixed_variables_reach_nested_keys() {
        let mut pairs = minimal();
        pairs.extend([
            ("RUSTY_BLOG__LOG__FORMAT", "json"),
            ("RUSTY_BLOG__DATABASE__MAX_CONNECTIONS", "25"),
        ]);
        let settings = Settings::from_sources(&vars(&pairs), no_files()).unwrap();
        assert_eq!(settings.log.format, LogFormat::Json);
        assert_eq!(settings.database.max_connections, 25);
    }

    #[test]
    fn absent_env_file_is_skipped() {
        assert!(load_env_file(&no_files().join(".env")).is_ok());
    }

    #[test]
    fn unreadable_env_file_is_an_error() {
        let dir = std::env::temp_dir();
        assert!(matches!(load_env_file(&dir), Err(ConfigError::DotEnv(_))));
    }

    #[test]
    fn missing_token_key_is_rejected() {
        let pairs = vars(&[("CLERK_WEBHOOK_SECRET", "whsec_dGVzdA==")]);
        let err = Settings::from_sources(&pairs, no_files()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_webhook_secret_is_rejected() {
        let pairs = vars(&[("CLERK_SECRET_KEY", "sk_test")]);
        assert!(Settings::from_sources(&pairs, no_files()).is_err());
    }
}
