use std::env;
use std::net::{IpAddr, SocketAddr};

use anyhow::{bail, Context, Result};

const DEV_SECRET: &str = "development-secret-change-me";

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub cors_allow_origin: String,
    pub auth: AuthConfig,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub access_token_ttl_minutes: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("access_token_ttl_minutes", &self.access_token_ttl_minutes)
            .finish()
    }
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_token_ttl_minutes: 30,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let development = lookup("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        let secret = match lookup("SECRET_KEY") {
            Some(s) if !s.trim().is_empty() => s,
            _ if development => {
                tracing::warn!("SECRET_KEY not set, using the development secret");
                DEV_SECRET.to_string()
            }
            _ => bail!("SECRET_KEY must be set (or APP_ENV=development for a dev secret)"),
        };

        Ok(Self {
            database_url: var_or("DATABASE_URL", "sqlite://todo.db"),
            host: var_or("HOST", "0.0.0.0")
                .parse()
                .context("HOST must be an IP address")?,
            port: var_or("PORT", "8000")
                .parse()
                .context("PORT must be a port number")?,
            cors_allow_origin: var_or("CORS_ALLOW_ORIGIN", "*"),
            auth: AuthConfig {
                secret,
                access_token_ttl_minutes: var_or("ACCESS_TOKEN_TTL_MINUTES", "30")
                    .parse()
                    .context("ACCESS_TOKEN_TTL_MINUTES must be an integer")?,
            },
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
