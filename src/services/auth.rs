use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use tracing::{debug, field, info, instrument, warn, Span};
use uuid::Uuid;

use super::error::{DomainError, DomainResult};
use crate::config::AuthConfig;
use crate::models::{Claims, NewUser, RegisterRequest, User};
use crate::storage::UserStore;
use crate::validation;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

/// Tokens handed out by `login` and `refresh`.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    /// `<user id>.<secret>`; only an argon2 hash of the secret is stored.
    pub refresh_token: String,
    /// Access token lifetime, in seconds.
    pub expires_in: i64,
    pub user: User,
}

/// Registration, credential checks and token issuance.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, config: AuthConfig) -> Self {
        Self { users, config }
    }

    #[instrument(name = "todo.auth.register", skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> DomainResult<User> {
        let errors = validation::validate_registration(&request);
        if !errors.is_empty() {
            return Err(DomainError::validation(errors));
        }

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(DomainError::conflict("Email already registered"));
        }
        if self.users.find_by_username(&request.username).await?.is_some() {
            return Err(DomainError::conflict("Username already taken"));
        }

        let password_hash = hash_secret(&request.password)?;
        let user = User::new(
            Uuid::new_v4(),
            NewUser {
                username: request.username,
                email: request.email,
                password_hash,
            },
        );
        // A concurrent registration may have claimed the name since the lookups above.
        if !self.users.insert(user.clone()).await? {
            return Err(DomainError::conflict("Email or username already registered"));
        }

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Unknown email, wrong password and inactive account all fail the same way.
    #[instrument(name = "todo.auth.login", skip_all, fields(user_id = tracing::field::Empty))]
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<TokenPair> {
        let mut user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| DomainError::unauthenticated(INVALID_CREDENTIALS))?;
        Span::current().record("user_id", field::display(user.id));

        if !verify_secret(password, &user.password_hash) || !user.is_active {
            debug!("login rejected");
            return Err(DomainError::unauthenticated(INVALID_CREDENTIALS));
        }

        user.record_login();
        let tokens = self.issue_tokens(user).await?;
        info!("user logged in");
        Ok(tokens)
    }

    /// Exchanges a refresh token for a new pair; the old refresh token stops working.
    #[instrument(name = "todo.auth.refresh", skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> DomainResult<TokenPair> {
        let (id, secret) = refresh_token
            .split_once('.')
            .ok_or_else(|| DomainError::unauthenticated(INVALID_REFRESH_TOKEN))?;
        let id = Uuid::parse_str(id)
            .map_err(|_| DomainError::unauthenticated(INVALID_REFRESH_TOKEN))?;

        let user = self
            .users
            .find_by_id(id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| DomainError::unauthenticated(INVALID_REFRESH_TOKEN))?;

        let valid = user
            .hashed_refresh_token
            .as_deref()
            .is_some_and(|hash| verify_secret(secret, hash));
        if !valid {
            warn!(user_id = %user.id, "refresh token mismatch");
            return Err(DomainError::unauthenticated(INVALID_REFRESH_TOKEN));
        }

        self.issue_tokens(user).await
    }

    #[instrument(name = "todo.auth.logout", skip(self), fields(user_id = %user_id))]
    pub async fn logout(&self, user_id: Uuid) -> DomainResult<()> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::unauthenticated("User not found"))?;

        user.clear_refresh_token();
        self.users.update(user).await?;
        info!("user logged out");
        Ok(())
    }

    /// Resolves a bearer access token to an active user.
    pub async fn authenticate(&self, token: &str) -> DomainResult<User> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| DomainError::unauthenticated(format!("Invalid token: {e}")))?;

        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| DomainError::unauthenticated("Invalid token subject"))?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::unauthenticated("User not found"))?;

        if !user.is_active {
            return Err(DomainError::unauthenticated("User is inactive"));
        }
        Ok(user)
    }

    /// Administrative (de)activation. Deactivating also revokes the refresh token.
    #[instrument(name = "todo.auth.set_active", skip(self, actor), fields(actor_id = %actor.id, user_id = %user_id))]
    pub async fn set_active(&self, actor: &User, user_id: Uuid, active: bool) -> DomainResult<User> {
        let user = self
            .admin_update(actor, user_id, |user| {
                if active {
                    user.activate();
                } else {
                    user.deactivate();
                    user.clear_refresh_token();
                }
            })
            .await?;
        info!(active, "user activation changed");
        Ok(user)
    }

    /// Marks the user's email as verified. Admin only.
    #[instrument(name = "todo.auth.verify_email", skip(self, actor), fields(actor_id = %actor.id, user_id = %user_id))]
    pub async fn verify_email(&self, actor: &User, user_id: Uuid) -> DomainResult<User> {
        let user = self
            .admin_update(actor, user_id, User::verify_email)
            .await?;
        info!("user email verified");
        Ok(user)
    }

    // --- helpers ---

    async fn admin_update(
        &self,
        actor: &User,
        user_id: Uuid,
        change: impl FnOnce(&mut User),
    ) -> DomainResult<User> {
        if !actor.is_admin() {
            return Err(DomainError::forbidden("Admin role required"));
        }

        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        change(&mut user);

        if !self.users.update(user.clone()).await? {
            return Err(DomainError::NotFound);
        }
        Ok(user)
    }

    async fn issue_tokens(&self, mut user: User) -> DomainResult<TokenPair> {
        let access_token = self.encode_access_token(user.id)?;

        let secret = Uuid::new_v4().simple().to_string();
        user.set_refresh_token(hash_secret(&secret)?);
        self.users.update(user.clone()).await?;

        Ok(TokenPair {
            access_token,
            refresh_token: format!("{}.{}", user.id, secret),
            expires_in: self.config.access_token_ttl_minutes * 60,
            user,
        })
    }

    fn encode_access_token(&self, user_id: Uuid) -> DomainResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now as usize,
            exp: (now + self.config.access_token_ttl_minutes * 60) as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(|e| DomainError::Internal(anyhow!("token creation failed: {e}")))
    }
}

fn hash_secret(secret: &str) -> DomainResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Internal(anyhow!("hashing failed: {e}")))
}

fn verify_secret(secret: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
