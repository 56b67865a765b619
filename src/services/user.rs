//! User service
//!
//! Registration, login, token verification and profile lookup. Successful
//! registration and login both return a signed bearer token together with
//! the user it identifies.

use crate::db::is_unique_violation;
use crate::db::repositories::UserRepository;
use crate::models::{normalize_email, User};
use crate::services::password::{hash_password, verify_dummy_password, verify_password};
use crate::services::token::{TokenClaims, TokenCodec, TokenError};
use std::sync::Arc;

/// Message shared by every credential failure so callers cannot probe which
/// emails are registered.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("{0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("{0}")]
    ValidationError(String),

    /// Email already registered
    #[error("User with this email already exists")]
    UserExists,

    /// Token missing a valid signature or otherwise malformed
    #[error("Invalid token")]
    InvalidToken,

    /// Token past its expiry
    #[error("Token expired")]
    TokenExpired,

    /// The token refers to a user that no longer exists
    #[error("User not found")]
    UserNotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<TokenError> for UserServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => UserServiceError::InvalidToken,
            TokenError::Expired => UserServiceError::TokenExpired,
            TokenError::Encoding(msg) => {
                UserServiceError::InternalError(anyhow::anyhow!("Token encoding failed: {}", msg))
            }
        }
    }
}

/// Input for user registration
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone, Default)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// A freshly issued token and its user
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// User service for accounts and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    tokens: TokenCodec,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, tokens: TokenCodec) -> Self {
        Self { user_repo, tokens }
    }

    /// The codec used to issue and verify tokens
    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Register a new, non-admin user and sign them in.
    ///
    /// # Errors
    ///
    /// - `ValidationError` if a field is blank or the email has no `@`
    /// - `UserExists` if the email is already registered (case-insensitive)
    /// - `InternalError` for database or hashing failures
    pub async fn register(&self, input: RegisterInput) -> Result<AuthSession, UserServiceError> {
        validate_register_input(&input)?;

        let email = normalize_email(&input.email);
        if self.user_repo.get_by_email(&email).await?.is_some() {
            return Err(UserServiceError::UserExists);
        }

        let password_hash = hash_password(&input.password)?;
        let user = User::new(input.name.trim().to_string(), email, password_hash, false);

        let created = match self.user_repo.create(&user).await {
            Ok(created) => created,
            // Lost a race with a concurrent registration of the same email
            Err(e) if is_unique_violation(&e) => return Err(UserServiceError::UserExists),
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Registered user {} ({})", created.id, created.email);
        self.session_for(created)
    }

    /// Verify credentials and issue a token.
    ///
    /// Unknown emails and wrong passwords fail identically.
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, UserServiceError> {
        if input.email.trim().is_empty() || input.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Please provide email and password".to_string(),
            ));
        }

        let email = normalize_email(&input.email);
        let Some(user) = self.user_repo.get_by_email(&email).await? else {
            // Same cost as a wrong password
            verify_dummy_password(&input.password);
            return Err(UserServiceError::AuthenticationError(
                INVALID_CREDENTIALS.to_string(),
            ));
        };

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(UserServiceError::AuthenticationError(
                INVALID_CREDENTIALS.to_string(),
            ));
        }

        self.session_for(user)
    }

    /// Verify a bearer token and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, UserServiceError> {
        Ok(self.tokens.decode(token)?)
    }

    /// Load the user a verified token refers to.
    pub async fn profile(&self, claims: &TokenClaims) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(claims.user_id)
            .await?
            .ok_or(UserServiceError::UserNotFound)
    }

    /// Make sure an admin account exists for `email`.
    ///
    /// Creates the account when the email is unknown; otherwise promotes the
    /// existing user, leaving their password unchanged.
    pub async fn ensure_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, UserServiceError> {
        let email = normalize_email(email);

        if let Some(mut existing) = self.user_repo.get_by_email(&email).await? {
            if !existing.is_admin {
                self.user_repo.set_admin(existing.id, true).await?;
                existing.is_admin = true;
                tracing::info!("Promoted {} to admin", existing.email);
            }
            return Ok(existing);
        }

        validate_register_input(&RegisterInput::new(name, email.as_str(), password))?;
        let user = User::new(name.trim().to_string(), email, hash_password(password)?, true);
        let created = self.user_repo.create(&user).await?;
        tracing::info!("Created admin user {}", created.email);
        Ok(created)
    }

    fn session_for(&self, user: User) -> Result<AuthSession, UserServiceError> {
        let token = self.tokens.issue(&user)?;
        Ok(AuthSession { token, user })
    }
}

fn validate_register_input(input: &RegisterInput) -> Result<(), UserServiceError> {
    if input.name.trim().is_empty() || input.email.trim().is_empty() || input.password.is_empty()
    {
        return Err(UserServiceError::ValidationError(
            "Please provide name, email, and password".to_string(),
        ));
    }

    if !input.email.contains('@') {
        return Err(UserServiceError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }

    Ok(())
}
