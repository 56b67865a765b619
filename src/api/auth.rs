//! Authentication API endpoints
//!
//! - POST /api/auth/register - Create an account and sign in
//! - POST /api/auth/login - Sign in
//! - GET /api/auth/profile - Current user (requires a bearer token)

use axum::{extract::State, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, JsonBody};
use crate::models::User;
use crate::services::user::{AuthSession, LoginInput, RegisterInput, UserServiceError};

/// Request body for user registration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for user login
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Public view of a user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            user: session.user.into(),
        }
    }
}

/// Routes that need no token
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Routes behind `require_auth`
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/auth/profile", get(profile))
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let input = RegisterInput::new(body.name, body.email, body.password);
    let session = state
        .user_service
        .register(input)
        .await
        .map_err(|e| auth_error(e, "Failed to register user"))?;

    Ok(Json(session.into()))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let session = state
        .user_service
        .login(LoginInput::new(body.email, body.password))
        .await
        .map_err(|e| auth_error(e, "Failed to login"))?;

    Ok(Json(session.into()))
}

/// GET /api/auth/profile
async fn profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .user_service
        .profile(&claims)
        .await
        .map_err(|e| auth_error(e, "Failed to get profile"))?;

    Ok(Json(user.into()))
}

fn auth_error(err: UserServiceError, internal_message: &str) -> ApiError {
    match err {
        UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
        UserServiceError::UserExists => ApiError::validation_error(err.to_string()),
        UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
        UserServiceError::InvalidToken | UserServiceError::TokenExpired => {
            ApiError::unauthorized(err.to_string())
        }
        UserServiceError::UserNotFound => ApiError::not_found(err.to_string()),
        UserServiceError::InternalError(e) => ApiError::internal(internal_message, e),
    }
}
