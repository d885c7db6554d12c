use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::{CreateUser, User, UserRole};
use serde::{Deserialize, Serialize};
use utils_core::response::ApiResponse;
use uuid::Uuid;

use crate::{
    Deployment,
    error::ApiError,
    extract::JsonBody,
    http::{auth::RequireUser, method_not_allowed},
    password::{hash_password, verify_password},
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Account summary returned by register and login, with a fresh bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub token: String,
}

impl AuthSession {
    fn issue(deployment: &Deployment, user: User) -> Result<Self, ApiError> {
        let token = deployment.tokens().issue(user.id)?;
        Ok(Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            token,
        })
    }
}

pub async fn register(
    State(deployment): State<Deployment>,
    JsonBody(payload): JsonBody<CreateUser>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<AuthSession>>), ApiError> {
    let new_user = payload.validate()?;
    let password_hash = hash_password(new_user.password.clone()).await?;

    let user = User::create(
        &deployment.db().pool,
        &new_user,
        password_hash,
        Uuid::new_v4(),
    )
    .await?;

    let session = AuthSession::issue(&deployment, user)?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(session))))
}

pub async fn login(
    State(deployment): State<Deployment>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<AuthSession>>, ApiError> {
    let invalid = || ApiError::Unauthorized(INVALID_CREDENTIALS.to_string());
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(invalid());
    };

    let Some((user, stored_hash)) =
        User::find_credentials_by_email(&deployment.db().pool, &email).await?
    else {
        return Err(invalid());
    };

    if !verify_password(password, stored_hash).await? {
        tracing::debug!(user_id = %user.id, "Rejected login with wrong password");
        return Err(invalid());
    }

    let session = AuthSession::issue(&deployment, user)?;
    Ok(ResponseJson(ApiResponse::success(session)))
}

pub async fn me(RequireUser(user): RequireUser) -> ResponseJson<ApiResponse<User>> {
    ResponseJson(ApiResponse::success(user))
}

pub fn router() -> Router<Deployment> {
    let inner = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .method_not_allowed_fallback(method_not_allowed);

    Router::new().nest("/auth", inner)
}
