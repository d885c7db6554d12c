use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use db::models::user::User;

use crate::{
    Deployment,
    error::{ApiError, NOT_AUTHORIZED},
};

/// Outcome of inspecting the `Authorization` header, stored as a request
/// extension by [`attach_auth_context`].
#[derive(Debug, Clone)]
pub enum AuthContext {
    Anonymous,
    Authenticated(User),
    Rejected(&'static str),
}

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

async fn resolve_token(deployment: &Deployment, token: &str) -> AuthContext {
    let claims = match deployment.tokens().verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::debug!(error = %err, "Ignoring invalid bearer token");
            return AuthContext::Rejected(NOT_AUTHORIZED);
        }
    };

    match User::find_by_id(&deployment.db().pool, claims.sub).await {
        Ok(Some(user)) => AuthContext::Authenticated(user),
        Ok(None) => AuthContext::Rejected("User not found"),
        Err(err) => {
            tracing::warn!(user_id = %claims.sub, error = %err, "Failed to load token owner");
            AuthContext::Rejected(NOT_AUTHORIZED)
        }
    }
}

/// Never rejects a request: task routes stay public and only handlers that
/// extract [`RequireUser`] enforce authentication.
pub async fn attach_auth_context(
    State(deployment): State<Deployment>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
        .map(str::to_string);

    let context = match token {
        Some(token) => resolve_token(&deployment, &token).await,
        None => AuthContext::Anonymous,
    };
    req.extensions_mut().insert(context);

    next.run(req).await
}

/// The authenticated user, if a valid bearer token was presented.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<AuthContext>() {
            Some(AuthContext::Authenticated(user)) => Some(user.clone()),
            _ => None,
        };
        Ok(CurrentUser(user))
    }
}

#[derive(Debug, Clone)]
pub struct RequireUser(pub User);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthContext>() {
            Some(AuthContext::Authenticated(user)) => Ok(RequireUser(user.clone())),
            Some(AuthContext::Rejected(reason)) => Err(ApiError::Unauthorized(reason.to_string())),
            Some(AuthContext::Anonymous) | None => {
                Err(ApiError::Unauthorized(NOT_AUTHORIZED.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_authorization_bearer;

    #[test]
    fn bearer_prefix_is_case_insensitive_and_trimmed() {
        assert_eq!(parse_authorization_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_authorization_bearer("  bearer   abc  "), Some("abc"));
        assert_eq!(parse_authorization_bearer("Basic abc"), None);
        assert_eq!(parse_authorization_bearer("Bearer   "), None);
        assert_eq!(parse_authorization_bearer("abc"), None);
    }
}
