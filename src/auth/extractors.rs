use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::{error, warn};

use super::{jwt::TokenError, repo_types::PublicUser};
use crate::{error::AppError, state::AppState};

/// Identity resolved from a valid access token.
///
/// Handlers taking this extractor only run once the token verified and the
/// user still exists.
#[derive(Debug, Clone)]
pub struct AuthUser(pub PublicUser);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthenticated("Access token required"))?;

        let claims = state.keys.verify_access(token).map_err(|e| match e {
            TokenError::Expired => {
                warn!("access token expired");
                AppError::TokenExpired("Token expired")
            }
            TokenError::Invalid => {
                warn!("access token invalid");
                AppError::Forbidden("Invalid token")
            }
        })?;

        let user = state
            .users
            .find_public(claims.sub)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %claims.sub, "load user for token failed");
                AppError::Internal(e)
            })?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token for unknown user");
                AppError::Unauthenticated("Invalid token")
            })?;

        Ok(AuthUser(user))
    }
}
