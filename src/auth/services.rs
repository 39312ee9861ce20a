use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{SigninRequest, SignupRequest},
    jwt::TokenError,
    repo::StoreError,
    repo_types::{NewUser, PublicUser, User},
    sessions,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub(crate) const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        // ASCII word characters only.
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*@[A-Za-z0-9_]+([.-]?[A-Za-z0-9_]+)*(\.[A-Za-z0-9_]{2,3})+$"
        )
        .unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Treats absent and blank values alike.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Passwords are taken verbatim; only an empty one counts as missing.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// User plus a freshly minted token pair.
#[derive(Debug)]
pub struct AuthSession {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

struct SignupInput {
    username: String,
    email: String,
    password: String,
}

fn validate_signup(req: SignupRequest) -> AppResult<SignupInput> {
    let (Some(username), Some(email), Some(password)) =
        (present(req.username), present(req.email), non_empty(req.password))
    else {
        return Err(AppError::InvalidInput(
            "Username, email, and password are required".into(),
        ));
    };

    let username = username.trim().to_string();
    let email = email.trim().to_lowercase();

    let len = username.chars().count();
    if !(3..=30).contains(&len) {
        return Err(AppError::InvalidInput(
            "Username must be between 3 and 30 characters".into(),
        ));
    }
    if !is_valid_email(&email) {
        return Err(AppError::InvalidInput("Please enter a valid email".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok(SignupInput {
        username,
        email,
        password,
    })
}

/// Mints both tokens and records the refresh token before anything is returned.
async fn open_session(state: &AppState, user: User) -> AppResult<AuthSession> {
    let access_token = state.keys.sign_access(user.id, &user.username, &user.email)?;
    let refresh_token = state.keys.sign_refresh(user.id)?;
    sessions::add_refresh_token(state.users.as_ref(), user.id, &refresh_token).await?;
    Ok(AuthSession {
        user: user.into(),
        access_token,
        refresh_token,
    })
}

#[instrument(skip(state, req))]
pub async fn signup(state: &AppState, req: SignupRequest) -> AppResult<AuthSession> {
    let input = validate_signup(req).inspect_err(|e| warn!(error = %e, "signup rejected"))?;

    if let Some(existing) = state
        .users
        .find_conflicting(&input.username, &input.email)
        .await?
    {
        let field = if existing.username == input.username {
            "username"
        } else {
            "email"
        };
        warn!(field, "signup conflict");
        return Err(AppError::AlreadyExists(field));
    }

    let password_hash = state.hasher.hash(&input.password).await.map_err(|e| {
        error!(error = %e, "hash_password failed");
        AppError::Internal(e)
    })?;

    let user = state
        .users
        .create(NewUser {
            username: input.username,
            email: input.email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(field) => {
                warn!(field, "signup conflict on insert");
                AppError::AlreadyExists(field)
            }
            StoreError::Backend(e) => {
                error!(error = %e, "create user failed");
                AppError::Internal(e)
            }
        })?;

    let session = open_session(state, user).await?;
    info!(user_id = %session.user.id, username = %session.user.username, "user registered");
    Ok(session)
}

#[instrument(skip(state, req))]
pub async fn signin(state: &AppState, req: SigninRequest) -> AppResult<AuthSession> {
    let (Some(login), Some(password)) = (present(req.username), non_empty(req.password)) else {
        return Err(AppError::InvalidInput(
            "Username and password are required".into(),
        ));
    };
    let login = login.trim();

    let Some(user) = state.users.find_by_login(login).await? else {
        warn!("signin unknown user");
        return Err(AppError::InvalidCredentials);
    };

    let ok = state
        .hasher
        .verify(&password, &user.password_hash)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "verify_password failed");
            AppError::Internal(e)
        })?;
    if !ok {
        warn!(user_id = %user.id, "signin invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let session = open_session(state, user).await?;
    info!(user_id = %session.user.id, "user signed in");
    Ok(session)
}

/// Exchanges a stored refresh token for a new access token. The refresh
/// token itself is not rotated.
#[instrument(skip(state, refresh_token))]
pub async fn refresh(state: &AppState, refresh_token: Option<String>) -> AppResult<String> {
    let token = present(refresh_token).ok_or(AppError::Unauthenticated("Refresh token required"))?;

    let claims = state.keys.verify_refresh(&token).map_err(|e| match e {
        TokenError::Expired => {
            warn!("refresh token expired");
            AppError::TokenExpired("Refresh token expired")
        }
        TokenError::Invalid => {
            warn!("refresh token invalid");
            AppError::Forbidden("Invalid refresh token")
        }
    })?;

    let Some(user) = state.users.find_public(claims.sub).await? else {
        warn!(user_id = %claims.sub, "refresh for unknown user");
        return Err(AppError::Unauthenticated("Invalid refresh token"));
    };

    if !sessions::has_refresh_token(state.users.as_ref(), user.id, &token).await? {
        warn!(user_id = %user.id, "refresh token revoked or expired in store");
        return Err(AppError::Unauthenticated("Invalid refresh token"));
    }

    let access_token = state.keys.sign_access(user.id, &user.username, &user.email)?;
    info!(user_id = %user.id, "access token refreshed");
    Ok(access_token)
}

/// Revokes one refresh token. Without a user or a token this does nothing.
#[instrument(skip(state, refresh_token))]
pub async fn logout(
    state: &AppState,
    user_id: Option<Uuid>,
    refresh_token: Option<String>,
) -> AppResult<()> {
    if let (Some(user_id), Some(token)) = (user_id, present(refresh_token)) {
        sessions::remove_refresh_token(state.users.as_ref(), user_id, &token).await?;
        info!(%user_id, "user logged out");
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn logout_all(state: &AppState, user_id: Uuid) -> AppResult<()> {
    sessions::clear_all_refresh_tokens(state.users.as_ref(), user_id).await?;
    Ok(())
}
