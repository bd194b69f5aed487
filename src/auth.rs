use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, header, request::Parts},
};

use crate::{
    config::{AppConfig, Env},
    error::{ApiError, OrInternal},
    models::{Role, User},
    repository::RepositoryState,
    session::SessionState,
};

/// Header accepted in `Env::Local` to act as a user without logging in.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// hash_password
///
/// 32-bit rolling hash (`h = h * 31 + c` over UTF-16 code units, wrapping),
/// rendered as a signed decimal. Not a password hash in any security sense;
/// it is kept so existing account rows keep verifying.
pub fn hash_password(password: &str) -> String {
    password
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_mul(31).wrapping_add(i32::from(unit))
        })
        .to_string()
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers use it for
/// ownership and role checks.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub contact: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Rejects with 403 unless the caller is an admin.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            contact: user.contact,
        }
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local` a numeric `x-user-id` naming an existing
///    account is accepted as-is.
/// 2. Bearer token resolved through the session store to a username.
/// 3. The username is looked up again so deleted accounts stop authenticating.
///
/// Rejection: 401 `{"error":"Unauthorized"}`; 500 if the lookup itself fails.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    SessionState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let sessions = SessionState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let dev_id = parts
                .headers
                .get(DEV_USER_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<i32>().ok());
            if let Some(id) = dev_id {
                let user = repo
                    .get_user(id)
                    .await
                    .or_internal("Failed to authenticate")?;
                if let Some(user) = user {
                    return Ok(user.into());
                }
            }
        }

        let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        let username = sessions.resolve(token).ok_or(ApiError::Unauthorized)?;

        repo.get_user_by_username(&username)
            .await
            .or_internal("Failed to authenticate")?
            .map(AuthUser::from)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Optional variant for routes that only authenticate conditionally
/// (GET /listings?owner=true). A missing or unknown token yields `None`.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    SessionState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match <AuthUser as FromRequestParts<S>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(ApiError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
