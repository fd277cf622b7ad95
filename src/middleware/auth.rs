use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header},
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use crate::{
    backend::BackendClient,
    dto::auth::Claims,
    error::{AppError, AppResult},
    models::Profile,
};

/// Identity of the caller, plus the raw credential so handlers can forward
/// it to the backend of record.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub profile: Profile,
    pub token: String,
}

pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::BadRequest("Missing Authorization header".into()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;

    if !auth_str.starts_with("Bearer ") {
        return Err(AppError::BadRequest("Invalid Authorization scheme".into()));
    }
    Ok(auth_str.trim_start_matches("Bearer ").trim())
}

pub fn decode_profile(token: &str, secret: &str) -> AppResult<Profile> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidCredential)?;

    let user_id = decoded
        .claims
        .sub
        .parse()
        .map_err(|_| AppError::InvalidCredential)?;

    Ok(Profile {
        user_id,
        name: decoded.claims.name.unwrap_or_default(),
        role: decoded.claims.roles,
        establishment: decoded.claims.establishment,
    })
}

/// Resolve a credential, refreshing it at most once when the role claim is
/// still PENDING. If the refresh fails or the fresh credential still reads
/// PENDING, the caller proceeds as PENDING; there is no retry loop.
pub async fn resolve_profile(
    token: &str,
    secret: &str,
    backend: &BackendClient,
) -> AppResult<(Profile, String)> {
    let profile = decode_profile(token, secret)?;
    if !profile.role.is_pending() {
        return Ok((profile, token.to_string()));
    }

    match backend.refresh_token(token).await {
        Ok(fresh) => match decode_profile(&fresh, secret) {
            Ok(refreshed) => Ok((refreshed, fresh)),
            Err(_) => Ok((profile, token.to_string())),
        },
        Err(err) => {
            tracing::warn!(error = %err, "credential refresh failed, proceeding as PENDING");
            Ok((profile, token.to_string()))
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

        let profile = decode_profile(token, &secret)?;

        Ok(CurrentUser {
            profile,
            token: token.to_string(),
        })
    }
}
