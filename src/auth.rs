use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    state::AppState,
};

const DEV_USER_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

pub fn require_user(state: &AppState, headers: &HeaderMap) -> AppResult<AuthUser> {
    authenticate(&state.config, headers)
}

pub fn require_user_id(state: &AppState, headers: &HeaderMap) -> AppResult<String> {
    require_user(state, headers).map(|user| user.id)
}

fn authenticate(config: &AppConfig, headers: &HeaderMap) -> AppResult<AuthUser> {
    if config.auth_dev_overrides_enabled() {
        if let Some(user_id) = header_str(headers, DEV_USER_HEADER) {
            tracing::debug!(user_id = %user_id, "Using dev auth override");
            return Ok(AuthUser {
                id: user_id,
                email: None,
            });
        }
    }

    let token = bearer_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Unauthorized: missing bearer token.".to_string()))?;

    let secret = config.jwt_secret.as_deref().ok_or_else(|| {
        AppError::Dependency("Authentication is not configured. Set JWT_SECRET.".to_string())
    })?;

    let claims = decode_claims(config, secret, &token)?;
    if claims.sub.trim().is_empty() {
        return Err(AppError::Unauthorized(
            "Unauthorized: token has no subject.".to_string(),
        ));
    }

    Ok(AuthUser {
        id: claims.sub.trim().to_string(),
        email: claims.email,
    })
}

fn decode_claims(config: &AppConfig, secret: &str, token: &str) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    match config.jwt_audience.as_deref() {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }
    if let Some(issuer) = config.jwt_issuer.as_deref() {
        validation.set_issuer(&[issuer]);
    }

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|error| {
        tracing::debug!(error = %error, "Rejected bearer token");
        AppError::Unauthorized("Unauthorized: invalid or expired token.".to_string())
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = header_str(headers, AUTHORIZATION.as_str())?;
    let (scheme, token) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
