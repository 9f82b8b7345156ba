//! Admin sign-in.
//!
//! Tokens look like `v1.<payload>.<signature>`, both parts base64url without
//! padding. The payload is JSON claims, the signature is HMAC-SHA256 over
//! the encoded payload keyed by `SESSION_SECRET`.
use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::Sha256;
use tracing::{info, warn};

use crate::{error::AppError, extract, state::AppState};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "v1";
const MAX_TOKEN_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    /// Unix seconds.
    pub exp: i64,
}

fn mac(secret: &[u8]) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::InternalError(e.to_string().into()))
}

pub fn issue_token(claims: &Claims, secret: &[u8]) -> Result<String, AppError> {
    let payload = serde_json::to_vec(claims).map_err(|e| AppError::InternalError(Box::new(e)))?;
    let payload_part = URL_SAFE_NO_PAD.encode(payload);

    let mut mac = mac(secret)?;
    mac.update(payload_part.as_bytes());
    let signature_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{TOKEN_VERSION}.{payload_part}.{signature_part}"))
}

/// Claims of a well formed, correctly signed token that has not expired.
pub fn verify_token(token: &str, secret: &[u8], now: i64) -> Result<Claims, AppError> {
    if token.len() > MAX_TOKEN_LEN {
        return Err(AppError::Unauthorized);
    }

    let mut parts = token.split('.');
    let (Some(TOKEN_VERSION), Some(payload_part), Some(signature_part), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AppError::Unauthorized);
    };

    let signature = URL_SAFE_NO_PAD
        .decode(signature_part)
        .map_err(|_| AppError::Unauthorized)?;
    let mut mac = mac(secret)?;
    mac.update(payload_part.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_part)
        .map_err(|_| AppError::Unauthorized)?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| AppError::Unauthorized)?;

    if claims.exp <= now {
        return Err(AppError::Unauthorized);
    }

    Ok(claims)
}

/// Compares HMAC digests of both passwords so the check takes the same
/// time wherever the first differing byte is.
pub fn password_matches(given: &str, expected: &str, secret: &[u8]) -> Result<bool, AppError> {
    let mut expected_mac = mac(secret)?;
    expected_mac.update(expected.as_bytes());
    let expected_digest = expected_mac.finalize().into_bytes();

    let mut given_mac = mac(secret)?;
    given_mac.update(given.as_bytes());
    Ok(given_mac.verify_slice(&expected_digest).is_ok())
}

#[derive(Deserialize)]
pub struct Login {
    email: String,
    password: String,
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    extract::Json(login): extract::Json<Login>,
) -> Result<Json<Value>, AppError> {
    let config = &state.config;

    let secret = config.session_secret.as_bytes();
    let email_matches = login.email.trim().eq_ignore_ascii_case(&config.admin_email);
    let password_ok = password_matches(&login.password, &config.admin_password, secret)?;
    if !email_matches || !password_ok {
        warn!("Rejected admin sign-in for {}", login.email);
        return Err(AppError::Unauthorized);
    }

    let claims = Claims {
        email: config.admin_email.clone(),
        exp: (Utc::now() + Duration::seconds(config.session_ttl_secs)).timestamp(),
    };
    let token = issue_token(&claims, secret)?;
    info!("Admin signed in");

    Ok(Json(json!({ "token": token, "expiresAt": claims.exp })))
}

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    verify_token(
        token.trim(),
        state.config.session_secret.as_bytes(),
        Utc::now().timestamp(),
    )?;

    Ok(next.run(request).await)
}
