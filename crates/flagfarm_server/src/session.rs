//! Password-based session layer (§4.9). A stateless signed cookie: no
//! server-side session table (one historical revision of the original kept
//! one, but never actually read from it — not reproduced here, see
//! DESIGN.md).

use crate::error::AppError;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use flagfarm_protocol::defaults::{SESSION_COOKIE_NAME, SESSION_LIFETIME_SECS};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

#[derive(Deserialize)]
pub struct AuthRequest {
    pub password: String,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn sign(secret_key: &str, payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret_key.as_bytes());
    hasher.update(payload);
    hex::encode(hasher.finalize())
}

/// Builds the `Set-Cookie` value for a freshly authenticated session.
pub fn issue_cookie(secret_key: &str) -> String {
    let payload = json!({ "exp": now() + SESSION_LIFETIME_SECS });
    let payload_b64 = base64::engine::general_purpose::STANDARD.encode(payload.to_string());
    let sig = sign(secret_key, payload_b64.as_bytes());
    let value = format!("{payload_b64}.{sig}");
    format!("{SESSION_COOKIE_NAME}={value}; HttpOnly; Path=/; SameSite=Strict")
}

fn verify_cookie(secret_key: &str, cookie_value: &str) -> bool {
    let Some((payload_b64, sig)) = cookie_value.split_once('.') else {
        return false;
    };
    if sign(secret_key, payload_b64.as_bytes()) != sig {
        return false;
    }
    let Ok(payload_bytes) = base64::engine::general_purpose::STANDARD.decode(payload_b64) else {
        return false;
    };
    let Ok(payload): Result<serde_json::Value, _> = serde_json::from_slice(&payload_bytes) else {
        return false;
    };
    payload.get("exp").and_then(|v| v.as_i64()).is_some_and(|exp| exp > now())
}

fn extract_cookie<'a>(request: &'a Request<Body>, name: &str) -> Option<&'a str> {
    request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').map(str::trim).find_map(|kv| {
                let (k, v) = kv.split_once('=')?;
                (k == name).then_some(v)
            })
        })
}

/// `POST /api/auth`: checks the password, issues the session cookie.
pub async fn auth_handler(
    State(state): State<AppState>,
    Json(body): Json<AuthRequest>,
) -> Result<Response, AppError> {
    if body.password != state.config.password {
        return Err(AppError::Unauthorized);
    }
    let cookie = issue_cookie(&state.config.secret_key);
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], ()).into_response())
}

/// Middleware gating every `/api/*` route except `/api/auth`.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let cookie = extract_cookie(&request, SESSION_COOKIE_NAME).unwrap_or("");
    if !verify_cookie(&state.config.secret_key, cookie) {
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}
