use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sha2::{Digest, Sha256};
use tracing::{error, info};
use uuid::Uuid;

use agora_db::models::UserRow;
use agora_types::api::{
    AuthResponse, Claims, FieldError, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest, UserResponse,
};
use agora_types::models::User;

use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::middleware::Viewer;
use crate::state::{AppState, blocking};
use crate::views;

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 3;
const RESET_TOKEN_TTL_MINUTES: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_lowercase();

    let errors = validate_registration(&email, &username, &req.password);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let password_hash = hash_password(&req.password)?;

    let user = blocking(&state, move |db| db.create_user(&username, &email, &password_hash)).await?;
    let token = start_session(&state, &user).await?;

    info!(user_id = user.id, "User registered: {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: views::user(user),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();

    let user = blocking(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(|| ApiError::field("email", "email does not exist"))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(format!("stored password hash unreadable: {e}")))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::field("password", "password is incorrect"))?;

    let token = start_session(&state, &user).await?;

    Ok(Json(AuthResponse {
        user: views::user(user),
        token,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let sid = claims.sid;
    let closed = blocking(&state, move |db| db.delete_session(sid)).await?;

    info!(user_id = claims.sub, %sid, "Session closed");
    Ok(Json(serde_json::json!({ "ok": closed })))
}

/// The signed-in user, or `null` for anonymous callers.
pub async fn me(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> ApiResult<impl IntoResponse> {
    let Some(user_id) = viewer.user_id() else {
        return Ok(Json(None::<User>));
    };

    let user = blocking(&state, move |db| db.get_user_by_id(user_id)).await?;
    Ok(Json(user.map(views::user)))
}

/// Always answers `ok: true` so the endpoint cannot be used to probe which
/// emails are registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();

    let lookup = email.clone();
    let Some(user) = blocking(&state, move |db| db.get_user_by_email(&lookup)).await? else {
        return Ok(Json(serde_json::json!({ "ok": true })));
    };

    let token = URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>());
    let token_hash = hash_reset_token(&token);
    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    let user_id = user.id;

    blocking(&state, move |db| db.create_password_reset(&token_hash, user_id, expires_at)).await?;

    let link = format!("{}/{}", state.reset_url_base.trim_end_matches('/'), token);
    let mailer = state.mailer.clone();
    let sent = tokio::task::spawn_blocking(move || mailer.send_password_reset(&email, &link)).await;
    match sent {
        Ok(Ok(())) => info!(user_id, "Password reset issued"),
        Ok(Err(e)) => error!(user_id, "Password reset mail failed: {}", e),
        Err(e) => error!("spawn_blocking join error: {}", e),
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::field("new_password", "password is too short"));
    }

    let token_hash = hash_reset_token(&req.token);
    let password_hash = hash_password(&req.new_password)?;

    let user = blocking(&state, move |db| {
        db.redeem_password_reset(&token_hash, &password_hash, Utc::now())
    })
    .await?
    .ok_or_else(|| ApiError::field("token", "reset link expired or already used"))?;

    info!(user_id = user.id, "Password reset completed");
    Ok(Json(UserResponse {
        user: views::user(user),
    }))
}

fn validate_registration(email: &str, username: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if !email.contains('@') {
        errors.push(FieldError::new("email", "invalid email address"));
    }

    let username_len = username.chars().count();
    if username_len < MIN_USERNAME_LEN {
        errors.push(FieldError::new("username", "username is too short"));
    } else if username_len > MAX_USERNAME_LEN {
        errors.push(FieldError::new("username", "username is too long"));
    } else if username.contains('@') {
        errors.push(FieldError::new("username", "username cannot contain '@'"));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new("password", "password is too short"));
    }

    errors
}

fn hash_password(password: &str) -> ApiResult<String> {
    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Only the digest is stored, so a leaked table cannot be replayed.
fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

async fn start_session(state: &AppState, user: &UserRow) -> ApiResult<String> {
    let sid = Uuid::new_v4();
    let expires_at = Utc::now() + state.session_ttl;
    let user_id = user.id;

    blocking(state, move |db| db.create_session(sid, user_id, expires_at)).await?;

    create_token(&state.jwt_secret, sid, user, expires_at.timestamp() as usize)
        .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
}

fn create_token(secret: &str, sid: Uuid, user: &UserRow, exp: usize) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        sid,
        username: user.username.clone(),
        exp,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_rules() {
        assert!(validate_registration("a@b.c", "abc", "pwd").is_empty());

        let errors = validate_registration("nope", "ab", "pw");
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["email", "username", "password"]);

        let long = "x".repeat(MAX_USERNAME_LEN + 1);
        assert_eq!(validate_registration("a@b.c", &long, "pwd")[0].message, "username is too long");
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter2").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"hunter2", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"hunter3", &parsed).is_err());
    }

    #[test]
    fn reset_token_digest_is_stable_hex() {
        let a = hash_reset_token("token");
        assert_eq!(a, hash_reset_token("token"));
        assert_ne!(a, hash_reset_token("other"));
        assert_eq!(a.len(), 64);
    }
}
