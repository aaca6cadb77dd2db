use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use agora_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// Identity of the caller on routes where signing in is optional.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Claims>);

impl Viewer {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|c| c.sub)
    }
}

/// Reject the request with 401 unless it carries a valid bearer token backed
/// by a live session. On success the [`Claims`] are placed in the request
/// extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = resolve(&state, req.headers())
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Like [`require_auth`] but lets anonymous callers through as an empty [`Viewer`].
pub async fn optional_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = resolve(&state, req.headers()).await?;

    req.extensions_mut().insert(Viewer(claims));
    Ok(next.run(req).await)
}

async fn resolve(state: &AppState, headers: &HeaderMap) -> Result<Option<Claims>, ApiError> {
    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
    else {
        return Ok(None);
    };

    let claims = match decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => data.claims,
        Err(e) => {
            debug!("rejected bearer token: {}", e);
            return Ok(None);
        }
    };

    let (sid, user_id) = (claims.sid, claims.sub);
    let active = blocking(state, move |db| db.session_is_active(sid, user_id, Utc::now())).await?;
    if !active {
        debug!(user_id, %sid, "token refers to a closed session");
    }

    Ok(active.then_some(claims))
}
