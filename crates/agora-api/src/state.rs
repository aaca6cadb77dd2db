use std::sync::Arc;

use tracing::error;

use agora_db::{Database, StoreError};

use crate::error::ApiError;
use crate::mail::Mailer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub session_ttl: chrono::Duration,
    /// Reset links are `{reset_url_base}/{token}`.
    pub reset_url_base: String,
    pub mailer: Arc<dyn Mailer>,
}

/// Run a store call on the blocking pool.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("store task failed".into())
        })?
        .map_err(ApiError::from)
}
