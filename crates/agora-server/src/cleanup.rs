use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use agora_api::state::AppStateInner;

/// Background task that prunes expired sessions and password-reset tokens.
pub async fn run_cleanup_loop(state: Arc<AppStateInner>, every: Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        let state = state.clone();
        let result = tokio::task::spawn_blocking(move || state.db.prune_expired(Utc::now())).await;

        match result {
            Ok(Ok(stats)) => {
                if stats.sessions > 0 || stats.password_resets > 0 {
                    info!(
                        "Cleanup: pruned {} sessions, {} reset tokens",
                        stats.sessions, stats.password_resets
                    );
                }
            }
            Ok(Err(e)) => warn!("Cleanup error: {}", e),
            Err(e) => warn!("Cleanup task panicked: {}", e),
        }
    }
}
