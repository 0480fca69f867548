use anyhow::Result;
use std::{sync::Arc, time::Duration as StdDuration};
use tokio::time::sleep;
use tracing::{debug, error};

use super::state::AdminState;

/// Spawn a background task that purges expired sessions and stale limiter
/// windows every `sweep_interval`.
pub fn spawn_session_sweeper(admin_state: Arc<AdminState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let interval = StdDuration::try_from(admin_state.config().sweep_interval())
            .unwrap_or(StdDuration::from_secs(3600));

        loop {
            sleep(interval).await;
            if let Err(err) = sweep_once(&admin_state) {
                error!("admin session sweep failed: {err}");
            }
        }
    })
}

/// Run one sweep pass, returning `(sessions, limiter windows)` removed.
pub(super) fn sweep_once(admin_state: &AdminState) -> Result<(usize, usize)> {
    let now = admin_state.now();
    let windows = admin_state.limiter().purge_expired(now);
    let sessions = admin_state.sessions().sweep(now)?;
    debug!(sessions, windows, "admin sweep complete");
    Ok((sessions, windows))
}
