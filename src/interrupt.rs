//! Cooperative cancellation on Ctrl-C.
//!
//! The first Ctrl-C cancels the shared [`CancellationToken`]; loops observe it
//! at their checkpoints and stop after persisting the last finished row. A
//! second Ctrl-C exits immediately, but never in the middle of a sheet write
//! wrapped in [`without_forced_exit`].

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Exit code used when the operator forces termination.
pub const FORCED_EXIT_CODE: i32 = 130;

// Held while a sheet file is being replaced.
static WRITE_LOCK: Mutex<()> = Mutex::new(());

/// Run `write` with the forced exit held back until it returns.
pub fn without_forced_exit<T>(write: impl FnOnce() -> T) -> T {
    let _guard = WRITE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    write()
}

/// Spawn the Ctrl-C listener that drives `token`.
pub fn install_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("could not listen for Ctrl-C; interruption is disabled");
            return;
        }
        warn!("interrupt received, finishing the current row (press Ctrl-C again to abort)");
        token.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("second interrupt received, aborting");
            let _guard = WRITE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            std::process::exit(FORCED_EXIT_CODE);
        }
    });
}

/// Sleep for `duration`, waking early if `token` is cancelled.
/// Returns `true` when the wait was cut short by cancellation.
pub async fn pause(duration: Duration, token: &CancellationToken) -> bool {
    if duration.is_zero() {
        return token.is_cancelled();
    }
    tokio::select! {
        _ = sleep(duration) => false,
        _ = token.cancelled() => true,
    }
}
