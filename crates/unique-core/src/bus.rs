//! Process-wide, lazily-initialized session bus connection.
//!
//! Mirrors the original's `g_once_init_enter`/`g_once_init_leave` pattern:
//! the first caller pays the cost of connecting, every later caller
//! (including ones racing the first) observes the same established
//! connection.

use tokio::sync::OnceCell;

static SESSION_BUS: OnceCell<zbus::Connection> = OnceCell::const_new();

/// Returns the process-wide session bus connection, connecting on first use.
///
/// Concurrent callers before the connection is established all await the
/// same in-flight connect; none of them triggers a second connection.
pub async fn session_bus() -> zbus::Result<zbus::Connection> {
    SESSION_BUS
        .get_or_try_init(|| async { zbus::Connection::session().await })
        .await
        .cloned()
}
