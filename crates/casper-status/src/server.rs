//! The axum router and its lifecycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use casper_session::SessionHandle;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{StatusError, StatusResult};
use crate::page;
use crate::report::StatusReport;

/// Shared state behind every handler.
#[derive(Debug, Clone)]
pub struct StatusState {
    session: SessionHandle,
    started_at: Instant,
    bot_name: String,
}

impl StatusState {
    /// Create the state. Uptime counts from `started_at`.
    #[must_use]
    pub fn new(session: SessionHandle, started_at: Instant, bot_name: impl Into<String>) -> Self {
        Self {
            session,
            started_at,
            bot_name: bot_name.into(),
        }
    }

    /// Report for the current snapshot.
    #[must_use]
    pub fn report(&self) -> StatusReport {
        StatusReport::new(&self.session.snapshot(), self.started_at.elapsed())
    }
}

/// Build the router: `GET /` for people, `GET /status` for machines.
#[must_use]
pub fn router(state: StatusState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .with_state(Arc::new(state))
}

async fn index(State(state): State<Arc<StatusState>>) -> impl IntoResponse {
    Html(page::render(&state.bot_name, &state.report()))
}

async fn status(State(state): State<Arc<StatusState>>) -> Json<StatusReport> {
    Json(state.report())
}

/// Bind the status listener.
///
/// # Errors
///
/// Returns [`StatusError::Bind`] if the address is unusable or taken.
pub async fn bind(addr: &str) -> StatusResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| StatusError::Bind {
            addr: addr.to_owned(),
            source,
        })
}

/// Serve until `shutdown` resolves, then finish in-flight requests.
///
/// # Errors
///
/// Returns [`StatusError::Serve`] if the server fails.
pub async fn serve<F>(listener: TcpListener, state: StatusState, shutdown: F) -> StatusResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Status server listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(StatusError::Serve)?;
    info!("Status server stopped");
    Ok(())
}
