//! Read-only JSON API and the dashboard page.
//!
//! Handlers copy what they need out of the history store and serialize after
//! every lock is released.

mod downsample;
mod error;
mod handlers;
mod model;
mod query;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use parking_lot::Mutex;
use tokio::{net::TcpListener, time::Instant};
use tower_http::timeout::TimeoutLayer;

use crate::app_context::AppContext;
use crate::shutdown::ShutdownSignal;

/// Last time any request reached the server.
#[derive(Clone)]
pub struct IdleTracker {
    last_request: Arc<Mutex<Instant>>,
}

impl IdleTracker {
    pub fn new() -> Self {
        Self {
            last_request: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn touch(&self) {
        *self.last_request.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_request.lock().elapsed()
    }

    /// Resolves once no request arrived for `limit`.
    pub async fn wait_idle(&self, limit: Duration) {
        loop {
            let idle = self.idle_for();
            if idle >= limit {
                return;
            }
            tokio::time::sleep(limit - idle).await;
        }
    }
}

impl Default for IdleTracker {
    fn default() -> Self {
        Self::new()
    }
}

async fn track_activity(State(tracker): State<IdleTracker>, request: Request, next: Next) -> Response {
    tracker.touch();
    next.run(request).await
}

pub fn router(app_context: AppContext, tracker: IdleTracker) -> Router {
    let request_timeout = Duration::from_secs(app_context.config.api.request_timeout_secs);

    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/api/snapshot", get(handlers::snapshot))
        .route("/api/history", get(handlers::history))
        .route("/api/trends", get(handlers::trends))
        .route("/api/status", get(handlers::status))
        .layer(middleware::from_fn_with_state(tracker, track_activity))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(app_context)
}

/// Serve until shutdown is requested or, with a non-zero `idle_shutdown_secs`,
/// until the server sat idle that long. Sampling is unaffected either way.
pub async fn serve(app_context: AppContext, mut shutdown: ShutdownSignal) -> std::io::Result<()> {
    let bind = app_context.config.api.bind.clone();
    let address: SocketAddr = bind
        .parse()
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{}: {}", bind, error)))?;
    let idle_limit = app_context.config.api.idle_shutdown_secs;

    let listener = TcpListener::bind(address).await?;
    log::info!(
        "api_listening address={} idle_shutdown_secs={}",
        listener.local_addr().unwrap_or(address),
        idle_limit
    );

    let tracker = IdleTracker::new();
    let app = router(app_context, tracker.clone());

    let stop = async move {
        if idle_limit == 0 {
            shutdown.wait().await;
            return;
        }

        tokio::select! {
            _ = shutdown.wait() => {}
            _ = tracker.wait_idle(Duration::from_secs(idle_limit)) => {
                log::info!("api_idle_shutdown idle_secs={}", tracker.idle_for().as_secs());
            }
        }
    };

    axum::serve(listener, app).with_graceful_shutdown(stop).await?;
    log::info!("api_stopped");
    Ok(())
}
