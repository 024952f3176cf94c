//! HTTP routes
//!
//! `/` serves the viewer page, `/video_feed` the MJPEG stream. Anything else
//! is a 404; axum answers wrong methods with 405 and strips bodies from HEAD.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use tokio::sync::Semaphore;

use crate::media::CONTENT_TYPE;
use crate::registry::FrameCache;
use crate::server::config::ServerConfig;
use crate::session::StreamSession;
use crate::shutdown::ShutdownSignal;

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    cache: Arc<FrameCache>,
    index_page: Bytes,
    shutdown: ShutdownSignal,
    keepalive: Duration,
    next_session_id: Arc<AtomicU64>,
    viewer_limit: Option<Arc<Semaphore>>,
}

impl AppState {
    pub fn new(config: &ServerConfig, cache: Arc<FrameCache>, shutdown: ShutdownSignal) -> Self {
        let viewer_limit = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            cache,
            index_page: config.index_page.clone(),
            shutdown,
            keepalive: config.keepalive_interval,
            next_session_id: Arc::new(AtomicU64::new(1)),
            viewer_limit,
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/video_feed", get(video_feed))
        .fallback(not_found)
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<Bytes> {
    Html(state.index_page)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found\n")
}

fn stream_headers() -> [(header::HeaderName, &'static str); 4] {
    [
        (header::CONTENT_TYPE, CONTENT_TYPE),
        (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        (header::PRAGMA, "no-cache"),
        (header::EXPIRES, "0"),
    ]
}

async fn video_feed(
    State(state): State<AppState>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    method: Method,
) -> Response {
    if method == Method::HEAD {
        return (stream_headers(), Body::empty()).into_response();
    }

    let permit = match &state.viewer_limit {
        Some(limit) => match Arc::clone(limit).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = %peer_addr, "Viewer rejected: limit reached");
                return (StatusCode::SERVICE_UNAVAILABLE, "Too many viewers\n").into_response();
            }
        },
        None => None,
    };

    let session_id = state.next_session_id.fetch_add(1, Ordering::Relaxed);
    let mut session =
        StreamSession::new(session_id, peer_addr, state.cache.reader(), state.keepalive);
    if let Some(permit) = permit {
        session = session.with_permit(permit);
    }

    tracing::info!(
        session_id = session_id,
        peer = %peer_addr,
        viewers = state.cache.reader_count(),
        "Viewer connected"
    );

    let body = Body::from_stream(session.into_stream(state.shutdown.clone()));
    (stream_headers(), body).into_response()
}
