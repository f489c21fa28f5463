//! Streamable HTTP transport: JSON-RPC over `POST`.

use crate::mcp::{McpServer, TransportError};
use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, info_span, warn};

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// HTTP transport settings.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Address to listen on
    pub addr: SocketAddr,
    /// Path of the JSON-RPC endpoint
    pub endpoint: String,
    /// Bearer token required on the endpoint, if any
    pub auth_token: Option<String>,
}

#[derive(Clone)]
struct AppState {
    server: Arc<McpServer>,
    auth_token: Option<Arc<str>>,
}

/// Build the router: `POST {endpoint}` for JSON-RPC and an unauthenticated
/// `GET /health`.
pub fn router(server: Arc<McpServer>, endpoint: &str, auth_token: Option<String>) -> Router {
    let state = AppState {
        server,
        auth_token: auth_token.filter(|t| !t.is_empty()).map(Arc::from),
    };

    let rpc = Router::new()
        .route(endpoint, post(handle_rpc))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health))
        .merge(rpc)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(server: Arc<McpServer>, options: HttpOptions) -> Result<(), TransportError> {
    let listener = TcpListener::bind(options.addr)
        .await
        .map_err(|source| TransportError::Bind {
            addr: options.addr,
            source,
        })?;
    serve_on(listener, server, options).await
}

/// Serve on an already bound listener until Ctrl-C.
pub async fn serve_on(
    listener: TcpListener,
    server: Arc<McpServer>,
    options: HttpOptions,
) -> Result<(), TransportError> {
    let local = listener.local_addr()?;
    if options.auth_token.is_none() {
        warn!("No auth token configured; the endpoint accepts unauthenticated requests");
    }
    info!("MCP endpoint listening on http://{}{}", local, options.endpoint);

    let app = router(server, &options.endpoint, options.auth_token);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP transport stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn health() -> &'static str {
    "ok"
}

async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    let raw = String::from_utf8_lossy(&body);
    match state.server.handle_message(&raw).await {
        Some(reply) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            reply,
        )
            .into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

/// Constant-time comparison against the configured token.
fn token_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.auth_token.as_deref() else {
        return next.run(request).await;
    };

    match bearer_token(request.headers()) {
        Some(token) if token_matches(token, expected) => next.run(request).await,
        presented => {
            warn!(
                has_token = presented.is_some(),
                "Rejected request with missing or invalid bearer token"
            );
            (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                "Unauthorized",
            )
                .into_response()
        }
    }
}

/// Tag each request with an id, reusing the caller's `x-request-id` when present.
async fn request_id(request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let span = info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        uri = %request.uri()
    );
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
