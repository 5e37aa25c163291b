//! HTTP server
//!
//! | Route          | Method     | Purpose                                   |
//! |----------------|------------|-------------------------------------------|
//! | `/`            | GET, POST  | Dispatch a plugin                         |
//! | `/healthz`     | GET        | Liveness probe                            |
//! | `/metrics`     | GET        | Counters (Prometheus, or `?format=json`)  |
//!
//! Each dispatch request gets one `request` span carrying a UUID, and the
//! engine's outcome is turned into exactly one response.

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, info_span, Instrument};
use url::form_urlencoded;

use crate::dispatch::{DispatchEngine, DispatchOutcome, DispatchRequest};
use crate::error::Result;
use crate::metrics::{render, MetricsCollector, TelemetryFormat};
use crate::report;

use super::request::{is_form, parse_request};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: DispatchEngine,
    /// Present when `GET /metrics` is enabled.
    pub collector: Option<Arc<MetricsCollector>>,
}

/// Build the router. `/metrics` is only mounted when a collector is set.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(dispatch_get).post(dispatch_post))
        .route("/healthz", get(healthz));
    if state.collector.is_some() {
        router = router.route("/metrics", get(metrics));
    }
    router.with_state(state)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
///
/// Detached plugin runs are not part of the drain; they are tied to the
/// runtime, not to the connection.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn dispatch_get(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let request = parse_request(query.as_deref(), None);
    handle(&state.engine, request).await
}

async fn dispatch_post(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let form_body = is_form(content_type).then_some(body.as_ref());
    let request = parse_request(query.as_deref(), form_body);
    handle(&state.engine, request).await
}

async fn handle(engine: &DispatchEngine, request: DispatchRequest) -> Response {
    let span = info_span!(
        "request",
        id = %request.id(),
        loader = %request.loader(),
        plugin = %request.plugin(),
    );
    let outcome = engine.dispatch(request).instrument(span).await;
    outcome_response(outcome)
}

fn outcome_response(outcome: DispatchOutcome) -> Response {
    match outcome {
        DispatchOutcome::Rejected { message } => text(StatusCode::BAD_REQUEST, message),
        DispatchOutcome::AuditFailed { message } => {
            text(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
        DispatchOutcome::Sync { plugin, result } => {
            if result.succeeded {
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, TEXT_PLAIN)],
                    result.combined_output,
                )
                    .into_response()
            } else {
                text(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    report::format_sync_failure(&plugin),
                )
            }
        }
        // The completion handle is dropped; the plugin keeps running.
        DispatchOutcome::Accepted { acknowledgment, .. } => text(StatusCode::OK, acknowledgment),
    }
}

fn text(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_PLAIN)], body).into_response()
}

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let Some(collector) = state.collector else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let requested = query.as_deref().and_then(|query| {
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "format")
            .map(|(_, value)| value.into_owned())
    });
    let format = TelemetryFormat::from_query(requested.as_deref());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, format.content_type())],
        render(&collector, &format),
    )
        .into_response()
}
