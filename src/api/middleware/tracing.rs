//! HTTP request/response tracing middleware.

use axum::extract::Request;
use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{Level, Span};

type HttpTraceLayer = TraceLayer<SharedClassifier<ServerErrorsAsFailures>, fn(&Request) -> Span>;

fn make_span(req: &Request) -> Span {
    tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        version = ?req.version(),
    )
}

/// Creates a tracing middleware for HTTP requests.
///
/// Each request gets an `INFO` span carrying method, path and HTTP version;
/// the response is logged at `INFO` with status and latency in milliseconds.
/// Audit persistence errors logged by the interceptor land inside this span.
///
/// # Example Logs
///
/// ```text
/// INFO request{method=POST path=/auth/login version=HTTP/1.1}: finished processing request latency=12 ms status=200
/// ERROR request{method=POST path=/transferencias version=HTTP/1.1}: Failed to persist audit record
/// ```
pub fn layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(make_span as fn(&Request) -> Span)
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}
