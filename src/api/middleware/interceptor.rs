//! Request interception middleware.
//!
//! Every request passes through [`RequestInterceptor::intercept`]:
//!
//! 1. Paths under a public prefix go straight to the handler, never counted or audited
//! 2. The fixed-window rate limiter refuses over-budget requests with `429`
//! 3. Bodies of mutating requests are captured and redacted
//! 4. The bearer identity is resolved, best effort
//! 5. The handler runs; its status, error message and duration are audited
//!
//! Audit persistence never changes what the caller sees. A panicking handler
//! is audited with [`FAULT_STATUS`] and the panic is resumed afterwards.

use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::{Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::{FutureExt, StreamExt, future, stream};
use serde_json::{Value, json};

use crate::application::services::{AuditService, Identity, IdentityExtractor, RateLimiter};
use crate::config::InterceptorConfig;
use crate::domain::entities::{AuditEvent, FAULT_STATUS};
use crate::error::{AppError, HandlerError};
use crate::utils::body_sanitizer::BodySanitizer;
use crate::utils::client_ip::client_ip;

/// Error text audited for refused requests when rejection auditing is enabled.
pub const RATE_LIMITED_ERROR: &str = "rate limit exceeded";

fn too_large_marker() -> Value {
    json!({ "error": "body too large to capture" })
}

fn unreadable_marker() -> Value {
    json!({ "error": "body could not be read" })
}

/// Request facts gathered before the handler runs.
struct RequestContext {
    method: Method,
    path: String,
    ip: Option<String>,
    subject_id: Option<String>,
    body: Option<Value>,
    started: Instant,
}

impl RequestContext {
    fn into_event(self, status_code: i32, error: Option<String>) -> AuditEvent {
        let duration_ms = i64::try_from(self.started.elapsed().as_millis()).unwrap_or(i64::MAX);

        AuditEvent {
            subject_id: self.subject_id,
            method: self.method.to_string(),
            path: self.path,
            status_code,
            ip: self.ip,
            body: self.body,
            error,
            duration_ms,
        }
    }
}

/// Orchestrates rate limiting, body capture, identity and auditing around a handler.
pub struct RequestInterceptor {
    audit: Arc<AuditService>,
    limiter: Arc<RateLimiter>,
    identity: IdentityExtractor,
    sanitizer: BodySanitizer,
    config: InterceptorConfig,
}

impl RequestInterceptor {
    pub fn new(
        audit: Arc<AuditService>,
        limiter: Arc<RateLimiter>,
        identity: IdentityExtractor,
        config: InterceptorConfig,
    ) -> Self {
        let sanitizer = BodySanitizer::with_extra_fields(&config.extra_sensitive_fields);

        Self {
            audit,
            limiter,
            identity,
            sanitizer,
            config,
        }
    }

    /// Whether `path` is exempt from rate limiting and auditing.
    ///
    /// A prefix matches the path itself and anything below it, so `/docs`
    /// covers `/docs/index.html` but not `/docsearch`.
    pub fn is_public(&self, path: &str) -> bool {
        self.config.public_prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str()).is_some_and(|rest| {
                rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/')
            })
        })
    }

    /// Runs `next` for `req` under the interception policy.
    pub async fn intercept<F, Fut>(&self, req: Request, next: F) -> Response
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        let started = Instant::now();
        let path = req.uri().path().to_string();

        if self.is_public(&path) {
            metrics::counter!("public_bypass_total").increment(1);
            return next(req).await;
        }

        let method = req.method().clone();
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let ip = client_ip(req.headers(), peer, self.config.behind_proxy).map(|ip| ip.to_string());

        let rule = self.config.rate_limits.rule_for(&path);
        let key = RateLimiter::key(ip.as_deref().unwrap_or("unknown"), method.as_str(), &path);

        if self.limiter.check_rule(&key, rule) {
            metrics::counter!("rate_limit_rejections_total").increment(1);
            tracing::warn!(%key, limit = %rule, "Rate limit exceeded");

            let response = AppError::too_many_requests(
                "Too many requests",
                json!({
                    "max_requests": rule.max_requests,
                    "window_seconds": rule.window_seconds,
                }),
            )
            .into_response();

            if self.config.audit_rate_limited {
                let identity = self.resolve_identity(&req);
                let ctx = RequestContext {
                    method,
                    path,
                    ip,
                    subject_id: identity.subject().map(str::to_string),
                    body: None,
                    started,
                };
                let event = ctx.into_event(
                    i32::from(response.status().as_u16()),
                    Some(RATE_LIMITED_ERROR.to_string()),
                );
                self.audit.record(event).await;
            }

            return response;
        }

        let (mut req, body) = if is_mutating(&method) {
            self.capture_body(req).await
        } else {
            (req, None)
        };

        let identity = self.resolve_identity(&req);
        let subject_id = identity.subject().map(str::to_string);
        req.extensions_mut().insert(identity);

        let ctx = RequestContext {
            method,
            path,
            ip,
            subject_id,
            body,
            started,
        };

        let outcome = AssertUnwindSafe(next(req)).catch_unwind().await;
        self.complete(ctx, outcome).await
    }

    /// Completion hook: audits the handler outcome, then hands it back unchanged.
    async fn complete(
        &self,
        ctx: RequestContext,
        outcome: Result<Response, Box<dyn Any + Send>>,
    ) -> Response {
        let (status_code, error) = match &outcome {
            Ok(response) => (
                i32::from(response.status().as_u16()),
                response
                    .extensions()
                    .get::<HandlerError>()
                    .map(|HandlerError(message)| message.clone()),
            ),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(method = %ctx.method, path = %ctx.path, error = %message, "Handler panicked");
                (FAULT_STATUS, Some(message))
            }
        };

        let event = ctx.into_event(status_code, error);
        metrics::histogram!("request_duration_ms").record(event.duration_ms as f64);
        self.audit.record(event).await;

        match outcome {
            Ok(response) => response,
            Err(payload) => resume_unwind(payload),
        }
    }

    fn resolve_identity(&self, req: &Request) -> Identity {
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        self.identity.resolve(authorization)
    }

    /// Buffers the body for audit and rebuilds the request around the same bytes.
    ///
    /// Bodies larger than the capture limit are forwarded untouched: the bytes
    /// read so far are replayed ahead of the unread remainder. A body that
    /// fails mid-stream reaches the handler with the same failure.
    async fn capture_body(&self, req: Request) -> (Request, Option<Value>) {
        let limit = self.config.body_limit_bytes;

        let declared = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());

        if declared.is_some_and(|len| len > limit) {
            return (req, Some(too_large_marker()));
        }

        let (parts, body) = req.into_parts();
        let mut chunks = body.into_data_stream();
        let mut buffered = Vec::new();

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(chunk) => {
                    buffered.extend_from_slice(&chunk);
                    if buffered.len() > limit {
                        let prefix = stream::once(future::ready(Ok(Bytes::from(buffered))));
                        let body = Body::from_stream(prefix.chain(chunks));
                        return (Request::from_parts(parts, body), Some(too_large_marker()));
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, path = %parts.uri.path(), "Failed to read request body");
                    let replay = stream::iter([Ok(Bytes::from(buffered)), Err(e)]);
                    let body = Body::from_stream(replay);
                    return (Request::from_parts(parts, body), Some(unreadable_marker()));
                }
            }
        }

        let captured = self.sanitizer.sanitize_bytes(&buffered);
        (Request::from_parts(parts, Body::from(buffered)), captured)
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Axum adapter for [`RequestInterceptor`].
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .merge(business_routes)
///     .layer(middleware::from_fn_with_state(interceptor, interceptor::layer));
/// ```
pub async fn layer(
    State(interceptor): State<Arc<RequestInterceptor>>,
    req: Request,
    next: Next,
) -> Response {
    interceptor.intercept(req, |req| next.run(req)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain_signer::ChainSigner;
    use crate::domain::entities::{RateLimitRule, RateLimitRules};
    use crate::domain::token::{Claims, MockTokenValidator, TokenError};
    use crate::infrastructure::persistence::InMemoryAuditRepository;
    use axum::http::StatusCode;

    struct Harness {
        interceptor: RequestInterceptor,
        repository: Arc<InMemoryAuditRepository>,
    }

    fn harness(config: InterceptorConfig) -> Harness {
        let repository = Arc::new(InMemoryAuditRepository::new());
        let audit = Arc::new(AuditService::new(
            repository.clone(),
            ChainSigner::new("test-signing-key"),
        ));

        let mut validator = MockTokenValidator::new();
        validator.expect_decode().returning(|token| match token {
            "valid" => Ok(Claims {
                sub: "user-42".to_string(),
                role: "cliente".to_string(),
                exp: u64::MAX,
            }),
            _ => Err(TokenError::InvalidSignature),
        });

        let interceptor = RequestInterceptor::new(
            audit,
            Arc::new(RateLimiter::new()),
            IdentityExtractor::new(Arc::new(validator)),
            config,
        );

        Harness {
            interceptor,
            repository,
        }
    }

    fn request(method: Method, uri: &str, body: &str) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn ok_handler(_req: Request) -> Response {
        StatusCode::OK.into_response()
    }

    #[test]
    fn test_public_prefix_matching() {
        let h = harness(InterceptorConfig::default());

        assert!(h.interceptor.is_public("/docs"));
        assert!(h.interceptor.is_public("/docs/index.html"));
        assert!(h.interceptor.is_public("/favicon.ico"));
        assert!(!h.interceptor.is_public("/docsearch"));
        assert!(!h.interceptor.is_public("/cuentas"));
    }

    #[tokio::test]
    async fn test_public_path_is_neither_limited_nor_audited() {
        let mut config = InterceptorConfig::default();
        config.rate_limits = RateLimitRules::new(RateLimitRule::new(1, 60));
        let h = harness(config);

        for _ in 0..5 {
            let response = h
                .interceptor
                .intercept(request(Method::GET, "/docs", ""), ok_handler)
                .await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert!(h.repository.records().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_not_audited_by_default() {
        let mut config = InterceptorConfig::default();
        config.rate_limits = RateLimitRules::new(RateLimitRule::new(1, 60));
        let h = harness(config);

        let first = h
            .interceptor
            .intercept(request(Method::GET, "/cuentas", ""), ok_handler)
            .await;
        let second = h
            .interceptor
            .intercept(request(Method::GET, "/cuentas", ""), ok_handler)
            .await;

        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(h.repository.records().len(), 1);
    }

    #[tokio::test]
    async fn test_rejection_audited_when_enabled() {
        let mut config = InterceptorConfig::default();
        config.rate_limits = RateLimitRules::new(RateLimitRule::new(1, 60));
        config.audit_rate_limited = true;
        let h = harness(config);

        for _ in 0..2 {
            h.interceptor
                .intercept(request(Method::GET, "/cuentas", ""), ok_handler)
                .await;
        }

        let records = h.repository.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].fields.status_code, 429);
        assert_eq!(records[1].fields.error.as_deref(), Some(RATE_LIMITED_ERROR));
    }

    #[tokio::test]
    async fn test_body_is_redacted_and_forwarded_intact() {
        let h = harness(InterceptorConfig::default());
        let raw = r#"{"correo":"a@b.com","password":"hunter2"}"#;

        let response = h
            .interceptor
            .intercept(request(Method::POST, "/auth/login", raw), |req| async move {
                let bytes = axum::body::to_bytes(req.into_body(), usize::MAX)
                    .await
                    .unwrap();
                assert_eq!(&bytes[..], raw.as_bytes());
                StatusCode::CREATED.into_response()
            })
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);

        let records = h.repository.records();
        assert_eq!(
            records[0].fields.body,
            Some(json!({"correo": "a@b.com", "password": "***REDACTED***"}))
        );
    }

    #[tokio::test]
    async fn test_body_capture_markers() {
        let mut config = InterceptorConfig::default();
        config.body_limit_bytes = 8;
        let h = harness(config);

        let mut oversized = request(Method::PUT, "/cuentas/1", r#"{"saldo":1000000}"#);
        oversized
            .headers_mut()
            .insert(header::CONTENT_LENGTH, "17".parse().unwrap());
        h.interceptor.intercept(oversized, ok_handler).await;

        h.interceptor
            .intercept(request(Method::POST, "/cuentas", "{nope"), ok_handler)
            .await;

        h.interceptor
            .intercept(request(Method::GET, "/cuentas", "{}"), ok_handler)
            .await;

        let records = h.repository.records();
        assert_eq!(records[0].fields.body, Some(too_large_marker()));
        assert_eq!(
            records[1].fields.body,
            Some(json!({"error": "unparsable body"}))
        );
        assert_eq!(records[2].fields.body, None);
    }

    fn streamed_request(method: Method, uri: &str, chunks: Vec<&'static str>) -> Request {
        let chunks = chunks.into_iter().map(Ok::<_, std::io::Error>);

        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from_stream(stream::iter(chunks)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_streamed_body_over_limit_reaches_handler_whole() {
        let mut config = InterceptorConfig::default();
        config.body_limit_bytes = 8;
        let h = harness(config);
        let raw = r#"{"saldo":1000000}"#;

        let req = streamed_request(Method::POST, "/transferencias", vec![r#"{"saldo""#, ":10", "00000}"]);
        let response = h
            .interceptor
            .intercept(req, |req| async move {
                let bytes = axum::body::to_bytes(req.into_body(), usize::MAX)
                    .await
                    .unwrap();
                assert_eq!(&bytes[..], raw.as_bytes());
                StatusCode::CREATED.into_response()
            })
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let records = h.repository.records();
        assert_eq!(records[0].fields.body, Some(too_large_marker()));
    }

    #[tokio::test]
    async fn test_streamed_body_within_limit_is_captured() {
        let h = harness(InterceptorConfig::default());

        let req = streamed_request(Method::POST, "/auth/login", vec![r#"{"password""#, r#":"hunter2"}"#]);
        h.interceptor
            .intercept(req, |req| async move {
                let bytes = axum::body::to_bytes(req.into_body(), usize::MAX)
                    .await
                    .unwrap();
                assert_eq!(&bytes[..], br#"{"password":"hunter2"}"#);
                StatusCode::OK.into_response()
            })
            .await;

        let records = h.repository.records();
        assert_eq!(
            records[0].fields.body,
            Some(json!({"password": "***REDACTED***"}))
        );
    }

    #[tokio::test]
    async fn test_failed_body_stream_is_marked_and_replayed() {
        let h = harness(InterceptorConfig::default());

        let chunks = vec![
            Ok(Bytes::from_static(b"{\"monto\"")),
            Err(std::io::Error::other("connection reset")),
        ];
        let req = Request::builder()
            .method(Method::POST)
            .uri("/transferencias")
            .body(Body::from_stream(stream::iter(chunks)))
            .unwrap();

        h.interceptor
            .intercept(req, |req| async move {
                assert!(axum::body::to_bytes(req.into_body(), usize::MAX).await.is_err());
                StatusCode::BAD_REQUEST.into_response()
            })
            .await;

        let records = h.repository.records();
        assert_eq!(records[0].fields.body, Some(unreadable_marker()));
        assert_eq!(records[0].fields.status_code, 400);
    }

    #[tokio::test]
    async fn test_identity_is_recorded_and_exposed() {
        let h = harness(InterceptorConfig::default());

        let mut req = request(Method::GET, "/cuentas", "");
        req.headers_mut()
            .insert(header::AUTHORIZATION, "Bearer valid".parse().unwrap());

        h.interceptor
            .intercept(req, |req| async move {
                let identity = req.extensions().get::<Identity>().cloned();
                assert_eq!(
                    identity.as_ref().and_then(Identity::subject),
                    Some("user-42")
                );
                StatusCode::OK.into_response()
            })
            .await;

        let mut req = request(Method::GET, "/cuentas", "");
        req.headers_mut()
            .insert(header::AUTHORIZATION, "Bearer forged".parse().unwrap());
        let response = h.interceptor.intercept(req, ok_handler).await;

        assert_eq!(response.status(), StatusCode::OK);
        let records = h.repository.records();
        assert_eq!(records[0].fields.subject_id.as_deref(), Some("user-42"));
        assert_eq!(records[1].fields.subject_id, None);
    }

    #[tokio::test]
    async fn test_handler_error_message_is_audited() {
        let h = harness(InterceptorConfig::default());

        let response = h
            .interceptor
            .intercept(request(Method::GET, "/cuentas/9", ""), |_req| async {
                AppError::not_found("Cuenta no encontrada", json!({})).into_response()
            })
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let records = h.repository.records();
        assert_eq!(records[0].fields.status_code, 404);
        assert_eq!(
            records[0].fields.error.as_deref(),
            Some("Cuenta no encontrada")
        );
    }

    #[tokio::test]
    async fn test_panicking_handler_is_audited_then_resumed() {
        let h = harness(InterceptorConfig::default());

        let result = AssertUnwindSafe(h.interceptor.intercept(
            request(Method::DELETE, "/cuentas/1", ""),
            |_req| async {
                if true {
                    panic!("ledger unavailable");
                }
                StatusCode::OK.into_response()
            },
        ))
        .catch_unwind()
        .await;

        let payload = result.err().expect("panic should be resumed");
        assert_eq!(panic_message(payload.as_ref()), "ledger unavailable");

        let records = h.repository.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields.status_code, FAULT_STATUS);
        assert_eq!(records[0].fields.error.as_deref(), Some("ledger unavailable"));
    }
}
