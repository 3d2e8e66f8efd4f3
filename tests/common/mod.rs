#![allow(dead_code)]

use async_trait::async_trait;
use audit_gateway::application::services::{Identity, RateLimiter};
use audit_gateway::config::InterceptorConfig;
use audit_gateway::domain::chain_signer::ChainSigner;
use audit_gateway::domain::entities::{AuditRecord, NewAuditRecord};
use audit_gateway::domain::repositories::AuditRepository;
use audit_gateway::domain::token::Claims;
use audit_gateway::error::AppError;
use audit_gateway::infrastructure::auth::JwtTokenValidator;
use audit_gateway::infrastructure::persistence::InMemoryAuditRepository;
use audit_gateway::routes;
use audit_gateway::state::AppState;
use axum::{
    Extension, Json, Router,
    routing::{get, post},
};
use axum_test::TestServer;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use std::sync::Arc;

pub const SIGNING_KEY: &str = "test-log-signing-key";
pub const JWT_SECRET: &str = "test-jwt-secret";

/// Signs a token the test validator accepts.
pub fn token(subject: &str, role: &str) -> String {
    let claims = Claims {
        sub: subject.to_string(),
        role: role.to_string(),
        exp: Utc::now().timestamp().unsigned_abs() + 3600,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn create_test_state(
    repository: Arc<dyn AuditRepository>,
    config: InterceptorConfig,
) -> AppState {
    AppState::new(
        repository,
        ChainSigner::new(SIGNING_KEY),
        Arc::new(JwtTokenValidator::new(JWT_SECRET, Algorithm::HS256)),
        Arc::new(RateLimiter::new()),
        config,
    )
}

/// State over a fresh in-memory repository, returned alongside it for inspection.
pub fn create_memory_state(config: InterceptorConfig) -> (AppState, Arc<InMemoryAuditRepository>) {
    let repository = Arc::new(InMemoryAuditRepository::new());
    (create_test_state(repository.clone(), config), repository)
}

/// Stand-in for the host's own endpoints.
pub fn business_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(echo_handler))
        .route("/cuentas", get(subject_handler))
        .route("/transferencias", post(rejecting_handler))
        .route("/docs", get(|| async { "docs" }))
}

async fn echo_handler(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

async fn subject_handler(Extension(identity): Extension<Identity>) -> Json<Value> {
    Json(json!({ "subject": identity.subject() }))
}

async fn rejecting_handler() -> Result<Json<Value>, AppError> {
    Err(AppError::bad_request(
        "Saldo insuficiente",
        json!({ "field": "monto" }),
    ))
}

pub fn create_test_server(state: AppState) -> TestServer {
    TestServer::new(routes::router(state, business_routes())).unwrap()
}

/// Repository whose every operation fails, as when the database is down.
pub struct FailingAuditRepository;

#[async_trait]
impl AuditRepository for FailingAuditRepository {
    async fn last_signature(&self) -> Result<Option<String>, AppError> {
        Err(AppError::internal("Database error", json!({})))
    }

    async fn insert(&self, _record: NewAuditRecord) -> Result<AuditRecord, AppError> {
        Err(AppError::internal("Database error", json!({})))
    }

    async fn find_by_id(&self, _id: i64) -> Result<Option<AuditRecord>, AppError> {
        Err(AppError::internal("Database error", json!({})))
    }

    async fn list(&self, _offset: i64, _limit: i64) -> Result<Vec<AuditRecord>, AppError> {
        Err(AppError::internal("Database error", json!({})))
    }

    async fn count(&self) -> Result<i64, AppError> {
        Err(AppError::internal("Database error", json!({})))
    }

    async fn chain_page(&self, _after_id: i64, _limit: i64) -> Result<Vec<AuditRecord>, AppError> {
        Err(AppError::internal("Database error", json!({})))
    }

    async fn health_check(&self) -> bool {
        false
    }
}
