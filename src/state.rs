//! Shared application state.

use std::sync::Arc;

use crate::api::middleware::interceptor::RequestInterceptor;
use crate::application::services::{AuditService, IdentityExtractor, RateLimiter};
use crate::config::InterceptorConfig;
use crate::domain::chain_signer::ChainSigner;
use crate::domain::repositories::AuditRepository;
use crate::domain::token::TokenValidator;

/// Services shared by the middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    pub audit_service: Arc<AuditService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub token_validator: Arc<dyn TokenValidator>,
    pub interceptor: Arc<RequestInterceptor>,
}

impl AppState {
    /// Wires the services around one audit repository and one token validator.
    pub fn new(
        repository: Arc<dyn AuditRepository>,
        signer: ChainSigner,
        token_validator: Arc<dyn TokenValidator>,
        rate_limiter: Arc<RateLimiter>,
        config: InterceptorConfig,
    ) -> Self {
        let audit_service = Arc::new(AuditService::new(repository, signer));

        let interceptor = Arc::new(RequestInterceptor::new(
            audit_service.clone(),
            rate_limiter.clone(),
            IdentityExtractor::new(token_validator.clone()),
            config,
        ));

        Self {
            audit_service,
            rate_limiter,
            token_validator,
            interceptor,
        }
    }
}
