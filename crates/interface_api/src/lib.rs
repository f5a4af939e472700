//! HTTP API Layer
//!
//! This crate exposes the claim lifecycle over REST using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Claim endpoints and health checks
//! - **Middleware**: Authentication, tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: `AppError` mapped to status codes and stable keys
//! - **Notifications**: Channel-backed event publisher and its listener
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let service = ClaimLifecycleService::new(port, publisher);
//! let app = create_router(service, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notifications;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_claims::{ClaimEventPublisher, ClaimLifecycleService, ClaimsPort};

use crate::config::ApiConfig;
use crate::handlers::{claims, health};
use crate::middleware::{audit_middleware, auth_middleware};

/// Lifecycle service over type-erased ports, so the router is not generic
pub type ClaimService = ClaimLifecycleService<dyn ClaimsPort, dyn ClaimEventPublisher>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: ClaimService,
    pub config: ApiConfig,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `service` - Claim lifecycle service wired to its ports
/// * `config` - API configuration
pub fn create_router(service: ClaimService, config: ApiConfig) -> Router {
    let state = AppState { service, config };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let claims_routes = Router::new()
        .route("/", get(claims::list_claims).post(claims::create_claim))
        .route("/status-changes", get(claims::recent_status_changes))
        .route("/:id", get(claims::get_claim))
        .route("/:id/history", get(claims::get_history))
        .route("/:id/items", post(claims::add_item))
        .route("/:id/items/:item_id", put(claims::update_item))
        .route("/:id/files", post(claims::attach_file))
        .route("/:id/submit", post(claims::submit))
        .route("/:id/revision", post(claims::request_revision))
        .route("/:id/receipt", post(claims::request_receipt))
        .route("/:id/receipt/submit", post(claims::submit_receipt))
        .route("/:id/approve", post(claims::approve))
        .route("/:id/deny", post(claims::deny))
        .route("/:id/paid", post(claims::mark_paid));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/claims", claims_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
