//! Benefit Service
//!
//! REST service for the maternity benefit installment ledger. Beneficiaries
//! query their ledger and apply for eligible installments; caseworkers
//! review, approve, reject and pay applications; external record sources
//! feed program events that drive eligibility.

pub mod config;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod notifier;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use handlers::AppState;
pub use ledger::Ledger;
pub use notifier::Notifier;
pub use storage::Storage;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/stats", get(handlers::get_stats_handler))
        .route("/api/beneficiaries", post(handlers::enroll_handler))
        .route("/api/events", post(handlers::record_event_handler))
        .route("/api/benefits/summary", get(handlers::get_summary_handler))
        .route("/api/benefits/apply", post(handlers::apply_handler))
        .route(
            "/api/caseworker/applications",
            get(handlers::list_pending_handler),
        )
        .route(
            "/api/caseworker/applications/{beneficiary_id}/{ordinal}/approve",
            post(handlers::approve_handler),
        )
        .route(
            "/api/caseworker/applications/{beneficiary_id}/{ordinal}/reject",
            post(handlers::reject_handler),
        )
        .route(
            "/api/caseworker/applications/{beneficiary_id}/{ordinal}/pay",
            post(handlers::mark_paid_handler),
        )
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
