//! API module - Axum HTTP server and routes
//!
//! JSON CRUD for users, orders and trade reports, order forwarding to the
//! exchange, and a public ticker proxy. Everything is mounted under `/api`.

mod handlers;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main application router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ==========================================
        // Status & Health
        // ==========================================
        .route("/api/teste", get(handlers::ping))
        .route("/api/health", get(handlers::health_check))

        // ==========================================
        // Users
        // ==========================================
        .route("/api/users", post(handlers::create_user).get(handlers::get_users))
        .route(
            "/api/users/:user_id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )

        // ==========================================
        // Orders
        // ==========================================
        .route("/api/orders", get(handlers::get_all_orders))
        .route(
            "/api/users/:user_id/orders",
            post(handlers::create_order).get(handlers::get_user_orders),
        )
        .route(
            "/api/users/:user_id/orders/:order_id",
            get(handlers::get_user_order)
                .put(handlers::update_order)
                .delete(handlers::delete_order),
        )

        // ==========================================
        // Trade Reports
        // ==========================================
        .route("/api/reports", post(handlers::create_report).get(handlers::get_reports))
        .route(
            "/api/reports/:report_id",
            get(handlers::get_report)
                .put(handlers::update_report)
                .delete(handlers::delete_report),
        )
        .route("/api/users/:user_id/reports", get(handlers::get_user_reports))
        .route("/api/orders/:order_id/reports", get(handlers::get_order_reports))

        // ==========================================
        // Market Data
        // ==========================================
        .route("/api/market/price/:symbol", get(handlers::get_price))

        // Apply middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
