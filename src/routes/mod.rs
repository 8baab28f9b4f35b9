//! Route modules for the OCR search server

pub mod access;
pub mod health;
pub mod index;
pub mod search;

use axum::{middleware, routing::get, Router};

use crate::state::AppState;

/// Build the application router
///
/// Every route sits behind the peer address allow-list.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/search", search::router())
        .nest("/index", index::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            access::ip_whitelist,
        ))
        .with_state(state)
}
