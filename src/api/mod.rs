pub mod health;
pub mod payments;
pub mod webhooks;

use crate::checkout::{CheckoutService, Reconciler};
use crate::config::Config;
use crate::db::Repository;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub checkout: Arc<CheckoutService>,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        checkout: Arc<CheckoutService>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            repo,
            config,
            checkout,
            reconciler,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/payments/create-intent", post(payments::create_intent))
        .route("/payments/cancel-intent", post(payments::cancel_intent))
        .route("/webhooks/payment", post(webhooks::handle_webhook))
        .layer(cors)
        .with_state(state)
}
