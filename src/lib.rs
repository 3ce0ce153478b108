//! Promo Registry Library
//!
//! This crate provides the core functionality for the Promo Registry API:
//! a CRUD + validation facade for promotional discount codes persisted in a
//! pluggable key-value settings store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod openapi;
pub mod services;
pub mod store;
pub mod tracing;

use axum::Router;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub discounts: services::DiscountService,
    pub store: Arc<dyn store::SettingsStore>,
}

impl AppState {
    pub fn new(
        config: config::AppConfig,
        event_sender: events::EventSender,
        store: Arc<dyn store::SettingsStore>,
    ) -> Self {
        let discounts = services::DiscountService::new(store.clone(), Some(event_sender.clone()))
            .with_registry_key(config.registry_namespace.clone());
        Self {
            config,
            event_sender,
            discounts,
            store,
        }
    }
}

// API routes function
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/discounts", handlers::discounts::discounts_routes())
}

/// Full application router: API, health probes, OpenAPI docs, the access
/// logger, and the request-id middleware. Request-id is the outermost layer
/// so both the access log and error payloads can pick the id up.
pub fn app_router(state: Arc<AppState>, logging: Arc<logging::LoggingState>) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .nest("/health", handlers::health::health_routes())
        .merge(openapi::swagger_ui())
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(
            logging,
            logging::logging_middleware,
        ))
        .layer(axum::middleware::from_fn(
            crate::tracing::request_id_middleware,
        ))
}
