//! # Bookline API
//!
//! The API crate provides the web server implementation for the Bookline
//! reservation service. It defines RESTful endpoints for publishing provider
//! slots, booking and cancelling them, and listing availability.
//!
//! ## Architecture
//!
//! This crate follows a layered architecture:
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate requests into reservation-engine calls
//! - **Middleware**: Provide cross-cutting concerns like error handling
//! - **Config**: Handle environment and application configuration
//!
//! The API uses Axum as the web framework; all slot and booking mutation
//! flows through the `ReservationEngine` so the no-double-booking guarantee
//! is upheld regardless of how many server tasks run concurrently.
//!
//! The layer performs no authentication (that concern belongs to a gateway
//! in front of this service); request payloads carry the principal id and
//! role, which handlers pass to the engine as its capability tag.

/// Configuration module for API settings
pub mod config;
/// Request handlers that drive the reservation engine
pub mod handlers;
/// Middleware for error handling
pub mod middleware;
/// Route definitions and API endpoint structure
pub mod routes;

use std::sync::Arc;

use axum::Router;
use bookline_core::clock::SystemClock;
use bookline_core::engine::ReservationEngine;
use bookline_core::notify::LogNotifier;
use bookline_db::store::PgStore;
use eyre::Result;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

/// The engine wiring used by the server: Postgres storage, wall-clock time,
/// log-stream notifications.
pub type AppEngine = ReservationEngine<PgStore, SystemClock, LogNotifier>;

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    /// The reservation engine; the single mutation surface for slots and
    /// bookings
    pub engine: AppEngine,
}

/// Starts the API server with the provided configuration and database
/// connection
///
/// This function initializes logging, wires the reservation engine to the
/// Postgres store, configures routes, and starts the HTTP server.
pub async fn start_server(config: config::ApiConfig, db_pool: PgPool) -> Result<()> {
    // Initialize tracing for logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Create shared state with dependencies
    let engine = ReservationEngine::new(PgStore::new(db_pool), SystemClock, LogNotifier);
    let state = Arc::new(ApiState { engine });

    // Build the application router with all routes
    let app = Router::new()
        // Health check endpoints
        .merge(routes::health::routes())
        // Slot management endpoints
        .merge(routes::slots::routes())
        // Booking endpoints
        .merge(routes::bookings::routes())
        // Attach shared state to all routes
        .with_state(state);

    // Apply CORS configuration if origins are specified
    let app = if let Some(origins) = &config.cors_origins {
        let cors = tower_http::cors::CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::ACCEPT,
            ])
            .allow_origin(
                origins
                    .iter()
                    .map(|origin| origin.parse().unwrap())
                    .collect::<Vec<_>>(),
            )
            .allow_credentials(true);

        app.layer(cors)
    } else {
        app
    };

    // Add request timeout middleware; lock waits on a contended slot are
    // bounded by this as well
    let app = app.layer(tower_http::timeout::TimeoutLayer::new(
        std::time::Duration::from_secs(config.request_timeout),
    ));

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
