//! HTTP API for the bracket engine.
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                              - Storage health check
//! POST /api/v1/brackets                     - Create a bracket
//! GET  /api/v1/brackets/{id}                - Bracket, progress and matches
//! GET  /api/v1/brackets/{id}/standings      - Points table
//! POST /api/v1/brackets/{id}/advance        - Generate the next round by hand
//! POST /api/v1/brackets/{id}/champion       - Decide the champion by hand
//! GET  /api/v1/events/{event_id}/brackets   - Brackets of an event, newest first
//! PUT  /api/v1/matches/{id}/result          - Record a match result
//! PUT  /api/v1/matches/{id}/schedule        - Set match date and venue
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use eb_server::api::{create_router, AppState};
//! use event_bracket::bracket::BracketManager;
//! use event_bracket::db::{MemoryBracketStore, StaticRoster};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState {
//!     manager: Arc::new(BracketManager::new(Arc::new(MemoryBracketStore::new()))),
//!     roster: Arc::new(StaticRoster::new()),
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. Put the server behind a reverse proxy
//! that restricts origins in production.

pub mod brackets;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use event_bracket::bracket::BracketManager;
use event_bracket::db::{BracketStore, TeamRoster};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// - `manager`: Bracket engine over the configured store
/// - `roster`: Source of confirmed teams when a request omits `team_ids`
pub struct AppState<S: BracketStore> {
    pub manager: Arc<BracketManager<S>>,
    pub roster: Arc<dyn TeamRoster>,
}

impl<S: BracketStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            roster: self.roster.clone(),
        }
    }
}

/// Create the API router with all endpoints and middleware.
pub fn create_router<S: BracketStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health_check::<S>))
        .nest("/api/v1", create_v1_router::<S>())
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(axum::middleware::from_fn(request_id::request_id_middleware)),
        )
        .with_state(state)
}

fn create_v1_router<S: BracketStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/brackets", post(brackets::create_bracket::<S>))
        .route("/brackets/{bracket_id}", get(brackets::get_bracket::<S>))
        .route(
            "/brackets/{bracket_id}/standings",
            get(brackets::get_standings::<S>),
        )
        .route(
            "/brackets/{bracket_id}/advance",
            post(brackets::advance_round::<S>),
        )
        .route(
            "/brackets/{bracket_id}/champion",
            post(brackets::set_champion::<S>),
        )
        .route(
            "/events/{event_id}/brackets",
            get(brackets::list_event_brackets::<S>),
        )
        .route(
            "/matches/{match_id}/result",
            put(brackets::record_result::<S>),
        )
        .route(
            "/matches/{match_id}/schedule",
            put(brackets::update_schedule::<S>),
        )
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"1.0.0","database":true,"timestamp":"2026-10-14T10:30:00Z"}
/// ```
async fn health_check<S: BracketStore + 'static>(
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    let db_healthy = match state.manager.store().health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            false
        }
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
