//! HTTP API for the hall of fame committee vote.
//!
//! Administrators load nominations, committee members sign in and pick up to
//! eight people they support, and everyone can see the ranked tally.
//!
//!
//!
//! # Request Flow
//! - Client sends `Authorization: Bearer <token>` on every call except login, setup and health
//! - [`extract::AuthUser`] verifies the token before the handler runs, [`extract::AdminUser`] also checks the role
//! - Handlers delegate to the [`ledger`] crate, which owns every query
//! - Failures come back as `{"error": "..."}` with 400, 401, 403, 404, 409 or 500
//!
//!
//!
//! # Routes
//!
//! Public
//! - `GET /api/health`
//! - `POST /api/auth/login`
//! - `POST /api/setup`, guarded by the setup key, works once
//!
//! Any signed-in user
//! - `POST /api/auth/change-password`
//! - `GET /api/nominations`, `GET /api/nominations/{id}`
//! - `GET /api/people`, `GET /api/people/{name}/{year}/nominations`, `GET /api/people/{name}/nominations`
//! - `GET /api/ballot/my-selections`, `POST /api/ballot`
//! - `GET /api/results`, `GET /api/stats`
//!
//! Admin only
//! - `POST /api/auth/register`
//! - `POST /api/nominations`, `PUT /api/nominations/{id}`, `DELETE /api/nominations/{id}`
//! - `GET /api/users`, `DELETE /api/users/{id}`
//! - `POST /api/admin/import-nominations`
//!
//!
//!
//! # Notes
//!
//! ## Ballots
//! Submitting a ballot replaces the caller's whole selection set in one transaction.
//! Two tabs submitting at once is fine, the last commit wins.
//!
//! ## Results
//! Percentages are relative to the number of committee accounts at the moment of the
//! request. The "top 8" line is drawn by the client, the server enforces nothing there.
//!
//!
//!
//! # Setup
//!
//! Secrets are read from `/run/secrets/<NAME>` first, then the environment.
//! ```sh
//! export JWT_SECRET=$(openssl rand -hex 32)
//! export SETUP_KEY=$(openssl rand -hex 16)
//! export DATABASE_URL=sqlite://nominations.db
//! RUST_LOG=info cargo run -p hall
//! ```
//!
//! Create the first admin and the committee.
//! ```sh
//! curl -X POST localhost:3001/api/setup -H 'Content-Type: application/json' \
//!   -d '{"setupKey":"...","adminUsername":"admin","adminPassword":"...","committee":["kpipe"]}'
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use config::Config;
use error::AppError;
use routes::*;
use state::State;

pub async fn start_server() -> Result<(), AppError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config).await?;

    info!("Starting server...");

    let app = app(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind {address}: {e}")))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    info!("Server shutting down...");
    state.store.close().await;

    Ok(())
}

pub fn app(state: Arc<State>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/setup", post(setup_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/change-password", post(change_password_handler))
        .route(
            "/api/nominations",
            get(list_nominations_handler).post(create_nomination_handler),
        )
        .route(
            "/api/nominations/{id}",
            get(get_nomination_handler)
                .put(update_nomination_handler)
                .delete(delete_nomination_handler),
        )
        .route("/api/people", get(people_handler))
        .route(
            "/api/people/{name}/{year}/nominations",
            get(person_nominations_handler),
        )
        .route(
            "/api/people/{name}/nominations",
            get(yearless_person_nominations_handler),
        )
        .route("/api/ballot", post(ballot_handler))
        .route("/api/ballot/my-selections", get(my_selections_handler))
        .route("/api/results", get(results_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/users", get(list_users_handler))
        .route("/api/users/{id}", axum::routing::delete(delete_user_handler))
        .route("/api/admin/import-nominations", post(import_handler))
        .layer(cors(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    match config
        .frontend_url
        .as_deref()
        .map(HeaderValue::from_str)
    {
        Some(Ok(origin)) => cors.allow_origin(origin),
        Some(Err(e)) => {
            warn!("Ignoring invalid FRONTEND_URL: {e}");
            cors.allow_origin(Any)
        }
        None => cors.allow_origin(Any),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
