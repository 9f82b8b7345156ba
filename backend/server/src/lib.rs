//! HTTP surface of the Oke Raffle event app.
//!
//!
//!
//! # Routes
//!
//! Public
//! - `POST /register`: form post, redirects to `/success?name=..` (`&existing=true` on a repeat)
//! - `GET /registration/status`
//! - `GET /participants`: names by alphabet, winners with their prize
//! - `POST /admin/login`: admin email and password for a bearer token
//!
//! Admin, `Authorization: Bearer <token>`
//! - `GET /admin/stats`
//! - `PUT /admin/registration/status`
//! - `GET /admin/registrations`, `GET /admin/winners`: `search`, `sort`, `direction`, `page`
//! - `GET|POST /admin/items`, `PUT|PATCH|DELETE /admin/items/{id}`
//! - `POST /admin/import`: CSV text body
//! - `GET /admin/raffle`, `POST /admin/raffle/{draft,assign,reset,confirm}`, `GET /admin/raffle/prizes`
//!
//!
//!
//! # Errors
//!
//! Every failure is JSON `{ "message": .., "errors"?: .. }`.
//!
//! | status | meaning |
//! |---|---|
//! | 400 | malformed body or query, or a raffle rule refused the request |
//! | 401 | missing, bad or expired admin token |
//! | 403 | registration closed, or the store denied the request |
//! | 404 | item not found |
//! | 409 | item id already in use |
//! | 415 | body sent without the expected content type |
//! | 422 | field validation, CSV rejection, or a body of the wrong shape |
//! | 503 | store unreachable |
//!
//!
//!
//! # Setup
//!
//! Secrets are read from `/run/secrets/<NAME>`, falling back to the environment.
//! ```sh
//! ADMIN_PASSWORD=change-me SESSION_SECRET=$(openssl rand -hex 32) \
//!   REDIS_URL=redis://localhost:6379 RUST_LOG=info cargo run -p raffle
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod notify;
pub mod routes;
pub mod state;

use auth::{login_handler, require_admin};
use routes::{
    assign_handler, confirm_handler, create_item_handler, delete_item_handler, draft_handler,
    import_handler, items_handler, participants_handler, patch_item_handler, prizes_handler,
    raffle_handler,
    register_handler, registration_status_handler, registrations_handler, replace_item_handler,
    reset_handler, set_registration_status_handler, stats_handler, winners_handler,
};
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let admin = Router::new()
        .route("/stats", get(stats_handler))
        .route("/registration/status", put(set_registration_status_handler))
        .route("/registrations", get(registrations_handler))
        .route("/items", get(items_handler).post(create_item_handler))
        .route(
            "/items/{id}",
            put(replace_item_handler)
                .patch(patch_item_handler)
                .delete(delete_item_handler),
        )
        .route("/import", post(import_handler))
        .route("/winners", get(winners_handler))
        .route("/raffle", get(raffle_handler))
        .route("/raffle/draft", post(draft_handler))
        .route("/raffle/prizes", get(prizes_handler))
        .route("/raffle/assign", post(assign_handler))
        .route("/raffle/reset", post(reset_handler))
        .route("/raffle/confirm", post(confirm_handler))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route("/login", post(login_handler));

    Router::new()
        .route("/register", post(register_handler))
        .route("/registration/status", get(registration_status_handler))
        .route("/participants", get(participants_handler))
        .nest("/admin", admin)
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await?;
    info!("Using {} store", state.ledger.backend_tag());

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
