//! REST backend for a book catalog: signup/login, authenticated book
//! listings with uploaded cover images, one-rating-per-user averages and a
//! top-rated listing.
//!
//! Stored state lives in a document store (redis, or an in-process map for
//! local runs) as two collections: `users` and `books`. Cover images are
//! written to a flat directory and served statically under `/images`.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        Method,
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
    services::ServeDir,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod books;
pub mod config;
pub mod database;
pub mod error;
pub mod guard;
pub mod images;
pub mod ratings;
pub mod state;
pub mod tokens;

use state::AppState;

/// Covers come in as multipart uploads; the axum default of 2 MB is too
/// tight for phone photos.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let address = format!("0.0.0.0:{}", state.config.port);
    let app = router(state).layer(cors);

    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/books", get(books::list).post(books::create))
        .route("/api/books/bestrating", get(books::best_rating))
        .route(
            "/api/books/:id",
            get(books::get_one).put(books::update).delete(books::delete),
        )
        .route("/api/books/:id/rating", post(ratings::rate))
        .nest_service("/images", ServeDir::new(&state.config.images_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
