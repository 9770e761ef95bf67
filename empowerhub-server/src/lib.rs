mod analytics;
mod auth;
mod bookings;
mod config;
mod context;
mod docs;
mod errors;
mod logging;
mod messages;
mod progress;
mod resources;
mod schemas;
mod serialized;
mod users;

use std::{
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use axum::{extract::State, routing::get, Json, Router as AxumRouter};
use empowerhub_core::Hub;
use log::{info, warn};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use utoipa::ToSchema;

pub use config::Config;
pub use context::ServerContext;
pub use logging::init_logger;

use crate::errors::ServerResult;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 8080;

/// How often expired login sessions are swept out of the store
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub type Router = AxumRouter<ServerContext>;

/// Starts the hub server
pub async fn run_server(hub: Arc<Hub>, config: Config) {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, config.port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    spawn_session_sweep(hub.clone());

    let api_router = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .nest("/sessions", bookings::router())
        .nest("/resources", resources::router())
        .nest("/messages", messages::router())
        .nest("/progress", progress::router())
        .nest("/analytics", analytics::router());

    let root_router = Router::new()
        .nest("/api", api_router)
        .route("/api.json", get(docs::docs))
        .route("/health", get(health))
        .layer(cors)
        .with_state(ServerContext { hub });

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {}", config.port);

    axum::serve(listener, root_router.into_make_service())
        .await
        .unwrap();
}

#[derive(Debug, Serialize, ToSchema)]
struct Health {
    status: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, body = Health, description = "Service is up and the store is reachable"),
        (status = 500, description = "The store is unreachable")
    )
)]
async fn health(State(context): State<ServerContext>) -> ServerResult<Json<Health>> {
    context.hub.database().check_connection().await?;

    Ok(Json(Health {
        status: "ok".to_string(),
    }))
}

/// Expired sessions are also cleared opportunistically on login, but an idle
/// instance shouldn't hold on to stale tokens for days
fn spawn_session_sweep(hub: Arc<Hub>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);

        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;

            match hub.database().clear_expired_sessions().await {
                Ok(0) => {}
                Ok(cleared) => info!("Cleared {cleared} expired sessions"),
                Err(e) => warn!("Failed to clear expired sessions: {e}"),
            }
        }
    });
}
