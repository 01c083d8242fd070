pub mod config;
pub mod device;
pub mod error;
pub mod handlers;
pub mod memory_repo;
pub mod models;
pub mod repository;
pub mod server;
pub mod util;

use axum::{
    routing::{get, post, put},
    Router,
};
use repository::UserMapRepository;
use std::sync::Arc;
use tokio::sync::Mutex;

pub use device::{DeviceClient, DeviceError};

#[derive(Clone)]
pub struct AppState {
    /// One device session shared by every request; the mutex serialises calls.
    pub device: Arc<Mutex<DeviceClient>>,
    pub repo: Arc<dyn UserMapRepository>,
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/users",
            post(handlers::users::create_user).get(handlers::users::list_users),
        )
        .route(
            "/api/users/:registration",
            put(handlers::users::update_user).delete(handlers::users::delete_user),
        )
        .route(
            "/api/users/:registration/image",
            post(handlers::images::set_user_image),
        )
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health_check))
}

/// Build the full application router (used by main and tests).
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(user_routes())
        .merge(health_routes())
        .with_state(state)
}
