use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::{self, TraceLayer};
use tracing::Level;

use crate::config::Config;
use crate::memory_repo::InMemoryRepository;
use crate::{build_app, AppState, DeviceClient};

fn build_cors(config: &Config) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::any())
        .allow_headers(AllowHeaders::any())
}

/// Bind, log in to the device, serve until `shutdown` resolves, then log out.
///
/// The listener is bound before any device login, so a bind failure returns
/// without a session to release.
pub async fn run<F>(config: Config, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Starting server on {}", listener.local_addr()?);

    let mut client = DeviceClient::new(
        &config.device_base_url,
        &config.device_login,
        &config.device_password,
        config.device_timeout,
    )
    .map_err(io::Error::other)?;

    if config.auto_login {
        match client.login().await {
            Ok(_) => tracing::info!("Logged in to device at {}", config.device_base_url),
            Err(e) => tracing::warn!(
                error = %e,
                "Initial device login failed; retrying on first request"
            ),
        }
    }

    let device = Arc::new(Mutex::new(client));
    let state = AppState {
        device: device.clone(),
        repo: Arc::new(InMemoryRepository::new()),
    };

    let cors = build_cors(&config);

    let app = build_app(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_payload_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_request(trace::DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    trace::DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(tower_http::LatencyUnit::Millis),
                ),
        )
        .layer(cors);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    // Release the device session however the server stopped.
    device.lock().await.logout().await;
    tracing::info!("Device session closed");

    served
}
