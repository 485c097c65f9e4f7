//! Application startup and server initialization.

use tokio::net::TcpListener;
use tracing::info;

use crate::auth::StagingGate;
use crate::config::ServerConfig;
use crate::routes;
use crate::state::AppState;

/// Builds the gate from the configured options and the environment, then
/// serves the placeholder site behind it on `bind_address`.
///
/// # Errors
///
/// Returns an error if the server fails to bind to the specified address
/// or encounters a runtime error during execution.
pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let gate = StagingGate::from_options(config.staging.clone());
    if let Err(missing) = gate.config().validate() {
        info!("Gate will serve its setup page until configured: {}", missing);
    }

    let app = routes::create_router(AppState::new(gate));

    info!("Starting server on {}", config.bind_address);
    let listener = TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
