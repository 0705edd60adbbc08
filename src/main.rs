use std::sync::Arc;

use chatnest::{AppState, auth, config::Config, db, gateway::GeminiGateway, session, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = Config::from_env()?;

    let db_pool = db::connect(&config.database_url).await?;
    let clients = auth::Clients::from_file(&config.oauth_clients_file, &config.public_url)?;
    let gateway = Arc::new(GeminiGateway::new(&config.gemini)?);

    let app_state = AppState {
        db_pool,
        clients,
        gateway,
    };
    let app = chatnest::app(
        app_state,
        session::session_layer(config.session_secure, config.session_idle_minutes),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
