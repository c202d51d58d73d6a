//! callguard gateway binary.
//!
//! Loads `$CALLGUARD_CONFIG` (default `callguard.yaml`), bootstraps every
//! configured protocol and serves the validation API until ctrl-c.

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use callguard_gateway::{app_state, config, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = config::config_path();
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.gateway.listen.parse()?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, protocols = state.registry().len(), "callguard-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            state.set_draining();
            tracing::info!("shutdown requested; draining");
        })
        .await?;
    Ok(())
}
