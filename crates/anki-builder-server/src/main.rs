use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use anki_builder_server::build_router;
use anki_builder_server::config::Settings;
use anki_builder_server::state::AppState;
use anki_builder_server::utils::logger::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = init_logger()?;

    info!("Starting Anki builder server...");

    let settings = Settings::load()?;
    info!(
        "Configuration loaded (model={}, chunk_max_tokens={}, chunk_limit={})",
        settings.llm.model, settings.pipeline.chunk_max_tokens, settings.pipeline.chunk_limit
    );

    let state = Arc::new(AppState::from_settings(&settings)?);
    let app = build_router(state, &settings.server.allowed_origins);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
