use anyhow::{Context, Result};
use slate_grader::config::{init_tracing, Config};
use slate_grader::data::load_state;
use slate_grader::server::{router, AppState};
use slate_grader::store::InMemoryStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let state_path = config.state_path();
    let state = load_state(&state_path)?.unwrap_or_default();
    info!(
        path = %state_path.display(),
        matchups = state.matchups.len(),
        "Slate loaded"
    );

    let app = router(AppState {
        store: Arc::new(InMemoryStore::new(state)),
        default_wager: config.default_wager,
    })
    .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Starting web server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await
        .context("Server error")?;

    Ok(())
}
