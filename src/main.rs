use anyhow::Context as _;
use mediagen::{Ctx, Settings, routes};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load().context("Failed to load configuration")?;
    let bind = settings.bind.clone();
    let ctx = Ctx::new(settings);

    let app = routes::mount().with_state(ctx);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("Listening on {bind}");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
