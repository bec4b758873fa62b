use std::sync::Arc;

use signup_service::{app, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Arc::new(AppConfig::from_env()?);

    let default_filter = if config.debug {
        "signup_service=debug,axum=info,tower_http=debug,sqlx=debug"
    } else {
        "signup_service=debug,axum=info,tower_http=info"
    };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    tracing::info!(project = %config.project_name, debug = config.debug, "starting");

    let app_state = AppState::init(config.clone()).await?;
    let router = app::build_app(app_state);
    app::serve(router, &config).await?;

    tracing::info!("server stopped");
    Ok(())
}
