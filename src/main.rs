mod admin;
mod ai;
mod app;
mod attachments;
mod auth;
mod config;
mod error;
mod extract;
mod notes;
mod ownership;
mod response;
mod state;
mod tags;

use crate::auth::repo::User;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "quillbox=debug,axum=info,tower_http=info".to_string());
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

    let state = state::AppState::init().await?;

    sqlx::migrate!("./migrations").run(&state.db).await?;
    User::ensure_admin(&state.db, &state.config.admin).await?;

    let config = state.config.clone();
    let app = app::build_app(state);
    app::serve(app, &config).await
}
