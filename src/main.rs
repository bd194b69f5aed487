use parkeasy::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{self, MemoryRepository, PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, persistence, admin seeding, then the
/// HTTP server.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration
    // `.env` is loaded first so it can feed `AppConfig::load`.
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging filter
    // RUST_LOG wins; otherwise verbose for this crate and the HTTP stack.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "parkeasy=debug,tower_http=info,axum=trace".into());

    // 3. Log format per environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Persistence
    // Postgres when DATABASE_URL is set (always in production), otherwise the
    // embedded store, which is lost on restart.
    let repo: RepositoryState = match config.db_url.as_deref() {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Connected to Postgres, migrations applied");
            Arc::new(PostgresRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store");
            Arc::new(MemoryRepository::new())
        }
    };

    // 5. Admin accounts
    repository::seed_admins(repo.as_ref(), &config).await;

    // 6. Router and server
    let port = config.port;
    let app = create_router(AppState::new(repo, config));

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;

    tracing::info!("Listening on 0.0.0.0:{port}");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
