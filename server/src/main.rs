//! Inventory ERP server.
//!
//! Run from repo root: `cargo run -p inventory-erp-server`
//! Settings come from the environment (a `.env` file is loaded first).

use inventory_erp::{
    app_with_layers, ensure_database_exists, ensure_entity_tables, ensure_sys_tables, seed_mock_data, AppInfo,
    AppState, Backend, EntityStore, MemoryStore, PageStore, Persistence, PgStore, Settings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for SIGTERM"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("inventory_erp=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let info = AppInfo {
        environment: settings.environment.as_str().to_string(),
        api_base_url: settings.api_base_url.clone(),
    };
    let pages = PageStore::new(settings.pages_dir.clone());

    let state = match settings.backend {
        Backend::Memory => {
            tokio::fs::create_dir_all(&settings.data_dir).await?;
            let store = Arc::new(MemoryStore::new());
            let persistence = Persistence::File(settings.data_dir.clone());
            let state = AppState::new(store.clone(), persistence, pages, info).await?;
            if settings.seed_mock_data {
                seed_mock_data(&store, &*state.model()?)?;
            }
            state
        }
        Backend::Postgres => {
            ensure_database_exists(&settings.database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(20)
                .acquire_timeout(Duration::from_secs(2))
                .idle_timeout(Duration::from_secs(30))
                .connect(&settings.database_url)
                .await?;
            ensure_sys_tables(&pool).await?;
            let store: Arc<dyn EntityStore> = Arc::new(PgStore::new(pool.clone()));
            let state = AppState::new(store, Persistence::Postgres(pool.clone()), pages, info).await?;
            ensure_entity_tables(&pool, &*state.model()?).await?;
            state
        }
    };

    let app = app_with_layers(state, &settings);
    let listener = TcpListener::bind((settings.host.as_str(), settings.port)).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        environment = settings.environment.as_str(),
        backend = ?settings.backend,
        "inventory-erp listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
