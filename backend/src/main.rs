use std::sync::Arc;
use std::time::Duration;

use student_living_backend::config::{Config, IdentityBackend, IdentityConfig};
use student_living_backend::identity::{IdentityProvider, InMemoryIdentityProvider, RestIdentityProvider};
use student_living_backend::session::SessionManager;
use student_living_backend::store::{RecordStore, SqliteRecordStore};
use student_living_backend::{logging, routes, AppState};
use student_living_common::Principal;
use tokio::net::TcpListener;

fn build_identity(config: &IdentityConfig) -> Result<Arc<dyn IdentityProvider>, Box<dyn std::error::Error>> {
    match config.backend {
        IdentityBackend::Rest => {
            if config.api_key.is_empty() {
                tracing::warn!("identity.api_key is empty, sign-in calls will be rejected");
            }
            let provider = RestIdentityProvider::new(
                &config.base_url,
                &config.api_key,
                Duration::from_secs(config.timeout_secs),
            )?;
            tracing::info!("Using REST identity provider at {}", config.base_url);
            Ok(Arc::new(provider))
        }
        IdentityBackend::Memory => {
            let provider = InMemoryIdentityProvider::new();
            for account in &config.accounts {
                let mut principal = Principal::new(&account.id).with_email(&account.email);
                if let Some(name) = &account.display_name {
                    principal = principal.with_display_name(name);
                }
                provider.add_account(&account.email, &account.password, principal);
            }
            tracing::info!(
                "Using in-memory identity provider with {} account(s)",
                config.accounts.len()
            );
            Ok(Arc::new(provider))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().map_err(|e| format!("Failed to load configuration: {}", e))?;

    logging::init_tracing(&config.logging.level);

    tracing::info!("Starting Student Living session service");

    // Initialize components
    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(&config.store.database_url)?);
    tracing::info!("Opened record store at {}", config.store.database_url);

    let identity = build_identity(&config.identity)?;
    let scope = SessionManager::start(identity, store.clone());

    let state = Arc::new(AppState {
        config: config.clone(),
        session: scope.handle(),
        store,
    });

    let app = routes::app(state);

    // Start server
    let addr = format!("{}:{}", config.api.host, config.api.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scope.shutdown().await;
    tracing::info!("Session provider stopped");

    Ok(())
}
