use std::net::TcpListener;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use user_api::auth::TokenIssuer;
use user_api::configuration::get_configuration;
use user_api::startup::run;
use user_api::store::{InMemoryUserStore, PgUserStore, UserStore};
use user_api::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let issuer = TokenIssuer::from_settings(&configuration.jwt);

    let store: Arc<dyn UserStore> = if configuration.database.in_memory {
        tracing::warn!("Using in-memory user store; accounts are lost on restart");
        Arc::new(InMemoryUserStore::new())
    } else {
        tracing::info!("Attempting to connect to database");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&configuration.database.connection_string())
            .await
            .map_err(|e| {
                tracing::error!("Failed to create connection pool: {}", e);
                std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "Database connection error",
                )
            })?;

        let store = PgUserStore::new(pool);
        store.migrate().await.map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
        })?;

        tracing::info!("Database connection pool created successfully");
        Arc::new(store)
    };

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, store, issuer)?.await
}
