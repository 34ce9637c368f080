//! Infrastructure for SlabTrack: environment configuration and the Postgres
//! card store, plus wiring that assembles a ready-to-use lifecycle service.

pub mod card_store;
pub mod config;

use thiserror::Error;

use slabtrack_cards::{CardLifecycleService, StoreError};

pub use card_store::PostgresCardStore;
pub use config::{AppConfig, ConfigError, DatabaseConfig};

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Connect to Postgres and make sure the schema exists.
pub async fn connect_store(config: &AppConfig) -> Result<PostgresCardStore, InfraError> {
    let url = config.database.require_url()?;
    let store = PostgresCardStore::connect(url, config.database.max_connections).await?;
    store.ensure_schema().await?;

    tracing::info!(
        max_connections = config.database.max_connections,
        "card store ready"
    );
    Ok(store)
}

/// Connect the store and build the lifecycle service around it.
pub async fn card_service(
    config: &AppConfig,
) -> Result<CardLifecycleService<PostgresCardStore>, InfraError> {
    let store = connect_store(config).await?;
    tracing::debug!(empty_listing = ?config.service.empty_listing, "card service configured");
    Ok(CardLifecycleService::with_config(store, config.service))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_database_url_fails_before_connecting() {
        let config = AppConfig::from_lookup(|_| None).unwrap();

        let err = card_service(&config).await.unwrap_err();
        assert!(matches!(err, InfraError::Config(ConfigError::Missing("DATABASE_URL"))));

        let err = connect_store(&config).await.unwrap_err();
        assert_eq!(err.to_string(), "configuration error: DATABASE_URL must be set");
    }
}
