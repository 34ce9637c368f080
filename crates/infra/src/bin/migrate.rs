//! Apply the SlabTrack schema to the database named by `DATABASE_URL`.

use anyhow::Context;

use slabtrack_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to read configuration")?;
    slabtrack_observability::init_with(config.log_format);

    slabtrack_infra::connect_store(&config)
        .await
        .context("failed to prepare the card store")?;

    tracing::info!("schema is up to date");
    Ok(())
}
