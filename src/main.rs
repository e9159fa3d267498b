use anyhow::Result;
use dotenvy::dotenv;
use futures::StreamExt;
use shoe_inventory::api;
use shoe_inventory::config::Config;
use shoe_inventory::storage::memory::{MemoryLedger, MemoryStore};
use shoe_inventory::storage::postgres::PostgresStorage;
use shoe_inventory::storage::{InventoryStore, SaleRecorder};
use shoe_inventory::{Inventory, InventoryEvent};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    match config.database_url() {
        Some(database_url) => {
            let storage = PostgresStorage::connect(database_url).await?;
            let inventory = Inventory::new(storage.clone(), storage.clone())
                .with_low_stock_threshold(*config.low_stock_threshold());
            serve(inventory, &config).await?;
            storage.close().await?;
        }
        None => {
            warn!("DATABASE_URL not set; sales and stock live in memory only");
            let inventory = Inventory::new(MemoryStore::new(), MemoryLedger::new())
                .with_low_stock_threshold(*config.low_stock_threshold());
            serve(inventory, &config).await?;
        }
    }

    info!("shutdown complete");
    Ok(())
}

async fn serve<S: InventoryStore, L: SaleRecorder<S>>(inventory: Inventory<S, L>, config: &Config) -> Result<()> {
    let inventory = Arc::new(inventory);

    let mut notification_stream = inventory.subscribe();
    tokio::spawn(async move {
        while let Some(Ok(event)) = notification_stream.next().await {
            match event {
                InventoryEvent::Created(item) => debug!(id = item.id, brand = %item.brand, "item created"),
                InventoryEvent::Updated(item) => debug!(id = item.id, "item updated"),
                InventoryEvent::Sold { item, sale } => {
                    debug!(id = item.id, sale_id = sale.id, left = item.quantity, "item sold")
                }
                InventoryEvent::Restocked(item) => debug!(id = item.id, quantity = item.quantity, "item restocked"),
                InventoryEvent::Deleted(id) => debug!(id, "item deleted"),
            }
        }
    });

    let app = api::router(inventory, &config.allowed_origins());
    let listener = TcpListener::bind(("0.0.0.0", *config.port())).await?;
    info!(addr = %listener.local_addr()?, "API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
