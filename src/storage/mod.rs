use crate::models::{ItemFilter, ItemPatch, NewItem, NewSale};
use crate::{InventoryItem, SaleRecord};
use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::DbErr;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(i32),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for stocked items.
#[async_trait]
pub trait InventoryStore: Send + Sync + 'static {
    async fn find_by_id(&self, id: i32) -> StoreResult<InventoryItem>;
    /// Matching items, most recently created first.
    async fn find_many(&self, filter: &ItemFilter) -> StoreResult<Vec<InventoryItem>>;
    async fn insert(&self, item: NewItem) -> StoreResult<InventoryItem>;
    async fn update_by_id(&self, id: i32, patch: ItemPatch) -> StoreResult<InventoryItem>;
    async fn delete_by_id(&self, id: i32) -> StoreResult<()>;
}

/// Append-only sale history.
#[async_trait]
pub trait SaleLedger: Send + Sync + 'static {
    async fn append(&self, sale: NewSale) -> StoreResult<SaleRecord>;
    /// Records created at or after `since` (all when `None`), newest first.
    async fn find_many(&self, since: Option<DateTimeWithTimeZone>) -> StoreResult<Vec<SaleRecord>>;
}

/// Commits a sale: the item's stock change and the ledger record together.
///
/// The default writes the stock first and puts it back if the append fails.
/// Backends that can share a transaction across both writes override it.
#[async_trait]
pub trait SaleRecorder<S: InventoryStore>: SaleLedger {
    async fn record_sale(
        &self,
        store: &S,
        before: &InventoryItem,
        stock: ItemPatch,
        sale: NewSale,
    ) -> StoreResult<(InventoryItem, SaleRecord)> {
        let item = store.update_by_id(before.id, stock).await?;
        match self.append(sale).await {
            Ok(record) => Ok((item, record)),
            Err(err) => {
                warn!(id = before.id, %err, "ledger append failed, restoring stock");
                let restore = ItemPatch::stock(before.quantity, before.sold);
                if let Err(restore_err) = store.update_by_id(before.id, restore).await {
                    error!(id = before.id, %restore_err, "failed to restore stock after ledger failure");
                }
                Err(err)
            }
        }
    }
}

pub mod memory;
pub mod postgres;
