pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod models;
pub mod notifications;
pub mod report;
pub mod storage;

pub use entities::inventory_items::Model as InventoryItem;
pub use entities::sales::Model as SaleRecord;
pub use error::{InventoryError, Result};
pub use models::{ItemFilter, ItemPatch, NewItem, RestockOrder, SaleOutcome, SellOrder};
pub use notifications::InventoryEvent;
pub use report::{ProfitSummary, ReportRange};

use chrono::{Local, Utc};
use dashmap::DashMap;
use models::NewSale;
use rust_decimal::Decimal;
use std::sync::Arc;
use storage::{InventoryStore, SaleLedger, SaleRecorder};
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, instrument, warn, Instrument, Span};

const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

type LockTable = DashMap<i32, Arc<Mutex<()>>>;

/// Exclusive access to one item. The table entry goes away with the last holder.
struct ItemLock {
    id: i32,
    table: Arc<LockTable>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ItemLock {
    fn drop(&mut self) {
        self.guard.take();
        self.table
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Stock bookkeeping over an item store and a sale ledger.
///
/// Mutations of one item are serialized through a per-item async lock, so a
/// sell always checks stock against the latest committed quantity.
pub struct Inventory<S: InventoryStore, L: SaleLedger> {
    store: Arc<S>,
    ledger: Arc<L>,
    item_locks: Arc<LockTable>,
    notification_tx: broadcast::Sender<InventoryEvent>,
    low_stock_threshold: i32,
}

impl<S: InventoryStore, L: SaleLedger> Inventory<S, L> {
    pub fn new(store: S, ledger: L) -> Self {
        let (notification_tx, _) = broadcast::channel(100);
        Self {
            store: Arc::new(store),
            ledger: Arc::new(ledger),
            item_locks: Arc::default(),
            notification_tx,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }

    pub fn with_low_stock_threshold(mut self, threshold: i32) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn subscribe(&self) -> BroadcastStream<InventoryEvent> {
        BroadcastStream::new(self.notification_tx.subscribe())
    }

    fn publish(&self, event: InventoryEvent) {
        // No subscribers is not an error.
        let _ = self.notification_tx.send(event);
    }

    async fn lock_item(&self, id: i32) -> ItemLock {
        let lock = self.item_locks.entry(id).or_default().clone();
        let guard = lock.lock_owned().await;
        ItemLock {
            id,
            table: Arc::clone(&self.item_locks),
            guard: Some(guard),
        }
    }

    #[instrument(skip(self, item), fields(brand = %item.brand))]
    pub async fn create_item(&self, item: NewItem) -> Result<InventoryItem> {
        let item = self.store.insert(item.validated()?).await?;
        info!(id = item.id, quantity = item.quantity, "item created");
        self.publish(InventoryEvent::Created(item.clone()));
        Ok(item)
    }

    pub async fn get_item(&self, id: i32) -> Result<InventoryItem> {
        Ok(self.store.find_by_id(id).await?)
    }

    /// Replaces the given fields. Never touches `sold` or the ledger.
    #[instrument(skip(self, patch))]
    pub async fn update_item(&self, id: i32, patch: ItemPatch) -> Result<InventoryItem> {
        let patch = ItemPatch {
            sold: None,
            ..patch.validated()?
        };
        let _guard = self.lock_item(id).await;
        let item = self.store.update_by_id(id, patch).await?;
        info!("item updated");
        self.publish(InventoryEvent::Updated(item.clone()));
        Ok(item)
    }

    /// Removes the item. Its sale records stay in the ledger.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: i32) -> Result<()> {
        {
            let _guard = self.lock_item(id).await;
            self.store.delete_by_id(id).await?;
        }
        info!("item deleted");
        self.publish(InventoryEvent::Deleted(id));
        Ok(())
    }

    /// Items matching `query`, newest first. A blank query lists everything.
    pub async fn search(&self, query: &str) -> Result<Vec<InventoryItem>> {
        Ok(self.store.find_many(&ItemFilter::search(query)).await?)
    }

    /// Items that are running out but not yet sold out.
    pub async fn low_stock(&self) -> Result<Vec<InventoryItem>> {
        let filter = ItemFilter::low_stock(self.low_stock_threshold);
        Ok(self.store.find_many(&filter).await?)
    }

    /// Adds stock and optionally replaces the unit cost used by future sales.
    #[instrument(skip(self, order), fields(qty = order.qty))]
    pub async fn restock(&self, id: i32, order: RestockOrder) -> Result<InventoryItem> {
        let order = order.validated()?;
        let _guard = self.lock_item(id).await;

        let item = self.store.find_by_id(id).await?;
        let quantity = item
            .quantity
            .checked_add(order.qty)
            .ok_or_else(|| InventoryError::invalid("quantity overflow"))?;

        let patch = ItemPatch {
            quantity: Some(quantity),
            buying_price: order.new_buying_price,
            ..ItemPatch::default()
        };
        let item = self.store.update_by_id(id, patch).await?;
        info!(quantity = item.quantity, buying_price = %item.buying_price, "item restocked");
        self.publish(InventoryEvent::Restocked(item.clone()));
        Ok(item)
    }

    /// Sale records in `range`, newest first.
    pub async fn sales(&self, range: ReportRange) -> Result<Vec<SaleRecord>> {
        let since = range.since(&Local::now()).map(|bound| bound.fixed_offset());
        Ok(self.ledger.find_many(since).await?)
    }

    pub async fn total_profit(&self, range: ReportRange) -> Result<Decimal> {
        report::total_profit(&self.sales(range).await?).ok_or(InventoryError::ProfitOverflow)
    }

    pub async fn profit_summary(&self, range: ReportRange) -> Result<ProfitSummary> {
        let sales = self.sales(range).await?;
        ProfitSummary::from_sales(range, &sales).ok_or(InventoryError::ProfitOverflow)
    }

    pub async fn export_sales_csv(&self, range: ReportRange) -> Result<String> {
        Ok(report::sales_csv(&self.sales(range).await?)?)
    }
}

impl<S: InventoryStore, L: SaleRecorder<S>> Inventory<S, L> {
    /// Sells `order.qty` units at the negotiated price.
    ///
    /// The stock update and the ledger record are committed by a spawned task
    /// that owns the item lock, so dropping this future never leaves one
    /// without the other.
    #[instrument(skip(self, order), fields(qty = order.qty))]
    pub async fn sell(&self, id: i32, order: SellOrder) -> Result<SaleOutcome> {
        let order = order.validated()?;
        let lock = self.lock_item(id).await;

        let item = self.store.find_by_id(id).await?;
        if order.qty > item.quantity {
            warn!(available = item.quantity, "not enough stock");
            return Err(InventoryError::InsufficientStock {
                requested: order.qty,
                available: item.quantity,
            });
        }
        let sold = item
            .sold
            .checked_add(order.qty)
            .ok_or_else(|| InventoryError::invalid("sold counter overflow"))?;
        let sale = NewSale::capture(&item, &order, Utc::now().into())?;
        let stock = ItemPatch::stock(item.quantity - order.qty, sold);

        let store = Arc::clone(&self.store);
        let ledger = Arc::clone(&self.ledger);
        let notification_tx = self.notification_tx.clone();
        let commit = tokio::spawn(
            async move {
                let result = ledger.record_sale(&*store, &item, stock, sale).await;
                if let Ok((item, sale)) = &result {
                    info!(sale_id = sale.id, profit = %sale.profit, "sale recorded");
                    let _ = notification_tx.send(InventoryEvent::Sold {
                        item: item.clone(),
                        sale: sale.clone(),
                    });
                }
                drop(lock);
                result
            }
            .instrument(Span::current()),
        );

        let (item, sale) = commit.await??;
        Ok(SaleOutcome { item, sale })
    }
}
