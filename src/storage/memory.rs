use crate::models::{ItemFilter, ItemPatch, NewItem, NewSale};
use crate::storage::{InventoryStore, SaleLedger, SaleRecorder, StoreError, StoreResult};
use crate::{InventoryItem, SaleRecord};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sea_orm::prelude::DateTimeWithTimeZone;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Process-local item store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    items: Arc<DashMap<i32, InventoryItem>>,
    next_id: Arc<AtomicI32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn find_by_id(&self, id: i32) -> StoreResult<InventoryItem> {
        self.items
            .get(&id)
            .map(|item| item.clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn find_many(&self, filter: &ItemFilter) -> StoreResult<Vec<InventoryItem>> {
        let mut items: Vec<InventoryItem> = self
            .items
            .iter()
            .filter(|entry| filter.accepts(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|item| Reverse((item.created_at, item.id)));
        Ok(items)
    }

    async fn insert(&self, item: NewItem) -> StoreResult<InventoryItem> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now().into();
        let item = InventoryItem {
            id,
            brand: item.brand,
            r#type: item.r#type,
            party: item.party,
            size: item.size,
            quantity: item.quantity,
            buying_price: item.buying_price,
            default_selling_price: item.default_selling_price,
            sold: 0,
            description: item.description.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.items.insert(id, item.clone());
        Ok(item)
    }

    async fn update_by_id(&self, id: i32, patch: ItemPatch) -> StoreResult<InventoryItem> {
        let mut item = self.items.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        patch.apply_to(&mut item);
        item.updated_at = Utc::now().into();
        Ok(item.clone())
    }

    async fn delete_by_id(&self, id: i32) -> StoreResult<()> {
        self.items
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }
}

/// Process-local sale ledger.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    sales: Arc<DashMap<i32, SaleRecord>>,
    next_id: Arc<AtomicI32>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SaleLedger for MemoryLedger {
    async fn append(&self, sale: NewSale) -> StoreResult<SaleRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = sale.into_record(id);
        self.sales.insert(id, record.clone());
        Ok(record)
    }

    async fn find_many(&self, since: Option<DateTimeWithTimeZone>) -> StoreResult<Vec<SaleRecord>> {
        let mut sales: Vec<SaleRecord> = self
            .sales
            .iter()
            .filter(|entry| since.map_or(true, |since| entry.created_at >= since))
            .map(|entry| entry.value().clone())
            .collect();
        sales.sort_by_key(|sale| Reverse((sale.created_at, sale.id)));
        Ok(sales)
    }
}

impl SaleRecorder<MemoryStore> for MemoryLedger {}
