use crate::entities::{inventory_items, sales};
use crate::models::{ItemFilter, ItemPatch, NewItem, NewSale};
use crate::storage::{InventoryStore, SaleLedger, SaleRecorder, StoreError, StoreResult};
use crate::{InventoryItem, SaleRecord};
use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func, Index, LikeExpr};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectOptions,
    ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Schema, TransactionError, TransactionTrait,
};
use tracing::info;

/// Item store and sale ledger backed by PostgreSQL through sea-orm.
///
/// One handle implements both contracts; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct PostgresStorage {
    db: DatabaseConnection,
}

impl PostgresStorage {
    /// Opens the pool and creates the tables if they do not exist yet.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let mut options = ConnectOptions::new(database_url.to_owned());
        options.max_connections(5).sqlx_logging(false);

        let db = Database::connect(options).await?;
        Self::init_database(&db).await?;
        info!("connected to PostgreSQL");

        Ok(Self { db })
    }

    async fn init_database(db: &DatabaseConnection) -> StoreResult<()> {
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);

        let mut items = schema.create_table_from_entity(inventory_items::Entity);
        db.execute(backend.build(items.if_not_exists())).await?;

        let mut ledger = schema.create_table_from_entity(sales::Entity);
        db.execute(backend.build(ledger.if_not_exists())).await?;

        let created_at_index = Index::create()
            .if_not_exists()
            .name("idx_sales_created_at")
            .table(sales::Entity)
            .col(sales::Column::CreatedAt)
            .to_owned();
        db.execute(backend.build(&created_at_index)).await?;

        Ok(())
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Closes the pool. Other clones become unusable.
    pub async fn close(self) -> StoreResult<()> {
        self.db.close().await?;
        info!("closed PostgreSQL pool");
        Ok(())
    }
}

/// `%text%` with LIKE wildcards escaped by `\`.
fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn sale_model(sale: NewSale) -> sales::ActiveModel {
    sales::ActiveModel {
        id: NotSet,
        item_id: Set(sale.item_id),
        brand: Set(sale.brand),
        r#type: Set(sale.r#type),
        party: Set(sale.party),
        size: Set(sale.size),
        qty: Set(sale.qty),
        selling_price_at_sale: Set(sale.selling_price_at_sale),
        buying_price_at_sale: Set(sale.buying_price_at_sale),
        profit: Set(sale.profit),
        customer: Set(sale.customer),
        created_at: Set(sale.created_at),
    }
}

fn apply_patch(patch: ItemPatch, model: &mut inventory_items::ActiveModel) {
    if let Some(brand) = patch.brand {
        model.brand = Set(brand);
    }
    if let Some(kind) = patch.r#type {
        model.r#type = Set(kind);
    }
    if let Some(party) = patch.party {
        model.party = Set(party);
    }
    if let Some(size) = patch.size {
        model.size = Set(size);
    }
    if let Some(quantity) = patch.quantity {
        model.quantity = Set(quantity);
    }
    if let Some(price) = patch.buying_price {
        model.buying_price = Set(price);
    }
    if let Some(price) = patch.default_selling_price {
        model.default_selling_price = Set(price);
    }
    if let Some(description) = patch.description {
        model.description = Set(description);
    }
    if let Some(sold) = patch.sold {
        model.sold = Set(sold);
    }
}

#[async_trait]
impl InventoryStore for PostgresStorage {
    async fn find_by_id(&self, id: i32) -> StoreResult<InventoryItem> {
        inventory_items::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn find_many(&self, filter: &ItemFilter) -> StoreResult<Vec<InventoryItem>> {
        use inventory_items::Column;

        let mut query = inventory_items::Entity::find();

        if let Some(text) = filter.query_text() {
            let pattern = contains_pattern(text);
            let any_field = [
                Column::Brand,
                Column::Type,
                Column::Party,
                Column::Description,
            ]
            .into_iter()
            .fold(Condition::any(), |condition, column| {
                condition.add(
                    Expr::expr(Func::lower(Expr::col(column)))
                        .like(LikeExpr::new(pattern.clone()).escape('\\')),
                )
            });
            query = query.filter(any_field);
        }

        if let Some(threshold) = filter.low_stock_below {
            query = query
                .filter(Column::Quantity.gt(0))
                .filter(Column::Quantity.lt(threshold));
        }

        Ok(query
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn insert(&self, item: NewItem) -> StoreResult<InventoryItem> {
        let model = inventory_items::ActiveModel {
            id: NotSet,
            brand: Set(item.brand),
            r#type: Set(item.r#type),
            party: Set(item.party),
            size: Set(item.size),
            quantity: Set(item.quantity),
            buying_price: Set(item.buying_price),
            default_selling_price: Set(item.default_selling_price),
            description: Set(item.description.unwrap_or_default()),
            ..inventory_items::ActiveModel::new()
        };
        Ok(model.insert(&self.db).await?)
    }

    async fn update_by_id(&self, id: i32, patch: ItemPatch) -> StoreResult<InventoryItem> {
        let mut model: inventory_items::ActiveModel = self.find_by_id(id).await?.into();
        apply_patch(patch, &mut model);
        Ok(model.update(&self.db).await?)
    }

    async fn delete_by_id(&self, id: i32) -> StoreResult<()> {
        let result = inventory_items::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl SaleLedger for PostgresStorage {
    async fn append(&self, sale: NewSale) -> StoreResult<SaleRecord> {
        Ok(sale_model(sale).insert(&self.db).await?)
    }

    async fn find_many(&self, since: Option<DateTimeWithTimeZone>) -> StoreResult<Vec<SaleRecord>> {
        let mut query = sales::Entity::find();
        if let Some(since) = since {
            query = query.filter(sales::Column::CreatedAt.gte(since));
        }
        Ok(query
            .order_by_desc(sales::Column::CreatedAt)
            .order_by_desc(sales::Column::Id)
            .all(&self.db)
            .await?)
    }
}

#[async_trait]
impl SaleRecorder<PostgresStorage> for PostgresStorage {
    /// Stock update and sale insert share one transaction on this pool.
    async fn record_sale(
        &self,
        _store: &PostgresStorage,
        before: &InventoryItem,
        stock: ItemPatch,
        sale: NewSale,
    ) -> StoreResult<(InventoryItem, SaleRecord)> {
        let mut item: inventory_items::ActiveModel = before.clone().into();
        apply_patch(stock, &mut item);
        let record = sale_model(sale);

        self.db
            .transaction::<_, _, DbErr>(|txn| {
                Box::pin(async move {
                    let item = item.update(txn).await?;
                    let record = record.insert(txn).await?;
                    Ok((item, record))
                })
            })
            .await
            .map_err(|err| match err {
                TransactionError::Connection(err) | TransactionError::Transaction(err) => {
                    StoreError::Database(err)
                }
            })
    }
}
