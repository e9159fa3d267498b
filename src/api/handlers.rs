use crate::api::error::ApiError;
use crate::notifications::handle_socket;
use crate::storage::{InventoryStore, SaleLedger, SaleRecorder};
use crate::{
    Inventory, InventoryItem, ItemPatch, NewItem, ProfitSummary, ReportRange, RestockOrder,
    SaleOutcome, SaleRecord, SellOrder,
};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub type SharedInventory<S, L> = State<Arc<Inventory<S, L>>>;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    pub range: Option<String>,
}

impl RangeParams {
    fn range(&self) -> ReportRange {
        ReportRange::from(self.range.as_deref())
    }
}

pub async fn list_items<S: InventoryStore, L: SaleLedger>(
    State(inventory): SharedInventory<S, L>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<InventoryItem>>, ApiError> {
    let Query(params) = params?;
    Ok(Json(inventory.search(&params.q).await?))
}

pub async fn low_stock<S: InventoryStore, L: SaleLedger>(
    State(inventory): SharedInventory<S, L>,
) -> Result<Json<Vec<InventoryItem>>, ApiError> {
    Ok(Json(inventory.low_stock().await?))
}

pub async fn create_item<S: InventoryStore, L: SaleLedger>(
    State(inventory): SharedInventory<S, L>,
    body: Result<Json<NewItem>, JsonRejection>,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    let Json(item) = body?;
    Ok((StatusCode::CREATED, Json(inventory.create_item(item).await?)))
}

pub async fn get_item<S: InventoryStore, L: SaleLedger>(
    State(inventory): SharedInventory<S, L>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<InventoryItem>, ApiError> {
    let Path(id) = id?;
    Ok(Json(inventory.get_item(id).await?))
}

pub async fn update_item<S: InventoryStore, L: SaleLedger>(
    State(inventory): SharedInventory<S, L>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<ItemPatch>, JsonRejection>,
) -> Result<Json<InventoryItem>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = body?;
    Ok(Json(inventory.update_item(id, patch).await?))
}

pub async fn delete_item<S: InventoryStore, L: SaleLedger>(
    State(inventory): SharedInventory<S, L>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    inventory.delete_item(id).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn sell<S: InventoryStore, L: SaleRecorder<S>>(
    State(inventory): SharedInventory<S, L>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<SellOrder>, JsonRejection>,
) -> Result<Json<SaleOutcome>, ApiError> {
    let Path(id) = id?;
    let Json(order) = body?;
    Ok(Json(inventory.sell(id, order).await?))
}

pub async fn restock<S: InventoryStore, L: SaleLedger>(
    State(inventory): SharedInventory<S, L>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<RestockOrder>, JsonRejection>,
) -> Result<Json<InventoryItem>, ApiError> {
    let Path(id) = id?;
    let Json(order) = body?;
    Ok(Json(inventory.restock(id, order).await?))
}

pub async fn profit<S: InventoryStore, L: SaleLedger>(
    State(inventory): SharedInventory<S, L>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<ProfitSummary>, ApiError> {
    let Query(params) = params?;
    Ok(Json(inventory.profit_summary(params.range()).await?))
}

pub async fn list_sales<S: InventoryStore, L: SaleLedger>(
    State(inventory): SharedInventory<S, L>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<Vec<SaleRecord>>, ApiError> {
    let Query(params) = params?;
    Ok(Json(inventory.sales(params.range()).await?))
}

pub async fn export_sales<S: InventoryStore, L: SaleLedger>(
    State(inventory): SharedInventory<S, L>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let csv = inventory.export_sales_csv(params.range()).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"sales.csv\""),
        ],
        csv,
    )
        .into_response())
}

pub async fn events<S: InventoryStore, L: SaleLedger>(
    State(inventory): SharedInventory<S, L>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let events = inventory.subscribe();
    upgrade.on_upgrade(move |socket| handle_socket(socket, events))
}
