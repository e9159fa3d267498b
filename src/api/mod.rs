//! HTTP surface consumed by the inventory UI.

pub mod error;
pub mod handlers;

use crate::storage::{InventoryStore, SaleRecorder};
use crate::Inventory;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, patch};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub fn router<S, L>(inventory: Arc<Inventory<S, L>>, allowed_origins: &[String]) -> Router
where
    S: InventoryStore,
    L: SaleRecorder<S>,
{
    Router::new()
        .route(
            "/api/shoes",
            get(handlers::list_items::<S, L>).post(handlers::create_item::<S, L>),
        )
        .route("/api/shoes/low-stock", get(handlers::low_stock::<S, L>))
        .route(
            "/api/shoes/:id",
            get(handlers::get_item::<S, L>)
                .put(handlers::update_item::<S, L>)
                .delete(handlers::delete_item::<S, L>),
        )
        .route("/api/shoes/:id/sell", patch(handlers::sell::<S, L>))
        .route("/api/shoes/:id/restock", patch(handlers::restock::<S, L>))
        .route("/api/profit", get(handlers::profit::<S, L>))
        .route("/api/sales", get(handlers::list_sales::<S, L>))
        .route("/api/export/sales.csv", get(handlers::export_sales::<S, L>))
        .route("/api/ws", get(handlers::events::<S, L>))
        .layer(cors(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(inventory)
}

fn cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE])
}
