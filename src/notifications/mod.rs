use crate::{InventoryItem, SaleRecord};
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

/// Published after every committed change.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum InventoryEvent {
    Created(InventoryItem),
    Updated(InventoryItem),
    Sold { item: InventoryItem, sale: SaleRecord },
    Restocked(InventoryItem),
    Deleted(i32),
}

/// Forwards events to a WebSocket client as JSON text frames until either
/// side goes away.
pub async fn handle_socket(socket: WebSocket, events: BroadcastStream<InventoryEvent>) {
    let (mut sender_ws, mut receiver) = socket.split();
    let mut events = events;

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(lagged) => {
                    debug!(%lagged, "websocket subscriber fell behind");
                    continue;
                }
            };
            if let Ok(json) = serde_json::to_string(&event) {
                if sender_ws.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        // Inbound frames are ignored; the loop only detects disconnects.
        while let Some(Ok(_)) = receiver.next().await {}
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}
