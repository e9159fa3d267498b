use crate::storage::StoreError;
use thiserror::Error;

pub type Result<T, E = InventoryError> = std::result::Result<T, E>;

/// Failures surfaced by [`crate::Inventory`].
///
/// Business-rule variants are raised before anything is written.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("item {0} not found")]
    NotFound(i32),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("profit total is out of range")]
    ProfitOverflow,

    #[error(transparent)]
    Store(StoreError),

    #[error("sale commit did not finish: {0}")]
    Commit(#[from] tokio::task::JoinError),

    #[error("csv export failed: {0}")]
    Export(#[from] csv::Error),
}

impl InventoryError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<StoreError> for InventoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}
