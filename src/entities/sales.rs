use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One immutable ledger entry. Item fields are copied in at sale time so the
/// record stays readable after the item is deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub item_id: i32,
    pub brand: String,
    pub r#type: String,
    pub party: String,
    pub size: Decimal,
    pub qty: i32,
    pub selling_price_at_sale: Decimal,
    pub buying_price_at_sale: Decimal,
    pub profit: Decimal,
    pub customer: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
