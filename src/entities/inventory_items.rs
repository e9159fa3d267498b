use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

/// A stocked shoe product.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub brand: String,
    pub r#type: String,
    pub party: String,
    pub size: Decimal,
    pub quantity: i32,
    pub buying_price: Decimal,
    pub default_selling_price: Decimal,
    pub sold: i32,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Case-insensitive substring match against brand, type, party and
    /// description. A blank query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        [&self.brand, &self.r#type, &self.party, &self.description]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }

    pub fn is_low_stock(&self, threshold: i32) -> bool {
        self.quantity > 0 && self.quantity < threshold
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        use chrono::Utc;
        let now = Utc::now().into();
        Self {
            sold: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..ActiveModelTrait::default()
        }
    }

    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            self.updated_at = Set(chrono::Utc::now().into());
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(brand: &str, kind: &str, party: &str, description: &str) -> Model {
        Model {
            id: 1,
            brand: brand.to_string(),
            r#type: kind.to_string(),
            party: party.to_string(),
            size: Decimal::new(85, 1),
            quantity: 3,
            buying_price: Decimal::from(100),
            default_selling_price: Decimal::from(150),
            sold: 0,
            description: description.to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_matches_any_field_case_insensitively() {
        let shoe = item("Nike", "Running", "Ahmed Traders", "breathable mesh");

        assert!(shoe.matches("nike"));
        assert!(shoe.matches("RUNN"));
        assert!(shoe.matches("traders"));
        assert!(shoe.matches("Mesh"));
        assert!(!shoe.matches("adidas"));
    }

    #[test]
    fn test_blank_query_matches_everything() {
        let shoe = item("Bata", "Sandal", "Local", "");
        assert!(shoe.matches(""));
        assert!(shoe.matches("   "));
    }

    #[test]
    fn test_low_stock_excludes_empty_and_plentiful() {
        let mut shoe = item("Bata", "Sandal", "Local", "");
        shoe.quantity = 0;
        assert!(!shoe.is_low_stock(5));
        shoe.quantity = 4;
        assert!(shoe.is_low_stock(5));
        shoe.quantity = 5;
        assert!(!shoe.is_low_stock(5));
    }
}
