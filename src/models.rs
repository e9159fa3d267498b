use crate::entities::inventory_items::Model as InventoryItem;
use crate::entities::sales::Model as SaleRecord;
use crate::error::{InventoryError, Result};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Deserializer, Serialize};

/// Fields required to add a product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub brand: String,
    pub r#type: String,
    pub party: String,
    pub size: Decimal,
    pub quantity: i32,
    pub buying_price: Decimal,
    #[serde(alias = "sellingPrice")]
    pub default_selling_price: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewItem {
    /// Trims text fields and checks numeric domains.
    pub fn validated(mut self) -> Result<Self> {
        self.brand = required("brand", &self.brand)?;
        self.r#type = required("type", &self.r#type)?;
        self.party = required("party", &self.party)?;
        self.description = self.description.map(|d| d.trim().to_string());
        non_negative_count("quantity", self.quantity)?;
        non_negative_price("buyingPrice", self.buying_price)?;
        non_negative_price("defaultSellingPrice", self.default_selling_price)?;
        Ok(self)
    }
}

/// Partial replacement of item fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemPatch {
    pub brand: Option<String>,
    pub r#type: Option<String>,
    pub party: Option<String>,
    pub size: Option<Decimal>,
    pub quantity: Option<i32>,
    pub buying_price: Option<Decimal>,
    #[serde(alias = "sellingPrice")]
    pub default_selling_price: Option<Decimal>,
    pub description: Option<String>,
    /// Only the sell path moves this counter; clients cannot set it.
    #[serde(skip_deserializing)]
    pub sold: Option<i32>,
}

impl ItemPatch {
    pub fn validated(mut self) -> Result<Self> {
        if let Some(brand) = &self.brand {
            self.brand = Some(required("brand", brand)?);
        }
        if let Some(kind) = &self.r#type {
            self.r#type = Some(required("type", kind)?);
        }
        if let Some(party) = &self.party {
            self.party = Some(required("party", party)?);
        }
        self.description = self.description.map(|d| d.trim().to_string());
        if let Some(quantity) = self.quantity {
            non_negative_count("quantity", quantity)?;
        }
        if let Some(price) = self.buying_price {
            non_negative_price("buyingPrice", price)?;
        }
        if let Some(price) = self.default_selling_price {
            non_negative_price("defaultSellingPrice", price)?;
        }
        Ok(self)
    }

    /// Patch that only moves the stock counters.
    pub fn stock(quantity: i32, sold: i32) -> Self {
        Self {
            quantity: Some(quantity),
            sold: Some(sold),
            ..Self::default()
        }
    }

    pub fn apply_to(self, item: &mut InventoryItem) {
        if let Some(brand) = self.brand {
            item.brand = brand;
        }
        if let Some(kind) = self.r#type {
            item.r#type = kind;
        }
        if let Some(party) = self.party {
            item.party = party;
        }
        if let Some(size) = self.size {
            item.size = size;
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(price) = self.buying_price {
            item.buying_price = price;
        }
        if let Some(price) = self.default_selling_price {
            item.default_selling_price = price;
        }
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(sold) = self.sold {
            item.sold = sold;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Free-text query; blank means no filtering.
    pub query: Option<String>,
    /// Keep only items with `0 < quantity < n`.
    pub low_stock_below: Option<i32>,
}

impl ItemFilter {
    pub fn search(query: &str) -> Self {
        Self {
            query: Some(query.to_string()),
            ..Self::default()
        }
    }

    pub fn low_stock(threshold: i32) -> Self {
        Self {
            low_stock_below: Some(threshold),
            ..Self::default()
        }
    }

    /// Normalized query text, `None` when blank.
    pub fn query_text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    pub fn accepts(&self, item: &InventoryItem) -> bool {
        let text_ok = self.query_text().map_or(true, |q| item.matches(q));
        let stock_ok = self
            .low_stock_below
            .map_or(true, |threshold| item.is_low_stock(threshold));
        text_ok && stock_ok
    }
}

fn one() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellOrder {
    #[serde(default = "one")]
    pub qty: i32,
    pub selling_price: Decimal,
    #[serde(default)]
    pub customer: Option<String>,
}

impl SellOrder {
    pub fn new(qty: i32, selling_price: Decimal) -> Self {
        Self {
            qty,
            selling_price,
            customer: None,
        }
    }

    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    pub fn validated(mut self) -> Result<Self> {
        positive_qty(self.qty)?;
        non_negative_price("sellingPrice", self.selling_price)?;
        self.customer = self
            .customer
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockOrder {
    #[serde(default = "one")]
    pub qty: i32,
    #[serde(
        default,
        rename = "buyingPrice",
        alias = "newBuyingPrice",
        deserialize_with = "blank_as_none"
    )]
    pub new_buying_price: Option<Decimal>,
}

impl RestockOrder {
    pub fn new(qty: i32) -> Self {
        Self {
            qty,
            new_buying_price: None,
        }
    }

    pub fn with_buying_price(mut self, price: Decimal) -> Self {
        self.new_buying_price = Some(price);
        self
    }

    pub fn validated(self) -> Result<Self> {
        positive_qty(self.qty)?;
        if let Some(price) = self.new_buying_price {
            non_negative_price("buyingPrice", price)?;
        }
        Ok(self)
    }
}

/// A sale about to be written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
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

impl NewSale {
    /// Snapshots the item's current cost and descriptive fields.
    ///
    /// Fails when the profit does not fit in a `Decimal`.
    pub fn capture(
        item: &InventoryItem,
        order: &SellOrder,
        created_at: DateTimeWithTimeZone,
    ) -> Result<Self> {
        let buying_price = item.buying_price;
        let profit = order
            .selling_price
            .checked_sub(buying_price)
            .and_then(|margin| margin.checked_mul(Decimal::from(order.qty)))
            .ok_or_else(|| InventoryError::invalid("profit for this sale is out of range"))?;
        Ok(Self {
            item_id: item.id,
            brand: item.brand.clone(),
            r#type: item.r#type.clone(),
            party: item.party.clone(),
            size: item.size,
            qty: order.qty,
            selling_price_at_sale: order.selling_price,
            buying_price_at_sale: buying_price,
            profit,
            customer: order.customer.clone(),
            created_at,
        })
    }

    pub fn into_record(self, id: i32) -> SaleRecord {
        SaleRecord {
            id,
            item_id: self.item_id,
            brand: self.brand,
            r#type: self.r#type,
            party: self.party,
            size: self.size,
            qty: self.qty,
            selling_price_at_sale: self.selling_price_at_sale,
            buying_price_at_sale: self.buying_price_at_sale,
            profit: self.profit,
            customer: self.customer,
            created_at: self.created_at,
        }
    }
}

/// Result of a successful sell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOutcome {
    pub item: InventoryItem,
    pub sale: SaleRecord,
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InventoryError::invalid(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn non_negative_count(field: &str, value: i32) -> Result<()> {
    if value < 0 {
        return Err(InventoryError::invalid(format!(
            "{field} must not be negative, got {value}"
        )));
    }
    Ok(())
}

fn non_negative_price(field: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(InventoryError::invalid(format!(
            "{field} must not be negative, got {value}"
        )));
    }
    Ok(())
}

fn positive_qty(qty: i32) -> Result<()> {
    if qty < 1 {
        return Err(InventoryError::invalid(format!(
            "qty must be a positive integer, got {qty}"
        )));
    }
    Ok(())
}

/// Forms submit an empty string for an untouched price box.
fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(Decimal),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(value)) => Ok(Some(value)),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn shoe(buying_price: i64) -> InventoryItem {
        InventoryItem {
            id: 7,
            brand: "Nike".to_string(),
            r#type: "Runner".to_string(),
            party: "Ahmed Traders".to_string(),
            size: Decimal::from(9),
            quantity: 10,
            buying_price: Decimal::from(buying_price),
            default_selling_price: Decimal::from(150),
            sold: 0,
            description: String::new(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_capture_computes_profit_from_snapshot() {
        let order = SellOrder::new(3, Decimal::from(150)).with_customer("Walk-in");
        let sale = NewSale::capture(&shoe(100), &order, Utc::now().into()).unwrap();

        assert_eq!(sale.buying_price_at_sale, Decimal::from(100));
        assert_eq!(sale.selling_price_at_sale, Decimal::from(150));
        assert_eq!(sale.profit, Decimal::from(150));
        assert_eq!(sale.brand, "Nike");
        assert_eq!(sale.customer.as_deref(), Some("Walk-in"));
    }

    #[test]
    fn test_capture_allows_selling_below_cost() {
        let order = SellOrder::new(2, Decimal::new(8050, 2));
        let sale = NewSale::capture(&shoe(100), &order, Utc::now().into()).unwrap();
        assert_eq!(sale.profit, Decimal::new(-3900, 2));
    }

    #[test]
    fn test_capture_rejects_profit_out_of_range() {
        let order = SellOrder::new(2, Decimal::MAX);
        let err = NewSale::capture(&shoe(0), &order, Utc::now().into()).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput(_)));

        let order = SellOrder::new(1, Decimal::MAX);
        let sale = NewSale::capture(&shoe(0), &order, Utc::now().into()).unwrap();
        assert_eq!(sale.profit, Decimal::MAX);
    }

    #[test]
    fn test_new_item_rejects_blank_and_negative_fields() {
        let item = NewItem {
            brand: "  ".to_string(),
            r#type: "Sandal".to_string(),
            party: "Local".to_string(),
            size: Decimal::from(7),
            quantity: 1,
            buying_price: Decimal::from(10),
            default_selling_price: Decimal::from(20),
            description: None,
        };
        assert!(matches!(
            item.clone().validated(),
            Err(InventoryError::InvalidInput(_))
        ));

        let negative = NewItem {
            brand: "Bata".to_string(),
            quantity: -1,
            ..item
        };
        assert!(matches!(
            negative.validated(),
            Err(InventoryError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sell_order_validation() {
        assert!(SellOrder::new(0, Decimal::from(10)).validated().is_err());
        assert!(SellOrder::new(1, Decimal::from(-1)).validated().is_err());

        let order = SellOrder::new(1, Decimal::ZERO)
            .with_customer("   ")
            .validated()
            .unwrap();
        assert_eq!(order.customer, None);
    }

    #[test]
    fn test_sell_order_defaults_qty_to_one() {
        let order: SellOrder = serde_json::from_str(r#"{"sellingPrice": 150}"#).unwrap();
        assert_eq!(order.qty, 1);
        assert_eq!(order.selling_price, Decimal::from(150));
    }

    #[test]
    fn test_restock_order_treats_blank_price_as_absent() {
        let order: RestockOrder =
            serde_json::from_str(r#"{"qty": 4, "buyingPrice": ""}"#).unwrap();
        assert_eq!(order, RestockOrder::new(4));

        let order: RestockOrder = serde_json::from_str(r#"{"buyingPrice": 120}"#).unwrap();
        assert_eq!(order.qty, 1);
        assert_eq!(order.new_buying_price, Some(Decimal::from(120)));
    }

    #[test]
    fn test_patch_ignores_client_supplied_sold() {
        let patch: ItemPatch = serde_json::from_str(r#"{"sold": 99, "brand": "Puma"}"#).unwrap();
        assert_eq!(patch.sold, None);
        assert_eq!(patch.brand.as_deref(), Some("Puma"));
    }

    #[test]
    fn test_new_item_accepts_legacy_selling_price_key() {
        let item: NewItem = serde_json::from_str(
            r#"{"brand":"Bata","type":"Sandal","party":"Local","size":7,
                "quantity":3,"buyingPrice":10,"sellingPrice":20}"#,
        )
        .unwrap();
        assert_eq!(item.default_selling_price, Decimal::from(20));
    }
}
