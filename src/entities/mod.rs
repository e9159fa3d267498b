pub mod inventory_items;
pub mod sales;
