//! Catalog types: products, combos, and recipes.
//!
//! The catalog itself is maintained elsewhere; orders only read price/GST
//! snapshots and recipe rows from it.

use crate::domain::{Money, Qty};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sellable product with its current price and GST percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Money,
    pub gst_percent: Money,
    pub is_active: bool,
}

/// A priced bundle of products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combo {
    pub id: Uuid,
    pub name: String,
    pub price: Money,
    pub gst_percent: Money,
}

/// One component of a combo: a product and how many units the combo includes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboItem {
    pub combo_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
}

/// Ingredient consumption per unit of a product sold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub product_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity: Qty,
}
