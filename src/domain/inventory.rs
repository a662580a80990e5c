//! Inventory types: ingredients and the append-only stock ledger.

use crate::domain::Qty;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stocked ingredient. `current_stock` is always the running balance of the
/// ledger entries for this ingredient; it is never mutated without appending
/// a matching `StockEntry` in the same transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    /// Normalized to uppercase on creation.
    pub name: String,
    pub unit: String,
    pub current_stock: Qty,
    pub min_stock: Qty,
}

impl Ingredient {
    /// True when current stock has fallen to or below the minimum threshold.
    pub fn is_low(&self) -> bool {
        self.current_stock <= self.min_stock
    }
}

/// Why a stock balance changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockReason {
    Opening,
    Purchase,
    Sale,
    Manual,
    Adjustment,
}

impl StockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockReason::Opening => "OPENING",
            StockReason::Purchase => "PURCHASE",
            StockReason::Sale => "SALE",
            StockReason::Manual => "MANUAL",
            StockReason::Adjustment => "ADJUSTMENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPENING" => Some(StockReason::Opening),
            "PURCHASE" => Some(StockReason::Purchase),
            "SALE" => Some(StockReason::Sale),
            "MANUAL" => Some(StockReason::Manual),
            "ADJUSTMENT" => Some(StockReason::Adjustment),
            _ => None,
        }
    }
}

impl std::fmt::Display for StockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One append-only ledger record. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    pub id: i64,
    pub ingredient_id: Uuid,
    /// Signed delta; negative for consumption.
    pub change: Qty,
    pub reason: StockReason,
    /// Acting staff member, when known.
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
}
