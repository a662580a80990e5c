//! Dining tables and their occupancy sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableStatus {
    Available,
    Occupied,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Available => "AVAILABLE",
            TableStatus::Occupied => "OCCUPIED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(TableStatus::Available),
            "OCCUPIED" => Some(TableStatus::Occupied),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: Uuid,
    /// Human label like "A1"; unique.
    pub number: String,
    pub capacity: i64,
    pub status: TableStatus,
}

/// The occupancy period of a table, grouping one or more orders.
///
/// A table has at most one active session (is_active, closed_at null) at any
/// time. Closing the session frees the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSession {
    pub id: Uuid,
    /// Short human-facing token like "T-4821"; unique.
    pub token: String,
    pub table_id: Uuid,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub guest_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}
