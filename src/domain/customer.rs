//! Customer directory entry, keyed by phone number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    /// Unique; get-or-create keys on this.
    pub phone: String,
    pub created_at: DateTime<Utc>,
}
