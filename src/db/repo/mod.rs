//! Repository layer for database operations.
//!
//! All cross-entity mutations (order creation, item replacement, settlement,
//! cancellation, seating, stock adjustment) run on a single pooled connection
//! under an immediate write transaction, so check-then-act sequences are
//! atomic and writers serialize. Methods are organized across submodules by
//! domain:
//! - `catalog.rs` - products, combos, recipes
//! - `inventory.rs` - ingredients and the stock ledger
//! - `tables.rs` - tables and sessions
//! - `orders.rs` - order creation, items, listing
//! - `settlement.rs` - the settle/cancel workflows

mod catalog;
mod inventory;
mod orders;
mod settlement;
mod tables;

pub use orders::{ItemRequest, OrderFilter};
pub use settlement::SettlementOutcome;

use crate::domain::{Money, Order, OrderPaymentStatus, OrderStatus, OrderType, Qty};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection};
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Open a write transaction that takes the database write lock up front.
    ///
    /// SQLite serializes writers; BEGIN IMMEDIATE acquires the lock before the
    /// first read so a check-then-act sequence can never interleave with a
    /// concurrent writer. busy_timeout makes contending writers wait.
    pub(crate) async fn begin_write(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(conn)
    }

    /// Commit on success, roll back on error. The rollback error (if any) is
    /// swallowed; the original failure is what the caller needs.
    pub(crate) async fn finish_write<T>(
        mut conn: PoolConnection<Sqlite>,
        result: Result<T, AppError>,
    ) -> Result<T, AppError> {
        match result {
            Ok(value) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Atomically advance a named counter and return the new value.
    ///
    /// Must be called inside a write transaction owned by the caller so the
    /// assigned number commits or rolls back with the rest of the operation.
    pub(crate) async fn next_counter(
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("UPDATE counters SET value = value + 1 WHERE name = ? RETURNING value")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.get::<i64, _>("value"))
    }
}

// =============================================================================
// Row parsing helpers
// =============================================================================

pub(crate) fn parse_money(s: &str, context: &str) -> Money {
    Money::from_str(s).unwrap_or_else(|e| {
        warn!(value = %s, context = %context, error = %e, "Failed to parse money column, using zero");
        Money::zero()
    })
}

pub(crate) fn parse_qty(s: &str, context: &str) -> Qty {
    Qty::from_str(s).unwrap_or_else(|e| {
        warn!(value = %s, context = %context, error = %e, "Failed to parse quantity column, using zero");
        Qty::zero()
    })
}

pub(crate) fn parse_uuid(s: &str, context: &str) -> Uuid {
    Uuid::from_str(s).unwrap_or_else(|e| {
        warn!(value = %s, context = %context, error = %e, "Failed to parse uuid column, using nil");
        Uuid::nil()
    })
}

pub(crate) fn parse_timestamp(s: &str, context: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!(value = %s, context = %context, error = %e, "Failed to parse timestamp column, using epoch");
            DateTime::<Utc>::UNIX_EPOCH
        })
}

pub(crate) fn order_from_row(row: &SqliteRow) -> Order {
    let id: String = row.get("id");
    let order_type: String = row.get("order_type");
    let status: String = row.get("status");
    let payment_status: String = row.get("payment_status");
    let total: String = row.get("total_amount");
    let discount: String = row.get("discount_amount");
    let created_at: String = row.get("created_at");

    Order {
        id: parse_uuid(&id, "orders.id"),
        order_number: row.get("order_number"),
        bill_number: row.get("bill_number"),
        order_type: OrderType::parse(&order_type).unwrap_or(OrderType::Takeaway),
        table_id: row
            .get::<Option<String>, _>("table_id")
            .map(|s| parse_uuid(&s, "orders.table_id")),
        session_id: row
            .get::<Option<String>, _>("session_id")
            .map(|s| parse_uuid(&s, "orders.session_id")),
        customer_id: row
            .get::<Option<String>, _>("customer_id")
            .map(|s| parse_uuid(&s, "orders.customer_id")),
        customer_name: row.get("customer_name"),
        customer_phone: row.get("customer_phone"),
        status: OrderStatus::parse(&status).unwrap_or(OrderStatus::New),
        payment_status: OrderPaymentStatus::parse(&payment_status)
            .unwrap_or(OrderPaymentStatus::Unpaid),
        total_amount: parse_money(&total, "orders.total_amount"),
        discount_amount: parse_money(&discount, "orders.discount_amount"),
        created_at: parse_timestamp(&created_at, "orders.created_at"),
    }
}
