//! Dining table and session lifecycle operations.

use crate::domain::{Table, TableSession, TableStatus};
use crate::error::AppError;
use chrono::Utc;
use rand::Rng;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, Repository};

/// Attempts before giving up on finding an unused session token.
const TOKEN_ATTEMPTS: usize = 16;

impl Repository {
    pub async fn create_table(&self, number: &str, capacity: i64) -> Result<Table, AppError> {
        if capacity <= 0 {
            return Err(AppError::BadRequest(
                "Capacity must be positive".to_string(),
            ));
        }
        let table = Table {
            id: Uuid::new_v4(),
            number: number.trim().to_string(),
            capacity,
            status: TableStatus::Available,
        };
        sqlx::query(
            "INSERT INTO dining_tables (id, number, capacity, status) VALUES (?, ?, ?, 'AVAILABLE')",
        )
        .bind(table.id.to_string())
        .bind(&table.number)
        .bind(table.capacity)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.message().contains("UNIQUE") => {
                AppError::Conflict(format!("Table {} already exists", table.number))
            }
            other => AppError::from(other),
        })?;
        Ok(table)
    }

    pub async fn list_tables(&self) -> Result<Vec<(Table, Option<TableSession>)>, sqlx::Error> {
        let rows = sqlx::query("SELECT id, number, capacity, status FROM dining_tables ORDER BY number")
            .fetch_all(&self.pool)
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in &rows {
            let table = table_from_row(row);
            let session = self.active_session_for_table(table.id).await?;
            result.push((table, session));
        }
        Ok(result)
    }

    pub async fn get_table(&self, id: Uuid) -> Result<Option<Table>, sqlx::Error> {
        let row = sqlx::query("SELECT id, number, capacity, status FROM dining_tables WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(table_from_row))
    }

    /// Seat a table: create its session and mark it occupied.
    ///
    /// Rejects tables that already have an active session. The human token is
    /// random; collisions are rare but checked, with regeneration on hit.
    pub async fn seat_table(
        &self,
        table_id: Uuid,
        customer_name: &str,
        customer_phone: Option<&str>,
        guest_count: i64,
    ) -> Result<TableSession, AppError> {
        if customer_name.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Customer name is required".to_string(),
            ));
        }
        if guest_count <= 0 {
            return Err(AppError::BadRequest(
                "Guest count must be positive".to_string(),
            ));
        }

        let mut conn = self.begin_write().await?;
        let result = async {
            let table_row =
                sqlx::query("SELECT id, number, capacity, status FROM dining_tables WHERE id = ?")
                    .bind(table_id.to_string())
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Table not found".to_string()))?;
            let table = table_from_row(&table_row);

            if guest_count > table.capacity {
                return Err(AppError::BadRequest(format!(
                    "Guest count exceeds table capacity of {}",
                    table.capacity
                )));
            }

            let occupied: (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM table_sessions WHERE table_id = ? AND is_active = 1",
            )
            .bind(table_id.to_string())
            .fetch_one(&mut *conn)
            .await?;
            if occupied.0 > 0 {
                return Err(AppError::Conflict("Table already occupied".to_string()));
            }

            let token = Self::generate_token_tx(&mut conn).await?;
            let session = TableSession {
                id: Uuid::new_v4(),
                token,
                table_id,
                customer_name: customer_name.trim().to_string(),
                customer_phone: customer_phone.map(|p| p.trim().to_string()),
                guest_count,
                is_active: true,
                created_at: Utc::now(),
                closed_at: None,
            };

            sqlx::query(
                r#"
                INSERT INTO table_sessions
                (id, token, table_id, customer_name, customer_phone, guest_count, is_active, created_at, closed_at)
                VALUES (?, ?, ?, ?, ?, ?, 1, ?, NULL)
                "#,
            )
            .bind(session.id.to_string())
            .bind(&session.token)
            .bind(session.table_id.to_string())
            .bind(&session.customer_name)
            .bind(session.customer_phone.as_deref())
            .bind(session.guest_count)
            .bind(session.created_at.to_rfc3339())
            .execute(&mut *conn)
            .await?;

            sqlx::query("UPDATE dining_tables SET status = 'OCCUPIED' WHERE id = ?")
                .bind(table_id.to_string())
                .execute(&mut *conn)
                .await?;

            Ok(session)
        }
        .await;
        Self::finish_write(conn, result).await
    }

    pub async fn get_session(&self, id: Uuid) -> Result<Option<TableSession>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, token, table_id, customer_name, customer_phone, guest_count,
                   is_active, created_at, closed_at
            FROM table_sessions WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(session_from_row))
    }

    pub async fn list_active_sessions(&self) -> Result<Vec<TableSession>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, token, table_id, customer_name, customer_phone, guest_count,
                   is_active, created_at, closed_at
            FROM table_sessions
            WHERE is_active = 1 AND closed_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(session_from_row).collect())
    }

    async fn active_session_for_table(
        &self,
        table_id: Uuid,
    ) -> Result<Option<TableSession>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, token, table_id, customer_name, customer_phone, guest_count,
                   is_active, created_at, closed_at
            FROM table_sessions
            WHERE table_id = ? AND is_active = 1 AND closed_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(table_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(session_from_row))
    }

    async fn generate_token_tx(conn: &mut SqliteConnection) -> Result<String, AppError> {
        for _ in 0..TOKEN_ATTEMPTS {
            let candidate = format!("T-{}", rand::thread_rng().gen_range(1000..10000));
            let exists: (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM table_sessions WHERE token = ?")
                    .bind(&candidate)
                    .fetch_one(&mut *conn)
                    .await?;
            if exists.0 == 0 {
                return Ok(candidate);
            }
        }
        Err(AppError::Internal(
            "Could not generate a unique session token".to_string(),
        ))
    }

    /// Close a session and free its table. Used by settlement and cancellation
    /// inside their own transactions.
    pub(crate) async fn close_session_tx(
        conn: &mut SqliteConnection,
        session_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        let row = sqlx::query("SELECT table_id FROM table_sessions WHERE id = ? AND is_active = 1")
            .bind(session_id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        let Some(row) = row else {
            // Already closed; nothing to do.
            return Ok(());
        };
        let table_id: String = row.get("table_id");

        sqlx::query("UPDATE table_sessions SET is_active = 0, closed_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(session_id.to_string())
            .execute(&mut *conn)
            .await?;

        sqlx::query("UPDATE dining_tables SET status = 'AVAILABLE' WHERE id = ?")
            .bind(&table_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// True when the session still has a non-cancelled order other than
    /// `excluding`. Decides whether terminating that order closes the session.
    pub(crate) async fn session_has_open_orders_tx(
        conn: &mut SqliteConnection,
        session_id: Uuid,
        excluding: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE session_id = ? AND id != ? AND status != 'CANCELLED' AND status != 'COMPLETED'
            "#,
        )
        .bind(session_id.to_string())
        .bind(excluding.to_string())
        .fetch_one(&mut *conn)
        .await?;
        Ok(count.0 > 0)
    }
}

fn table_from_row(row: &sqlx::sqlite::SqliteRow) -> Table {
    let id: String = row.get("id");
    let status: String = row.get("status");
    Table {
        id: parse_uuid(&id, "dining_tables.id"),
        number: row.get("number"),
        capacity: row.get("capacity"),
        status: TableStatus::parse(&status).unwrap_or(TableStatus::Available),
    }
}

fn session_from_row(row: &sqlx::sqlite::SqliteRow) -> TableSession {
    let id: String = row.get("id");
    let table_id: String = row.get("table_id");
    let created_at: String = row.get("created_at");
    TableSession {
        id: parse_uuid(&id, "table_sessions.id"),
        token: row.get("token"),
        table_id: parse_uuid(&table_id, "table_sessions.table_id"),
        customer_name: row.get("customer_name"),
        customer_phone: row.get("customer_phone"),
        guest_count: row.get("guest_count"),
        is_active: row.get::<i64, _>("is_active") != 0,
        created_at: parse_timestamp(&created_at, "table_sessions.created_at"),
        closed_at: row
            .get::<Option<String>, _>("closed_at")
            .map(|s| parse_timestamp(&s, "table_sessions.closed_at")),
    }
}
