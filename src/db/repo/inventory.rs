//! Ingredient and stock ledger operations.
//!
//! `current_stock` is never written without appending a ledger entry in the
//! same transaction; replaying the ledger always reproduces the balance.

use crate::domain::{Ingredient, Qty, StockEntry, StockReason};
use crate::error::AppError;
use chrono::Utc;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{parse_qty, parse_timestamp, parse_uuid, Repository};

impl Repository {
    /// Create an ingredient. A positive opening stock becomes the first
    /// ledger entry with reason OPENING.
    pub async fn create_ingredient(
        &self,
        name: &str,
        unit: &str,
        opening_stock: Qty,
        min_stock: Qty,
        actor: Option<&str>,
    ) -> Result<Ingredient, AppError> {
        if opening_stock.is_negative() {
            return Err(AppError::BadRequest(
                "Opening stock cannot be negative".to_string(),
            ));
        }

        let ingredient = Ingredient {
            id: Uuid::new_v4(),
            name: name.trim().to_uppercase(),
            unit: unit.to_string(),
            current_stock: opening_stock,
            min_stock,
        };

        let mut conn = self.begin_write().await?;
        let result = async {
            sqlx::query(
                "INSERT INTO ingredients (id, name, unit, current_stock, min_stock) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(ingredient.id.to_string())
            .bind(&ingredient.name)
            .bind(&ingredient.unit)
            .bind(ingredient.current_stock.to_canonical_string())
            .bind(ingredient.min_stock.to_canonical_string())
            .execute(&mut *conn)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.message().contains("UNIQUE") => {
                    AppError::Conflict(format!("Ingredient {} already exists", ingredient.name))
                }
                other => AppError::from(other),
            })?;

            if !opening_stock.is_zero() {
                Self::append_ledger_tx(
                    &mut conn,
                    ingredient.id,
                    opening_stock,
                    StockReason::Opening,
                    actor,
                )
                .await?;
            }
            Ok(ingredient.clone())
        }
        .await;
        Self::finish_write(conn, result).await
    }

    pub async fn list_ingredients(&self) -> Result<Vec<Ingredient>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, name, unit, current_stock, min_stock FROM ingredients ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(ingredient_from_row).collect())
    }

    pub async fn get_ingredient(&self, id: Uuid) -> Result<Option<Ingredient>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, name, unit, current_stock, min_stock FROM ingredients WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(ingredient_from_row))
    }

    /// Apply a manual stock change (MANUAL or ADJUSTMENT). The balance update
    /// and the ledger append commit together.
    pub async fn adjust_stock(
        &self,
        ingredient_id: Uuid,
        change: Qty,
        reason: StockReason,
        actor: Option<&str>,
    ) -> Result<Ingredient, AppError> {
        if change.is_zero() {
            return Err(AppError::BadRequest("Change must be non-zero".to_string()));
        }
        if !matches!(reason, StockReason::Manual | StockReason::Adjustment) {
            return Err(AppError::BadRequest(
                "Reason must be MANUAL or ADJUSTMENT".to_string(),
            ));
        }

        let mut conn = self.begin_write().await?;
        let result = async {
            let ingredient = Self::get_ingredient_tx(&mut conn, ingredient_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Ingredient not found".to_string()))?;

            let new_stock = ingredient.current_stock + change;
            if new_stock.is_negative() {
                return Err(AppError::InsufficientStock(ingredient.name.clone()));
            }

            Self::apply_stock_change_tx(&mut conn, ingredient_id, new_stock, change, reason, actor)
                .await?;

            Ok(Ingredient {
                current_stock: new_stock,
                ..ingredient
            })
        }
        .await;
        Self::finish_write(conn, result).await
    }

    /// Receive a purchase: one PURCHASE ledger entry per line, all-or-nothing.
    pub async fn record_purchase(
        &self,
        lines: &[(Uuid, Qty)],
        actor: Option<&str>,
    ) -> Result<(), AppError> {
        if lines.is_empty() {
            return Err(AppError::BadRequest("No purchase lines".to_string()));
        }
        if lines.iter().any(|(_, qty)| !qty.is_positive()) {
            return Err(AppError::BadRequest(
                "Purchase quantity must be positive".to_string(),
            ));
        }

        let mut conn = self.begin_write().await?;
        let result = async {
            for (ingredient_id, qty) in lines {
                let ingredient = Self::get_ingredient_tx(&mut conn, *ingredient_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Ingredient not found".to_string()))?;
                let new_stock = ingredient.current_stock + *qty;
                Self::apply_stock_change_tx(
                    &mut conn,
                    *ingredient_id,
                    new_stock,
                    *qty,
                    StockReason::Purchase,
                    actor,
                )
                .await?;
            }
            Ok(())
        }
        .await;
        Self::finish_write(conn, result).await
    }

    /// Ledger entries for one ingredient in append order.
    pub async fn get_ledger(&self, ingredient_id: Uuid) -> Result<Vec<StockEntry>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, ingredient_id, change, reason, actor, created_at
            FROM stock_ledger
            WHERE ingredient_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(ingredient_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| {
                let ingredient: String = r.get("ingredient_id");
                let change: String = r.get("change");
                let reason: String = r.get("reason");
                let created_at: String = r.get("created_at");
                StockEntry {
                    id: r.get("id"),
                    ingredient_id: parse_uuid(&ingredient, "stock_ledger.ingredient_id"),
                    change: parse_qty(&change, "stock_ledger.change"),
                    reason: StockReason::parse(&reason).unwrap_or(StockReason::Adjustment),
                    actor: r.get("actor"),
                    created_at: parse_timestamp(&created_at, "stock_ledger.created_at"),
                }
            })
            .collect())
    }

    /// Replay the ledger into a balance. Equals `current_stock` by invariant.
    pub async fn replay_ledger_balance(&self, ingredient_id: Uuid) -> Result<Qty, sqlx::Error> {
        let entries = self.get_ledger(ingredient_id).await?;
        Ok(entries
            .iter()
            .fold(Qty::zero(), |acc, entry| acc + entry.change))
    }

    // In-transaction helpers shared with settlement.

    pub(crate) async fn get_ingredient_tx(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<Ingredient>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, name, unit, current_stock, min_stock FROM ingredients WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.as_ref().map(ingredient_from_row))
    }

    /// Write the new balance and append the matching ledger entry.
    pub(crate) async fn apply_stock_change_tx(
        conn: &mut SqliteConnection,
        ingredient_id: Uuid,
        new_stock: Qty,
        change: Qty,
        reason: StockReason,
        actor: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE ingredients SET current_stock = ? WHERE id = ?")
            .bind(new_stock.to_canonical_string())
            .bind(ingredient_id.to_string())
            .execute(&mut *conn)
            .await?;
        Self::append_ledger_tx(conn, ingredient_id, change, reason, actor).await
    }

    async fn append_ledger_tx(
        conn: &mut SqliteConnection,
        ingredient_id: Uuid,
        change: Qty,
        reason: StockReason,
        actor: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO stock_ledger (ingredient_id, change, reason, actor, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(ingredient_id.to_string())
        .bind(change.to_canonical_string())
        .bind(reason.as_str())
        .bind(actor)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

fn ingredient_from_row(row: &sqlx::sqlite::SqliteRow) -> Ingredient {
    let id: String = row.get("id");
    let stock: String = row.get("current_stock");
    let min: String = row.get("min_stock");
    Ingredient {
        id: parse_uuid(&id, "ingredients.id"),
        name: row.get("name"),
        unit: row.get("unit"),
        current_stock: parse_qty(&stock, "ingredients.current_stock"),
        min_stock: parse_qty(&min, "ingredients.min_stock"),
    }
}
