//! The settlement and cancellation workflows.
//!
//! Settlement is the one place where order, payment, stock, session, and
//! table all change together. Everything below runs inside a single write
//! transaction: a failure at any step (missing recipe, insufficient stock)
//! rolls back the payment row, the order update, every deduction, and any
//! session closure.

use crate::domain::{
    format_bill_number, Money, OrderPaymentStatus, PaymentMethod, StockReason,
};
use crate::engine::{resolve_consumption, SoldUnit};
use crate::error::AppError;
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use super::Repository;

/// What a successful settlement returns to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementOutcome {
    pub bill_number: String,
    pub final_amount: Money,
    /// Present when the order has a customer phone; used for the
    /// fire-and-forget invoice notification after commit.
    pub customer_phone: Option<String>,
    pub customer_name: Option<String>,
}

impl Repository {
    /// Settle an order: record payment, assign the bill number, deduct stock,
    /// and release the table session, atomically.
    ///
    /// Double settlement is rejected with a conflict, not treated as
    /// idempotent: a second call after success must fail.
    pub async fn settle_order(
        &self,
        order_id: Uuid,
        method: PaymentMethod,
        actor: Option<&str>,
    ) -> Result<SettlementOutcome, AppError> {
        let mut conn = self.begin_write().await?;
        let result = Self::settle_in_tx(&mut conn, order_id, method, actor).await;
        let outcome = Self::finish_write(conn, result).await?;

        info!(
            order_id = %order_id,
            bill_number = %outcome.bill_number,
            amount = %outcome.final_amount,
            "order settled"
        );
        Ok(outcome)
    }

    async fn settle_in_tx(
        conn: &mut SqliteConnection,
        order_id: Uuid,
        method: PaymentMethod,
        actor: Option<&str>,
    ) -> Result<SettlementOutcome, AppError> {
        let order = Self::get_order_tx(conn, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if order.payment_status == OrderPaymentStatus::Paid {
            return Err(AppError::Conflict("Already paid".to_string()));
        }

        let final_amount = order.final_amount();

        // Payment row first; it rolls back with everything else on failure.
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, method, amount, status, paid_at)
            VALUES (?, ?, ?, ?, 'SUCCESS', ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(order_id.to_string())
        .bind(method.as_str())
        .bind(final_amount.to_canonical_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *conn)
        .await?;

        let bill_number = format_bill_number(Self::next_counter(conn, "bill_number").await?);

        sqlx::query(
            "UPDATE orders SET bill_number = ?, status = 'COMPLETED', payment_status = 'PAID' WHERE id = ?",
        )
        .bind(&bill_number)
        .bind(order_id.to_string())
        .execute(&mut *conn)
        .await?;

        Self::deduct_stock_for_order_tx(conn, order_id, actor).await?;

        if let Some(session_id) = order.session_id {
            if !Self::session_has_open_orders_tx(conn, session_id, order_id).await? {
                Self::close_session_tx(conn, session_id).await?;
            }
        }

        Ok(SettlementOutcome {
            bill_number,
            final_amount,
            customer_phone: order.customer_phone,
            customer_name: order.customer_name,
        })
    }

    /// Resolve consumption across all items, then check and deduct each
    /// ingredient. Aggregation happens before any deduction so an ingredient
    /// shared by several lines is checked once against its combined demand,
    /// and the sorted map gives a deterministic visit order.
    async fn deduct_stock_for_order_tx(
        conn: &mut SqliteConnection,
        order_id: Uuid,
        actor: Option<&str>,
    ) -> Result<(), AppError> {
        let items = Self::get_order_items_tx(conn, order_id).await?;

        let mut units: Vec<SoldUnit> = Vec::new();
        for item in &items {
            if let Some(product_id) = item.product_id {
                let name = Self::get_product_name_tx(conn, product_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
                units.push(SoldUnit {
                    product_id,
                    product_name: name,
                    quantity: item.quantity,
                });
            } else if let Some(combo_id) = item.combo_id {
                let components = Self::get_combo_items_tx(conn, combo_id).await?;
                for component in components {
                    let name = Self::get_product_name_tx(conn, component.product_id)
                        .await?
                        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
                    units.push(SoldUnit {
                        product_id: component.product_id,
                        product_name: name,
                        quantity: component.quantity * item.quantity,
                    });
                }
            }
        }

        if units.is_empty() {
            return Ok(());
        }

        let mut product_ids: Vec<Uuid> = units.iter().map(|u| u.product_id).collect();
        product_ids.sort();
        product_ids.dedup();
        let recipes = Self::recipes_for_products_tx(conn, &product_ids).await?;

        // BTreeMap: ingredients visited in sorted id order.
        let usage = resolve_consumption(&units, &recipes)?;

        for (ingredient_id, required) in &usage {
            let ingredient = Self::get_ingredient_tx(conn, *ingredient_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound("Ingredient not found for stock deduction".to_string())
                })?;

            if ingredient.current_stock < *required {
                return Err(AppError::InsufficientStock(ingredient.name));
            }

            let new_stock = ingredient.current_stock - *required;
            Self::apply_stock_change_tx(
                conn,
                *ingredient_id,
                new_stock,
                -*required,
                StockReason::Sale,
                actor,
            )
            .await?;
        }

        Ok(())
    }

    /// Cancel an unpaid order. Never touches stock or payments; settlement is
    /// the only stock-consuming path and it has not run yet.
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<(), AppError> {
        let mut conn = self.begin_write().await?;
        let result = async {
            let order = Self::get_order_tx(&mut conn, order_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

            if order.status == crate::domain::OrderStatus::Cancelled {
                return Err(AppError::Conflict("Order already cancelled".to_string()));
            }
            if order.payment_status == OrderPaymentStatus::Paid
                || order.status == crate::domain::OrderStatus::Completed
            {
                return Err(AppError::Conflict(
                    "Paid/completed orders cannot be cancelled".to_string(),
                ));
            }

            sqlx::query("UPDATE orders SET status = 'CANCELLED' WHERE id = ?")
                .bind(order_id.to_string())
                .execute(&mut *conn)
                .await?;

            if let Some(session_id) = order.session_id {
                if !Self::session_has_open_orders_tx(&mut conn, session_id, order_id).await? {
                    Self::close_session_tx(&mut conn, session_id).await?;
                }
            }

            Ok(())
        }
        .await;
        Self::finish_write(conn, result).await?;

        info!(order_id = %order_id, "order cancelled");
        Ok(())
    }
}
