//! Order creation, item replacement, and queries.

use crate::domain::{
    Money, Order, OrderItem, OrderPaymentStatus, OrderStatus, OrderType, Payment, PaymentMethod,
    PaymentState,
};
use crate::engine::{order_total, PricedLine};
use crate::error::AppError;
use chrono::Utc;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{order_from_row, parse_money, parse_timestamp, parse_uuid, Repository};

/// One requested order line before pricing: exactly one of product/combo.
#[derive(Debug, Clone)]
pub struct ItemRequest {
    pub product_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    pub quantity: i64,
}

/// Shorthand list filters, mirroring the POS front-end tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderFilter {
    /// Unpaid and not terminal.
    Pending,
    Cancelled,
    Paid,
    Finished,
}

impl OrderFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderFilter::Pending),
            "cancelled" => Some(OrderFilter::Cancelled),
            "paid" => Some(OrderFilter::Paid),
            "finished" => Some(OrderFilter::Finished),
            _ => None,
        }
    }
}

impl Repository {
    /// Create an order, assigning the next order number atomically.
    ///
    /// DINE_IN requires an active session (the table comes from it); TAKEAWAY
    /// requires a customer name and phone, get-or-created in the directory.
    pub async fn create_order(
        &self,
        order_type: OrderType,
        session_id: Option<Uuid>,
        customer_name: Option<&str>,
        customer_phone: Option<&str>,
    ) -> Result<Order, AppError> {
        let mut conn = self.begin_write().await?;
        let result = async {
            let (session_id, table_id, customer_name, customer_phone) = match order_type {
                OrderType::DineIn => {
                    let session_id = session_id.ok_or_else(|| {
                        AppError::BadRequest("Session required for dine-in".to_string())
                    })?;
                    let row = sqlx::query(
                        "SELECT table_id, customer_name, customer_phone, is_active FROM table_sessions WHERE id = ?",
                    )
                    .bind(session_id.to_string())
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| AppError::BadRequest("Invalid session".to_string()))?;

                    if row.get::<i64, _>("is_active") == 0 {
                        return Err(AppError::Conflict("Session is not active".to_string()));
                    }
                    let table_id: String = row.get("table_id");
                    let name: String = row.get("customer_name");
                    let phone: Option<String> = row.get("customer_phone");
                    (
                        Some(session_id),
                        Some(parse_uuid(&table_id, "table_sessions.table_id")),
                        Some(name),
                        phone,
                    )
                }
                OrderType::Takeaway => {
                    let name = customer_name
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .ok_or_else(|| {
                            AppError::BadRequest(
                                "Customer name and phone required for takeaway".to_string(),
                            )
                        })?;
                    let phone = customer_phone
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .ok_or_else(|| {
                            AppError::BadRequest(
                                "Customer name and phone required for takeaway".to_string(),
                            )
                        })?;
                    (None, None, Some(name.to_string()), Some(phone.to_string()))
                }
            };

            let customer_id = match (&customer_name, &customer_phone) {
                (Some(name), Some(phone)) => {
                    Some(Self::get_or_create_customer_tx(&mut conn, name, phone).await?)
                }
                _ => None,
            };

            let order_number = Self::next_counter(&mut conn, "order_number").await?;
            let order = Order {
                id: Uuid::new_v4(),
                order_number,
                bill_number: None,
                order_type,
                table_id,
                session_id,
                customer_id,
                customer_name,
                customer_phone,
                status: OrderStatus::New,
                payment_status: OrderPaymentStatus::Unpaid,
                total_amount: Money::zero(),
                discount_amount: Money::zero(),
                created_at: Utc::now(),
            };

            sqlx::query(
                r#"
                INSERT INTO orders
                (id, order_number, bill_number, order_type, table_id, session_id, customer_id,
                 customer_name, customer_phone, status, payment_status, total_amount,
                 discount_amount, created_at)
                VALUES (?, ?, NULL, ?, ?, ?, ?, ?, ?, 'NEW', 'UNPAID', '0.00', '0.00', ?)
                "#,
            )
            .bind(order.id.to_string())
            .bind(order.order_number)
            .bind(order.order_type.as_str())
            .bind(order.table_id.map(|id| id.to_string()))
            .bind(order.session_id.map(|id| id.to_string()))
            .bind(order.customer_id.map(|id| id.to_string()))
            .bind(order.customer_name.as_deref())
            .bind(order.customer_phone.as_deref())
            .bind(order.created_at.to_rfc3339())
            .execute(&mut *conn)
            .await?;

            Ok(order)
        }
        .await;
        Self::finish_write(conn, result).await
    }

    /// Replace the order's entire item set with a newly priced one.
    ///
    /// Callers resubmit the complete list each time; omitting an item removes
    /// it. Prices and GST are snapshotted from the catalog inside the same
    /// transaction, and the order total is recomputed. An optional discount
    /// replaces the stored one.
    pub async fn replace_items(
        &self,
        order_id: Uuid,
        items: &[ItemRequest],
        discount: Option<Money>,
    ) -> Result<Money, AppError> {
        if items.is_empty() {
            return Err(AppError::BadRequest("No items provided".to_string()));
        }
        for (idx, item) in items.iter().enumerate() {
            match (item.product_id, item.combo_id) {
                (None, None) => {
                    return Err(AppError::BadRequest(format!(
                        "Item {}: product id or combo id is required",
                        idx
                    )))
                }
                (Some(_), Some(_)) => {
                    return Err(AppError::BadRequest(format!(
                        "Item {}: provide either product id or combo id, not both",
                        idx
                    )))
                }
                _ => {}
            }
            if item.quantity <= 0 {
                return Err(AppError::BadRequest(format!(
                    "Item {}: quantity must be greater than 0",
                    idx
                )));
            }
        }
        if let Some(d) = discount {
            if d.is_negative() {
                return Err(AppError::BadRequest(
                    "Discount cannot be negative".to_string(),
                ));
            }
        }

        let mut conn = self.begin_write().await?;
        let result = async {
            let order = Self::get_order_tx(&mut conn, order_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

            if order.payment_status == OrderPaymentStatus::Paid {
                return Err(AppError::Conflict("Order already paid".to_string()));
            }
            if order.status.is_terminal() {
                return Err(AppError::Conflict(format!(
                    "Cannot modify a {} order",
                    order.status
                )));
            }

            let mut lines = Vec::with_capacity(items.len());
            for item in items {
                let line = if let Some(product_id) = item.product_id {
                    let product = Self::get_product_tx(&mut conn, product_id)
                        .await?
                        .ok_or_else(|| AppError::BadRequest("Invalid product id".to_string()))?;
                    PricedLine::price(
                        Some(product.id),
                        None,
                        item.quantity,
                        product.price,
                        product.gst_percent,
                    )
                } else {
                    let combo_id = item.combo_id.expect("validated above");
                    let combo = Self::get_combo_tx(&mut conn, combo_id)
                        .await?
                        .ok_or_else(|| AppError::BadRequest("Invalid combo id".to_string()))?;
                    PricedLine::price(
                        None,
                        Some(combo.id),
                        item.quantity,
                        combo.price,
                        combo.gst_percent,
                    )
                };
                lines.push(line);
            }

            sqlx::query("DELETE FROM order_items WHERE order_id = ?")
                .bind(order_id.to_string())
                .execute(&mut *conn)
                .await?;

            for line in &lines {
                sqlx::query(
                    r#"
                    INSERT INTO order_items
                    (order_id, product_id, combo_id, quantity, base_price, gst_percent, gst_amount, price_at_time)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(order_id.to_string())
                .bind(line.product_id.map(|id| id.to_string()))
                .bind(line.combo_id.map(|id| id.to_string()))
                .bind(line.quantity)
                .bind(line.base_price.to_canonical_string())
                .bind(line.gst_percent.to_canonical_string())
                .bind(line.gst_amount.to_canonical_string())
                .bind(line.price_at_time.to_canonical_string())
                .execute(&mut *conn)
                .await?;
            }

            let total = order_total(&lines);
            let discount = discount.unwrap_or(order.discount_amount);
            sqlx::query("UPDATE orders SET total_amount = ?, discount_amount = ? WHERE id = ?")
                .bind(total.to_canonical_string())
                .bind(discount.to_canonical_string())
                .bind(order_id.to_string())
                .execute(&mut *conn)
                .await?;

            Ok(total)
        }
        .await;
        Self::finish_write(conn, result).await
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(order_from_row))
    }

    pub async fn get_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, combo_id, quantity, base_price, gst_percent,
                   gst_amount, price_at_time
            FROM order_items WHERE order_id = ? ORDER BY id ASC
            "#,
        )
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(order_item_from_row).collect())
    }

    /// List orders, newest first, with optional tab filter and explicit
    /// status / payment-status filters.
    pub async fn list_orders(
        &self,
        filter: Option<OrderFilter>,
        statuses: &[OrderStatus],
        payment_statuses: &[OrderPaymentStatus],
        limit: i64,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let mut sql = String::from("SELECT * FROM orders WHERE 1=1");
        match filter {
            Some(OrderFilter::Pending) => {
                sql.push_str(
                    " AND status != 'CANCELLED' AND status != 'COMPLETED' AND payment_status = 'UNPAID'",
                );
            }
            Some(OrderFilter::Cancelled) => sql.push_str(" AND status = 'CANCELLED'"),
            Some(OrderFilter::Paid) => sql.push_str(" AND payment_status = 'PAID'"),
            Some(OrderFilter::Finished) => sql.push_str(" AND status = 'COMPLETED'"),
            None => {}
        }
        if !statuses.is_empty() {
            let list = statuses
                .iter()
                .map(|s| format!("'{}'", s.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            sql.push_str(&format!(" AND status IN ({})", list));
        }
        if !payment_statuses.is_empty() {
            let list = payment_statuses
                .iter()
                .map(|s| format!("'{}'", s.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            sql.push_str(&format!(" AND payment_status IN ({})", list));
        }
        sql.push_str(" ORDER BY created_at DESC, order_number DESC LIMIT ?");

        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(order_from_row).collect())
    }

    /// Kitchen-side status progression. Terminal states are unreachable here;
    /// COMPLETED comes from settlement, CANCELLED from cancellation.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<Order, AppError> {
        if next.is_terminal() {
            return Err(AppError::BadRequest(format!(
                "Status {} can only be reached through payment or cancellation",
                next
            )));
        }

        let mut conn = self.begin_write().await?;
        let result = async {
            let order = Self::get_order_tx(&mut conn, order_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
            if order.status.is_terminal() {
                return Err(AppError::Conflict(format!(
                    "Cannot update a {} order",
                    order.status
                )));
            }
            sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
                .bind(next.as_str())
                .bind(order_id.to_string())
                .execute(&mut *conn)
                .await?;
            Ok(Order {
                status: next,
                ..order
            })
        }
        .await;
        Self::finish_write(conn, result).await
    }

    /// The successful payment for an order, if it has one.
    pub async fn get_success_payment(
        &self,
        order_id: Uuid,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, order_id, method, amount, status, paid_at
            FROM payments
            WHERE order_id = ? AND status = 'SUCCESS'
            ORDER BY paid_at DESC
            LIMIT 1
            "#,
        )
        .bind(order_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let id: String = r.get("id");
            let order: String = r.get("order_id");
            let method: String = r.get("method");
            let amount: String = r.get("amount");
            let status: String = r.get("status");
            let paid_at: String = r.get("paid_at");
            Payment {
                id: parse_uuid(&id, "payments.id"),
                order_id: parse_uuid(&order, "payments.order_id"),
                method: PaymentMethod::parse(&method).unwrap_or(PaymentMethod::Cash),
                amount: parse_money(&amount, "payments.amount"),
                status: PaymentState::parse(&status).unwrap_or(PaymentState::Success),
                paid_at: parse_timestamp(&paid_at, "payments.paid_at"),
            }
        }))
    }

    pub async fn count_payments(&self, order_id: Uuid) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments WHERE order_id = ?")
            .bind(order_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    pub(crate) async fn get_order_tx(
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> Result<Option<Order>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(order_from_row))
    }

    pub(crate) async fn get_order_items_tx(
        conn: &mut SqliteConnection,
        order_id: Uuid,
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, combo_id, quantity, base_price, gst_percent,
                   gst_amount, price_at_time
            FROM order_items WHERE order_id = ? ORDER BY id ASC
            "#,
        )
        .bind(order_id.to_string())
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.iter().map(order_item_from_row).collect())
    }

    async fn get_or_create_customer_tx(
        conn: &mut SqliteConnection,
        name: &str,
        phone: &str,
    ) -> Result<Uuid, sqlx::Error> {
        let existing = sqlx::query("SELECT id FROM customers WHERE phone = ?")
            .bind(phone)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(row) = existing {
            let id: String = row.get("id");
            return Ok(parse_uuid(&id, "customers.id"));
        }

        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO customers (id, name, phone, created_at) VALUES (?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(name)
            .bind(phone)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *conn)
            .await?;
        Ok(id)
    }
}

fn order_item_from_row(row: &sqlx::sqlite::SqliteRow) -> OrderItem {
    let order_id: String = row.get("order_id");
    let base: String = row.get("base_price");
    let gst_pct: String = row.get("gst_percent");
    let gst_amt: String = row.get("gst_amount");
    let price: String = row.get("price_at_time");
    OrderItem {
        id: row.get("id"),
        order_id: parse_uuid(&order_id, "order_items.order_id"),
        product_id: row
            .get::<Option<String>, _>("product_id")
            .map(|s| parse_uuid(&s, "order_items.product_id")),
        combo_id: row
            .get::<Option<String>, _>("combo_id")
            .map(|s| parse_uuid(&s, "order_items.combo_id")),
        quantity: row.get("quantity"),
        base_price: parse_money(&base, "order_items.base_price"),
        gst_percent: parse_money(&gst_pct, "order_items.gst_percent"),
        gst_amount: parse_money(&gst_amt, "order_items.gst_amount"),
        price_at_time: parse_money(&price, "order_items.price_at_time"),
    }
}
