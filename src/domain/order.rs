//! Order aggregate types: orders, line items, and their state machines.

use crate::domain::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    DineIn,
    Takeaway,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::DineIn => "DINE_IN",
            OrderType::Takeaway => "TAKEAWAY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DINE_IN" => Some(OrderType::DineIn),
            // Legacy spelling accepted on input.
            "TAKEAWAY" | "TAKE_AWAY" => Some(OrderType::Takeaway),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    InProgress,
    Ready,
    Served,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Ready => "READY",
            OrderStatus::Served => "SERVED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(OrderStatus::New),
            "IN_PROGRESS" => Some(OrderStatus::InProgress),
            "READY" => Some(OrderStatus::Ready),
            "SERVED" => Some(OrderStatus::Served),
            "COMPLETED" => Some(OrderStatus::Completed),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states are only reachable through settlement or cancellation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl OrderPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPaymentStatus::Unpaid => "UNPAID",
            OrderPaymentStatus::Paid => "PAID",
            OrderPaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNPAID" => Some(OrderPaymentStatus::Unpaid),
            "PAID" => Some(OrderPaymentStatus::Paid),
            "REFUNDED" => Some(OrderPaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// An order and its derived money fields. Line items live in `OrderItem`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    /// Monotonic creation-time sequence, unique across all orders.
    pub order_number: i64,
    /// Customer-facing bill number, assigned only on successful payment.
    pub bill_number: Option<String>,
    pub order_type: OrderType,
    pub table_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    /// Sum of line totals. Discount is applied at settlement, not here.
    pub total_amount: Money,
    pub discount_amount: Money,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Amount due at settlement: total minus discount, floored at zero.
    pub fn final_amount(&self) -> Money {
        self.total_amount.saturating_sub(self.discount_amount)
    }
}

/// A priced order line. Price fields are frozen at the moment the item was
/// added; later catalog changes never alter them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    pub quantity: i64,
    pub base_price: Money,
    pub gst_percent: Money,
    pub gst_amount: Money,
    pub price_at_time: Money,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.price_at_time.times(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_order_type_parse_accepts_legacy_spelling() {
        assert_eq!(OrderType::parse("TAKE_AWAY"), Some(OrderType::Takeaway));
        assert_eq!(OrderType::parse("DINE_IN"), Some(OrderType::DineIn));
        assert_eq!(OrderType::parse("DELIVERY"), None);
    }

    #[test]
    fn test_status_terminality() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Served.is_terminal());
    }

    #[test]
    fn test_final_amount_floors_at_zero() {
        let mut order = sample_order();
        order.total_amount = Money::from_str("100").unwrap();
        order.discount_amount = Money::from_str("150").unwrap();
        assert_eq!(order.final_amount(), Money::zero());

        order.discount_amount = Money::from_str("30").unwrap();
        assert_eq!(order.final_amount().to_canonical_string(), "70.00");
    }

    fn sample_order() -> Order {
        Order {
            id: Uuid::new_v4(),
            order_number: 1,
            bill_number: None,
            order_type: OrderType::Takeaway,
            table_id: None,
            session_id: None,
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            status: OrderStatus::New,
            payment_status: OrderPaymentStatus::Unpaid,
            total_amount: Money::zero(),
            discount_amount: Money::zero(),
            created_at: Utc::now(),
        }
    }
}
