//! Order line pricing and total derivation.
//!
//! Prices and GST percentages are snapshotted from the catalog at the moment
//! items are submitted; everything here is arithmetic over those snapshots.

use crate::domain::Money;
use serde::Serialize;
use uuid::Uuid;

/// A fully priced order line ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedLine {
    pub product_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    pub quantity: i64,
    pub base_price: Money,
    pub gst_percent: Money,
    pub gst_amount: Money,
    pub price_at_time: Money,
}

impl PricedLine {
    /// Price a line from a catalog snapshot.
    ///
    /// gst_amount = round2(base × percent / 100), half-up.
    /// price_at_time = base + gst_amount, frozen thereafter.
    pub fn price(
        product_id: Option<Uuid>,
        combo_id: Option<Uuid>,
        quantity: i64,
        base_price: Money,
        gst_percent: Money,
    ) -> Self {
        let gst_amount = base_price.gst_portion(gst_percent);
        PricedLine {
            product_id,
            combo_id,
            quantity,
            base_price,
            gst_percent,
            gst_amount,
            price_at_time: base_price + gst_amount,
        }
    }

    pub fn line_total(&self) -> Money {
        self.price_at_time.times(self.quantity)
    }
}

/// Order total: sum of line totals. Discount is applied at settlement.
pub fn order_total(lines: &[PricedLine]) -> Money {
    lines
        .iter()
        .fold(Money::zero(), |acc, line| acc + line.line_total())
}
