//! Human-facing identifier formats.
//!
//! Two independent sequences: order numbers are assigned at creation, bill
//! numbers only at successful payment. Both come from dedicated counter rows
//! (see the repository), never from scanning existing rows.

/// Width of the zero-padded bill number, e.g. "000000000001".
pub const BILL_NUMBER_WIDTH: usize = 12;

/// Format a creation-time order number as "ORD-000042".
pub fn format_order_number(n: i64) -> String {
    format!("ORD-{:06}", n)
}

/// Format a bill number as a fixed-width zero-padded string.
pub fn format_bill_number(n: i64) -> String {
    format!("{:0width$}", n, width = BILL_NUMBER_WIDTH)
}
