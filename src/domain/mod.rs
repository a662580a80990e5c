//! Domain types: pure data and state machines, no I/O.

pub mod actor;
pub mod catalog;
pub mod customer;
pub mod inventory;
pub mod money;
pub mod numbering;
pub mod order;
pub mod payment;
pub mod table;

pub use actor::{Actor, Role};
pub use catalog::{Combo, ComboItem, Product, Recipe};
pub use customer::Customer;
pub use inventory::{Ingredient, StockEntry, StockReason};
pub use money::{Money, Qty};
pub use numbering::{format_bill_number, format_order_number};
pub use order::{Order, OrderItem, OrderPaymentStatus, OrderStatus, OrderType};
pub use payment::{Payment, PaymentMethod, PaymentState};
pub use table::{Table, TableSession, TableStatus};
