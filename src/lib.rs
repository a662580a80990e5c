pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod notify;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Actor, Ingredient, Money, Order, OrderItem, OrderPaymentStatus, OrderStatus, OrderType,
    Payment, PaymentMethod, Qty, Role, StockEntry, StockReason, Table, TableSession,
};
pub use error::AppError;
pub use notify::Notifier;
