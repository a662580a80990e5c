//! Pure business logic: pricing math and recipe resolution. No I/O.

pub mod pricing;
pub mod resolver;

pub use pricing::{order_total, PricedLine};
pub use resolver::{resolve_consumption, ResolveError, SoldUnit};
