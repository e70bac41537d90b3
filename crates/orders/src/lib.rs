//! Orders domain module.
//!
//! The order record, its exception sub-records, the typed field accessor used
//! by rule conditions, and the data accessor through which orders are created
//! and mutated.

pub mod field;
pub mod order;
pub mod repository;

pub use field::{FieldKind, FieldValue, OrderField};
pub use order::{ExceptionStatus, Order, OrderDirection, OrderException, OrderStatus};
pub use repository::{InMemoryOrderRepository, OrderRepository};
