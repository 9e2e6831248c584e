//! A dynamic SQL gateway: a case-insensitive, ordered row container, a
//! safe string-built pagination layer over five SQL dialects, result and
//! statement caches, a connection monitor, and per-table decorators
//! (timestamps, soft deletes, optimistic locking), all driven through a
//! storage-agnostic [`driver::Driver`] trait.

pub mod builder;
pub mod cache;
pub mod decorators;
pub mod driver;
pub mod gateway;
pub mod monitor;
pub mod record;
pub mod sql;
pub mod stmt_cache;
pub mod txn;

pub use builder::QueryBuilder;
pub use gateway::Gateway;
pub use record::{IntoValue, Record, Value};
