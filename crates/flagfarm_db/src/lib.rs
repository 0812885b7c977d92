//! Embedded SQLite storage for the flag farm server: the Flag Store (§4.1)
//! and the hfi checker registry (§3).

pub mod error;
pub mod flags;
pub mod hfi;
pub mod pool;
pub mod schema;

pub use error::{DbError, Result};
pub use flags::FlagStore;
pub use hfi::{CheckerRecord, HfiRegistry};
pub use pool::{create_pool, create_pool_in_memory};
pub use schema::migrate;
