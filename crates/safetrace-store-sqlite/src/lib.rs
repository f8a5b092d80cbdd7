//! SQLite backend for the SafeTrace store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each store call executes inside one
//! connection callback, which is what makes the conditional status update
//! atomic with respect to other writers.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
