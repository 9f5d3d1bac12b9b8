//! Record store implementations.
//!
//! Available backends:
//! - `BigQueryStore` - BigQuery REST API (insertAll / jobs.query)
//! - `PostgresStore` - PostgreSQL storage (requires `postgres` feature)
//! - `MemoryStore` - In-memory storage (tests and local runs)
//! - `UnavailableStore` - Stand-in when a backend could not be constructed

pub mod bigquery;
pub mod memory;
pub mod unavailable;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use bigquery::{BigQueryConfig, BigQueryStore};
pub use memory::MemoryStore;
pub use unavailable::UnavailableStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
