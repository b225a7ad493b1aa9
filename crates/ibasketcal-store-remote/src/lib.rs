//! Remote backends for the basketball data store.
//!
//! Two wire protocols, one local [`Store`](ibasketcal_core::store::Store)
//! contract:
//!
//! - [`EdgeSqlStore`] speaks SQL over HTTPS to a hosted libSQL-style
//!   service; it reuses the embedded backend's SQL dialect and ships a whole
//!   bulk replace as one pipelined transaction.
//! - [`RowStore`] speaks a PostgREST-style REST dialect to a hosted
//!   Postgres; rows are upserted per table with merge-duplicates semantics
//!   and the raw entity JSON lives in real JSON columns.
//!
//! Neither backend can answer `database_size_bytes`; both return `None`.

mod edgesql;
mod rows;
mod rowstore;

pub mod error;

pub use edgesql::EdgeSqlStore;
pub use error::{Error, Result};
pub use rowstore::RowStore;
