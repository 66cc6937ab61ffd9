//! HUBSYNC Warehouse - Id Reads and Appends
//!
//! [`PgWarehouse`] implements [`hubsync_core::WarehouseHandle`] over any
//! server that speaks the PostgreSQL wire protocol. Statement text and
//! value binding live in [`sql`].

pub mod postgres;
pub mod sql;

pub use postgres::{create_pool, PgWarehouse};
