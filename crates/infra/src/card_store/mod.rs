//! Card store implementations backed by external infrastructure.

pub mod postgres;

pub use postgres::PostgresCardStore;

/// DDL for the `cards` table, applied by `PostgresCardStore::ensure_schema`.
pub const SCHEMA: &str = include_str!("../../migrations/0001_cards.sql");
