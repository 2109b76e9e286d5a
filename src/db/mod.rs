//! Database module: row models and the SQLite record store.
//!
//! - `model`: raw row shapes as they come out of SQLite.
//! - `repo`: pool setup, migrations and the [`RecordStore`] implementation.
//!
//! Callers import from `og_preview::db`.

pub mod model;
pub mod repo;

pub use repo::*;
