//! Parity cache database.
//!
//! A single SQLite file (by default `.cache/re-parity/parity.db`) holds:
//! - opaque decompiler/ASM text blobs keyed by `(prefix, normalized address)`,
//!   so repeated runs do not re-invoke the external tool;
//! - a history of parity runs with their status tallies.

mod models;
mod parity_db;

pub use models::ParityRunRecord;
pub use parity_db::{DbError, DbResult, ParityDb, CURRENT_SCHEMA_VERSION};
