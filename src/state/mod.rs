/// State management module
///
/// This module handles the persisted side of the catalog:
/// - Database connection, schema and typed relation access (library.rs)
/// - Shared data structures (data.rs)

pub mod data;
pub mod library;

pub use data::*;
pub use library::{CatalogTx, Library, StatsSnapshot};
