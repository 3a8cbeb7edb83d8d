//! Catalog query and engagement engine for a community photo library.
//!
//! - [`Catalog::search`] turns optional, string-typed facets (free text,
//!   photographer, event, tags, liked-only) into a sorted, paginated page of
//!   display-ready [`ViewRecord`]s.
//! - [`Catalog::like`] / [`Catalog::unlike`] maintain each photo's
//!   denormalized like count atomically alongside the like relation.
//!
//! Authentication, image storage and rendering live outside this crate; the
//! engine only sees viewer ids and opaque storage references.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod engagement;
pub mod error;
pub mod query;
pub mod state;

pub use catalog::{Anonymous, Catalog, IdentityProvider};
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use query::{FacetSet, Page, SortMode};
pub use state::{Library, ViewRecord};
