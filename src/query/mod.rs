/// Catalog query pipeline
///
/// facets (validate) -> resolver -> planner -> assembler
///
/// Validation and planning are pure; resolution and assembly read the store
/// through a single [`crate::state::CatalogTx`].

pub mod assembler;
pub mod facets;
pub mod page;
pub mod planner;
pub mod resolver;

pub use facets::{FacetSet, SearchRequest, SortMode};
pub use page::Page;
pub use planner::{Predicate, QueryPlan, Restriction};
pub use resolver::{Resolution, ResolvedFacets};
