//! Facet resolution: human-typed facet values to internal identifiers.
//!
//! Read-only. A facet that names nothing is not an error, it resolves to
//! [`Resolution::Unresolved`] and the planner turns that into an empty page.

use tracing::debug;

use super::facets::SearchRequest;
use crate::error::Result;
use crate::state::{CatalogTx, EventId, PhotographerId, TagId, ViewerId};

/// Outcome of resolving one facet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// Facet not requested, imposes no constraint
    Omitted,
    /// Facet requested and matched
    Resolved(T),
    /// Facet requested but matched nothing
    Unresolved,
}

impl<T> Resolution<T> {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Resolution::Unresolved)
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            Resolution::Resolved(value) => Some(value),
            _ => None,
        }
    }
}

impl<I> Resolution<Vec<I>> {
    /// An empty id list means the facet matched nothing
    fn from_ids(ids: Vec<I>) -> Self {
        if ids.is_empty() {
            Resolution::Unresolved
        } else {
            Resolution::Resolved(ids)
        }
    }
}

/// Every facet of a request, resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFacets {
    /// Free text needs no resolution, it is matched at query time
    pub text: Option<String>,
    pub photographers: Resolution<Vec<PhotographerId>>,
    pub events: Resolution<Vec<EventId>>,
    pub tags: Resolution<Vec<TagId>>,
    pub liked_by: Resolution<ViewerId>,
}

impl ResolvedFacets {
    /// No facet constrains the result
    pub fn unconstrained() -> Self {
        Self {
            text: None,
            photographers: Resolution::Omitted,
            events: Resolution::Omitted,
            tags: Resolution::Omitted,
            liked_by: Resolution::Omitted,
        }
    }

    pub fn any_unresolved(&self) -> bool {
        self.photographers.is_unresolved()
            || self.events.is_unresolved()
            || self.tags.is_unresolved()
            || self.liked_by.is_unresolved()
    }
}

/// Resolve the name-like facets of `request` against the store.
pub fn resolve(tx: &CatalogTx<'_>, request: &SearchRequest) -> Result<ResolvedFacets> {
    let liked_by = resolve_liked_by(request);

    let photographers = match &request.photographer {
        None => Resolution::Omitted,
        Some(name) => Resolution::from_ids(tx.photographer_ids_by_name(name)?),
    };

    let events = match &request.event {
        None => Resolution::Omitted,
        Some(name) => Resolution::from_ids(tx.event_ids_by_name(name)?),
    };

    let tags = resolve_tags(tx, &request.tags)?;

    let resolved = ResolvedFacets {
        text: request.text.clone(),
        photographers,
        events,
        tags,
        liked_by,
    };
    debug!(?resolved, "Resolved facets");
    Ok(resolved)
}

/// An anonymous caller cannot have liked anything
fn resolve_liked_by(request: &SearchRequest) -> Resolution<ViewerId> {
    match (request.liked_only, &request.viewer) {
        (false, _) => Resolution::Omitted,
        (true, Some(viewer)) => Resolution::Resolved(viewer.clone()),
        (true, None) => Resolution::Unresolved,
    }
}

/// Every requested name must exist, otherwise the whole tag facet is unresolved
fn resolve_tags(tx: &CatalogTx<'_>, names: &[String]) -> Result<Resolution<Vec<TagId>>> {
    if names.is_empty() {
        return Ok(Resolution::Omitted);
    }

    let found = tx.tag_ids_by_names(names)?;
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        match found.get(name) {
            Some(id) => ids.push(*id),
            None => {
                debug!(tag = %name, "Tag facet names an unknown tag");
                return Ok(Resolution::Unresolved);
            }
        }
    }
    Ok(Resolution::from_ids(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;
    use crate::query::facets::FacetSet;
    use crate::state::{Account, Library, NewPhoto};
    use chrono::{TimeZone, Utc};

    fn library() -> Library {
        let library = Library::open_in_memory().unwrap();
        for (id, name) in [("acc-ana", "Ana Ortiz"), ("acc-bo", "Bo Lindqvist")] {
            library
                .upsert_account(&Account {
                    id: id.into(),
                    display_name: name.into(),
                    avatar_ref: None,
                })
                .unwrap();
        }
        let ana = library.create_photographer("acc-ana", "").unwrap();
        library.create_photographer("acc-bo", "").unwrap();
        let date = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        library.create_event("Harbour Walk", "Porto", date, "acc-bo").unwrap();
        library
            .create_photo(&NewPhoto {
                photographer_id: ana,
                event_id: None,
                storage_ref: "a.jpg".into(),
                date,
                tags: vec!["night".into(), "street".into()],
            })
            .unwrap();
        library
    }

    fn resolve_facets(library: &Library, facets: FacetSet) -> ResolvedFacets {
        let request = facets.validate(&CatalogConfig::in_memory()).unwrap();
        library.read(|tx| resolve(tx, &request)).unwrap()
    }

    #[test]
    fn test_omitted_facets() {
        let library = library();
        let resolved = resolve_facets(&library, FacetSet::new());

        assert_eq!(resolved, ResolvedFacets::unconstrained());
        assert!(!resolved.any_unresolved());
    }

    #[test]
    fn test_photographer_partial_case_insensitive() {
        let library = library();
        let resolved = resolve_facets(&library, FacetSet::new().photographer("ORTIZ"));
        assert_eq!(resolved.photographers.resolved().map(Vec::len), Some(1));

        // "o" appears in both names
        let resolved = resolve_facets(&library, FacetSet::new().photographer("o"));
        assert_eq!(resolved.photographers.resolved().map(Vec::len), Some(2));
    }

    #[test]
    fn test_non_ascii_names_match_in_any_case() {
        let library = library();
        library
            .upsert_account(&Account {
                id: "acc-sarka".into(),
                display_name: "Šárka Nováková".into(),
                avatar_ref: None,
            })
            .unwrap();
        library.create_photographer("acc-sarka", "").unwrap();
        let date = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        library.create_event("Český Furmeet", "Brno", date, "acc-sarka").unwrap();

        for name in ["Šárka", "šárka", "ŠÁRKA"] {
            let resolved = resolve_facets(&library, FacetSet::new().photographer(name));
            assert_eq!(resolved.photographers.resolved().map(Vec::len), Some(1), "{name}");
        }
        let resolved = resolve_facets(&library, FacetSet::new().event("český"));
        assert_eq!(resolved.events.resolved().map(Vec::len), Some(1));
    }

    #[test]
    fn test_unknown_names_are_unresolved() {
        let library = library();
        let resolved = resolve_facets(
            &library,
            FacetSet::new().photographer("Nobody").event("Marathon"),
        );

        assert!(resolved.photographers.is_unresolved());
        assert!(resolved.events.is_unresolved());
        assert!(resolved.any_unresolved());
    }

    #[test]
    fn test_tags_require_every_name() {
        let library = library();

        let resolved = resolve_facets(&library, FacetSet::new().tag("night").tag("street"));
        assert_eq!(resolved.tags.resolved().map(Vec::len), Some(2));

        let resolved = resolve_facets(&library, FacetSet::new().tag("night").tag("studio"));
        assert!(resolved.tags.is_unresolved());
    }

    #[test]
    fn test_liked_only_needs_a_viewer() {
        let library = library();

        let anonymous = resolve_facets(&library, FacetSet::new().liked_only());
        assert!(anonymous.liked_by.is_unresolved());

        let signed_in = resolve_facets(&library, FacetSet::new().liked_only().viewer("v1"));
        assert_eq!(signed_in.liked_by, Resolution::Resolved("v1".to_string()));

        let not_asked = resolve_facets(&library, FacetSet::new().viewer("v1"));
        assert_eq!(not_asked.liked_by, Resolution::Omitted);
    }

    #[test]
    fn test_resolution_never_touches_photos() {
        let library = library();
        resolve_facets(&library, FacetSet::new().photographer("ana").tag("night"));
        assert_eq!(library.stats().photo_queries, 0);
    }
}
