/// The catalog engine
///
/// Entry point for whatever transport wraps the engine: faceted search,
/// like and unlike. Blocking calls do their work on the caller's thread;
/// the `_async` variants move it onto tokio's blocking pool.

use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::{debug, info};

use crate::cache::ResultCache;
use crate::config::CatalogConfig;
use crate::engagement::Ledger;
use crate::error::{CatalogError, Result};
use crate::query::{assembler, planner, resolver, FacetSet, Page};
use crate::state::{Library, PhotoId, StatsSnapshot, ViewerId};

/// Supplies the viewer identity of the current request
pub trait IdentityProvider {
    /// `None` for anonymous callers
    fn viewer_id(&self) -> Option<ViewerId>;
}

/// A caller with no identity
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl IdentityProvider for Anonymous {
    fn viewer_id(&self) -> Option<ViewerId> {
        None
    }
}

impl IdentityProvider for Option<ViewerId> {
    fn viewer_id(&self) -> Option<ViewerId> {
        self.clone()
    }
}

#[derive(Debug)]
pub struct Catalog {
    library: Library,
    cache: ResultCache,
    config: CatalogConfig,
}

impl Catalog {
    pub fn open(config: CatalogConfig) -> Result<Self> {
        let library = Library::open(&config)?;
        let cache = ResultCache::new(Duration::from_secs(config.cache_ttl_secs));
        info!(
            "Catalog ready (cache ttl {}s, default page size {})",
            config.cache_ttl_secs, config.default_page_size
        );

        Ok(Self {
            library,
            cache,
            config,
        })
    }

    /// Private in-memory catalog with default settings
    pub fn in_memory() -> Result<Self> {
        Self::open(CatalogConfig::in_memory())
    }

    /// Direct store access for seeding and administration
    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.library.stats()
    }

    /// Run a faceted search.
    ///
    /// A facet that matches nothing yields an empty page, not an error.
    /// Errors are either [`CatalogError::Validation`] for a malformed facet
    /// set or a retryable store failure.
    pub fn search(&self, facets: &FacetSet) -> Result<Page> {
        let request = facets.validate(&self.config)?;
        let key = request.cache_key()?;

        if let Some(page) = self.cache.get(&key) {
            return Ok(page);
        }
        let generation = self.cache.generation();

        let page = self.library.read(|tx| {
            let resolved = resolver::resolve(tx, &request)?;
            let plan = planner::plan(resolved, &request);
            assembler::execute(tx, &plan, request.viewer.as_deref())
        })?;

        debug!(
            total_items = page.total_items,
            total_pages = page.total_pages,
            "Search complete"
        );

        self.cache.insert(key, page.clone(), generation);
        Ok(page)
    }

    /// Search on behalf of whoever `identity` says is asking
    pub fn search_as(&self, identity: &dyn IdentityProvider, mut facets: FacetSet) -> Result<Page> {
        facets.viewer = identity.viewer_id();
        self.search(&facets)
    }

    /// Returns `true` if a new like was recorded, `false` if it already existed
    pub fn like(&self, photo_id: PhotoId, viewer_id: &str) -> Result<bool> {
        let liked = Ledger::new(&self.library).like(photo_id, viewer_id)?;
        if liked {
            self.cache.invalidate_all();
        }
        Ok(liked)
    }

    /// Returns `true` if a like was removed, `false` if there was none
    pub fn unlike(&self, photo_id: PhotoId, viewer_id: &str) -> Result<bool> {
        let removed = Ledger::new(&self.library).unlike(photo_id, viewer_id)?;
        if removed {
            self.cache.invalidate_all();
        }
        Ok(removed)
    }

    /// Flip the like state; returns whether the viewer now likes the photo
    pub fn toggle_like(&self, photo_id: PhotoId, viewer_id: &str) -> Result<bool> {
        let liked = Ledger::new(&self.library).toggle(photo_id, viewer_id)?;
        self.cache.invalidate_all();
        Ok(liked)
    }

    /// Repair a photo's stored like count from its like rows
    pub fn reconcile_likes(&self, photo_id: PhotoId) -> Result<u32> {
        let count = Ledger::new(&self.library).reconcile(photo_id)?;
        self.cache.invalidate_all();
        Ok(count)
    }

    /// Drop all cached pages
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    // ========== Async bridge ==========

    pub async fn search_async(self: &Arc<Self>, facets: FacetSet) -> Result<Page> {
        let catalog = Arc::clone(self);
        blocking(move || catalog.search(&facets)).await
    }

    pub async fn like_async(self: &Arc<Self>, photo_id: PhotoId, viewer_id: ViewerId) -> Result<bool> {
        let catalog = Arc::clone(self);
        blocking(move || catalog.like(photo_id, &viewer_id)).await
    }

    pub async fn unlike_async(self: &Arc<Self>, photo_id: PhotoId, viewer_id: ViewerId) -> Result<bool> {
        let catalog = Arc::clone(self);
        blocking(move || catalog.unlike(photo_id, &viewer_id)).await
    }
}

/// Spawn blocking because every store access waits on SQLite
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| CatalogError::Unavailable(format!("Task join error: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Account, NewPhoto};
    use chrono::{Duration as Days, TimeZone, Utc};

    fn catalog() -> (Catalog, Vec<PhotoId>) {
        let catalog = Catalog::in_memory().unwrap();
        let library = catalog.library();
        library
            .upsert_account(&Account {
                id: "acc-ana".into(),
                display_name: "Ana Ortiz".into(),
                avatar_ref: None,
            })
            .unwrap();
        let ana = library.create_photographer("acc-ana", "").unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let ids = (0..3)
            .map(|i| {
                library
                    .create_photo(&NewPhoto {
                        photographer_id: ana,
                        event_id: None,
                        storage_ref: format!("{i}.jpg"),
                        date: start + Days::days(i),
                        tags: vec!["street".into()],
                    })
                    .unwrap()
            })
            .collect();
        (catalog, ids)
    }

    #[test]
    fn test_repeated_search_is_served_from_cache() {
        let (catalog, _) = catalog();
        let facets = FacetSet::new().tag("street");

        let first = catalog.search(&facets).unwrap();
        let queries = catalog.stats().photo_queries;
        let second = catalog.search(&facets).unwrap();

        assert_eq!(first, second);
        assert_eq!(catalog.stats().photo_queries, queries);
    }

    #[test]
    fn test_like_invalidates_cached_pages() {
        let (catalog, ids) = catalog();
        let facets = FacetSet::new().sort_by("most_liked").viewer("v1");

        let before = catalog.search(&facets).unwrap();
        assert!(before.items.iter().all(|item| item.like_count == 0));

        assert!(catalog.like(ids[0], "v1").unwrap());
        let after = catalog.search(&facets).unwrap();

        assert_eq!(after.items[0].photo_id, ids[0]);
        assert_eq!(after.items[0].like_count, 1);
        assert_eq!(after.items[0].liked_by_viewer, Some(true));
    }

    #[test]
    fn test_validation_error_before_store_access() {
        let (catalog, _) = catalog();
        let before = catalog.stats();

        let err = catalog.search(&FacetSet::new().sort_by("trending")).unwrap_err();

        assert!(matches!(err, CatalogError::Validation(_)));
        assert!(!err.is_retryable());
        assert_eq!(catalog.stats(), before);
    }

    #[test]
    fn test_search_as_uses_identity() {
        let (catalog, ids) = catalog();
        catalog.like(ids[1], "v1").unwrap();

        let anonymous = catalog.search_as(&Anonymous, FacetSet::new().liked_only()).unwrap();
        assert_eq!(anonymous.total_items, 0);

        let signed_in = catalog
            .search_as(&Some("v1".to_string()), FacetSet::new().liked_only())
            .unwrap();
        assert_eq!(signed_in.total_items, 1);
        assert_eq!(signed_in.items[0].photo_id, ids[1]);
    }

    #[test]
    fn test_clear_cache_forces_fresh_query() {
        let (catalog, _) = catalog();
        let facets = FacetSet::new().tag("street");

        catalog.search(&facets).unwrap();
        catalog.clear_cache();
        let queries = catalog.stats().photo_queries;
        catalog.search(&facets).unwrap();

        assert_eq!(catalog.stats().photo_queries, queries + 2);
    }

    #[test]
    fn test_reconcile_likes_refreshes_cached_pages() {
        let (catalog, ids) = catalog();
        catalog.like(ids[2], "v1").unwrap();
        let facets = FacetSet::new().sort_by("most_liked");
        assert_eq!(catalog.search(&facets).unwrap().items[0].like_count, 1);

        catalog
            .library()
            .write(|tx| {
                tx.delete_like(ids[2], "v1")?;
                Ok(())
            })
            .unwrap();

        assert_eq!(catalog.reconcile_likes(ids[2]).unwrap(), 0);
        let page = catalog.search(&facets).unwrap();
        assert!(page.items.iter().all(|item| item.like_count == 0));
    }

    #[test]
    fn test_page_json_is_camel_case() {
        let (catalog, ids) = catalog();
        catalog.like(ids[0], "v1").unwrap();

        let page = catalog.search(&FacetSet::new().viewer("v1").page_size(1)).unwrap();
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(json["totalItems"], 3);
        let item = &json["items"][0];
        assert_eq!(item["photoId"], ids[2]);
        assert_eq!(item["likeCount"], 0);
        assert_eq!(item["likedByViewer"], false);
        assert_eq!(item["photographerName"], "Ana Ortiz");
        assert!(item.get("liked_by_viewer").is_none());
    }

    #[test]
    fn test_disabled_cache_always_queries() {
        let catalog = Catalog::open(CatalogConfig {
            cache_ttl_secs: 0,
            ..CatalogConfig::in_memory()
        })
        .unwrap();

        catalog.search(&FacetSet::new()).unwrap();
        catalog.search(&FacetSet::new()).unwrap();

        assert_eq!(catalog.stats().photo_queries, 2);
    }
}
