//! Result assembly
//!
//! Runs a [`QueryPlan`] and denormalizes the page into [`ViewRecord`]s.
//! Enrichment happens after pagination and costs one set-membership
//! lookup per related relation, however many photos are on the page.

use tracing::debug;

use super::page::{total_pages, Page};
use super::planner::{FetchPlan, QueryPlan};
use crate::error::{CatalogError, Result};
use crate::state::{CatalogTx, Photo, ViewRecord};

/// Execute `plan` inside `tx`. Call it within a single read transaction so
/// counts, rows and names all come from one snapshot.
pub fn execute(tx: &CatalogTx<'_>, plan: &QueryPlan, viewer: Option<&str>) -> Result<Page> {
    match plan {
        QueryPlan::Empty { page, page_size } => Ok(Page::empty(*page, *page_size)),
        QueryPlan::Fetch(fetch) => fetch_page(tx, fetch, viewer),
    }
}

fn fetch_page(tx: &CatalogTx<'_>, plan: &FetchPlan, viewer: Option<&str>) -> Result<Page> {
    let (where_sql, args) = plan.predicate.to_sql();

    let total_items = tx.count_photos(&where_sql, &args)?;
    let photos = if plan.offset >= total_items {
        Vec::new()
    } else {
        tx.fetch_photo_page(
            &where_sql,
            &args,
            plan.sort.order_by(),
            plan.page_size,
            plan.offset,
        )?
    };

    debug!(
        total_items,
        returned = photos.len(),
        page = plan.page,
        sort = %plan.sort,
        "Fetched photo page"
    );

    Ok(Page {
        items: enrich(tx, photos, viewer)?,
        total_items,
        total_pages: total_pages(total_items, plan.page_size),
        page: plan.page,
        page_size: plan.page_size,
    })
}

/// Attach photographer, event, tag and like-state details to a page of photos
fn enrich(tx: &CatalogTx<'_>, photos: Vec<Photo>, viewer: Option<&str>) -> Result<Vec<ViewRecord>> {
    if photos.is_empty() {
        return Ok(Vec::new());
    }

    let photo_ids: Vec<_> = photos.iter().map(|p| p.id).collect();

    let mut photographer_ids: Vec<_> = photos.iter().map(|p| p.photographer_id).collect();
    photographer_ids.sort_unstable();
    photographer_ids.dedup();

    let mut event_ids: Vec<_> = photos.iter().filter_map(|p| p.event_id).collect();
    event_ids.sort_unstable();
    event_ids.dedup();

    let photographers = tx.photographer_cards(&photographer_ids)?;
    let events = tx.event_names(&event_ids)?;
    let mut tags = tx.tag_names_for(&photo_ids)?;
    let liked = match viewer {
        Some(viewer) => Some(tx.liked_photo_ids(viewer, &photo_ids)?),
        None => None,
    };

    photos
        .into_iter()
        .map(|photo| {
            let card = photographers.get(&photo.photographer_id).ok_or_else(|| {
                CatalogError::NotFound(format!(
                    "photographer {} of photo {}",
                    photo.photographer_id, photo.id
                ))
            })?;

            Ok(ViewRecord {
                photo_id: photo.id,
                photographer_id: photo.photographer_id,
                photographer_name: card.display_name.clone(),
                photographer_avatar: card.avatar_ref.clone(),
                event_id: photo.event_id,
                event_name: photo.event_id.and_then(|id| events.get(&id).cloned()),
                storage_ref: photo.storage_ref,
                like_count: photo.like_count,
                date: photo.date,
                tags: tags.remove(&photo.id).unwrap_or_default(),
                liked_by_viewer: liked.as_ref().map(|set| set.contains(&photo.id)),
            })
        })
        .collect()
}
