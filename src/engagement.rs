/// Engagement ledger
///
/// The only writer of the like relation and of the denormalized
/// `like_count` column. Each call runs in one immediate transaction: the
/// existence check, the like-row mutation and the counter update commit
/// together or not at all, and concurrent calls on the same photo are
/// serialized by the store's write lock.

use tracing::{debug, warn};

use crate::error::{CatalogError, Result};
use crate::state::{CatalogTx, Library, PhotoId};

pub struct Ledger<'a> {
    library: &'a Library,
}

impl<'a> Ledger<'a> {
    pub fn new(library: &'a Library) -> Self {
        Self { library }
    }

    /// Record a like. Returns `false` if the viewer already liked the photo.
    pub fn like(&self, photo_id: PhotoId, viewer_id: &str) -> Result<bool> {
        let viewer_id = checked_viewer(viewer_id)?;

        self.library.write(|tx| {
            ensure_photo(tx, photo_id)?;

            if !tx.insert_like(photo_id, viewer_id)? {
                debug!(photo_id, viewer_id, "Already liked");
                return Ok(false);
            }
            tx.increment_like_count(photo_id)?;

            debug!(photo_id, viewer_id, "Liked");
            Ok(true)
        })
    }

    /// Remove a like. Returns `false` if there was none.
    pub fn unlike(&self, photo_id: PhotoId, viewer_id: &str) -> Result<bool> {
        let viewer_id = checked_viewer(viewer_id)?;

        self.library.write(|tx| {
            ensure_photo(tx, photo_id)?;

            if !tx.delete_like(photo_id, viewer_id)? {
                debug!(photo_id, viewer_id, "Not liked, nothing to remove");
                return Ok(false);
            }
            if !tx.decrement_like_count(photo_id)? {
                warn!(photo_id, "Like count was already zero while a like row existed");
            }

            debug!(photo_id, viewer_id, "Unliked");
            Ok(true)
        })
    }

    /// Flip the viewer's like state. Returns the new state.
    pub fn toggle(&self, photo_id: PhotoId, viewer_id: &str) -> Result<bool> {
        let viewer_id = checked_viewer(viewer_id)?;

        self.library.write(|tx| {
            ensure_photo(tx, photo_id)?;

            if tx.delete_like(photo_id, viewer_id)? {
                if !tx.decrement_like_count(photo_id)? {
                    warn!(photo_id, "Like count was already zero while a like row existed");
                }
                Ok(false)
            } else {
                tx.insert_like(photo_id, viewer_id)?;
                tx.increment_like_count(photo_id)?;
                Ok(true)
            }
        })
    }

    /// Rebuild a photo's stored like count from its like rows.
    /// Returns the corrected count.
    pub fn reconcile(&self, photo_id: PhotoId) -> Result<u32> {
        self.library.write(|tx| {
            ensure_photo(tx, photo_id)?;
            let count = tx.recount_likes(photo_id)?;
            debug!(photo_id, count, "Like count reconciled");
            Ok(count)
        })
    }
}

fn checked_viewer(viewer_id: &str) -> Result<&str> {
    let viewer_id = viewer_id.trim();
    if viewer_id.is_empty() {
        return Err(CatalogError::validation("viewer id must not be blank"));
    }
    Ok(viewer_id)
}

fn ensure_photo(tx: &CatalogTx<'_>, photo_id: PhotoId) -> Result<()> {
    match tx.photo(photo_id)? {
        Some(_) => Ok(()),
        None => Err(CatalogError::NotFound(format!("photo {photo_id}"))),
    }
}
