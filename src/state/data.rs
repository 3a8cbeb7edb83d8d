/// Shared data structures for the catalog
///
/// These structs represent the data model that flows between
/// the database layer and the query engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PhotoId = i64;
pub type PhotographerId = i64;
pub type EventId = i64;
pub type TagId = i64;

/// Account identity supplied by the external identity provider
pub type AccountId = String;

/// A viewer is any authenticated account
pub type ViewerId = AccountId;

/// An account as seen by the catalog: only what is needed for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub display_name: String,
    /// Opaque avatar reference, resolved by the storage collaborator
    pub avatar_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photographer {
    pub id: PhotographerId,
    pub account_id: AccountId,
    pub bio: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub organizer_id: AccountId,
}

/// Represents a single photo row
///
/// Immutable once created except `like_count`, which only the
/// engagement ledger writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub photographer_id: PhotographerId,
    /// Nulled when the event is deleted
    pub event_id: Option<EventId>,
    /// Opaque storage reference (bucket key, path, ...)
    pub storage_ref: String,
    /// Denormalized count of like rows referencing this photo
    pub like_count: u32,
    /// Display/sort date, distinct from the creation timestamp
    pub date: DateTime<Utc>,
}

/// Input for registering a new photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoto {
    pub photographer_id: PhotographerId,
    pub event_id: Option<EventId>,
    pub storage_ref: String,
    pub date: DateTime<Utc>,
    /// Tag names; missing tags are created on the fly
    pub tags: Vec<String>,
}

/// Display-ready representation of a photo assembled for one result page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRecord {
    pub photo_id: PhotoId,
    pub photographer_id: PhotographerId,
    pub photographer_name: String,
    pub photographer_avatar: Option<String>,
    pub event_id: Option<EventId>,
    pub event_name: Option<String>,
    pub storage_ref: String,
    pub like_count: u32,
    pub date: DateTime<Utc>,
    /// All tags of the photo, sorted and deduplicated
    pub tags: Vec<String>,
    /// `None` when the request carried no viewer identity
    pub liked_by_viewer: Option<bool>,
}

/// Photographer display info returned by the batch lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotographerCard {
    pub display_name: String,
    pub avatar_ref: Option<String>,
}
