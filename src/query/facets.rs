use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::state::ViewerId;

/// Raw, loosely typed search facets as they arrive from the caller.
///
/// Every facet is optional. Nothing here is trusted until
/// [`FacetSet::validate`] turns it into a [`SearchRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FacetSet {
    /// Free-text substring search
    pub query: Option<String>,
    /// Photographer display name, partial and case-insensitive
    pub photographer: Option<String>,
    /// Event name, partial and case-insensitive
    pub event: Option<String>,
    /// Exact tag names; a photo matches if it has at least one of them
    pub tags: Vec<String>,
    /// Only photos the viewer has liked
    pub liked_only: bool,
    /// Viewer identity from the identity provider, `None` for anonymous callers
    pub viewer: Option<ViewerId>,
    /// `newest` (default), `oldest` or `most_liked`
    pub sort_by: Option<String>,
    /// 1-indexed page number, defaults to 1
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl FacetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn photographer(mut self, name: impl Into<String>) -> Self {
        self.photographer = Some(name.into());
        self
    }

    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.event = Some(name.into());
        self
    }

    pub fn tag(mut self, name: impl Into<String>) -> Self {
        self.tags.push(name.into());
        self
    }

    pub fn liked_only(mut self) -> Self {
        self.liked_only = true;
        self
    }

    pub fn viewer(mut self, viewer: impl Into<ViewerId>) -> Self {
        self.viewer = Some(viewer.into());
        self
    }

    pub fn sort_by(mut self, sort: impl Into<String>) -> Self {
        self.sort_by = Some(sort.into());
        self
    }

    pub fn page(mut self, page: i64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Validate and normalize into a [`SearchRequest`].
    ///
    /// Fails on an unknown sort mode, a non-positive page or page size, a
    /// page size above the configured maximum, or a blank viewer id.
    pub fn validate(&self, config: &CatalogConfig) -> Result<SearchRequest> {
        let sort = match self.sort_by.as_deref().map(str::trim) {
            None | Some("") => SortMode::default(),
            Some(raw) => raw.parse()?,
        };

        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err(CatalogError::validation(format!(
                "page must be at least 1, got {page}"
            )));
        }
        let page = u32::try_from(page)
            .map_err(|_| CatalogError::validation(format!("page {page} is out of range")))?;

        let page_size = self
            .page_size
            .unwrap_or_else(|| i64::from(config.default_page_size));
        if page_size < 1 {
            return Err(CatalogError::validation(format!(
                "page size must be at least 1, got {page_size}"
            )));
        }
        if page_size > i64::from(config.max_page_size) {
            return Err(CatalogError::validation(format!(
                "page size {page_size} exceeds the maximum of {}",
                config.max_page_size
            )));
        }
        let page_size = page_size as u32;

        let viewer = match &self.viewer {
            Some(id) if id.trim().is_empty() => {
                return Err(CatalogError::validation("viewer id must not be blank"));
            }
            Some(id) => Some(id.trim().to_string()),
            None => None,
        };

        let mut tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        tags.sort();
        tags.dedup();

        Ok(SearchRequest {
            text: non_blank(&self.query),
            photographer: non_blank(&self.photographer),
            event: non_blank(&self.event),
            tags,
            liked_only: self.liked_only,
            viewer,
            sort,
            page,
            page_size,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Fixed set of result orderings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Display date descending, later inserts first on ties
    #[default]
    Newest,
    /// Display date ascending, earlier inserts first on ties
    Oldest,
    /// Like count descending, then display date descending
    MostLiked,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Newest => "newest",
            SortMode::Oldest => "oldest",
            SortMode::MostLiked => "most_liked",
        }
    }

    /// `ORDER BY` body over the photo alias `p`.
    /// Always ends on the row id so pages never overlap.
    pub fn order_by(&self) -> &'static str {
        match self {
            SortMode::Newest => "p.date DESC, p.id DESC",
            SortMode::Oldest => "p.date ASC, p.id ASC",
            SortMode::MostLiked => "p.like_count DESC, p.date DESC, p.id DESC",
        }
    }
}

impl FromStr for SortMode {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "newest" => Ok(SortMode::Newest),
            "oldest" => Ok(SortMode::Oldest),
            "most_liked" => Ok(SortMode::MostLiked),
            _ => Err(CatalogError::validation(format!("unknown sort mode '{s}'"))),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated facet set with defaults applied.
///
/// Two requests that mean the same thing compare equal, which makes this
/// the unit of caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SearchRequest {
    pub text: Option<String>,
    pub photographer: Option<String>,
    pub event: Option<String>,
    /// Trimmed, sorted, deduplicated
    pub tags: Vec<String>,
    pub liked_only: bool,
    pub viewer: Option<ViewerId>,
    pub sort: SortMode,
    pub page: u32,
    pub page_size: u32,
}

impl SearchRequest {
    /// Row offset of the requested page
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Canonical serialization covering every facet, sort, page and page size
    pub fn cache_key(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
