//! Query planning
//!
//! Turns resolved facets into either an empty-page short-circuit or a
//! fetch plan: one conjunctive predicate, a sort order and a page window.

use rusqlite::types::Value;
use tracing::debug;

use super::facets::{SearchRequest, SortMode};
use super::resolver::{Resolution, ResolvedFacets};
use crate::state::library::contains_pattern;
use crate::state::{EventId, PhotographerId, TagId, ViewerId};

/// One AND-ed restriction on the photo relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
    PhotographerIn(Vec<PhotographerId>),
    EventIn(Vec<EventId>),
    /// Photo has at least one of these tags
    TaggedWithAny(Vec<TagId>),
    LikedBy(ViewerId),
    /// Substring of photographer name, event name or location, or a tag name
    TextMatches(String),
}

impl Restriction {
    fn push_sql(&self, clauses: &mut Vec<String>, args: &mut Vec<Value>) {
        match self {
            Restriction::PhotographerIn(ids) => {
                clauses.push(in_list("p.photographer_id", ids.len()));
                args.extend(ids.iter().map(|id| Value::Integer(*id)));
            }
            Restriction::EventIn(ids) => {
                clauses.push(in_list("p.event_id", ids.len()));
                args.extend(ids.iter().map(|id| Value::Integer(*id)));
            }
            Restriction::TaggedWithAny(ids) => {
                let inner = in_list("tag_id", ids.len());
                clauses.push(format!(
                    "p.id IN (SELECT photo_id FROM photo_tags WHERE {inner})"
                ));
                args.extend(ids.iter().map(|id| Value::Integer(*id)));
            }
            Restriction::LikedBy(viewer) => {
                clauses.push("p.id IN (SELECT photo_id FROM likes WHERE viewer_id = ?)".into());
                args.push(Value::Text(viewer.clone()));
            }
            Restriction::TextMatches(text) => {
                clauses.push(
                    "(EXISTS (SELECT 1 FROM photographers ph JOIN accounts a ON a.id = ph.account_id \
                       WHERE ph.id = p.photographer_id AND unicode_lower(a.display_name) LIKE ? ESCAPE '\\') \
                     OR EXISTS (SELECT 1 FROM events e WHERE e.id = p.event_id \
                       AND (unicode_lower(e.name) LIKE ? ESCAPE '\\' OR unicode_lower(e.location) LIKE ? ESCAPE '\\')) \
                     OR EXISTS (SELECT 1 FROM photo_tags pt JOIN tags t ON t.id = pt.tag_id \
                       WHERE pt.photo_id = p.id AND unicode_lower(t.name) LIKE ? ESCAPE '\\'))"
                        .into(),
                );
                let pattern = contains_pattern(text);
                args.extend(std::iter::repeat(Value::Text(pattern)).take(4));
            }
        }
    }
}

/// `column IN (?, ...)`, or a constant false for an empty list
fn in_list(column: &str, n: usize) -> String {
    if n == 0 {
        return "0".to_string();
    }
    format!("{column} IN ({})", vec!["?"; n].join(", "))
}

/// A conjunction of restrictions. The empty conjunction matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    restrictions: Vec<Restriction>,
}

impl Predicate {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn and(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    /// Render as a `WHERE` fragment over alias `p` plus its bound arguments.
    /// Returns an empty fragment when there is nothing to restrict.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        if self.restrictions.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut clauses = Vec::with_capacity(self.restrictions.len());
        let mut args = Vec::new();
        for restriction in &self.restrictions {
            restriction.push_sql(&mut clauses, &mut args);
        }
        (format!("WHERE {}", clauses.join(" AND ")), args)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub predicate: Predicate,
    pub sort: SortMode,
    pub page: u32,
    pub page_size: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Some facet matched nothing; answer with an empty page without querying photos
    Empty { page: u32, page_size: u32 },
    Fetch(FetchPlan),
}

/// Build the plan for a validated request whose facets have been resolved.
pub fn plan(resolved: ResolvedFacets, request: &SearchRequest) -> QueryPlan {
    if resolved.any_unresolved() {
        debug!("Short-circuit: a facet matched nothing");
        return QueryPlan::Empty {
            page: request.page,
            page_size: request.page_size,
        };
    }

    QueryPlan::Fetch(FetchPlan {
        predicate: build_predicate(resolved),
        sort: request.sort,
        page: request.page,
        page_size: request.page_size,
        offset: request.offset(),
    })
}

fn build_predicate(resolved: ResolvedFacets) -> Predicate {
    let mut predicate = Predicate::all();

    if let Resolution::Resolved(ids) = resolved.photographers {
        predicate = predicate.and(Restriction::PhotographerIn(ids));
    }
    if let Resolution::Resolved(ids) = resolved.events {
        predicate = predicate.and(Restriction::EventIn(ids));
    }
    if let Resolution::Resolved(ids) = resolved.tags {
        predicate = predicate.and(Restriction::TaggedWithAny(ids));
    }
    if let Resolution::Resolved(viewer) = resolved.liked_by {
        predicate = predicate.and(Restriction::LikedBy(viewer));
    }
    if let Some(text) = resolved.text {
        predicate = predicate.and(Restriction::TextMatches(text));
    }

    predicate
}
