use serde::{Deserialize, Serialize};

use crate::state::ViewRecord;

/// One page of search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<ViewRecord>,
    pub total_items: u64,
    pub total_pages: u64,
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    /// The answer to a query that cannot match anything
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            total_items: 0,
            total_pages: 0,
            page,
            page_size,
        }
    }

    /// Requested page lies beyond the last one.
    /// The engine does not clamp; callers re-request `total_pages` instead.
    pub fn is_out_of_range(&self) -> bool {
        self.total_pages > 0 && u64::from(self.page) > self.total_pages
    }
}

/// `ceil(total_items / page_size)`
pub fn total_pages(total_items: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total_items.div_ceil(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(4, 2), 2);
    }

    #[test]
    fn test_out_of_range() {
        let mut page = Page::empty(5, 10);
        assert!(!page.is_out_of_range());

        page.total_items = 25;
        page.total_pages = 3;
        assert!(page.is_out_of_range());

        page.page = 3;
        assert!(!page.is_out_of_range());
    }
}
