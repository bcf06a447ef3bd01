//! Page arithmetic shared by list builders.

/// Number of pages needed for `item_count` items.
///
/// An empty result still occupies one page so "no results" renders as a
/// regular page with a zero count.
pub fn total_pages(item_count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    item_count.div_ceil(page_size).max(1)
}

/// Resolved slice bounds for one page of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page after clamping into `1..=total_pages`.
    pub page: usize,
    pub total_pages: usize,
    pub start: usize,
    pub end: usize,
}

impl PageWindow {
    /// Clamp a requested page into range and compute its bounds.
    pub fn clamp(item_count: usize, page_size: usize, requested: u32) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_pages(item_count, page_size);
        let page = usize::try_from(requested)
            .unwrap_or(usize::MAX)
            .clamp(1, total_pages);
        let start = ((page - 1) * page_size).min(item_count);
        let end = (start + page_size).min(item_count);
        Self {
            page,
            total_pages,
            start,
            end,
        }
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.start.min(items.len())..self.end.min(items.len())]
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}
