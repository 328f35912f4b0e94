use serde::Serialize;

use crate::config::DEFAULT_PAGE_SIZE;

/// How a multi-result read wants its results bounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageRequest {
    #[default]
    None,
    /// 1-indexed page number.
    Page(u64),
    /// Absolute row offset.
    Offset(u64),
}

impl PageRequest {
    /// Guard-clause resolution of raw pagination inputs.
    ///
    /// A positive `page` wins over `offset`; a non-positive `page` falls
    /// through to the `offset` clause, and a negative `offset` falls through
    /// to no pagination. Out-of-domain values never error.
    pub fn resolve(page: Option<i64>, offset: Option<i64>) -> Self {
        if let Some(page) = page {
            if page > 0 {
                return PageRequest::Page(page as u64);
            }
        }
        if let Some(offset) = offset {
            if offset >= 0 {
                return PageRequest::Offset(offset as u64);
            }
        }
        PageRequest::None
    }
}

/// Pagination metadata reported alongside a page of entries.
///
/// Invariants: `total_pages = max(1, ceil(total_entries / page_size))` and
/// `1 <= page <= total_pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u64,
    pub page_size: u64,
    pub total_entries: u64,
    pub total_pages: u64,
}

/// The envelope returned when pagination is engaged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub entries: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total_entries: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub(crate) fn new(entries: Vec<T>, meta: PageMeta) -> Self {
        Self {
            entries,
            page: meta.page,
            page_size: meta.page_size,
            total_entries: meta.total_entries,
            total_pages: meta.total_pages,
        }
    }

    pub fn meta(&self) -> PageMeta {
        PageMeta {
            page: self.page,
            page_size: self.page_size,
            total_entries: self.total_entries,
            total_pages: self.total_pages,
        }
    }
}

/// Result shape of [`Repo::find`](crate::Repo::find): a bare list when no
/// pagination was requested, a [`Page`] envelope otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
    Unpaged(Vec<T>),
    Paged(Page<T>),
}

impl<T> Listing<T> {
    pub fn entries(&self) -> &[T] {
        match self {
            Listing::Unpaged(entries) => entries,
            Listing::Paged(page) => &page.entries,
        }
    }

    pub fn into_entries(self) -> Vec<T> {
        match self {
            Listing::Unpaged(entries) => entries,
            Listing::Paged(page) => page.entries,
        }
    }

    pub fn meta(&self) -> Option<PageMeta> {
        match self {
            Listing::Unpaged(_) => None,
            Listing::Paged(page) => Some(page.meta()),
        }
    }

    pub fn is_paged(&self) -> bool {
        matches!(self, Listing::Paged(_))
    }
}

pub(crate) fn resolve_page_size(requested: Option<u64>, configured: u64) -> u64 {
    match requested.filter(|size| *size > 0) {
        Some(size) => size,
        None if configured > 0 => configured,
        None => DEFAULT_PAGE_SIZE,
    }
}

pub(crate) fn total_pages(total_entries: u64, page_size: u64) -> u64 {
    total_entries.div_ceil(page_size).max(1)
}

/// Page/offset math over a known total: clamps the request into range and
/// returns the effective row offset plus the metadata to report.
pub(crate) fn bound(
    request: PageRequest,
    page_size: u64,
    total_entries: u64,
) -> Option<(u64, PageMeta)> {
    let total_pages = total_pages(total_entries, page_size);

    match request {
        PageRequest::None => None,
        PageRequest::Page(requested) => {
            let page = requested.min(total_pages);
            let offset = page_size * (page - 1);
            Some((
                offset,
                PageMeta {
                    page,
                    page_size,
                    total_entries,
                    total_pages,
                },
            ))
        }
        PageRequest::Offset(requested) => {
            let offset = requested.min(total_entries);
            let page = (offset / page_size + 1).min(total_pages);
            Some((
                offset,
                PageMeta {
                    page,
                    page_size,
                    total_entries,
                    total_pages,
                },
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_law() {
        for total in 0..200u64 {
            for size in 1..20u64 {
                let expected = (total.div_ceil(size)).max(1);
                assert_eq!(total_pages(total, size), expected);
            }
        }
    }

    #[test]
    fn empty_set_still_has_one_page() {
        assert_eq!(total_pages(0, 10), 1);

        let (offset, meta) = bound(PageRequest::Page(1), 10, 0).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(
            meta,
            PageMeta {
                page: 1,
                page_size: 10,
                total_entries: 0,
                total_pages: 1
            }
        );
    }

    #[test]
    fn page_beyond_range_clamps_to_last() {
        let (offset, meta) = bound(PageRequest::Page(99), 10, 25).unwrap();
        assert_eq!(meta.page, 3);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(offset, 20);
    }

    #[test]
    fn offset_beyond_range_clamps_to_total() {
        let (offset, meta) = bound(PageRequest::Offset(999), 10, 25).unwrap();
        assert_eq!(offset, 25);
        assert_eq!(meta.page, 3);
    }

    #[test]
    fn offset_derives_page_for_reporting() {
        let (offset, meta) = bound(PageRequest::Offset(5), 10, 12).unwrap();
        assert_eq!(offset, 5);
        assert_eq!(meta.page, 1);
        assert_eq!(meta.total_pages, 2);
    }

    #[test]
    fn page_is_always_within_range() {
        for total in 0..60u64 {
            for size in 1..8u64 {
                for requested in 0..80u64 {
                    let (_, meta) = bound(PageRequest::Offset(requested), size, total).unwrap();
                    assert!(meta.page >= 1);
                    assert!(meta.page <= meta.total_pages);
                }
            }
        }
    }

    #[test]
    fn page_offset_round_trip() {
        for size in 1..20u64 {
            for page in 1..50u64 {
                let offset = size * (page - 1);
                assert_eq!(offset / size + 1, page);
            }
        }
    }

    #[test]
    fn guard_clauses_fall_through() {
        assert_eq!(PageRequest::resolve(Some(2), Some(7)), PageRequest::Page(2));
        assert_eq!(
            PageRequest::resolve(Some(0), Some(7)),
            PageRequest::Offset(7)
        );
        assert_eq!(PageRequest::resolve(Some(-3), None), PageRequest::None);
        assert_eq!(PageRequest::resolve(None, Some(-1)), PageRequest::None);
        assert_eq!(PageRequest::resolve(None, Some(0)), PageRequest::Offset(0));
        assert_eq!(PageRequest::resolve(None, None), PageRequest::None);
    }

    #[test]
    fn page_size_resolution_order() {
        assert_eq!(resolve_page_size(Some(20), 30), 20);
        assert_eq!(resolve_page_size(Some(0), 30), 30);
        assert_eq!(resolve_page_size(None, 30), 30);
        assert_eq!(resolve_page_size(None, 0), DEFAULT_PAGE_SIZE);
    }
}
