//! Page cursor and pager arithmetic.
//!
//! Users see 1-based pages; the backend counts from zero. [`PageCursor`]
//! holds the user-facing number and converts at the wire boundary only.

use std::fmt;
use std::num::NonZeroU32;
use std::ops::RangeInclusive;

use serde::Serialize;

use crate::application::params::ParamStore;
use crate::domain::resources::PAGE_KEY;

/// 1-based page number as carried in the `page` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PageCursor(NonZeroU32);

impl PageCursor {
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    pub fn new(page: u32) -> Option<Self> {
        NonZeroU32::new(page).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// 0-based index sent as `pageNumber`.
    pub fn page_index(self) -> u32 {
        self.0.get() - 1
    }

    /// Cursor for a 0-based index echoed by the server.
    pub fn from_index(index: u32) -> Self {
        Self::new(index.saturating_add(1)).unwrap_or(Self::FIRST)
    }

    /// Absent, zero, negative or non-numeric values all mean the first page.
    pub fn from_param(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.trim().parse::<u32>().ok())
            .and_then(Self::new)
            .unwrap_or(Self::FIRST)
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn previous(self) -> Option<Self> {
        Self::new(self.get() - 1)
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One page of records in canonical form, whatever shape the server used.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub page_number: PageCursor,
}

impl<T> ResultPage<T> {
    pub fn try_map<U, E, F>(self, mut f: F) -> Result<ResultPage<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        let content = self
            .content
            .into_iter()
            .map(&mut f)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResultPage {
            content,
            total_elements: self.total_elements,
            page_number: self.page_number,
        })
    }
}

/// Client-side pagination over a complete, unpaged result.
///
/// The total is the full array length; a cursor past the end yields an
/// empty page rather than an error.
pub fn paginate_flat<T: Clone>(items: &[T], page: PageCursor, page_size: u32) -> ResultPage<T> {
    let size = page_size.max(1) as usize;
    let start = (page.page_index() as usize).saturating_mul(size);
    let content = items.iter().skip(start).take(size).cloned().collect();
    ResultPage {
        content,
        total_elements: items.len() as u64,
        page_number: page,
    }
}

/// Navigation state derived from a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pager {
    pub current: PageCursor,
    pub total_elements: u64,
    pub page_size: u32,
}

impl Pager {
    pub fn new(current: PageCursor, total_elements: u64, page_size: u32) -> Self {
        Self {
            current,
            total_elements,
            page_size: page_size.max(1),
        }
    }

    pub fn for_page<T>(page: &ResultPage<T>, page_size: u32) -> Self {
        Self::new(page.page_number, page.total_elements, page_size)
    }

    /// `ceil(total / size)`; zero when there are no records.
    pub fn total_pages(&self) -> u32 {
        let pages = self.total_elements.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Selectable page numbers; empty when there are no records.
    pub fn pages(&self) -> RangeInclusive<u32> {
        match self.total_pages() {
            0 => RangeInclusive::new(1, 0),
            total => 1..=total,
        }
    }

    pub fn has_previous(&self) -> bool {
        self.current > PageCursor::FIRST
    }

    pub fn has_next(&self) -> bool {
        self.current.get() < self.total_pages()
    }

    /// Cursor points past the last page (e.g. after records were deleted).
    pub fn is_out_of_range(&self) -> bool {
        self.current.get() > self.total_pages().max(1)
    }

    /// Write the selected page into the store. Other keys are untouched.
    pub fn go_to(&self, store: &ParamStore, page: PageCursor) -> bool {
        if page == PageCursor::FIRST {
            store.remove([PAGE_KEY])
        } else {
            store.set([(PAGE_KEY, page.to_string())])
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "page {} of {} ({} items)",
            self.current,
            self.total_pages().max(1),
            self.total_elements
        )
    }
}
