//! Cursor Module
//!
//! Fixed-size paging window over a decoded sequence, with optional ordering.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// "Comes before" predicate used to order a sequence before paging.
pub type OrderFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

// == Page ==
/// Outcome of slicing a sequence with a [`Cursor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page<T> {
    /// Items inside the window; shorter than the page size at the tail
    Items(Vec<T>),
    /// The window starts past the end of the data
    End,
}

impl<T> Page<T> {
    pub fn is_end(&self) -> bool {
        matches!(self, Page::End)
    }

    pub fn items(&self) -> &[T] {
        match self {
            Page::Items(items) => items,
            Page::End => &[],
        }
    }

    pub fn into_items(self) -> Option<Vec<T>> {
        match self {
            Page::Items(items) => Some(items),
            Page::End => None,
        }
    }
}

// == Cursor ==
/// Caller-held pagination state.
///
/// The window always spans `page_size` positions and only moves forward.
pub struct Cursor<T> {
    page_size: usize,
    ordering: Option<OrderFn<T>>,
    window_start: usize,
    window_end: usize,
    page_count: usize,
}

impl<T> Cursor<T> {
    /// Cursor over the first `page_size` items, keeping source order.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            ordering: None,
            window_start: 0,
            window_end: page_size,
            page_count: 0,
        }
    }

    /// Cursor that sorts the sequence with `comes_before` before paging.
    pub fn with_ordering<F>(page_size: usize, comes_before: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            ordering: Some(Arc::new(comes_before)),
            ..Self::new(page_size)
        }
    }

    // == Advance ==
    /// Slides the window to the next page.
    pub fn advance(&mut self) {
        self.window_start = self.window_end;
        self.window_end = self.window_end.saturating_add(self.page_size);
        self.page_count += 1;
    }

    /// Moves back to the first page.
    pub fn reset(&mut self) {
        self.window_start = 0;
        self.window_end = self.page_size;
        self.page_count = 0;
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn window_start(&self) -> usize {
        self.window_start
    }

    pub fn window_end(&self) -> usize {
        self.window_end
    }

    /// Number of times the cursor has advanced.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn range(&self) -> Range<usize> {
        self.window_start..self.window_end
    }

    pub fn has_ordering(&self) -> bool {
        self.ordering.is_some()
    }

    // == Sort ==
    /// Stable-sorts `items` with the cursor's ordering, if it has one.
    pub fn sort(&self, items: &mut [T]) {
        if let Some(comes_before) = &self.ordering {
            items.sort_by(|a, b| {
                if comes_before(a, b) {
                    Ordering::Less
                } else if comes_before(b, a) {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            });
        }
    }

    // == Slice ==
    /// Cuts the current window out of `items`.
    ///
    /// A window running past the end yields the available suffix; a window
    /// starting at or past the end yields [`Page::End`].
    pub fn slice(&self, items: &[T]) -> Page<T>
    where
        T: Clone,
    {
        if self.window_end < items.len() {
            Page::Items(items[self.range()].to_vec())
        } else if self.window_start < items.len() {
            Page::Items(items[self.window_start..].to_vec())
        } else {
            Page::End
        }
    }
}

impl<T> Clone for Cursor<T> {
    fn clone(&self) -> Self {
        Self {
            page_size: self.page_size,
            ordering: self.ordering.clone(),
            window_start: self.window_start,
            window_end: self.window_end,
            page_count: self.page_count,
        }
    }
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("page_size", &self.page_size)
            .field("ordered", &self.ordering.is_some())
            .field("window", &self.range())
            .field("page_count", &self.page_count)
            .finish()
    }
}
