/// One fetched page of a list.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total size of the underlying collection as known when this page was fetched.
    pub total: usize,
    /// Continuation marker: `false` once the source reports there is nothing after this page.
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: usize, has_more: bool) -> Self {
        Self {
            items,
            total,
            has_more,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Number of items across `pages`.
pub fn loaded_len<T>(pages: &[Page<T>]) -> usize {
    pages.iter().map(Page::len).sum()
}

/// Server-cursor page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CursorParam {
    pub offset: usize,
    pub limit: usize,
}

/// Client-slice page request: the window `[start, start + size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SliceParam {
    pub start: usize,
    pub size: usize,
}

impl SliceParam {
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.size)
    }
}

/// Tagged page request used by [`crate::CatalogStrategy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PageParam {
    Cursor(CursorParam),
    Slice(SliceParam),
}

/// Lifecycle of an [`crate::InfiniteList`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ListPhase {
    Idle,
    LoadingFirst,
    Ready,
    LoadingNext,
    Exhausted,
}

impl ListPhase {
    pub fn is_loading(self) -> bool {
        matches!(self, Self::LoadingFirst | Self::LoadingNext)
    }
}
