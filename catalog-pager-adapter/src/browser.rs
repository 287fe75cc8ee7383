use async_trait::async_trait;
use catalog_pager::model::CatalogItem;
use catalog_pager::{
    CatalogClient, CatalogStrategy, Completion, FetchError, FetchResult, InfiniteList, ListId,
    ListPhase, Page, PageFuture, PageParam, PageSizes, PageTicket, normalize_category,
};

use crate::PagedSource;

type CatalogList = InfiniteList<CatalogStrategy>;

/// What presentation renders for the list area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListSnapshot<'a> {
    /// The list the items come from (the placeholder's while `is_placeholder`).
    pub list: ListId,
    pub category: Option<&'a str>,
    pub items: &'a [CatalogItem],
    pub total: usize,
    pub has_next_page: bool,
    pub is_fetching_next_page: bool,
    /// The active list has no page yet.
    pub is_initial_loading: bool,
    /// `items` belong to the previously active list, shown until the new one has its first
    /// page.
    pub is_placeholder: bool,
    /// Every item has been loaded and there was at least one.
    pub all_caught_up: bool,
    pub last_error: Option<&'a FetchError>,
}

/// A framework-neutral controller for the catalog list: owns the active [`InfiniteList`] and
/// replaces it whenever the category filter changes.
///
/// Adapters drive it by calling:
/// - `set_category` when the filter changes
/// - `load_more` (or `begin_load_more` / `fetch` / `complete` when they own the I/O)
/// - `snapshot` to render
///
/// Responses for a list that is no longer active are dropped.
#[derive(Clone, Debug)]
pub struct Browser {
    client: CatalogClient,
    sizes: PageSizes,
    active: CatalogList,
    placeholder: Option<CatalogList>,
}

impl Browser {
    /// Starts on the unfiltered list.
    pub fn new(client: CatalogClient) -> Self {
        Self::with_page_sizes(client, PageSizes::default())
    }

    pub fn with_page_sizes(client: CatalogClient, sizes: PageSizes) -> Self {
        let active = InfiniteList::new(CatalogStrategy::for_category(client.clone(), "", sizes));
        Self {
            client,
            sizes,
            active,
            placeholder: None,
        }
    }

    pub fn client(&self) -> &CatalogClient {
        &self.client
    }

    pub fn active(&self) -> &CatalogList {
        &self.active
    }

    pub fn category(&self) -> Option<&str> {
        self.active.strategy().category()
    }

    pub fn has_placeholder(&self) -> bool {
        self.placeholder.is_some()
    }

    /// Switches the active list. A blank `category` selects the unfiltered list.
    ///
    /// Returns `false` when `category` already is the active filter. The previous list is kept
    /// as placeholder only while the new one is empty; its in-flight responses are ignored.
    pub fn set_category(&mut self, category: &str) -> bool {
        let normalized = normalize_category(category);
        if self.category().unwrap_or("") == normalized {
            return false;
        }

        let next = InfiniteList::new(CatalogStrategy::for_category(
            self.client.clone(),
            &normalized,
            self.sizes,
        ));
        let previous = core::mem::replace(&mut self.active, next);
        adebug!(
            from = previous.id().get(),
            to = self.active.id().get(),
            category = %normalized,
            "active list switched"
        );
        if !previous.is_empty() {
            self.placeholder = Some(previous);
        }
        true
    }

    /// Issues the next request of the active list: the first page while it is idle, the next
    /// page otherwise.
    pub fn begin_load_more(&mut self) -> Option<PageTicket<PageParam>> {
        if self.active.phase() == ListPhase::Idle {
            self.active.begin_first_page()
        } else {
            self.active.begin_next_page()
        }
    }

    pub fn fetch(&self, ticket: &PageTicket<PageParam>) -> PageFuture<CatalogItem> {
        self.active.fetch(ticket)
    }

    /// Applies a response. Tickets of a list that is no longer active are ignored.
    pub fn complete(
        &mut self,
        ticket: &PageTicket<PageParam>,
        result: FetchResult<Page<CatalogItem>>,
    ) -> FetchResult<Completion> {
        if ticket.list() != self.active.id() {
            adebug!(
                list = ticket.list().get(),
                active = self.active.id().get(),
                "dropping response for inactive list"
            );
            return Ok(Completion::Ignored);
        }
        let completion = self.active.complete(ticket, result)?;
        self.settle();
        Ok(completion)
    }

    /// Loads the next page of the active list.
    pub async fn load_more(&mut self) -> FetchResult<bool> {
        let fetched = self.active.fetch_next_page().await?;
        self.settle();
        Ok(fetched)
    }

    fn settle(&mut self) {
        if !self.active.pages().is_empty() && self.placeholder.take().is_some() {
            atrace!(list = self.active.id().get(), "placeholder released");
        }
    }

    pub fn snapshot(&self) -> ListSnapshot<'_> {
        let active = &self.active;
        let is_initial_loading = active.pages().is_empty() && active.is_enabled();
        let shown = match &self.placeholder {
            Some(placeholder) if active.pages().is_empty() => placeholder,
            _ => active,
        };
        let is_placeholder = !core::ptr::eq(shown, active);

        ListSnapshot {
            list: shown.id(),
            category: shown.strategy().category(),
            items: shown.items(),
            total: shown.total(),
            has_next_page: active.has_next_page(),
            is_fetching_next_page: active.is_fetching_next_page(),
            is_initial_loading,
            is_placeholder,
            all_caught_up: active.is_exhausted() && !active.is_empty(),
            last_error: active.last_error(),
        }
    }
}

#[async_trait]
impl PagedSource for Browser {
    fn has_next_page(&self) -> bool {
        PagedSource::has_next_page(&self.active)
    }

    fn is_fetching_next_page(&self) -> bool {
        PagedSource::is_fetching_next_page(&self.active)
    }

    async fn fetch_next_page(&mut self) -> FetchResult<bool> {
        self.load_more().await
    }
}
