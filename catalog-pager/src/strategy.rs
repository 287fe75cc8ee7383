use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{self, BoxFuture};

use crate::client::normalize_category;
use crate::model::CatalogItem;
use crate::types::loaded_len;
use crate::{
    CatalogClient, CursorParam, FetchError, FetchResult, Page, PageParam, PageSizes, SliceParam,
};

/// A page fetch detached from the strategy that issued it, so a list can be dropped while its
/// request is still running.
pub type PageFuture<T> = BoxFuture<'static, FetchResult<Page<T>>>;

/// How to compute and fetch the next page of one list.
///
/// [`crate::InfiniteList`] is written once against this trait; the two pagination styles of
/// the catalog differ only here.
pub trait PageStrategy {
    type Item: Clone + core::fmt::Debug + Send + 'static;
    type Param: Clone + core::fmt::Debug + Send + 'static;

    fn initial_param(&self) -> Self::Param;

    fn fetch_page(&self, param: &Self::Param) -> PageFuture<Self::Item>;

    /// The request following `pages`, or `None` once the list is exhausted.
    ///
    /// `pages` is never empty when called by [`crate::InfiniteList`].
    fn next_param(&self, pages: &[Page<Self::Item>]) -> Option<Self::Param>;

    /// A disabled strategy never fetches.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Pagination delegated to the server: offsets are counted from what is already loaded and the
/// server's continuation marker decides whether there is more.
#[derive(Clone, Debug)]
pub struct ServerCursorStrategy {
    client: CatalogClient,
    sizes: PageSizes,
}

impl ServerCursorStrategy {
    pub fn new(client: CatalogClient) -> Self {
        Self {
            client,
            sizes: PageSizes::default(),
        }
    }

    pub fn with_page_sizes(mut self, sizes: PageSizes) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn page_sizes(&self) -> PageSizes {
        self.sizes
    }
}

impl PageStrategy for ServerCursorStrategy {
    type Item = CatalogItem;
    type Param = CursorParam;

    fn initial_param(&self) -> CursorParam {
        CursorParam {
            offset: 0,
            limit: self.sizes.first,
        }
    }

    fn fetch_page(&self, param: &CursorParam) -> PageFuture<CatalogItem> {
        let client = self.client.clone();
        let CursorParam { offset, limit } = *param;
        async move {
            let page = client.collection_page(limit, offset).await?;
            let has_more = page.next.as_deref().is_some_and(|next| !next.is_empty());
            Ok(Page::new(page.results, page.count, has_more))
        }
        .boxed()
    }

    fn next_param(&self, pages: &[Page<CatalogItem>]) -> Option<CursorParam> {
        if !pages.last()?.has_more {
            return None;
        }
        Some(CursorParam {
            offset: loaded_len(pages),
            limit: self.sizes.next,
        })
    }
}

/// Pagination over one bulk resource: the whole category is fetched once, then every page is a
/// window over the resident items.
#[derive(Clone, Debug)]
pub struct ClientSliceStrategy {
    client: CatalogClient,
    category: String,
    sizes: PageSizes,
    resident: Arc<Mutex<Option<Arc<Vec<CatalogItem>>>>>,
}

impl ClientSliceStrategy {
    pub fn new(client: CatalogClient, category: &str) -> Self {
        Self {
            client,
            category: normalize_category(category),
            sizes: PageSizes::default(),
            resident: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_page_sizes(mut self, sizes: PageSizes) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Items of the category, once the bulk fetch has completed.
    pub fn resident(&self) -> Option<Arc<Vec<CatalogItem>>> {
        self.resident
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PageStrategy for ClientSliceStrategy {
    type Item = CatalogItem;
    type Param = SliceParam;

    fn initial_param(&self) -> SliceParam {
        SliceParam {
            start: 0,
            size: self.sizes.first,
        }
    }

    fn fetch_page(&self, param: &SliceParam) -> PageFuture<CatalogItem> {
        if !self.is_enabled() {
            return future::ready(Err(FetchError::Disabled)).boxed();
        }
        let client = self.client.clone();
        let category = self.category.clone();
        let resident = Arc::clone(&self.resident);
        let param = *param;
        async move {
            let cached = resident
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            let all = match cached {
                Some(all) => all,
                None => {
                    let all = Arc::new(client.category(&category).await?.items());
                    pdebug!(category = %category, len = all.len(), "category resident");
                    *resident.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some(Arc::clone(&all));
                    all
                }
            };
            Ok(slice_page(&all, param))
        }
        .boxed()
    }

    fn next_param(&self, pages: &[Page<CatalogItem>]) -> Option<SliceParam> {
        let total = pages.last()?.total;
        let loaded = loaded_len(pages);
        if loaded >= total {
            return None;
        }
        Some(SliceParam {
            start: loaded,
            size: self.sizes.next,
        })
    }

    fn is_enabled(&self) -> bool {
        !self.category.is_empty()
    }
}

fn slice_page(all: &[CatalogItem], param: SliceParam) -> Page<CatalogItem> {
    let len = all.len();
    let start = param.start.min(len);
    let end = param.end().min(len);
    Page::new(all[start..end].to_vec(), len, param.end() < len)
}

/// The catalog's two list kinds behind one strategy type.
#[derive(Clone, Debug)]
pub enum CatalogStrategy {
    All(ServerCursorStrategy),
    Category(ClientSliceStrategy),
}

impl CatalogStrategy {
    /// The unfiltered list for a blank `category`, the category list otherwise.
    pub fn for_category(client: CatalogClient, category: &str, sizes: PageSizes) -> Self {
        if normalize_category(category).is_empty() {
            Self::All(ServerCursorStrategy::new(client).with_page_sizes(sizes))
        } else {
            Self::Category(ClientSliceStrategy::new(client, category).with_page_sizes(sizes))
        }
    }

    /// The category this list is filtered by, if any.
    pub fn category(&self) -> Option<&str> {
        match self {
            Self::All(_) => None,
            Self::Category(s) => Some(s.category()),
        }
    }
}

impl From<SliceParam> for CursorParam {
    fn from(p: SliceParam) -> Self {
        Self {
            offset: p.start,
            limit: p.size,
        }
    }
}

impl From<CursorParam> for SliceParam {
    fn from(p: CursorParam) -> Self {
        Self {
            start: p.offset,
            size: p.limit,
        }
    }
}

impl PageStrategy for CatalogStrategy {
    type Item = CatalogItem;
    type Param = PageParam;

    fn initial_param(&self) -> PageParam {
        match self {
            Self::All(s) => PageParam::Cursor(s.initial_param()),
            Self::Category(s) => PageParam::Slice(s.initial_param()),
        }
    }

    fn fetch_page(&self, param: &PageParam) -> PageFuture<CatalogItem> {
        match (self, *param) {
            (Self::All(s), PageParam::Cursor(p)) => s.fetch_page(&p),
            (Self::All(s), PageParam::Slice(p)) => s.fetch_page(&p.into()),
            (Self::Category(s), PageParam::Slice(p)) => s.fetch_page(&p),
            (Self::Category(s), PageParam::Cursor(p)) => s.fetch_page(&p.into()),
        }
    }

    fn next_param(&self, pages: &[Page<CatalogItem>]) -> Option<PageParam> {
        match self {
            Self::All(s) => s.next_param(pages).map(PageParam::Cursor),
            Self::Category(s) => s.next_param(pages).map(PageParam::Slice),
        }
    }

    fn is_enabled(&self) -> bool {
        match self {
            Self::All(s) => s.is_enabled(),
            Self::Category(s) => s.is_enabled(),
        }
    }
}
